use serde::{Deserialize, Serialize};

/// The authenticated identity. Token and username always travel together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub token: String,
    pub username: String,
}

impl SessionData {
    pub fn new(token: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            username: username.into(),
        }
    }
}

/// Client-side session state.
///
/// `Unresolved` only exists between construction and the first read of the
/// credential store; no redirect decision is ever made while in it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unresolved,
    Unauthenticated,
    Authenticated(SessionData),
}

impl SessionState {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, SessionState::Unresolved)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn data(&self) -> Option<&SessionData> {
        match self {
            SessionState::Authenticated(data) => Some(data),
            _ => None,
        }
    }

    /// Get the bearer token if authenticated
    pub fn token(&self) -> Option<&str> {
        self.data().map(|d| d.token.as_str())
    }

    pub fn username(&self) -> Option<&str> {
        self.data().map(|d| d.username.as_str())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            token: self.token().map(str::to_string),
            username: self.username().map(str::to_string),
        }
    }

    /// Short label used in log fields.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Unresolved => "unresolved",
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::Authenticated(_) => "authenticated",
        }
    }
}

/// Read-only view of the session handed to screens.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SessionSnapshot {
    pub token: Option<String>,
    pub username: Option<String>,
}

impl SessionSnapshot {
    /// Value for the `Authorization` header, if a token is present.
    pub fn bearer(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {}", t))
    }
}

/// One identity field read at startup: `None` until the read completes,
/// then `Some(value)` where `value` may itself be absent.
type FieldRead = Option<Option<String>>;

/// Collects the two independent startup reads of the credential store.
///
/// The reads may complete in either order; [`StartupRead::resolve`] only
/// yields a state once both fields are known.
#[derive(Debug, Clone, Default)]
pub struct StartupRead {
    token: FieldRead,
    username: FieldRead,
}

impl StartupRead {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_token(&mut self, value: Option<String>) {
        self.token = Some(value.filter(|v| !v.is_empty()));
    }

    pub fn set_username(&mut self, value: Option<String>) {
        self.username = Some(value.filter(|v| !v.is_empty()));
    }

    pub fn is_complete(&self) -> bool {
        self.token.is_some() && self.username.is_some()
    }

    /// True when exactly one of the two fields was stored. Such a leftover
    /// cannot become a session and should be removed from the store.
    pub fn is_partial(&self) -> bool {
        matches!(
            (&self.token, &self.username),
            (Some(Some(_)), Some(None)) | (Some(None), Some(Some(_)))
        )
    }

    pub fn resolve(&self) -> Option<SessionState> {
        match (&self.token, &self.username) {
            (Some(Some(token)), Some(Some(username))) => Some(SessionState::Authenticated(
                SessionData::new(token.clone(), username.clone()),
            )),
            (Some(_), Some(_)) => Some(SessionState::Unauthenticated),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_read_waits_for_both_fields() {
        let mut read = StartupRead::new();
        assert!(read.resolve().is_none());

        read.set_token(Some("tok123".to_string()));
        assert!(!read.is_complete());
        assert!(read.resolve().is_none());

        read.set_username(Some("alice".to_string()));
        assert_eq!(
            read.resolve(),
            Some(SessionState::Authenticated(SessionData::new("tok123", "alice")))
        );
    }

    #[test]
    fn test_startup_read_order_does_not_matter() {
        let mut read = StartupRead::new();
        read.set_username(Some("alice".to_string()));
        assert!(read.resolve().is_none());
        read.set_token(Some("tok123".to_string()));
        assert!(read.resolve().unwrap().is_authenticated());
    }

    #[test]
    fn test_startup_read_absent_token() {
        let mut read = StartupRead::new();
        read.set_token(None);
        assert!(read.resolve().is_none());
        read.set_username(Some("alice".to_string()));
        assert_eq!(read.resolve(), Some(SessionState::Unauthenticated));
        assert!(read.is_partial());
    }

    #[test]
    fn test_startup_read_token_without_username() {
        let mut read = StartupRead::new();
        read.set_token(Some("tok123".to_string()));
        read.set_username(None);
        assert_eq!(read.resolve(), Some(SessionState::Unauthenticated));
        assert!(read.is_partial());
    }

    #[test]
    fn test_startup_read_empty_values_count_as_absent() {
        let mut read = StartupRead::new();
        read.set_token(Some(String::new()));
        read.set_username(Some("alice".to_string()));
        assert_eq!(read.resolve(), Some(SessionState::Unauthenticated));
    }

    #[test]
    fn test_snapshot_tracks_state() {
        assert_eq!(SessionState::Unresolved.snapshot(), SessionSnapshot::default());
        assert_eq!(SessionState::Unauthenticated.snapshot(), SessionSnapshot::default());

        let state = SessionState::Authenticated(SessionData::new("tok123", "alice"));
        let snapshot = state.snapshot();
        assert_eq!(snapshot.token.as_deref(), Some("tok123"));
        assert_eq!(snapshot.username.as_deref(), Some("alice"));
        assert_eq!(snapshot.bearer().as_deref(), Some("Bearer tok123"));
    }

    #[test]
    fn test_state_labels() {
        assert!(!SessionState::Unresolved.is_resolved());
        assert!(SessionState::Unauthenticated.is_resolved());
        assert_eq!(SessionState::Unresolved.label(), "unresolved");
        assert_eq!(SessionState::Unauthenticated.label(), "unauthenticated");
    }
}
