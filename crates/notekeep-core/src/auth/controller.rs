//! Session state machine.
//!
//! `SessionController` owns the in-memory session, reconciles it with the
//! credential store on startup and keeps the current route consistent with
//! it. It is the single writer of the `token` and `username` keys.

use std::sync::{Arc, Mutex as StdMutex};

use futures::stream::{FuturesUnordered, StreamExt};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::credentials::{CredentialStore, StoreError, TOKEN_KEY, USERNAME_KEY};
use super::session::{SessionData, SessionSnapshot, SessionState, StartupRead};
use crate::routing::{Route, RouteObserver, LANDING_PATH, LOGIN_PATH};

/// Buffer size for the session event channel.
const CHANNEL_BUFFER_SIZE: usize = 32;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Token must not be empty")]
    EmptyToken,

    #[error("Username must not be empty")]
    EmptyUsername,

    #[error("Failed to persist credentials: {0}")]
    Persist(#[from] StoreError),
}

/// Notifications that trigger reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The startup read finished and the session left `Unresolved`
    Resolved,
    /// `login` or `logout` completed
    Changed,
    /// The current route changed
    RouteChanged(Route),
}

/// Decide where the user must be sent for a given state and route.
///
/// Returns `None` when no redirect is needed. Nothing is ever decided while
/// the session is unresolved.
pub fn reconcile_route(state: &SessionState, route: &Route) -> Option<Route> {
    match state {
        SessionState::Unresolved => None,
        SessionState::Unauthenticated if !route.is_public() => Some(Route::Login),
        SessionState::Authenticated(_) if route.is_root() => Some(Route::Notes),
        _ => None,
    }
}

pub struct SessionController<S, R> {
    store: S,
    router: R,
    state: RwLock<SessionState>,
    // Serialises start/login/logout so persistence writes never interleave
    transition: Mutex<()>,
    events_tx: mpsc::Sender<SessionEvent>,
    events_rx: StdMutex<Option<mpsc::Receiver<SessionEvent>>>,
}

impl<S: CredentialStore, R: RouteObserver> SessionController<S, R> {
    pub fn new(store: S, router: R) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        Self {
            store,
            router,
            state: RwLock::new(SessionState::Unresolved),
            transition: Mutex::new(()),
            events_tx: tx,
            events_rx: StdMutex::new(Some(rx)),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    /// Sender for route observers that publish `RouteChanged`.
    pub fn event_sender(&self) -> mpsc::Sender<SessionEvent> {
        self.events_tx.clone()
    }

    /// Take the event receiver. Only the first caller gets it.
    pub fn subscribe(&self) -> Option<mpsc::Receiver<SessionEvent>> {
        self.events_rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.read().await.snapshot()
    }

    fn publish(&self, event: SessionEvent) {
        if let Err(e) = self.events_tx.try_send(event) {
            debug!(error = %e, "Session event not delivered");
        }
    }

    async fn read_field(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Failed to read credential, treating as absent");
                None
            }
        }
    }

    /// Read the stored identity and leave `Unresolved`.
    ///
    /// Both keys are read concurrently; the state only changes once both
    /// reads have finished. Calling this again after resolution is a no-op.
    pub async fn start(&self) -> SessionState {
        let resolved = {
            let _guard = self.transition.lock().await;
            let current = self.state.read().await.clone();
            if current.is_resolved() {
                return current;
            }

            let mut reads: FuturesUnordered<_> = [TOKEN_KEY, USERNAME_KEY]
                .into_iter()
                .map(|key| async move { (key, self.read_field(key).await) })
                .collect();

            let mut startup = StartupRead::new();
            let resolved = loop {
                match reads.next().await {
                    Some((key, value)) => {
                        if key == TOKEN_KEY {
                            startup.set_token(value);
                        } else {
                            startup.set_username(value);
                        }
                        if let Some(state) = startup.resolve() {
                            break state;
                        }
                        debug!(key, "Identity field resolved, waiting for the rest");
                    }
                    None => break SessionState::Unauthenticated,
                }
            };

            if startup.is_partial() {
                warn!("Stored session is missing a field, discarding it");
                if let Err(e) = self.erase().await {
                    warn!(error = %e, "Failed to remove partial session");
                }
            }

            *self.state.write().await = resolved.clone();
            resolved
        };

        info!(state = resolved.label(), username = ?resolved.username(), "Session resolved");
        self.publish(SessionEvent::Resolved);
        self.reconcile().await;
        resolved
    }

    /// Cloneable handle onto this shared controller.
    pub fn handle(self: &Arc<Self>) -> SessionHandle<S, R> {
        SessionHandle::new(Arc::clone(self))
    }

    /// Record a new session and go to the landing screen.
    ///
    /// Both keys must be written before the in-memory state changes. On a
    /// write failure the store is put back to match the previous session and
    /// the error is returned.
    pub async fn login(&self, token: &str, username: &str) -> Result<(), SessionError> {
        if token.is_empty() {
            return Err(SessionError::EmptyToken);
        }
        if username.is_empty() {
            return Err(SessionError::EmptyUsername);
        }

        {
            let _guard = self.transition.lock().await;
            let previous = self.state.read().await.clone();

            if let Err(e) = self.persist(token, username).await {
                error!(error = %e, username, "Failed to persist session");
                self.restore(&previous).await;
                return Err(e.into());
            }

            *self.state.write().await =
                SessionState::Authenticated(SessionData::new(token, username));
            info!(username, "Logged in");
        }

        self.publish(SessionEvent::Changed);
        self.router.replace(LANDING_PATH);
        Ok(())
    }

    /// Forget the session and go to the login screen.
    pub async fn logout(&self) -> Result<(), SessionError> {
        {
            let _guard = self.transition.lock().await;
            let previous = self.state.read().await.clone();

            if let Err(e) = self.erase().await {
                error!(error = %e, "Failed to remove stored session");
                self.restore(&previous).await;
                return Err(e.into());
            }

            *self.state.write().await = SessionState::Unauthenticated;
            info!(username = ?previous.username(), "Logged out");
        }

        self.publish(SessionEvent::Changed);
        self.router.replace(LOGIN_PATH);
        Ok(())
    }

    async fn persist(&self, token: &str, username: &str) -> Result<(), StoreError> {
        self.store.set(TOKEN_KEY, token).await?;
        self.store.set(USERNAME_KEY, username).await?;
        Ok(())
    }

    async fn erase(&self) -> Result<(), StoreError> {
        self.store.delete(TOKEN_KEY).await?;
        self.store.delete(USERNAME_KEY).await?;
        Ok(())
    }

    /// Best-effort rewrite of the store to match `previous`.
    async fn restore(&self, previous: &SessionState) {
        let result = match previous {
            SessionState::Authenticated(data) => self.persist(&data.token, &data.username).await,
            _ => self.erase().await,
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to restore stored session after error");
        }
    }

    /// Align the current route with the session state.
    ///
    /// Returns the redirect target, if a redirect was issued.
    pub async fn reconcile(&self) -> Option<Route> {
        let state = self.state.read().await.clone();
        if !state.is_resolved() {
            debug!("Session unresolved, skipping reconciliation");
            return None;
        }

        let route = self.router.current_route();
        let target = reconcile_route(&state, &route)?;
        info!(from = %route, to = %target, state = state.label(), "Redirecting");
        self.router.replace(&target.path());
        Some(target)
    }

    /// React to one event.
    pub async fn handle_event(&self, event: SessionEvent) -> Option<Route> {
        debug!(?event, "Session event");
        self.reconcile().await
    }

    /// Reconcile on every event until the channel closes.
    pub async fn run_reconciler(&self, mut rx: mpsc::Receiver<SessionEvent>) {
        while let Some(event) = rx.recv().await {
            self.handle_event(event).await;
        }
        debug!("Session event channel closed");
    }
}

/// Cheap, cloneable view of a shared controller handed to screens: the
/// read-only session plus `login`/`logout`.
pub struct SessionHandle<S, R> {
    controller: Arc<SessionController<S, R>>,
}

impl<S, R> Clone for SessionHandle<S, R> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
        }
    }
}

impl<S: CredentialStore, R: RouteObserver> SessionHandle<S, R> {
    pub fn new(controller: Arc<SessionController<S, R>>) -> Self {
        Self { controller }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.controller.snapshot().await
    }

    pub async fn login(&self, token: &str, username: &str) -> Result<(), SessionError> {
        self.controller.login(token, username).await
    }

    pub async fn logout(&self) -> Result<(), SessionError> {
        self.controller.logout().await
    }
}
