//! API client for communicating with the Notes REST API.
//!
//! This module provides the `ApiClient` struct for the login/register
//! exchange and for authenticated note, category, and favorite requests.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::SessionData;
use crate::models::{
    Category, CategoryDraft, CategoryMembership, FavoriteRequest, FavoriteTarget, Note, NoteDraft,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

/// Result of a successful login exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    user: Option<AuthUser>,
}

#[derive(Debug, Clone, Deserialize)]
struct AuthUser {
    username: Option<String>,
}

impl AuthResponse {
    /// Username reported by the server, if any.
    pub fn username(&self) -> Option<&str> {
        self.username
            .as_deref()
            .or_else(|| self.user.as_ref().and_then(|u| u.username.as_deref()))
            .filter(|u| !u.is_empty())
    }

    /// Session for this login. Servers that do not report a username get
    /// the login email as display name.
    pub fn into_session(self, email: &str) -> SessionData {
        let username = self.username().unwrap_or(email).to_string();
        SessionData::new(self.token, username)
    }
}

/// API client for the Notes service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

// Bearer token is never printed
impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("has_token", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client for `base_url` (e.g. `http://localhost:3000`)
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        Ok(headers)
    }

    // ===== Request plumbing =====

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(response: reqwest::Response) -> Result<Option<reqwest::Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Send a request, retrying rate-limited attempts with exponential
    /// backoff, and return the response body text.
    async fn execute(&self, method: Method, path: &str, body: Option<&Value>) -> Result<String> {
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut request = self
                .client
                .request(method.clone(), &url)
                .headers(self.auth_headers()?);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request
                .send()
                .await
                .map_err(ApiError::from)
                .with_context(|| format!("Failed to send {} request to {}", method, url))?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    debug!(%method, url = %url, "Request succeeded");
                    return response
                        .text()
                        .await
                        .with_context(|| format!("Failed to read response from {}", url));
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(url = %url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }

    fn parse<T: DeserializeOwned>(text: &str, path: &str) -> Result<T> {
        serde_json::from_str(text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", path, e)).into()
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let text = self.execute(Method::GET, path, None).await?;
        Self::parse(&text, path)
    }

    /// Send a JSON body and return the response text.
    async fn send<B: Serialize>(&self, method: Method, path: &str, body: &B) -> Result<String> {
        let body = serde_json::to_value(body)?;
        self.execute(method, path, Some(&body)).await
    }

    fn require_token(&self) -> Result<()> {
        if self.token.is_none() {
            return Err(ApiError::Unauthorized.into());
        }
        Ok(())
    }

    fn validate(result: std::result::Result<(), String>) -> Result<()> {
        result.map_err(|msg| ApiError::Validation(msg).into())
    }

    // ===== Authentication =====

    /// Exchange email and password for a token
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<AuthResponse> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ApiError::Validation("Email and password are required".to_string()).into());
        }

        let text = self
            .send(Method::POST, "auth/login", &LoginRequest { email, password })
            .await?;
        let auth: AuthResponse = Self::parse(&text, "auth/login")?;
        if auth.token.is_empty() {
            return Err(ApiError::InvalidResponse("Login response has an empty token".to_string()).into());
        }
        Ok(auth)
    }

    /// Create an account
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<()> {
        if username.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(ApiError::Validation("All fields are required".to_string()).into());
        }

        self.send(
            Method::POST,
            "auth/register",
            &RegisterRequest {
                username,
                email,
                password,
            },
        )
        .await?;
        Ok(())
    }

    /// Create an account and log straight into it.
    ///
    /// The registration username is used as display name when the login
    /// response does not carry one.
    pub async fn register_and_login(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<SessionData> {
        self.register(username, email, password).await?;
        let auth = self
            .authenticate(email, password)
            .await
            .context("Registered, but could not log in")?;
        Ok(auth.into_session(username))
    }

    // ===== Notes =====

    pub async fn list_notes(&self) -> Result<Vec<Note>> {
        self.require_token()?;
        self.get("notes").await
    }

    pub async fn get_note(&self, id: i64) -> Result<Note> {
        self.require_token()?;
        self.get(&format!("notes/{}", id)).await
    }

    /// Create a note. Returns the created note when the server echoes it.
    pub async fn create_note(&self, draft: &NoteDraft) -> Result<Option<Note>> {
        self.require_token()?;
        Self::validate(draft.validate())?;
        let text = self.send(Method::POST, "notes", draft).await?;
        Ok(serde_json::from_str(&text).ok())
    }

    pub async fn update_note(&self, id: i64, draft: &NoteDraft) -> Result<()> {
        self.require_token()?;
        Self::validate(draft.validate())?;
        self.send(Method::PUT, &format!("notes/{}", id), draft).await?;
        Ok(())
    }

    pub async fn delete_note(&self, id: i64) -> Result<()> {
        self.require_token()?;
        self.execute(Method::DELETE, &format!("notes/{}", id), None)
            .await?;
        Ok(())
    }

    // ===== Favorites =====

    pub async fn list_favorites(&self) -> Result<Vec<Note>> {
        self.require_token()?;
        self.get("favorites").await
    }

    pub async fn add_favorite(&self, note_id: i64) -> Result<()> {
        self.require_token()?;
        self.send(Method::POST, "favorites", &FavoriteRequest::add(note_id))
            .await?;
        Ok(())
    }

    pub async fn remove_favorite(&self, note_id: i64) -> Result<()> {
        self.require_token()?;
        self.send(Method::DELETE, "favorites", &FavoriteRequest::remove(note_id))
            .await?;
        Ok(())
    }

    /// Flip the favorite flag of a note from a list response.
    pub async fn toggle_favorite(&self, note: &Note) -> Result<FavoriteTarget> {
        if note.is_favorite() {
            self.remove_favorite(note.id).await?;
            Ok(FavoriteTarget::Removed)
        } else {
            self.add_favorite(note.id).await?;
            Ok(FavoriteTarget::Added)
        }
    }

    // ===== Categories =====

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.require_token()?;
        self.get("categories").await
    }

    pub async fn create_category(&self, name: &str) -> Result<Option<Category>> {
        self.require_token()?;
        let draft = CategoryDraft::new(name.trim());
        Self::validate(draft.validate())?;
        let text = self.send(Method::POST, "categories", &draft).await?;
        Ok(serde_json::from_str(&text).ok())
    }

    pub async fn delete_category(&self, id: i64) -> Result<()> {
        self.require_token()?;
        self.execute(Method::DELETE, &format!("categories/{}", id), None)
            .await?;
        Ok(())
    }

    pub async fn category_notes(&self, id: i64) -> Result<Vec<Note>> {
        self.require_token()?;
        self.get(&format!("categories/{}/notes", id)).await
    }

    pub async fn add_note_to_category(&self, note_id: i64, category_id: i64) -> Result<()> {
        self.require_token()?;
        let body = CategoryMembership { note_id, category_id };
        self.send(Method::POST, "categories/add-note", &body).await?;
        Ok(())
    }

    pub async fn remove_note_from_category(&self, note_id: i64, category_id: i64) -> Result<()> {
        self.require_token()?;
        let body = CategoryMembership { note_id, category_id };
        self.send(Method::DELETE, "categories/remove-note", &body)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(err: &anyhow::Error) -> &ApiError {
        err.downcast_ref::<ApiError>().expect("expected an ApiError")
    }

    #[test]
    fn test_url_building() {
        let client = ApiClient::new("http://localhost:3000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
        assert_eq!(client.url("notes"), "http://localhost:3000/api/notes");
        assert_eq!(client.url("/notes/5"), "http://localhost:3000/api/notes/5");
    }

    #[test]
    fn test_auth_headers() {
        let client = ApiClient::new("http://localhost:3000").unwrap();
        assert!(client.auth_headers().unwrap().is_empty());

        let authed = client.with_token("tok123".to_string());
        let headers = authed.auth_headers().unwrap();
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer tok123");
        // The token-less client is untouched
        assert!(!client.has_token());
    }

    #[test]
    fn test_parse_auth_response() {
        let auth: AuthResponse = serde_json::from_str(r#"{"token": "tok123"}"#).unwrap();
        assert_eq!(auth.username(), None);
        assert_eq!(
            auth.into_session("alice@example.com"),
            SessionData::new("tok123", "alice@example.com")
        );

        let auth: AuthResponse =
            serde_json::from_str(r#"{"token": "tok123", "username": "alice"}"#).unwrap();
        assert_eq!(auth.username(), Some("alice"));

        let auth: AuthResponse =
            serde_json::from_str(r#"{"token": "tok123", "user": {"id": 1, "username": "bob"}}"#)
                .unwrap();
        assert_eq!(auth.into_session("x@example.com").username, "bob");
    }

    #[tokio::test]
    async fn test_authenticate_requires_credentials() {
        let client = ApiClient::new("http://localhost:3000").unwrap();
        let err = client.authenticate("", "secret").await.unwrap_err();
        assert!(matches!(api_error(&err), ApiError::Validation(_)));

        let err = client.register("alice", "alice@example.com", "").await.unwrap_err();
        assert!(matches!(api_error(&err), ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_protected_calls_require_token() {
        let client = ApiClient::new("http://localhost:3000").unwrap();
        let err = client.list_notes().await.unwrap_err();
        assert!(api_error(&err).is_unauthorized());

        let err = client.add_favorite(5).await.unwrap_err();
        assert!(api_error(&err).is_unauthorized());
    }

    #[tokio::test]
    async fn test_drafts_validated_before_sending() {
        let client = ApiClient::new("http://localhost:3000")
            .unwrap()
            .with_token("tok123".to_string());

        let err = client.create_note(&NoteDraft::new("", "body")).await.unwrap_err();
        assert!(matches!(api_error(&err), ApiError::Validation(_)));

        let err = client.update_note(7, &NoteDraft::new("Groceries", "")).await.unwrap_err();
        assert!(matches!(api_error(&err), ApiError::Validation(_)));

        let err = client.create_category("  ").await.unwrap_err();
        assert!(matches!(api_error(&err), ApiError::Validation(_)));
    }

    #[test]
    fn test_debug_hides_token() {
        let client = ApiClient::new("http://localhost:3000")
            .unwrap()
            .with_token("tok123".to_string());
        let text = format!("{:?}", client);
        assert!(text.contains("has_token: true"));
        assert!(!text.contains("tok123"));
    }

    #[test]
    fn test_parse_invalid_body() {
        let err = ApiClient::parse::<Vec<Note>>("<html>", "notes").unwrap_err();
        assert!(matches!(api_error(&err), ApiError::InvalidResponse(_)));
    }
}
