//! Application state for the notekeep CLI.
//!
//! `App` wires the session controller to a credential store, an in-memory
//! router and the Notes API client. Every command opens the route of its
//! screen first, so the session gate decides whether it may run.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};

use notekeep_core::auth::{open_store, CredentialStore, SessionController, SessionSnapshot};
use notekeep_core::config::CredentialBackend;
use notekeep_core::routing::{MemoryRouter, Route, RouteObserver};
use notekeep_core::{ApiClient, Config};

type Controller = SessionController<Arc<dyn CredentialStore>, Arc<MemoryRouter>>;

pub struct App {
    pub config: Config,
    session: Arc<Controller>,
    router: Arc<MemoryRouter>,
    api: ApiClient,
}

impl App {
    /// Create the app and resolve the stored session.
    pub async fn new(config: Config, ephemeral: bool) -> Result<Self> {
        let backend = if ephemeral {
            CredentialBackend::Memory
        } else {
            config.credential_backend
        };
        let data_dir = config
            .data_dir()
            .context("Could not locate the credential directory")?;
        let store = open_store(backend, data_dir);

        let router = Arc::new(MemoryRouter::new());
        let session = Arc::new(SessionController::new(store, Arc::clone(&router)));
        let api = ApiClient::new(config.api_url())?;
        debug!(api_url = api.base_url(), %backend, "App configured");

        let state = session.start().await;
        debug!(state = state.label(), route = %router.current(), "Session started");

        Ok(Self {
            config,
            session,
            router,
            api,
        })
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot().await
    }

    /// Navigate to `route` and return an API client carrying the session
    /// token. Fails when the session gate sends the user to the login screen.
    pub async fn open(&self, route: Route) -> Result<ApiClient> {
        self.router.push(&route.path());
        if let Some(target) = self.session.reconcile().await {
            debug!(from = %route, to = %target, "Navigation redirected");
        }

        if route.is_public() {
            return Ok(self.api.clone());
        }
        if self.router.current() == Route::Login {
            bail!("Not logged in. Run `notekeep login` first.");
        }

        let token = self
            .snapshot()
            .await
            .token
            .context("Not logged in. Run `notekeep login` first.")?;
        Ok(self.api.with_token(token))
    }

    /// Authenticate and record the session.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<String> {
        let api = self.open(Route::Login).await?;
        let auth = api.authenticate(email, password).await?;
        let session = auth.into_session(email);

        self.session
            .login(&session.token, &session.username)
            .await
            .context("Logged in, but the session could not be saved")?;

        self.remember_email(email);
        info!(username = %session.username, "Login successful");
        Ok(session.username)
    }

    /// Create an account, then log into it.
    pub async fn register(&mut self, username: &str, email: &str, password: &str) -> Result<String> {
        let api = self.open(Route::Register).await?;
        let session = api.register_and_login(username, email, password).await?;

        self.session
            .login(&session.token, &session.username)
            .await
            .context("Registered, but the session could not be saved")?;

        self.remember_email(email);
        info!(username = %session.username, "Registration successful");
        Ok(session.username)
    }

    pub async fn logout(&self) -> Result<Option<String>> {
        let username = self.snapshot().await.username;
        self.session.logout().await?;
        Ok(username)
    }

    fn remember_email(&mut self, email: &str) {
        if self.config.last_email.as_deref() == Some(email) {
            return;
        }
        self.config.last_email = Some(email.to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }
}
