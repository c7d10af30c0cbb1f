//! notekeep-core - client core for the notekeep personal notes service.
//!
//! - [`auth`]: session state machine and credential storage
//! - [`routing`]: screen routes and navigation
//! - [`api`]: Notes REST API client
//! - [`models`]: note and category types
//! - [`config`]: on-disk configuration with environment overrides

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod routing;

pub use api::{ApiClient, ApiError};
pub use auth::{
    CredentialStore, SessionController, SessionError, SessionEvent, SessionHandle, SessionSnapshot,
    SessionState,
};
pub use config::{Config, CredentialBackend};
pub use routing::{MemoryRouter, Route, RouteObserver};
