//! Authentication module for managing the client-side session.
//!
//! This module provides:
//! - `SessionController`: the session state machine that gates screens
//! - `CredentialStore`: persistent key-value storage for `token`/`username`
//!   (OS keychain, JSON file, or in-memory)
//!
//! The session starts `Unresolved` and becomes `Authenticated` or
//! `Unauthenticated` once the stored credentials have been read.

pub mod controller;
pub mod credentials;
pub mod file_store;
pub mod memory_store;
pub mod session;

pub use controller::{reconcile_route, SessionController, SessionError, SessionEvent, SessionHandle};
pub use credentials::{
    open_store, CredentialStore, KeyringStore, StoreError, StoreResult, TOKEN_KEY, USERNAME_KEY,
};
pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use session::{SessionData, SessionSnapshot, SessionState, StartupRead};
