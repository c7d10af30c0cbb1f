//! Persistent credential storage.
//!
//! The session controller is the only writer of the `token` and `username`
//! keys. Screens never touch the store directly.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use keyring::Entry;
use thiserror::Error;
use tracing::debug;

use super::{FileStore, MemoryStore};
use crate::config::CredentialBackend;

/// Key holding the bearer token
pub const TOKEN_KEY: &str = "token";

/// Key holding the display username
pub const USERNAME_KEY: &str = "username";

/// Service name for keychain entries
const SERVICE_NAME: &str = "notekeep";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Credential file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Credential store task failed: {0}")]
    Task(String),

    #[error("Credential store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Async key-value store surviving restarts.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove a key. Removing a key that is not present succeeds.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}

#[async_trait]
impl<T: CredentialStore + ?Sized> CredentialStore for Arc<T> {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set(key, value).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        (**self).delete(key).await
    }
}

/// OS keychain storage. Each key is a separate entry under the `notekeep`
/// service.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    async fn run<T, F>(&self, key: &str, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(Entry) -> StoreResult<T> + Send + 'static,
    {
        let service = self.service.clone();
        let key = key.to_string();
        // keyring calls block on platform IPC
        tokio::task::spawn_blocking(move || {
            let entry = Entry::new(&service, &key)?;
            op(entry)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for KeyringStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.run(key, |entry| match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let value = value.to_string();
        self.run(key, move |entry| Ok(entry.set_password(&value)?))
            .await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.run(key, |entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        })
        .await
    }
}

/// Open the store for the configured backend.
pub fn open_store(backend: CredentialBackend, data_dir: PathBuf) -> Arc<dyn CredentialStore> {
    debug!(?backend, ?data_dir, "Opening credential store");
    match backend {
        CredentialBackend::Keyring => Arc::new(KeyringStore::new()),
        CredentialBackend::File => Arc::new(FileStore::in_dir(data_dir)),
        CredentialBackend::Memory => Arc::new(MemoryStore::new()),
    }
}
