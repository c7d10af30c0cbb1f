use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::credentials::{CredentialStore, StoreResult};

/// Credential file name in the data directory
const CREDENTIALS_FILE: &str = "credentials.json";

/// Credential store backed by a JSON file, for hosts without a keychain.
pub struct FileStore {
    path: PathBuf,
    // Serialises read-modify-write cycles on the file
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn in_dir(dir: PathBuf) -> Self {
        Self::new(dir.join(CREDENTIALS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_map(&self) -> StoreResult<BTreeMap<String, String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_map(&self, map: &BTreeMap<String, String>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(map)?;
        tokio::fs::write(&self.path, contents).await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let _guard = self.lock.lock().await;
        let map = self.read_map().await?;
        Ok(map.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map).await?;
        debug!(key, path = ?self.path, "Credential written");
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        if map.remove(key).is_some() {
            self.write_map(&map).await?;
            debug!(key, path = ?self.path, "Credential removed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StoreError;

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::in_dir(dir.path().join("nested"));
        assert_eq!(store.get("token").await.unwrap(), None);
        // Deleting from a missing file is fine and does not create it
        store.delete("token").await.unwrap();
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_set_creates_parent_dirs_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::in_dir(dir.path().join("a").join("b"));
        store.set("token", "tok123").await.unwrap();
        store.set("username", "alice").await.unwrap();

        let reopened = FileStore::new(store.path().to_path_buf());
        assert_eq!(reopened.get("token").await.unwrap().as_deref(), Some("tok123"));
        assert_eq!(reopened.get("username").await.unwrap().as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_delete_only_removes_named_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::in_dir(dir.path().to_path_buf());
        store.set("token", "tok123").await.unwrap();
        store.set("username", "alice").await.unwrap();
        store.delete("token").await.unwrap();

        assert_eq!(store.get("token").await.unwrap(), None);
        assert_eq!(store.get("username").await.unwrap().as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::in_dir(dir.path().to_path_buf());
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.get("token").await, Err(StoreError::Corrupt(_))));
    }
}
