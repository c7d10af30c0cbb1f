use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::credentials::{CredentialStore, StoreError, StoreResult};

/// In-process credential store.
///
/// Used for `--ephemeral` runs and in tests, where it can be told to fail
/// or to delay individual operations.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    read_delays: Mutex<HashMap<String, Duration>>,
    failing_writes: Mutex<HashSet<String>>,
    fail_reads: AtomicBool,
    writes: AtomicUsize,
    deletes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token and username.
    pub fn with_credentials(token: &str, username: &str) -> Self {
        let store = Self::new();
        {
            let mut values = store.values();
            values.insert(super::TOKEN_KEY.to_string(), token.to_string());
            values.insert(super::USERNAME_KEY.to_string(), username.to_string());
        }
        store
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every `get` fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make `set` and `delete` fail for one key.
    pub fn fail_writes_for(&self, key: &str) {
        self.failing_writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string());
    }

    pub fn clear_write_failures(&self) {
        self.failing_writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Delay reads of one key.
    pub fn delay_reads_of(&self, key: &str, delay: Duration) {
        self.read_delays
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), delay);
    }

    /// Number of successful `set` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of successful `delete` calls.
    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Synchronous peek, bypassing delays and failures.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.values().get(key).cloned()
    }

    fn check_write(&self, key: &str) -> StoreResult<()> {
        let failing = self.failing_writes.lock().unwrap_or_else(|e| e.into_inner());
        if failing.contains(key) {
            return Err(StoreError::Unavailable(format!("write to '{}' rejected", key)));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let delay = self
            .read_delays
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("read of '{}' rejected", key)));
        }
        Ok(self.peek(key))
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.check_write(key)?;
        self.values().insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.check_write(key)?;
        self.values().remove(key);
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeded_store() {
        let store = MemoryStore::with_credentials("tok123", "alice");
        assert_eq!(store.get("token").await.unwrap().as_deref(), Some("tok123"));
        assert_eq!(store.get("username").await.unwrap().as_deref(), Some("alice"));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_failing_writes_leave_value_untouched() {
        let store = MemoryStore::with_credentials("tok123", "alice");
        store.fail_writes_for("username");

        assert!(store.set("username", "bob").await.is_err());
        assert!(store.delete("username").await.is_err());
        assert_eq!(store.peek("username").as_deref(), Some("alice"));

        // Other keys are unaffected
        store.set("token", "tok456").await.unwrap();
        assert_eq!(store.write_count(), 1);

        store.clear_write_failures();
        store.delete("username").await.unwrap();
        assert_eq!(store.delete_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_reads() {
        let store = MemoryStore::with_credentials("tok123", "alice");
        store.fail_reads(true);
        assert!(store.get("token").await.is_err());
        store.fail_reads(false);
        assert!(store.get("token").await.is_ok());
    }
}
