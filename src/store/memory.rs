//! Process-local store driver.
//!
//! Entries live in a DashMap and expire lazily: an expired entry is removed
//! the first time it is read after its deadline. No background sweeper runs.

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

use super::{KvStore, StoreError};

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Thread-safe in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn set(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<(), StoreError> {
        let expires_at = (ttl_secs > 0).then(|| Instant::now() + Duration::from_secs(ttl_secs));
        self.entries
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let now = Instant::now();
        // Expiry check and removal happen under the same shard lock
        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired(now))
            .is_some()
        {
            return Ok(None);
        }
        Ok(self.entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn delete(&self, keys: &[&str], prefix: &str) -> Result<(), StoreError> {
        for key in keys {
            self.entries.remove(&format!("{}{}", prefix, key));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_overwrite() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").await.unwrap(), None);

        store.set("a", b"1".to_vec(), 60).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(b"1".to_vec()));

        store.set("a", b"2".to_vec(), 60).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(b"2".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_with_prefix() {
        let store = MemoryStore::new();
        store.set("p_1", b"x".to_vec(), 0).await.unwrap();
        store.set("p_2", b"y".to_vec(), 0).await.unwrap();
        store.set("1", b"z".to_vec(), 0).await.unwrap();

        store.delete(&["1", "2"], "p_").await.unwrap();

        assert_eq!(store.get("p_1").await.unwrap(), None);
        assert_eq!(store.get("p_2").await.unwrap(), None);
        // Unprefixed key untouched
        assert_eq!(store.get("1").await.unwrap(), Some(b"z".to_vec()));
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let store = MemoryStore::new();
        store.set("short", b"v".to_vec(), 1).await.unwrap();
        store.set("forever", b"v".to_vec(), 0).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(store.get("short").await.unwrap(), None);
        assert_eq!(store.get("forever").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_writers() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let key = format!("k{}", i);
                store.set(&key, vec![i as u8], 60).await.unwrap();
                store.get(&key).await.unwrap()
            }));
        }
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), Some(vec![i as u8]));
        }
        assert_eq!(store.len(), 32);
    }
}
