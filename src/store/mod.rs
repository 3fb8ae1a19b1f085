//! Order session store.
//!
//! ## Components
//! - [`KvStore`]: byte-level key-value contract with TTL, implemented by
//!   every driver
//! - `memory`: process-local [`MemoryStore`] (DashMap, lazy expiry)
//! - `redis`: networked [`RedisStore`] (feature `redis-store`)
//! - `orders`: typed [`OrderStore`] for purchase sessions and paid markers
//!
//! Drivers never see typed values. Encoding happens in [`OrderStore`], which
//! reports undecodable entries as [`StoreError::Decode`] instead of guessing.

pub mod memory;
pub mod orders;
#[cfg(feature = "redis-store")]
pub mod redis;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStore;
pub use orders::{OrderState, OrderStore, PAID_ORDER_PREFIX, PAID_TTL_SECS, PURCHASE_SESSION_PREFIX, SESSION_TTL_SECS};
#[cfg(feature = "redis-store")]
pub use self::redis::RedisStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Failed to encode value for {key}: {reason}")]
    Encode { key: String, reason: String },

    #[error("Failed to decode value at {key}: {reason}")]
    Decode { key: String, reason: String },
}

/// Key-value contract shared by all drivers.
///
/// `ttl_secs == 0` stores without expiry. Single-key operations only; no
/// driver offers multi-key atomicity and none is required.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn set(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Delete `prefix + key` for every key.
    async fn delete(&self, keys: &[&str], prefix: &str) -> Result<(), StoreError>;

    /// Driver name for logs
    fn name(&self) -> &'static str;
}
