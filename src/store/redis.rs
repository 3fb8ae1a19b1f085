//! Redis store driver.
//!
//! Uses a multiplexed `ConnectionManager`, which reconnects on its own and is
//! cheap to clone per operation. TTLs map onto `SET ... EX`.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::info;
use url::Url;

use super::{KvStore, StoreError};
use crate::config::RedisConfig;

pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect using the bridge's redis settings.
    pub async fn connect(config: &RedisConfig) -> Result<Self, StoreError> {
        let url = connection_url(config)?;
        info!(server = %config.server, db = config.db, "Connecting to Redis");

        let client =
            redis::Client::open(url.as_str()).map_err(|e| StoreError::Backend(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self { conn })
    }
}

/// `redis://[:password@]host:port/db`, with the password percent-encoded.
pub(crate) fn connection_url(config: &RedisConfig) -> Result<Url, StoreError> {
    let mut url = Url::parse(&format!("redis://{}/{}", config.server, config.db))
        .map_err(|e| StoreError::Backend(format!("invalid redis server {}: {}", config.server, e)))?;
    if !config.password.is_empty() {
        url.set_password(Some(&config.password))
            .map_err(|_| StoreError::Backend("cannot set redis password".into()))?;
    }
    Ok(url)
}

fn backend(e: redis::RedisError) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl KvStore for RedisStore {
    async fn set(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        if ttl_secs > 0 {
            conn.set_ex::<_, _, ()>(key, value, ttl_secs)
                .await
                .map_err(backend)
        } else {
            conn.set::<_, _, ()>(key, value).await.map_err(backend)
        }
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<Vec<u8>>>(key).await.map_err(backend)
    }

    async fn delete(&self, keys: &[&str], prefix: &str) -> Result<(), StoreError> {
        if keys.is_empty() {
            return Ok(());
        }
        let full: Vec<String> = keys.iter().map(|k| format!("{}{}", prefix, k)).collect();
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(full).await.map_err(backend)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redis_config(server: &str, password: &str, db: i64) -> RedisConfig {
        RedisConfig {
            server: server.to_string(),
            password: password.to_string(),
            db,
        }
    }

    #[test]
    fn test_connection_url_without_password() {
        let url = connection_url(&redis_config("localhost:6379", "", 0)).unwrap();
        assert_eq!(url.as_str(), "redis://localhost:6379/0");
    }

    #[test]
    fn test_connection_url_encodes_password() {
        let url = connection_url(&redis_config("cache:6380", "p@ss/word", 2)).unwrap();
        assert_eq!(url.host_str(), Some("cache"));
        assert_eq!(url.port(), Some(6380));
        assert_eq!(url.path(), "/2");
        assert_eq!(url.password(), Some("p%40ss%2Fword"));
    }

    #[test]
    fn test_connection_url_rejects_garbage() {
        assert!(connection_url(&redis_config("bad host:xx", "", 0)).is_err());
    }
}
