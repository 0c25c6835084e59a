//! Redis session cache adapter.

use super::{CacheConfig, SessionCache};
use crate::error::{AuthError, AuthResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::{debug, error, warn};

/// Session cache over a managed Redis connection.
///
/// Entries are written with plain `SET` — no expiry. Logout deletes the key,
/// which is the refresh-revocation mechanism; a TTL here would silently log
/// users out.
#[derive(Clone)]
pub struct RedisSessionCache {
    connection: ConnectionManager,
    config: CacheConfig,
}

impl RedisSessionCache {
    pub async fn new(config: CacheConfig) -> AuthResult<Self> {
        let client = Client::open(config.redis_url.as_str()).map_err(|e| {
            error!("Failed to create Redis client: {}", e);
            AuthError::Cache(format!("Redis client creation failed: {e}"))
        })?;

        let connection = ConnectionManager::new(client).await.map_err(|e| {
            error!("Failed to connect to Redis: {}", e);
            AuthError::Cache(format!("Redis connection failed: {e}"))
        })?;

        Ok(Self { connection, config })
    }

    fn build_key(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    async fn get(&self, key: &str) -> AuthResult<Option<String>> {
        let cache_key = self.build_key(key);
        debug!("session cache GET: {}", cache_key);

        let mut conn = self.connection.clone();
        conn.get(&cache_key).await.map_err(|e| {
            warn!("Redis GET failed for {}: {}", cache_key, e);
            AuthError::Cache(format!("Cache get failed: {e}"))
        })
    }

    async fn set(&self, key: &str, value: String) -> AuthResult<()> {
        let cache_key = self.build_key(key);
        debug!("session cache SET: {}", cache_key);

        let mut conn = self.connection.clone();
        conn.set(&cache_key, value).await.map_err(|e| {
            warn!("Redis SET failed for {}: {}", cache_key, e);
            AuthError::Cache(format!("Cache set failed: {e}"))
        })
    }

    async fn delete(&self, key: &str) -> AuthResult<()> {
        let cache_key = self.build_key(key);
        debug!("session cache DELETE: {}", cache_key);

        let mut conn = self.connection.clone();
        conn.del(&cache_key).await.map_err(|e| {
            warn!("Redis DELETE failed for {}: {}", cache_key, e);
            AuthError::Cache(format!("Cache delete failed: {e}"))
        })
    }
}
