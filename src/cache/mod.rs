//! Session cache.
//!
//! Maps a user id to a serialized snapshot of the user's persisted state.
//! The entry is written on login and on every mutation, and deleted on
//! logout; its continued presence is what keeps a refresh token usable, so
//! entries carry no TTL and revocation is an explicit delete.

mod memory;
mod redis;

pub use memory::MemorySessionCache;
pub use redis::RedisSessionCache;

use crate::error::AuthResult;
use async_trait::async_trait;
use std::env;

/// Key-value contract consumed by the flows. `delete` of an absent key is
/// not an error.
#[async_trait]
pub trait SessionCache: Send + Sync {
    async fn get(&self, key: &str) -> AuthResult<Option<String>>;
    async fn set(&self, key: &str, value: String) -> AuthResult<()>;
    async fn delete(&self, key: &str) -> AuthResult<()>;
}

/// Cache adapter configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379").
    pub redis_url: String,

    /// Key prefix for all cache entries.
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            key_prefix: "keygate:session:".to_string(),
        }
    }
}

impl CacheConfig {
    /// Load from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            key_prefix: env::var("KEYGATE_CACHE_PREFIX")
                .unwrap_or_else(|_| "keygate:session:".to_string()),
        }
    }
}
