//! Response cache — Redis when configured, in-process TTL map otherwise.
//!
//! A Redis error on any operation falls back to the memory map for that
//! operation; the cache is an optimization, never a source of truth, so
//! failures degrade silently to a miss.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

/// Two-tier cache handle. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct Cache {
    redis: Option<ConnectionManager>,
    memory: Arc<RwLock<HashMap<String, MemoryEntry>>>,
}

impl Cache {
    /// Connect to Redis if a URL is configured; otherwise memory-only.
    pub async fn connect(redis_url: Option<&str>) -> Self {
        let redis = match redis_url {
            Some(url) => match redis::Client::open(url) {
                Ok(client) => match ConnectionManager::new(client).await {
                    Ok(conn) => {
                        tracing::info!("Connected to Redis cache");
                        Some(conn)
                    }
                    Err(e) => {
                        tracing::warn!("Redis unavailable, using memory cache: {e}");
                        None
                    }
                },
                Err(e) => {
                    tracing::warn!("Invalid Redis URL, using memory cache: {e}");
                    None
                }
            },
            None => None,
        };

        Self {
            redis,
            memory: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Memory-only cache, for tests and Redis-less deployments.
    pub fn in_memory() -> Self {
        Self {
            redis: None,
            memory: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get and deserialize a cached value. Expired or missing keys are a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if let Some(conn) = &self.redis {
            let mut conn = conn.clone();
            match conn.get::<_, Option<String>>(key).await {
                Ok(Some(raw)) => return serde_json::from_str(&raw).ok(),
                Ok(None) => return None,
                Err(e) => tracing::debug!("Redis get failed, trying memory: {e}"),
            }
        }

        let mut memory = self.memory.write().await;
        match memory.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                serde_json::from_str(&entry.value).ok()
            }
            Some(_) => {
                memory.remove(key);
                None
            }
            None => None,
        }
    }

    /// Serialize and store a value with a TTL.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        let Ok(raw) = serde_json::to_string(value) else {
            return;
        };

        if let Some(conn) = &self.redis {
            let mut conn = conn.clone();
            if let Err(e) = conn.set_ex::<_, _, ()>(key, &raw, ttl_secs).await {
                tracing::debug!("Redis set failed, using memory: {e}");
            } else {
                return;
            }
        }

        self.memory.write().await.insert(
            key.to_string(),
            MemoryEntry {
                value: raw,
                expires_at: Instant::now() + Duration::from_secs(ttl_secs),
            },
        );
    }

    /// Invalidate a key in both tiers.
    pub async fn del(&self, key: &str) {
        if let Some(conn) = &self.redis {
            let mut conn = conn.clone();
            if let Err(e) = conn.del::<_, ()>(key).await {
                tracing::debug!("Redis del failed: {e}");
            }
        }
        self.memory.write().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_roundtrip() {
        let cache = Cache::in_memory();
        cache.set("k", &vec![1, 2, 3], 60).await;
        let got: Option<Vec<i32>> = cache.get("k").await;
        assert_eq!(got, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss() {
        let cache = Cache::in_memory();
        cache.set("k", &"v", 0).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        let got: Option<String> = cache.get("k").await;
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn del_removes_entry() {
        let cache = Cache::in_memory();
        cache.set("k", &"v", 60).await;
        cache.del("k").await;
        let got: Option<String> = cache.get("k").await;
        assert_eq!(got, None);
    }
}
