use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use redis::AsyncCommands;

pub type Result<T> = std::result::Result<T, CacheError>;

#[derive(Debug)]
pub enum CacheError {
    Backend(String),
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::Backend(why) => write!(f, "cache backend error: {why}"),
        }
    }
}

impl std::error::Error for CacheError {}

/// A string-valued key-value store with per-key TTL. OTPs and quote caching
/// are the only two consumers; no transactions are required.
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn del(&self, key: &str) -> Result<()>;
}

#[derive(Default)]
pub struct InMemoryStore {
    entries: DashMap<String, (String, Instant)>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EphemeralStore for InMemoryStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.entries
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let Some(entry) = self.entries.get(key) else {
            return Ok(None);
        };
        let (value, expires_at) = entry.value().clone();
        if expires_at < Instant::now() {
            drop(entry);
            self.entries.remove(key);
            return Ok(None);
        }
        Ok(Some(value))
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

pub struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    /// Opens the client and round-trips a `PING` so callers can fall back
    /// to an in-memory store if the server isn't reachable yet.
    pub async fn connect(url: &str) -> std::result::Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<_, ()>(&mut conn).await?;
        Ok(Self { client })
    }
}

#[async_trait]
impl EphemeralStore for RedisStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|why| CacheError::Backend(why.to_string()))?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(|why| CacheError::Backend(why.to_string()))
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|why| CacheError::Backend(why.to_string()))?;
        conn.get(key)
            .await
            .map_err(|why| CacheError::Backend(why.to_string()))
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|why| CacheError::Backend(why.to_string()))?;
        conn.del::<_, ()>(key)
            .await
            .map_err(|why| CacheError::Backend(why.to_string()))
    }
}

/// Redis-backed when available, otherwise an in-memory map. Restart loses
/// OTPs and quote-selection fast-path state in the fallback case, which
/// matches the degraded-mode contract: log and continue, never hard-fail.
pub enum EphemeralCache {
    Redis(RedisStore),
    InMemory(InMemoryStore),
}

impl EphemeralCache {
    pub async fn connect(redis_url: Option<&str>, fallback_allowed: bool) -> Self {
        match redis_url {
            Some(url) => match RedisStore::connect(url).await {
                Ok(store) => EphemeralCache::Redis(store),
                Err(why) if fallback_allowed => {
                    tracing::warn!(error = %why, "ephemeral KV unreachable, falling back to in-memory");
                    EphemeralCache::InMemory(InMemoryStore::new())
                }
                Err(why) => panic!("ephemeral KV unreachable and FALLBACK_ALLOWED is false: {why}"),
            },
            None => EphemeralCache::InMemory(InMemoryStore::new()),
        }
    }
}

#[async_trait]
impl EphemeralStore for EphemeralCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        match self {
            EphemeralCache::Redis(store) => store.set(key, value, ttl).await,
            EphemeralCache::InMemory(store) => store.set(key, value, ttl).await,
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self {
            EphemeralCache::Redis(store) => store.get(key).await,
            EphemeralCache::InMemory(store) => store.get(key).await,
        }
    }

    async fn del(&self, key: &str) -> Result<()> {
        match self {
            EphemeralCache::Redis(store) => store.del(key).await,
            EphemeralCache::InMemory(store) => store.del(key).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_round_trips_within_ttl() {
        let store = InMemoryStore::new();
        store.set("k", "v", Duration::from_secs(5)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn in_memory_expires_after_ttl() {
        let store = InMemoryStore::new();
        store
            .set("k", "v", Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn del_removes_the_key() {
        let store = InMemoryStore::new();
        store.set("k", "v", Duration::from_secs(5)).await.unwrap();
        store.del("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
