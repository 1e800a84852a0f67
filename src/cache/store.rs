use dashmap::DashMap;
use redis::AsyncCommands;
use redis::Client;
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::error::CacheError;
use crate::models::MovieId;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    MovieDetails(MovieId),
    NowPlaying(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::MovieDetails(id) => write!(f, "details:{}", id),
            CacheKey::NowPlaying(language) => write!(f, "now_playing:{}", language.to_lowercase()),
        }
    }
}

/// Creates a Redis client for caching
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Message for asynchronous cache writes
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
}

struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// Metadata cache: an in-process map, optionally written through to Redis
#[derive(Clone)]
pub struct Cache {
    memory: Arc<DashMap<String, MemoryEntry>>,
    redis: Option<RedisBackend>,
}

#[derive(Clone)]
struct RedisBackend {
    client: Client,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl CacheWriterHandle {
    /// Signals the writer task to flush pending writes and stop
    pub async fn shutdown(self) {
        if let Some(tx) = self.shutdown_tx {
            let _ = tx.send(()).await;
            tracing::info!("Cache writer shutdown signal sent");
        }
    }
}

impl Cache {
    /// Process-local cache with no Redis backing
    pub fn in_memory() -> Self {
        Self {
            memory: Arc::new(DashMap::new()),
            redis: None,
        }
    }

    /// Cache that also writes through to Redis from a background task
    pub fn with_redis(client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let writer_client = client.clone();
        tokio::spawn(async move {
            Self::cache_writer_task(writer_client, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            memory: Arc::new(DashMap::new()),
            redis: Some(RedisBackend { client, write_tx }),
        };

        let handle = CacheWriterHandle {
            shutdown_tx: Some(shutdown_tx),
        };

        (cache, handle)
    }

    /// Builds the cache from an optional Redis URL
    pub fn from_url(redis_url: Option<&str>) -> anyhow::Result<(Self, CacheWriterHandle)> {
        match redis_url {
            Some(url) => {
                let client = create_redis_client(url)?;
                tracing::info!("Metadata cache writes through to Redis");
                Ok(Self::with_redis(client))
            }
            None => {
                tracing::info!("Metadata cache is in-process only");
                Ok((Self::in_memory(), CacheWriterHandle { shutdown_tx: None }))
            }
        }
    }

    /// Background task that drains write messages into Redis
    ///
    /// On shutdown, remaining queued messages are flushed before exiting.
    async fn cache_writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = Self::write_to_redis(&client, msg).await {
                        tracing::warn!(error = %e, "Failed to write to Redis cache");
                    }
                }
                _ = shutdown_rx.recv() => {
                    write_rx.close();
                    let mut flushed = 0usize;
                    while let Some(msg) = write_rx.recv().await {
                        if let Err(e) = Self::write_to_redis(&client, msg).await {
                            tracing::warn!(error = %e, "Failed to flush cache write during shutdown");
                        }
                        flushed += 1;
                    }

                    tracing::info!(flushed, "Cache writer task stopped");
                    break;
                }
                else => break,
            }
        }
    }

    async fn write_to_redis(client: &Client, msg: CacheWriteMessage) -> Result<(), CacheError> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
        Ok(())
    }

    /// Live in-process value for `key`; an expired entry is dropped on the way out
    fn get_from_memory(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let entry = self.memory.get(key)?;
        if !entry.is_expired(now) {
            return Some(entry.value.clone());
        }
        drop(entry);
        self.memory.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    fn put_in_memory(&self, key: String, value: String, ttl: u64) {
        let expires_at = Instant::now() + Duration::from_secs(ttl);
        self.memory.insert(key, MemoryEntry { value, expires_at });
    }

    /// Removes every expired in-process entry, returning how many were dropped
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.memory.len();
        self.memory.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.memory.len())
    }

    /// Sweeps expired in-process entries every `period` until the runtime stops
    pub fn spawn_eviction(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = cache.evict_expired();
                if evicted > 0 {
                    tracing::debug!(evicted, remaining = cache.memory.len(), "Evicted expired cache entries");
                }
            }
        })
    }

    /// Entries that no longer match the expected shape are misses, so the caller
    /// recomputes and overwrites them
    fn decode<T: DeserializeOwned>(key: &str, json: &str) -> Option<T> {
        match serde_json::from_str(json) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %CacheError::from(e), key = %key, "Undecodable cache entry, treating as miss");
                None
            }
        }
    }

    async fn get_from_redis(client: &Client, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key).await?;
        Ok(cached)
    }

    /// Retrieves a value from the cache by key
    ///
    /// Checks process memory first, then Redis when configured. Redis hits are copied
    /// into memory. An unreachable Redis or an entry that fails to decode counts as a miss.
    pub async fn get_from_cache<T: DeserializeOwned>(
        &self,
        key: &CacheKey,
        ttl: u64,
    ) -> Result<Option<T>, CacheError> {
        let key = key.to_string();

        if let Some(json) = self.get_from_memory(&key) {
            if let Some(value) = Self::decode(&key, &json) {
                tracing::debug!(key = %key, "Memory cache hit");
                return Ok(Some(value));
            }
            self.memory.remove(&key);
        }

        let Some(redis) = &self.redis else {
            return Ok(None);
        };

        match Self::get_from_redis(&redis.client, &key).await {
            Ok(Some(json)) => {
                let Some(value) = Self::decode(&key, &json) else {
                    return Ok(None);
                };
                tracing::debug!(key = %key, "Redis cache hit");
                self.put_in_memory(key, json, ttl);
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Redis read failed, treating as miss");
                Ok(None)
            }
        }
    }

    /// Stores a value without waiting on Redis
    ///
    /// The in-process copy is written immediately; the Redis write is queued for the
    /// background writer.
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let key = key.to_string();
        self.put_in_memory(key.clone(), json.clone(), ttl);

        if let Some(redis) = &self.redis {
            let msg = CacheWriteMessage {
                key,
                value: json,
                ttl,
            };
            if let Err(e) = redis.write_tx.send(msg) {
                tracing::error!(error = %e, "Failed to send cache write message");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MovieDetails;

    #[test]
    fn test_cache_key_display_details() {
        let key = CacheKey::MovieDetails(MovieId(19995));
        assert_eq!(format!("{}", key), "details:19995");
    }

    #[test]
    fn test_cache_key_display_now_playing_lowercase() {
        let key = CacheKey::NowPlaying("en-US".to_string());
        assert_eq!(format!("{}", key), "now_playing:en-us");
    }

    #[tokio::test]
    async fn test_memory_miss() {
        let cache = Cache::in_memory();
        let key = CacheKey::MovieDetails(MovieId(1));
        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key, 60).await.unwrap();
        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    async fn test_memory_set_then_get() {
        let cache = Cache::in_memory();
        let key = CacheKey::MovieDetails(MovieId(2));
        let value = vec!["Action".to_string(), "Drama".to_string()];

        cache.set_in_background(&key, &value, 60);

        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key, 60).await.unwrap();
        assert_eq!(retrieved, Some(value));
    }

    #[tokio::test]
    async fn test_memory_entry_expires() {
        let cache = Cache::in_memory();
        let key = CacheKey::NowPlaying("en-US".to_string());

        cache.set_in_background(&key, &vec![1u64, 2, 3], 0);

        let retrieved: Option<Vec<u64>> = cache.get_from_cache(&key, 0).await.unwrap();
        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss_and_can_be_overwritten() {
        let cache = Cache::in_memory();
        let key = CacheKey::MovieDetails(MovieId(7));

        cache.set_in_background(&key, &vec!["old", "shape"], 60);

        let retrieved: Option<MovieDetails> = cache.get_from_cache(&key, 60).await.unwrap();
        assert_eq!(retrieved, None);

        cache.set_in_background(&key, &MovieDetails::placeholder(), 60);
        let retrieved: Option<MovieDetails> = cache.get_from_cache(&key, 60).await.unwrap();
        assert_eq!(retrieved, Some(MovieDetails::placeholder()));
    }

    #[tokio::test]
    async fn test_expired_entries_evicted_in_bulk() {
        let cache = Cache::in_memory();
        cache.set_in_background(&CacheKey::MovieDetails(MovieId(1)), &"stale", 0);
        cache.set_in_background(&CacheKey::MovieDetails(MovieId(2)), &"stale", 0);
        cache.set_in_background(&CacheKey::MovieDetails(MovieId(3)), &"fresh", 60);

        assert_eq!(cache.evict_expired(), 2);
        assert_eq!(cache.memory.len(), 1);
        assert_eq!(cache.evict_expired(), 0);
    }

    #[tokio::test]
    async fn test_expired_entry_removed_on_read() {
        let cache = Cache::in_memory();
        let key = CacheKey::MovieDetails(MovieId(5));
        cache.set_in_background(&key, &"stale", 0);

        let retrieved: Option<String> = cache.get_from_cache(&key, 0).await.unwrap();
        assert_eq!(retrieved, None);
        assert!(cache.memory.is_empty());
    }

    #[tokio::test]
    async fn test_eviction_task_sweeps_periodically() {
        let cache = Cache::in_memory();
        cache.set_in_background(&CacheKey::MovieDetails(MovieId(6)), &"stale", 0);

        let sweeper = cache.spawn_eviction(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(cache.memory.is_empty());
        sweeper.abort();
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let cache = Cache::in_memory();
        let clone = cache.clone();
        let key = CacheKey::MovieDetails(MovieId(3));

        clone.set_in_background(&key, &"cached".to_string(), 60);

        let retrieved: Option<String> = cache.get_from_cache(&key, 60).await.unwrap();
        assert_eq!(retrieved.as_deref(), Some("cached"));
    }

    #[tokio::test]
    async fn test_unreachable_redis_degrades_to_miss() {
        let client = create_redis_client("redis://127.0.0.1:1").unwrap();
        let (cache, handle) = Cache::with_redis(client);
        let key = CacheKey::MovieDetails(MovieId(4));

        let retrieved: Option<String> = cache.get_from_cache(&key, 60).await.unwrap();
        assert_eq!(retrieved, None);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_from_url_without_redis() {
        let (cache, handle) = Cache::from_url(None).unwrap();
        assert!(cache.redis.is_none());
        handle.shutdown().await;
    }
}
