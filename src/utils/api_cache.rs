use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use moka::future::Cache;
use serde_json::Value;

use crate::clock::Clock;

#[derive(Clone)]
struct Cached {
    value: Value,
    stored_at: DateTime<Utc>,
    generation: u64,
}

/// Read-through cache for finance store blobs.
///
/// Owned by the application state and handed to handlers; expiry is judged
/// against the injected [`Clock`], capacity is bounded by moka.
///
/// Every invalidation bumps a generation counter. An entry stamped with an
/// older generation is never served, so a load that raced a write cannot
/// leave its stale result behind.
#[derive(Clone)]
pub struct ApiCache {
    entries: Cache<String, Cached>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    generation: Arc<AtomicU64>,
}

impl ApiCache {
    pub fn new(max_capacity: u64, ttl_secs: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Cache::builder().max_capacity(max_capacity).build(),
            ttl: Duration::seconds(i64::from(ttl_secs)),
            clock,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns the cached value unless it is older than the TTL or predates
    /// the last invalidation.
    pub async fn get(&self, key: &str) -> Option<Value> {
        let cached = self.entries.get(key).await?;
        let stale = cached.generation != self.generation.load(Ordering::SeqCst);
        if stale || self.clock.now() - cached.stored_at >= self.ttl {
            self.entries.invalidate(key).await;
            return None;
        }
        Some(cached.value)
    }

    pub async fn set(&self, key: &str, value: Value) {
        let generation = self.generation.load(Ordering::SeqCst);
        self.insert(key, value, generation).await;
    }

    /// Cached value for `key`, else the result of `load`, cached when present.
    /// The generation is read before `load` runs, so a write landing in
    /// between makes the loaded value unservable.
    pub async fn get_or_load<F, Fut, E>(&self, key: &str, load: F) -> Result<Option<Value>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Value>, E>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(Some(value));
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let loaded = load().await?;
        if let Some(value) = &loaded {
            self.insert(key, value.clone(), generation).await;
        }
        Ok(loaded)
    }

    /// Call after the write to `key` has been committed.
    pub async fn invalidate(&self, key: &str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.invalidate(key).await;
    }

    async fn insert(&self, key: &str, value: Value, generation: u64) {
        let cached = Cached {
            value,
            stored_at: self.clock.now(),
            generation,
        };
        self.entries.insert(key.to_string(), cached).await;
    }
}
