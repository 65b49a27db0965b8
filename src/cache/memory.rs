//! In-process result cache with TTL and hit-count eviction.
//!
//! Bounded map of recently scraped values. Entries expire by TTL, lazily on
//! read and in bulk via an hourly sweep task; when the map is full, the entry
//! with the fewest hits is dropped first. Repeat seeds within a run stay hot
//! while one-off lookups age out.

use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::util::constants::{SCRAPE_CACHE_SWEEP_SECS, SCRAPE_CACHE_TTL_SECS};

struct CacheSlot<V> {
    data: V,
    created_at: Instant,
    expires_at: Instant,
    hit_count: u64,
}

/// Bounded TTL cache for scraped values.
///
/// Capacity eviction removes the lowest-hit entry rather than the least
/// recently used one: a page that answered many lookups is worth keeping
/// over a fresher page nothing asked for twice.
pub struct ScrapeCache<V> {
    entries: Mutex<LruCache<String, CacheSlot<V>>>,
    capacity: usize,
    default_ttl: Duration,
    sweeper: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl<V> ScrapeCache<V>
where
    V: Clone + Send + 'static,
{
    /// Cache holding at most `capacity` entries with the standard 24h TTL.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let bound = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(bound)),
            capacity,
            default_ttl: Duration::from_secs(SCRAPE_CACHE_TTL_SECS),
            sweeper: std::sync::Mutex::new(None),
        }
    }

    /// Fetch a value, counting the hit. Expired entries are dropped here
    /// rather than waiting for the sweep.
    pub async fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let expired = match entries.get_mut(key) {
            Some(slot) if now < slot.expires_at => {
                slot.hit_count += 1;
                return Some(slot.data.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
            debug!(key, "cache entry expired on read");
        }
        None
    }

    /// Insert with the default TTL.
    pub async fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl).await;
    }

    /// Insert with an explicit TTL. Replacing an existing key keeps the
    /// map size unchanged; a new key at capacity evicts the coldest entry.
    pub async fn insert_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        if !entries.contains(&key) && entries.len() >= self.capacity {
            let victim = entries
                .iter()
                .min_by_key(|(_, slot)| (slot.hit_count, slot.created_at))
                .map(|(k, _)| k.clone());
            if let Some(victim) = victim {
                entries.pop(&victim);
                debug!(key = %victim, "evicted coldest cache entry");
            }
        }

        entries.put(
            key,
            CacheSlot {
                data: value,
                created_at: now,
                expires_at: now + ttl,
                hit_count: 0,
            },
        );
    }

    /// Drop every TTL-expired entry, returning how many were removed.
    pub async fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, slot)| slot.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Spawn the hourly sweep task. The task holds only a weak reference,
    /// so dropping the last cache handle ends it; it is also aborted
    /// explicitly when the cache drops.
    pub fn start_sweeper(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(SCRAPE_CACHE_SWEEP_SECS));
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(cache) = weak.upgrade() else { break };
                let swept = cache.sweep_expired().await;
                if swept > 0 {
                    debug!(swept, "cache sweep dropped expired entries");
                }
            }
        });
        if let Ok(mut slot) = self.sweeper.lock() {
            if let Some(old) = slot.replace(handle) {
                old.abort();
            }
        }
    }
}

impl<V> Drop for ScrapeCache<V> {
    fn drop(&mut self) {
        if let Ok(slot) = self.sweeper.get_mut() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_returns_inserted_value() {
        let cache: ScrapeCache<String> = ScrapeCache::new(8);
        cache.insert("example.com/about", "hello".to_string()).await;
        assert_eq!(
            cache.get("example.com/about").await,
            Some("hello".to_string())
        );
        assert_eq!(cache.get("example.com/other").await, None);
    }

    #[tokio::test]
    async fn expired_entries_are_dropped_on_read() {
        let cache: ScrapeCache<u32> = ScrapeCache::new(8);
        cache
            .insert_with_ttl("k", 7, Duration::from_millis(10))
            .await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("k").await, None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn capacity_eviction_prefers_cold_entries() {
        let cache: ScrapeCache<u32> = ScrapeCache::new(2);
        cache.insert("hot", 1).await;
        cache.insert("cold", 2).await;
        // Two hits keep "hot" warm.
        cache.get("hot").await;
        cache.get("hot").await;

        cache.insert("new", 3).await;
        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get("hot").await, Some(1));
        assert_eq!(cache.get("cold").await, None);
        assert_eq!(cache.get("new").await, Some(3));
    }

    #[tokio::test]
    async fn replacing_a_key_does_not_evict_others() {
        let cache: ScrapeCache<u32> = ScrapeCache::new(2);
        cache.insert("a", 1).await;
        cache.insert("b", 2).await;
        cache.insert("a", 10).await;
        assert_eq!(cache.get("a").await, Some(10));
        assert_eq!(cache.get("b").await, Some(2));
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_entries() {
        let cache: ScrapeCache<u32> = ScrapeCache::new(8);
        cache
            .insert_with_ttl("stale", 1, Duration::from_millis(10))
            .await;
        cache.insert("fresh", 2).await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(cache.sweep_expired().await, 1);
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("fresh").await, Some(2));
    }
}
