use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use crate::clock::Clock;
use crate::coordinates::Coordinates;

/// Validated provider payload and the moment it was fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub payload: Value,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(payload: Value, stored_at: DateTime<Utc>) -> Self {
        Self { payload, stored_at }
    }

    /// Whole minutes between `stored_at` and `now`, rounded down.
    pub fn age_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.stored_at).num_minutes().max(0)
    }
}

/// Expiring key/value store shared by the lookup services.
///
/// Entries disappear on their own once `expires_in` has passed; writing an
/// existing key replaces it (last writer wins).
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Live entry for `key`, if any.
    async fn read(&self, key: &str) -> Option<CacheEntry>;

    async fn write(&self, key: String, entry: CacheEntry, expires_in: Duration);
}

struct StoredEntry {
    entry: CacheEntry,
    expires_at: DateTime<Utc>,
}

/// Upper bound on live entries held by a [`MemoryCache`].
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Process-local [`CacheStore`] behind an async `RwLock`.
///
/// Expired entries are purged on write. When the cache is full, the entry
/// closest to expiry makes room for the new one.
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, StoredEntry>>>,
    clock: Arc<dyn Clock>,
    max_entries: usize,
}

impl MemoryCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_max_entries(clock, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(clock: Arc<dyn Clock>, max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            clock,
            max_entries: max_entries.max(1),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn read(&self, key: &str) -> Option<CacheEntry> {
        let entries = self.entries.read().await;
        if let Some(stored) = entries.get(key)
            && stored.expires_at > self.clock.now()
        {
            return Some(stored.entry.clone());
        }
        None
    }

    async fn write(&self, key: String, entry: CacheEntry, expires_in: Duration) {
        let expires_at = TimeDelta::from_std(expires_in)
            .ok()
            .and_then(|ttl| entry.stored_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, stored| stored.expires_at > now);
        if entries.len() < before {
            debug!(evicted = before - entries.len(), "Dropped expired cache entries");
        }

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            let soonest = entries
                .iter()
                .min_by_key(|(_, stored)| stored.expires_at)
                .map(|(k, _)| k.clone());
            if let Some(victim) = soonest {
                debug!(cache_key = %victim, "Cache full, evicting entry");
                entries.remove(&victim);
            }
        }

        entries.insert(key, StoredEntry { entry, expires_at });
    }
}

/// Key for a forecast: provider identity plus the coordinate bucket.
pub fn weather_key(provider: &str, coordinates: &Coordinates) -> String {
    let (lat, lng) = coordinates.bucket();
    format!("weather:{}:{:.1},{:.1}", provider, lat, lng)
}

/// Key for suggestions: the query with surrounding whitespace trimmed.
///
/// Provider identity is not part of the key, so every address provider
/// shares one slot per query.
pub fn suggestions_key(query: &str) -> String {
    format!("suggestions:{}", query.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde_json::json;

    fn cache() -> (Arc<ManualClock>, MemoryCache) {
        let clock = Arc::new(ManualClock::default());
        let cache = MemoryCache::new(clock.clone());
        (clock, cache)
    }

    #[tokio::test]
    async fn reads_back_until_expiry() {
        let (clock, cache) = cache();
        let entry = CacheEntry::new(json!({ "a": 1 }), clock.now());
        cache
            .write("k".to_string(), entry.clone(), Duration::from_secs(60))
            .await;

        assert_eq!(cache.read("k").await, Some(entry));

        clock.advance(TimeDelta::seconds(59));
        assert!(cache.read("k").await.is_some());

        clock.advance(TimeDelta::seconds(1));
        assert!(cache.read("k").await.is_none());
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let (_, cache) = cache();
        assert!(cache.read("nope").await.is_none());
    }

    #[tokio::test]
    async fn write_overwrites_and_purges_expired() {
        let (clock, cache) = cache();
        cache
            .write(
                "short".to_string(),
                CacheEntry::new(json!(1), clock.now()),
                Duration::from_secs(1),
            )
            .await;
        cache
            .write(
                "long".to_string(),
                CacheEntry::new(json!(1), clock.now()),
                Duration::from_secs(600),
            )
            .await;
        assert_eq!(cache.entries.read().await.len(), 2);

        clock.advance(TimeDelta::seconds(5));
        cache
            .write(
                "long".to_string(),
                CacheEntry::new(json!(2), clock.now()),
                Duration::from_secs(600),
            )
            .await;

        assert_eq!(cache.entries.read().await.len(), 1);
        assert_eq!(cache.read("long").await.map(|e| e.payload), Some(json!(2)));
    }

    #[tokio::test]
    async fn full_cache_evicts_entry_closest_to_expiry() {
        let clock = Arc::new(ManualClock::default());
        let cache = MemoryCache::with_max_entries(clock.clone(), 2);

        async fn write(cache: &MemoryCache, clock: &ManualClock, key: &str, secs: u64) {
            let entry = CacheEntry::new(json!(key), clock.now());
            cache
                .write(key.to_string(), entry, Duration::from_secs(secs))
                .await;
        }

        write(&cache, &clock, "a", 600).await;
        write(&cache, &clock, "b", 60).await;
        write(&cache, &clock, "a", 600).await;
        assert_eq!(cache.entries.read().await.len(), 2);

        write(&cache, &clock, "c", 600).await;

        assert_eq!(cache.entries.read().await.len(), 2);
        assert!(cache.read("b").await.is_none());
        assert!(cache.read("a").await.is_some());
        assert!(cache.read("c").await.is_some());
    }

    #[test]
    fn age_is_floored_minutes() {
        let stored_at = Utc::now();
        let entry = CacheEntry::new(json!(null), stored_at);

        assert_eq!(entry.age_minutes(stored_at), 0);
        assert_eq!(entry.age_minutes(stored_at + TimeDelta::seconds(59)), 0);
        assert_eq!(entry.age_minutes(stored_at + TimeDelta::seconds(90)), 1);
        assert_eq!(entry.age_minutes(stored_at + TimeDelta::minutes(30)), 30);
        assert_eq!(entry.age_minutes(stored_at - TimeDelta::seconds(5)), 0);
    }

    #[test]
    fn weather_key_uses_bucket_and_provider() {
        let coords: Coordinates = "53.5461,-113.4937".parse().unwrap();
        assert_eq!(
            weather_key("weatherapi_com", &coords),
            "weather:weatherapi_com:53.5,-113.5"
        );

        let neighbour: Coordinates = "53.4999,-113.5123".parse().unwrap();
        assert_eq!(
            weather_key("weatherapi_com", &neighbour),
            weather_key("weatherapi_com", &coords)
        );
        assert_ne!(weather_key("test", &coords), weather_key("weatherapi_com", &coords));
    }

    #[test]
    fn suggestions_key_trims_only_the_ends() {
        assert_eq!(suggestions_key("  Edmonton  "), "suggestions:Edmonton");
        assert_eq!(suggestions_key("Edmonton"), suggestions_key("  Edmonton  "));
        assert_ne!(suggestions_key("New  York"), suggestions_key("New York"));
        assert_ne!(suggestions_key("edmonton"), suggestions_key("Edmonton"));
    }
}
