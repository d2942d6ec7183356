//! Response cache with TTL expiry and periodic sweeping.
//!
//! Upstream catalog and availability answers are expensive and requested over
//! and over by both user-facing calls and the scheduler, so every response is
//! cached as the raw bytes received. A hit is therefore byte-identical to the
//! original response.
//!
//! Entries past their TTL are treated as misses on read and physically
//! removed by [`ResponseCache::run_sweeper`] on a slower interval.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, instrument};

/// Configuration for the response cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Lifetime of an entry.
    pub ttl: Duration,
    /// How often expired entries are swept.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(10 * 60),
        }
    }
}

/// Source of the current instant.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    offset_nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset_nanos: AtomicU64::new(0),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.offset_nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

/// Normalized request signature.
///
/// Built from the region, the operation path, and the query parameters in
/// sorted order. Every component is percent-escaped so distinct requests can
/// never encode to the same key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new<'a, I>(region: &str, path: &str, params: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let sorted: BTreeMap<&str, &str> = params.into_iter().collect();

        let mut key = String::with_capacity(region.len() + path.len() + 32);
        escape_into(&mut key, region);
        key.push('|');
        escape_into(&mut key, path);
        key.push('?');
        for (i, (name, value)) in sorted.iter().enumerate() {
            if i > 0 {
                key.push('&');
            }
            escape_into(&mut key, name);
            key.push('=');
            escape_into(&mut key, value);
        }

        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn escape_into(out: &mut String, raw: &str) {
    for byte in raw.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' | b',' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    value: Bytes,
    expires_at: Instant,
}

/// Cache statistics.
#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
}

/// Shared TTL cache of upstream responses.
pub struct ResponseCache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    stats: CacheStats,
}

impl fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl ResponseCache {
    /// Create a cache driven by the system clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache driven by the given clock.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            entries: RwLock::new(HashMap::new()),
            stats: CacheStats::default(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Look up a live entry.
    pub async fn get(&self, key: &CacheKey) -> Option<Bytes> {
        let now = self.clock.now();
        let entries = self.entries.read().await;

        match entries.get(key) {
            Some(entry) if entry.expires_at > now => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            _ => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a value with an explicit TTL.
    pub async fn set(&self, key: CacheKey, value: Bytes, ttl: Duration) {
        let expires_at = self.clock.now() + ttl;
        let mut entries = self.entries.write().await;
        entries.insert(key, CacheEntry { value, expires_at });
    }

    /// Store a value with the configured TTL.
    pub async fn insert(&self, key: CacheKey, value: Bytes) {
        self.set(key, value, self.config.ttl).await;
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Remove every expired entry. Returns the number removed.
    pub async fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let removed = before - entries.len();

        if removed > 0 {
            self.stats
                .evictions
                .fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, remaining = entries.len(), "Swept expired cache entries");
        }

        removed
    }

    /// Sweep on the configured interval until shutdown is signaled.
    #[instrument(skip(self, shutdown))]
    pub async fn run_sweeper(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            sweep_interval_secs = self.config.sweep_interval.as_secs(),
            ttl_secs = self.config.ttl.as_secs(),
            "Starting cache sweeper"
        );

        let mut interval = tokio::time::interval(self.config.sweep_interval);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.sweep().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Cache sweeper shutting down");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_cache() -> (ResponseCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = ResponseCache::with_clock(CacheConfig::default(), clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_key_sorts_parameters() {
        let a = CacheKey::new("ovh-eu", "/x", [("planCode", "24ska01"), ("datacenters", "gra")]);
        let b = CacheKey::new("ovh-eu", "/x", [("datacenters", "gra"), ("planCode", "24ska01")]);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "ovh-eu|/x?datacenters=gra&planCode=24ska01");
    }

    #[test]
    fn test_key_is_region_scoped() {
        let eu = CacheKey::new("ovh-eu", "/x", [("planCode", "a")]);
        let ca = CacheKey::new("ovh-ca", "/x", [("planCode", "a")]);
        assert_ne!(eu, ca);
    }

    #[test]
    fn test_key_escaping_prevents_collisions() {
        let joined = CacheKey::new("r", "/x", [("a", "1&b=2")]);
        let split = CacheKey::new("r", "/x", [("a", "1"), ("b", "2")]);
        assert_ne!(joined, split);
    }

    #[tokio::test]
    async fn test_hit_within_ttl_and_miss_after() {
        let (cache, clock) = manual_cache();
        let key = CacheKey::new("ovh-eu", "/x", []);

        assert!(cache.get(&key).await.is_none());
        cache.insert(key.clone(), Bytes::from_static(b"[1,2]")).await;

        clock.advance(Duration::from_secs(299));
        assert_eq!(cache.get(&key).await.as_deref(), Some(&b"[1,2]"[..]));

        clock.advance(Duration::from_secs(2));
        assert!(cache.get(&key).await.is_none());

        assert_eq!(cache.stats().hits.load(Ordering::Relaxed), 1);
        assert_eq!(cache.stats().misses.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let (cache, clock) = manual_cache();
        let short = CacheKey::new("r", "/short", []);
        let long = CacheKey::new("r", "/long", []);

        cache
            .set(short.clone(), Bytes::from_static(b"a"), Duration::from_secs(10))
            .await;
        cache
            .set(long.clone(), Bytes::from_static(b"b"), Duration::from_secs(100))
            .await;

        clock.advance(Duration::from_secs(50));
        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.sweep().await, 1);
        assert_eq!(cache.len().await, 1);
        assert!(cache.get(&long).await.is_some());
        assert_eq!(cache.stats().evictions.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_shutdown() {
        let cache = Arc::new(ResponseCache::new(CacheConfig {
            ttl: Duration::from_millis(10),
            sweep_interval: Duration::from_millis(20),
        }));
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn({
            let cache = cache.clone();
            async move { cache.run_sweeper(rx).await }
        });

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
