// Flight offer cache
// Sits between the search fan-out and the upstream provider, one slot per (origin, destination, date)

use crate::config::CacheConfig;
use crate::model::{normalize_code, LookupKey, Offer};
use chrono::NaiveDate;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hit_count: AtomicUsize,
    pub miss_count: AtomicUsize,
    pub expired_count: AtomicUsize,
    pub stored_count: AtomicUsize,
    pub swept_count: AtomicUsize,
    pub invalidated_count: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheStatsReport {
    pub items_count: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub expired_count: usize,
    pub stored_count: usize,
    pub swept_count: usize,
    pub invalidated_count: usize,
}

pub trait OfferCache: Send + Sync + 'static {
    // Offers for the key if present and not expired.
    // An expired entry is removed as a side effect and reported as absent.
    fn get(&self, key: &LookupKey) -> Option<Arc<Vec<Offer>>>;

    // Insert or overwrite the entry, expiring one TTL from now.
    // Returns the shared payload now held by the cache.
    fn set(&self, key: LookupKey, offers: Vec<Offer>) -> Arc<Vec<Offer>>;

    // Remove every expired entry, returns how many were dropped
    fn sweep(&self) -> usize;

    // Bulk invalidate entries matching a partial key, None matches anything
    fn invalidate(
        &self,
        origin: Option<&str>,
        destination: Option<&str>,
        date: Option<NaiveDate>,
    ) -> usize;

    // Number of stored entries, expired ones included until swept
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn stats(&self) -> CacheStatsReport;
}

struct CacheEntry {
    offers: Arc<Vec<Offer>>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Sharded in-memory offer cache.
///
/// Memory grows with the number of distinct (origin, destination, date) triples
/// seen since the last sweep; run a [`crate::reaper::CacheReaper`] to bound it.
pub struct InMemoryOfferCache {
    entries: DashMap<LookupKey, CacheEntry>,
    ttl: Duration,
    stats: CacheStats,
}

impl InMemoryOfferCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_ttl(config.ttl())
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            stats: CacheStats::default(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl OfferCache for InMemoryOfferCache {
    fn get(&self, key: &LookupKey) -> Option<Arc<Vec<Offer>>> {
        let now = Instant::now();

        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                self.stats.hit_count.fetch_add(1, Ordering::Relaxed);
                debug!(%key, offers = entry.offers.len(), "cache hit");
                return Some(Arc::clone(&entry.offers));
            }
            Some(_) => true,
            None => false,
        };

        // The read guard is gone here, and a concurrent set may already have replaced the entry
        if expired && self.entries.remove_if(key, |_, e| e.is_expired(now)).is_some() {
            self.stats.expired_count.fetch_add(1, Ordering::Relaxed);
            debug!(%key, "dropped expired cache entry");
        }

        self.stats.miss_count.fetch_add(1, Ordering::Relaxed);
        debug!(%key, "cache miss");
        None
    }

    fn set(&self, key: LookupKey, offers: Vec<Offer>) -> Arc<Vec<Offer>> {
        debug!(%key, offers = offers.len(), "storing offers");

        let offers = Arc::new(offers);
        let entry = CacheEntry {
            offers: Arc::clone(&offers),
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.insert(key, entry);
        self.stats.stored_count.fetch_add(1, Ordering::Relaxed);
        offers
    }

    fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });

        self.stats.swept_count.fetch_add(removed, Ordering::Relaxed);
        info!(removed, remaining = self.entries.len(), "swept offer cache");
        removed
    }

    fn invalidate(
        &self,
        origin: Option<&str>,
        destination: Option<&str>,
        date: Option<NaiveDate>,
    ) -> usize {
        let origin = origin.map(normalize_code);
        let destination = destination.map(normalize_code);
        let mut removed = 0;

        self.entries.retain(|key, _| {
            let matches_origin = origin.as_ref().map_or(true, |o| &key.origin == o);
            let matches_destination = destination.as_ref().map_or(true, |d| &key.destination == d);
            let matches_date = date.map_or(true, |d| key.date == d);

            let matched = matches_origin && matches_destination && matches_date;
            if matched {
                removed += 1;
            }
            !matched
        });

        self.stats
            .invalidated_count
            .fetch_add(removed, Ordering::Relaxed);
        removed
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn stats(&self) -> CacheStatsReport {
        CacheStatsReport {
            items_count: self.entries.len(),
            hit_count: self.stats.hit_count.load(Ordering::Relaxed),
            miss_count: self.stats.miss_count.load(Ordering::Relaxed),
            expired_count: self.stats.expired_count.load(Ordering::Relaxed),
            stored_count: self.stats.stored_count.load(Ordering::Relaxed),
            swept_count: self.stats.swept_count.load(Ordering::Relaxed),
            invalidated_count: self.stats.invalidated_count.load(Ordering::Relaxed),
        }
    }
}
