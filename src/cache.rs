use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::{Arc, Mutex};

/// Source of "now" for cache expiry. Swappable so expiry can be driven by hand.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self(Mutex::new(start))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap_or_else(|e| e.into_inner());
        *now = *now + by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Clone, Debug)]
struct CachedPage {
    body: String,
    expires_at: DateTime<Utc>,
}

/// Entry count at which an insert culls the cache.
pub const MAX_ENTRIES: usize = 300;

/// Whole rendered pages keyed by `prefix:discriminator`.
/// A stale entry is dropped when it is next read. Once the cache is full, an
/// insert first sweeps expired entries and then, if still full, evicts a third.
pub struct ResponseCache {
    pages: DashMap<String, CachedPage>,
    ttl: Duration,
    max_entries: usize,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            pages: DashMap::new(),
            ttl,
            max_entries: MAX_ENTRIES,
            clock,
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn key(prefix: &str, discriminator: &str) -> String {
        format!("{}:{}", prefix, discriminator)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        let hit = self.pages.get(key).map(|page| {
            if page.expires_at > now {
                Some(page.body.clone())
            } else {
                None
            }
        })?;

        if hit.is_none() {
            self.pages.remove(key);
        }
        hit
    }

    pub fn insert(&self, key: String, body: String) {
        let now = self.clock.now();
        if self.pages.len() >= self.max_entries && !self.pages.contains_key(&key) {
            self.cull(now);
        }
        self.pages.insert(
            key,
            CachedPage {
                body,
                expires_at: now + self.ttl,
            },
        );
    }

    fn cull(&self, now: DateTime<Utc>) {
        self.pages.retain(|_, page| page.expires_at > now);
        let len = self.pages.len();
        if len < self.max_entries {
            return;
        }

        // Keys are collected first; removing while iterating would deadlock the shard.
        let victims: Vec<String> = self
            .pages
            .iter()
            .take((len / 3).max(1))
            .map(|entry| entry.key().clone())
            .collect();
        log::debug!("ResponseCache: evicting {} of {} entries", victims.len(), len);
        for key in victims {
            self.pages.remove(&key);
        }
    }

    /// Drops every entry whose key starts with `prefix:`.
    pub fn invalidate_prefix(&self, prefix: &str) {
        let lead = format!("{}:", prefix);
        self.pages.retain(|key, _| !key.starts_with(&lead));
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.pages.len())
            .field("ttl", &self.ttl)
            .field("max_entries", &self.max_entries)
            .finish()
    }
}
