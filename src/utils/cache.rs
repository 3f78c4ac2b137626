// src/utils/cache.rs

use std::{
    collections::{BTreeMap, HashMap},
    time::{Duration, Instant},
};

use axum::body::Bytes;

/// A cached static asset.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResource {
    pub body: Bytes,
    pub content_type: Option<String>,
}

impl CachedResource {
    pub fn size(&self) -> usize {
        self.body.len()
    }
}

#[derive(Debug)]
struct Entry {
    resource: CachedResource,
    inserted_at: Instant,
    /// Position in the recency index; larger is more recent.
    tick: u64,
}

/// In-memory cache for static assets (images, fonts, scripts).
///
/// Entries expire `ttl` after insertion. When the byte budget is exceeded the
/// least recently used entries are evicted first. A miss only costs a refetch.
#[derive(Debug)]
pub struct ResourceCache {
    entries: HashMap<String, Entry>,
    recency: BTreeMap<u64, String>,
    next_tick: u64,
    total_bytes: usize,
    max_bytes: usize,
    ttl: Duration,
    hits: u64,
    misses: u64,
}

/// Hit/miss counters and current occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: usize,
    pub hits: u64,
    pub misses: u64,
}

impl ResourceCache {
    pub fn new(max_bytes: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            next_tick: 0,
            total_bytes: 0,
            max_bytes,
            ttl,
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&mut self, key: &str) -> Option<CachedResource> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&mut self, key: impl Into<String>, resource: CachedResource) -> bool {
        self.insert_at(key.into(), resource, Instant::now())
    }

    pub fn get_at(&mut self, key: &str, now: Instant) -> Option<CachedResource> {
        let expired = match self.entries.get(key) {
            None => {
                self.misses += 1;
                return None;
            }
            Some(entry) => now.duration_since(entry.inserted_at) >= self.ttl,
        };

        if expired {
            self.remove(key);
            self.misses += 1;
            return None;
        }

        let tick = self.bump();
        let entry = self.entries.get_mut(key)?;
        self.recency.remove(&entry.tick);
        entry.tick = tick;
        self.recency.insert(tick, key.to_string());
        self.hits += 1;
        Some(entry.resource.clone())
    }

    /// Stores `resource`, evicting least recently used entries as needed.
    /// Returns `false` when the resource alone exceeds the budget.
    pub fn insert_at(&mut self, key: String, resource: CachedResource, now: Instant) -> bool {
        let size = resource.size();
        if size > self.max_bytes {
            return false;
        }

        self.remove(&key);
        while self.total_bytes + size > self.max_bytes {
            let Some((_, oldest)) = self.recency.pop_first() else {
                break;
            };
            if let Some(evicted) = self.entries.remove(&oldest) {
                self.total_bytes -= evicted.resource.size();
                tracing::debug!(key = %oldest, "Evicted cached asset");
            }
        }

        let tick = self.bump();
        self.recency.insert(tick, key.clone());
        self.total_bytes += size;
        self.entries.insert(
            key,
            Entry {
                resource,
                inserted_at: now,
                tick,
            },
        );
        true
    }

    pub fn remove(&mut self, key: &str) -> Option<CachedResource> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.tick);
        self.total_bytes -= entry.resource.size();
        Some(entry.resource)
    }

    /// Drops every entry older than the TTL.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.inserted_at) >= self.ttl)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            total_bytes: self.total_bytes,
            hits: self.hits,
            misses: self.misses,
        }
    }

    fn bump(&mut self) -> u64 {
        self.next_tick += 1;
        self.next_tick
    }
}
