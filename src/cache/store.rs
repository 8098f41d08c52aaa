//! Cache storage implementations.
//!
//! [`EnvelopeStore`] abstracts the key/value store holding shareable widget
//! envelopes; [`MemoryStore`] is the in-process implementation backed by an
//! LRU map with per-entry deadlines.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::domain::Envelope;

use super::config::CacheConfig;
use super::keys::CacheKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Key/value store for cached envelopes.
///
/// `set` is atomic at entry granularity: a concurrent reader observes either
/// the previous envelope or the new one, never a partial write. TTL handling
/// is best effort.
pub trait EnvelopeStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<Envelope>;
    fn set(&self, key: CacheKey, envelope: Envelope, ttl: Duration);
    fn invalidate(&self, key: &CacheKey);
}

struct StoredEnvelope {
    envelope: Envelope,
    expires_at: Instant,
}

/// In-memory envelope store.
///
/// Expiry is lazy: an expired entry is dropped on the read that discovers it.
pub struct MemoryStore {
    entries: RwLock<LruCache<CacheKey, StoredEnvelope>>,
}

impl MemoryStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
        }
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }
}

impl EnvelopeStore for MemoryStore {
    fn get(&self, key: &CacheKey) -> Option<Envelope> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        match entries.get(key) {
            Some(stored) if stored.expires_at > Instant::now() => Some(stored.envelope.clone()),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: CacheKey, envelope: Envelope, ttl: Duration) {
        let stored = StoredEnvelope {
            envelope,
            expires_at: Instant::now() + ttl,
        };
        rw_write(&self.entries, SOURCE, "set").put(key, stored);
    }

    fn invalidate(&self, key: &CacheKey) {
        rw_write(&self.entries, SOURCE, "invalidate").pop(key);
    }
}
