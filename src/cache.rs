//! LRU Cache Engine (C2): the map + ordered-list pair that is the actual
//! subject of this service, guarded by a single exclusive lock per §5 —
//! every public operation, including `get`, mutates ordering, so there is no
//! read-only path that a reader-writer lock could shortcut.

use std::collections::HashSet;

use hashbrown::HashMap;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::capacity::Capacity;
use crate::entry::{CacheValue, CachedResponse};
use crate::error::CacheError;
use crate::list::{NodeId, OrderedKeyStore};
use crate::pattern;

struct Inner {
    map: HashMap<String, NodeId>,
    list: OrderedKeyStore<CacheValue>,
    capacity: Capacity,
    total_bytes: u64,
}

impl Inner {
    fn evict_lru(&mut self) {
        let Some(id) = self.list.lru() else { return };
        if let Some(value) = self.list.unlink(id) {
            self.map.remove(&value.key);
            self.total_bytes = self.total_bytes.saturating_sub(value.response.byte_size());
            debug!(category = "EVICT", key = %value.key, "evicted cache entry");
        }
    }

    fn enforce_capacity(&mut self) {
        while self
            .capacity
            .over_budget(self.map.len() as u64, self.total_bytes)
            && !self.map.is_empty()
        {
            self.evict_lru();
        }
    }
}

/// Thread-safe LRU cache: map + ordered list behind a single mutex.
pub struct Cache {
    inner: Mutex<Inner>,
}

impl Cache {
    /// Creates an empty cache under the given capacity policy. Fails if
    /// `size == 0` or `unit` is unrecognised (surfaced by
    /// [`Capacity::parse`] before this constructor is reached in practice).
    pub fn new(capacity: Capacity) -> Result<Cache, CacheError> {
        Ok(Cache {
            inner: Mutex::new(Inner {
                map: HashMap::new(),
                list: OrderedKeyStore::new(),
                capacity,
                total_bytes: 0,
            }),
        })
    }

    /// Looks up `key`. On a hit, promotes the entry to the MRU end.
    pub fn get(&self, key: &str) -> Option<CachedResponse> {
        let mut inner = self.inner.lock();
        let id = *inner.map.get(key)?;
        inner.list.move_to_mru(id);
        let value = inner.list.get(id)?;
        debug!(category = "READ", key = %key, "cache hit");
        Some(value.response.clone())
    }

    /// Inserts `key` at the MRU end, then evicts from the LRU end until the
    /// cache is within its capacity bound. If `key` is already present this
    /// is a no-op: re-setting an existing key would silently corrupt the
    /// ordering assumptions callers rely on, so it only warns.
    pub fn set(&self, key: String, response: CachedResponse) {
        let mut inner = self.inner.lock();
        if inner.map.contains_key(&key) {
            warn!(category = "WRITE", key = %key, "duplicate set ignored");
            return;
        }

        let size = response.byte_size();
        let value = CacheValue::new(key.clone(), response);
        let id = inner.list.insert_mru(value);
        inner.map.insert(key.clone(), id);
        inner.total_bytes += size;
        debug!(category = "WRITE", key = %key, "cache write");

        inner.enforce_capacity();
    }

    /// Removes each of `keys` if present. Unknown keys are silently
    /// skipped; this never evicts by capacity and never promotes.
    pub fn bust(&self, keys: impl IntoIterator<Item = impl AsRef<str>>) {
        let mut inner = self.inner.lock();
        for key in keys {
            let key = key.as_ref();
            let Some(id) = inner.map.remove(key) else {
                continue;
            };
            if let Some(value) = inner.list.unlink(id) {
                inner.total_bytes = inner.total_bytes.saturating_sub(value.response.byte_size());
            }
            debug!(category = "BUST", key = %key, "cache entry busted");
        }
    }

    /// Computes the set of currently cached keys matched by any of
    /// `patterns` after route-parameter hydration. See [`pattern::match_keys`].
    pub fn match_keys(&self, patterns: &[String], params: &[(String, String)]) -> HashSet<String> {
        let inner = self.inner.lock();
        let keys: Vec<&str> = inner.map.keys().map(String::as_str).collect();
        pattern::match_keys(patterns, params, keys)
    }

    /// Current entry count.
    pub fn size(&self) -> u64 {
        self.inner.lock().map.len() as u64
    }

    /// Snapshot of currently cached keys; order is unspecified.
    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().map.keys().cloned().collect()
    }
}
