//! In-process read-through cache
//!
//! String-keyed, TTL-based key-value store with single-flight population:
//! concurrent callers of [`MemoryCache::get_or_create`] for the same key run
//! the factory exactly once and all observe its value. Values round-trip
//! through JSON so the cache stays type-agnostic.
//!
//! The cache is optional for correctness - every consumer must have a
//! fallback path to its authoritative store.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::Instant;

use crate::domain::result::Result;

/// Entry lifetime used when a call does not specify one
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Registry of mutual-exclusion locks scoped to individual string keys.
///
/// A lock object lives only while at least one caller holds or waits on it;
/// the last guard to drop removes it, so the registry stays bounded.
pub(crate) struct KeyedLocks {
    locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    pub(crate) fn new() -> Self {
        Self {
            locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Acquire the lock for `key`, waiting if another caller holds it
    pub(crate) async fn lock(&self, key: &str) -> KeyedGuard<'_> {
        let entry = {
            let mut locks = self.locks.lock().unwrap();
            locks.entry(key.to_string()).or_default().clone()
        };
        let guard = entry.clone().lock_owned().await;
        KeyedGuard {
            registry: self,
            key: key.to_string(),
            entry,
            _guard: guard,
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.lock().unwrap().len()
    }
}

/// Held lock for one key; releasing it drops the registry entry when no
/// other caller is waiting on the same key.
pub(crate) struct KeyedGuard<'a> {
    registry: &'a KeyedLocks,
    key: String,
    entry: Arc<AsyncMutex<()>>,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for KeyedGuard<'_> {
    fn drop(&mut self) {
        let mut locks = self.registry.locks.lock().unwrap();
        // Three strong refs mean no waiter: the registry map, self.entry,
        // and the owned guard itself. Waiters each hold further clones.
        if Arc::strong_count(&self.entry) <= 3 {
            locks.remove(&self.key);
        }
    }
}

struct CacheEntry {
    value: JsonValue,
    expires_at: Instant,
}

/// TTL key-value cache with single-flight population
pub struct MemoryCache {
    entries: StdMutex<HashMap<String, CacheEntry>>,
    locks: KeyedLocks,
    default_ttl: Duration,
}

impl MemoryCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: StdMutex::new(HashMap::new()),
            locks: KeyedLocks::new(),
            default_ttl,
        }
    }

    /// Return the live value for `key`, if any.
    ///
    /// Expired entries are dropped on access. A stored JSON null reads as a
    /// miss, so absent results are always re-fetched rather than served as
    /// a cached "nothing".
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                if entry.value.is_null() {
                    return None;
                }
                serde_json::from_value(entry.value.clone()).ok()
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Unconditional write
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let expires_at = Instant::now() + ttl.unwrap_or(self.default_ttl);
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    /// Delete an entry if present; used by writers to invalidate
    pub fn remove(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }

    /// Delete every entry whose key starts with `prefix`
    pub fn remove_by_prefix(&self, prefix: &str) {
        self.entries
            .lock()
            .unwrap()
            .retain(|key, _| !key.starts_with(prefix));
    }

    pub fn key_exists(&self, key: &str) -> bool {
        let entries = self.entries.lock().unwrap();
        entries
            .get(key)
            .map(|entry| entry.expires_at > Instant::now())
            .unwrap_or(false)
    }

    /// Return the live value for `key`, populating it via `factory` on miss.
    ///
    /// Population is single-flight per key: the lock is scoped to `key`, the
    /// entry is re-checked after acquisition, and the factory runs only if
    /// the entry is still absent. A factory error propagates to its caller
    /// and caches nothing; the next caller re-runs the factory.
    pub async fn get_or_create<T, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        factory: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let _guard = self.locks.lock(key).await;

        // Another caller may have populated the key while we waited
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let value = factory().await?;
        self.set(key, &value, ttl)?;
        Ok(value)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
