//! Memoization keyed by document identity and version.
//!
//! One entry is kept per identity: the value computed for its newest known
//! version. Entries expire after a period without access and the least
//! recently used ones are dropped beyond capacity. Both sweeps run on every
//! [`get`](VersionedCache::get) and [`set`](VersionedCache::set), so eviction
//! timing only depends on the calls made and the [`Clock`].

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use rustc_hash::FxHashMap;
use vls_conf::CacheSettings;

use crate::language::LanguageId;

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

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
    now: Mutex<Instant>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheLimits {
    pub capacity: usize,
    pub max_age: Duration,
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self::from(&CacheSettings::default())
    }
}

impl From<&CacheSettings> for CacheLimits {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            capacity: settings.capacity.max(1),
            max_age: Duration::from_secs(settings.max_age_secs),
        }
    }
}

struct Entry<V> {
    version: u64,
    language: LanguageId,
    value: Arc<V>,
    last_access: Instant,
}

pub struct VersionedCache<K, V> {
    entries: Mutex<FxHashMap<K, Entry<V>>>,
    limits: Mutex<CacheLimits>,
    clock: Arc<dyn Clock>,
}

impl<K, V> fmt::Debug for VersionedCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionedCache")
            .field("len", &self.lock().len())
            .finish_non_exhaustive()
    }
}

impl<K, V> Default for VersionedCache<K, V> {
    fn default() -> Self {
        Self::new(CacheLimits::default(), Arc::new(SystemClock))
    }
}

impl<K, V> VersionedCache<K, V> {
    #[must_use]
    pub fn new(limits: CacheLimits, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(FxHashMap::default()),
            limits: Mutex::new(limits),
            clock,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FxHashMap<K, Entry<V>>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn limits(&self) -> CacheLimits {
        *self
            .limits
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn set_limits(&self, limits: CacheLimits) {
        *self
            .limits
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = limits;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl<K, V> VersionedCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    /// The value stored for `key` at exactly `version` and `language`.
    pub fn get(&self, key: &K, version: u64, language: &LanguageId) -> Option<Arc<V>> {
        let now = self.clock.now();
        let mut entries = self.lock();
        self.sweep(&mut entries, now);
        let entry = entries.get_mut(key)?;
        if entry.version != version || entry.language != *language {
            return None;
        }
        entry.last_access = now;
        Some(Arc::clone(&entry.value))
    }

    /// Store `value` for `key` at `version` and return the value callers
    /// should use.
    ///
    /// A value for an older version than the stored one is handed back but
    /// not kept. When an equal version is already stored, the stored value
    /// wins so that every caller observes the same instance.
    pub fn set(&self, key: K, version: u64, language: LanguageId, value: V) -> Arc<V> {
        let now = self.clock.now();
        let mut entries = self.lock();
        self.sweep(&mut entries, now);

        if let Some(existing) = entries.get_mut(&key) {
            if existing.version > version {
                tracing::trace!(?key, version, stored = existing.version, "discarding stale value");
                return Arc::new(value);
            }
            if existing.version == version && existing.language == language {
                existing.last_access = now;
                return Arc::clone(&existing.value);
            }
        }

        let value = Arc::new(value);
        entries.insert(
            key,
            Entry {
                version,
                language,
                value: Arc::clone(&value),
                last_access: now,
            },
        );
        self.enforce_capacity(&mut entries);
        value
    }

    /// Return the cached value or compute, store and return it. `compute`
    /// runs without the cache locked.
    pub fn get_or_compute(
        &self,
        key: &K,
        version: u64,
        language: &LanguageId,
        compute: impl FnOnce() -> V,
    ) -> Arc<V> {
        if let Some(value) = self.get(key, version, language) {
            return value;
        }
        let value = compute();
        self.set(key.clone(), version, language.clone(), value)
    }

    /// Drop the entry for `key`. Returns whether one existed.
    pub fn invalidate(&self, key: &K) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Drop every entry whose key matches `predicate`.
    pub fn invalidate_where(&self, predicate: impl Fn(&K) -> bool) {
        self.lock().retain(|key, _| !predicate(key));
    }

    fn sweep(&self, entries: &mut FxHashMap<K, Entry<V>>, now: Instant) {
        let max_age = self.limits().max_age;
        entries.retain(|key, entry| {
            let keep = now.saturating_duration_since(entry.last_access) <= max_age;
            if !keep {
                tracing::trace!(?key, version = entry.version, "evicting expired entry");
            }
            keep
        });
        self.enforce_capacity(entries);
    }

    fn enforce_capacity(&self, entries: &mut FxHashMap<K, Entry<V>>) {
        let capacity = self.limits().capacity;
        while entries.len() > capacity {
            let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            tracing::trace!(key = ?oldest, "evicting least recently used entry");
            entries.remove(&oldest);
        }
    }
}
