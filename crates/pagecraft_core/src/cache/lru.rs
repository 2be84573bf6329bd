//! Process-scoped memoization with least-recently-used eviction.

use super::{current_generation, CachedFn, DontCache, KeyFn};
use crate::config::Config;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

/// Bounded map evicting the least recently used entry when full.
struct LruStore<K, V> {
    capacity: usize,
    generation: u64,
    tick: u64,
    entries: HashMap<K, (V, u64)>,
    recency: BTreeMap<u64, K>,
}

impl<K, V> LruStore<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            generation: current_generation(),
            tick: 0,
            entries: HashMap::new(),
            recency: BTreeMap::new(),
        }
    }

    fn sync_generation(&mut self, generation: u64) {
        if self.generation != generation {
            self.entries.clear();
            self.recency.clear();
            self.generation = generation;
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn get(&mut self, key: &K) -> Option<V> {
        let tick = self.next_tick();
        let (value, last_used) = self.entries.get_mut(key)?;
        let previous = std::mem::replace(last_used, tick);
        let value = value.clone();
        if let Some(key) = self.recency.remove(&previous) {
            self.recency.insert(tick, key);
        }
        Some(value)
    }

    fn insert(&mut self, key: K, value: V) {
        let tick = self.next_tick();
        if let Some((_, previous)) = self.entries.remove(&key) {
            self.recency.remove(&previous);
        }
        while self.entries.len() >= self.capacity {
            let Some((_, oldest)) = self.recency.pop_first() else {
                break;
            };
            self.entries.remove(&oldest);
        }
        self.recency.insert(tick, key.clone());
        self.entries.insert(key, (value, tick));
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A computation memoized for the lifetime of the process.
pub struct LruCached<A, K, V> {
    key_fn: KeyFn<A, K>,
    func: CachedFn<A, V>,
    store: Mutex<LruStore<K, V>>,
    bypass: bool,
}

/// Memoize `func` in a process-wide LRU store keyed by `key_fn`.
///
/// Capacity and the global bypass flag come from [`Config::global`].
pub fn lru_cache<A, K, V>(
    key_fn: impl Fn(&A) -> Result<K, DontCache> + Send + Sync + 'static,
    func: impl Fn(A) -> V + Send + Sync + 'static,
) -> LruCached<A, K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    LruCached::with_config(key_fn, func, Config::global())
}

impl<A, K, V> LruCached<A, K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Build a cache using the capacity and bypass flag from `config`.
    pub fn with_config(
        key_fn: impl Fn(&A) -> Result<K, DontCache> + Send + Sync + 'static,
        func: impl Fn(A) -> V + Send + Sync + 'static,
        config: &Config,
    ) -> Self {
        Self {
            key_fn: Box::new(key_fn),
            func: Box::new(func),
            store: Mutex::new(LruStore::new(config.lru_cache_size)),
            bypass: config.disable_cache,
        }
    }

    /// Build a cache holding at most `capacity` entries.
    pub fn with_capacity(
        key_fn: impl Fn(&A) -> Result<K, DontCache> + Send + Sync + 'static,
        func: impl Fn(A) -> V + Send + Sync + 'static,
        capacity: usize,
    ) -> Self {
        let config = Config {
            lru_cache_size: capacity,
            ..Config::default()
        };
        Self::with_config(key_fn, func, &config)
    }

    fn store(&self) -> std::sync::MutexGuard<'_, LruStore<K, V>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the memoized result for `args`, computing it on a miss.
    pub fn call(&self, args: A) -> V {
        if self.bypass {
            return (self.func)(args);
        }
        let key = match (self.key_fn)(&args) {
            Ok(key) => key,
            Err(DontCache) => {
                tracing::debug!("Key function declined caching; calling through");
                return (self.func)(args);
            }
        };

        let generation = current_generation();
        {
            let mut store = self.store();
            store.sync_generation(generation);
            if let Some(hit) = store.get(&key) {
                tracing::trace!("LRU cache hit");
                return hit;
            }
        }

        tracing::trace!("LRU cache miss");
        // Computed without the lock so `func` may call other cached functions.
        let value = (self.func)(args);
        let mut store = self.store();
        let now = current_generation();
        store.sync_generation(now);
        if now == generation {
            store.insert(key, value.clone());
        } else {
            tracing::debug!("Cache cleared during computation; result not stored");
        }
        value
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        let mut store = self.store();
        store.sync_generation(current_generation());
        store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
