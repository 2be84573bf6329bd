//! Request-scoped memoization.
//!
//! The surrounding server creates one [`RequestContext`] per inbound request
//! and enters it for the duration of the handler. Cached results live on the
//! context and disappear with it.

use super::{current_generation, next_cache_id, CachedFn, DontCache, KeyFn};
use crate::config::Config;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

thread_local! {
    static CURRENT_REQUEST: RefCell<Option<Rc<RequestContext>>> = const { RefCell::new(None) };
}

/// Per-request state holding request-scoped cache entries.
pub struct RequestContext {
    generation: Cell<u64>,
    caches: RefCell<HashMap<usize, Box<dyn Any>>>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            generation: Cell::new(current_generation()),
            caches: RefCell::new(HashMap::new()),
        }
    }
}

impl RequestContext {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// The request entered on this thread, if any.
    pub fn current() -> Option<Rc<RequestContext>> {
        CURRENT_REQUEST.with(|slot| slot.borrow().clone())
    }

    /// Make `self` the current request until the guard drops.
    ///
    /// Guards nest: dropping one restores whichever request was current
    /// before it was entered.
    pub fn enter(self: &Rc<Self>) -> RequestGuard {
        let previous = CURRENT_REQUEST.with(|slot| slot.replace(Some(Rc::clone(self))));
        RequestGuard { previous }
    }

    /// Drop every cached entry held by this request.
    pub fn clear(&self) {
        self.caches.borrow_mut().clear();
    }

    fn sync_generation(&self) {
        let generation = current_generation();
        if self.generation.get() != generation {
            self.clear();
            self.generation.set(generation);
        }
    }

    fn lookup<K, V>(&self, cache_id: usize, key: &K) -> Option<V>
    where
        K: Hash + Eq + 'static,
        V: Clone + 'static,
    {
        self.sync_generation();
        self.caches
            .borrow()
            .get(&cache_id)
            .and_then(|entries| entries.downcast_ref::<HashMap<K, V>>())
            .and_then(|entries| entries.get(key).cloned())
    }

    fn store<K, V>(&self, cache_id: usize, key: K, value: V)
    where
        K: Hash + Eq + 'static,
        V: 'static,
    {
        self.sync_generation();
        let mut caches = self.caches.borrow_mut();
        let entries = caches
            .entry(cache_id)
            .or_insert_with(|| Box::new(HashMap::<K, V>::new()) as Box<dyn Any>);
        if let Some(entries) = entries.downcast_mut::<HashMap<K, V>>() {
            entries.insert(key, value);
        }
    }
}

/// Restores the previously current request on drop.
pub struct RequestGuard {
    previous: Option<Rc<RequestContext>>,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_REQUEST.with(|slot| *slot.borrow_mut() = previous);
    }
}

/// A computation memoized for the lifetime of the current request.
pub struct RequestCached<A, K, V> {
    id: usize,
    key_fn: KeyFn<A, K>,
    func: CachedFn<A, V>,
    bypass: bool,
}

/// Memoize `func` on the current [`RequestContext`], keyed by `key_fn`.
///
/// Calls made while no request is entered run uncached.
pub fn request_cache<A, K, V>(
    key_fn: impl Fn(&A) -> Result<K, DontCache> + Send + Sync + 'static,
    func: impl Fn(A) -> V + Send + Sync + 'static,
) -> RequestCached<A, K, V>
where
    K: Hash + Eq + 'static,
    V: Clone + 'static,
{
    RequestCached::with_config(key_fn, func, Config::global())
}

impl<A, K, V> RequestCached<A, K, V>
where
    K: Hash + Eq + 'static,
    V: Clone + 'static,
{
    /// Build a cache honouring the bypass flag from `config`.
    pub fn with_config(
        key_fn: impl Fn(&A) -> Result<K, DontCache> + Send + Sync + 'static,
        func: impl Fn(A) -> V + Send + Sync + 'static,
        config: &Config,
    ) -> Self {
        Self {
            id: next_cache_id(),
            key_fn: Box::new(key_fn),
            func: Box::new(func),
            bypass: config.disable_cache,
        }
    }

    /// Return the result memoized on the current request, computing it on a
    /// miss.
    pub fn call(&self, args: A) -> V {
        if self.bypass {
            return (self.func)(args);
        }
        let Some(request) = RequestContext::current() else {
            tracing::trace!("No current request; calling through");
            return (self.func)(args);
        };
        let key = match (self.key_fn)(&args) {
            Ok(key) => key,
            Err(DontCache) => {
                tracing::debug!("Key function declined caching; calling through");
                return (self.func)(args);
            }
        };

        let generation = current_generation();
        if let Some(hit) = request.lookup::<K, V>(self.id, &key) {
            tracing::trace!(cache_id = self.id, "Request cache hit");
            return hit;
        }
        tracing::trace!(cache_id = self.id, "Request cache miss");
        let value = (self.func)(args);
        if current_generation() == generation {
            request.store(self.id, key, value.clone());
        } else {
            tracing::debug!(
                cache_id = self.id,
                "Cache cleared during computation; result not stored"
            );
        }
        value
    }
}
