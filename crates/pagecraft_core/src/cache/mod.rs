//! Memoization wrappers scoped to a request or to the whole process.
//!
//! Both flavours take a key function computing a cache key from the call's
//! arguments. A key function that returns [`DontCache`] makes that call run
//! uncached. [`clear_cache`] invalidates every cache of both kinds.

mod lru;
mod request;

#[cfg(test)]
mod tests;

pub use lru::{lru_cache, LruCached};
pub use request::{request_cache, RequestCached, RequestContext, RequestGuard};

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use thiserror::Error;

/// Returned by a key function to opt one call out of memoization.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[error("call must not be cached")]
pub struct DontCache;

/// Key function signature shared by both cache flavours.
pub type KeyFn<A, K> = Box<dyn Fn(&A) -> Result<K, DontCache> + Send + Sync>;
/// Wrapped computation signature shared by both cache flavours.
pub type CachedFn<A, V> = Box<dyn Fn(A) -> V + Send + Sync>;

static GENERATION: AtomicU64 = AtomicU64::new(0);
static NEXT_CACHE_ID: AtomicUsize = AtomicUsize::new(0);

/// Invalidate every request-scoped and process-scoped cache.
///
/// Stores notice the new generation on their next access and drop their
/// entries then.
pub fn clear_cache() {
    let generation = GENERATION.fetch_add(1, Ordering::SeqCst) + 1;
    tracing::debug!("Cleared all caches (generation {})", generation);
}

fn current_generation() -> u64 {
    GENERATION.load(Ordering::SeqCst)
}

fn next_cache_id() -> usize {
    NEXT_CACHE_ID.fetch_add(1, Ordering::Relaxed)
}
