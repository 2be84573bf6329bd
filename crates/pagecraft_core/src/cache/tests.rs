use super::*;
use crate::config::Config;
use crate::test_support::cache_lock;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

type Calls = Arc<Mutex<Vec<(i32, i32)>>>;

fn recorder() -> (Calls, impl Fn((i32, i32)) -> i32 + Send + Sync + 'static) {
    let calls: Calls = Arc::default();
    let sink = Arc::clone(&calls);
    let func = move |(a, b): (i32, i32)| {
        sink.lock().unwrap().push((a, b));
        a * 10 + b
    };
    (calls, func)
}

fn pair_key(args: &(i32, i32)) -> Result<(i32, i32), DontCache> {
    Ok(*args)
}

fn dont_cache(_: &(i32, i32)) -> Result<(i32, i32), DontCache> {
    Err(DontCache)
}

#[test]
fn request_cache_memoizes_per_key() {
    let _lock = cache_lock().lock().unwrap();
    let request = RequestContext::new();
    let _entered = request.enter();
    let (calls, func) = recorder();
    let my_fun = RequestCached::with_config(pair_key, func, &Config::default());

    assert_eq!(my_fun.call((1, 2)), 12);
    assert_eq!(my_fun.call((1, 2)), 12);
    assert_eq!(calls.lock().unwrap().len(), 1);
    assert_eq!(my_fun.call((2, 1)), 21);
    assert_eq!(calls.lock().unwrap().len(), 2);

    clear_cache();
    my_fun.call((1, 2));
    assert_eq!(calls.lock().unwrap().len(), 3);
}

#[test]
fn request_cache_dont_cache_always_calls_through() {
    let _lock = cache_lock().lock().unwrap();
    let request = RequestContext::new();
    let _entered = request.enter();
    let (calls, func) = recorder();
    let my_fun = RequestCached::with_config(dont_cache, func, &Config::default());

    my_fun.call((1, 2));
    my_fun.call((1, 2));
    assert_eq!(calls.lock().unwrap().len(), 2);
}

#[test]
fn request_cache_is_scoped_to_the_entered_request() {
    let _lock = cache_lock().lock().unwrap();
    let (calls, func) = recorder();
    let my_fun = RequestCached::with_config(pair_key, func, &Config::default());

    let first = RequestContext::new();
    {
        let _entered = first.enter();
        my_fun.call((1, 2));
        my_fun.call((1, 2));
    }
    assert_eq!(calls.lock().unwrap().len(), 1);

    let second = RequestContext::new();
    {
        let _entered = second.enter();
        my_fun.call((1, 2));
    }
    assert_eq!(calls.lock().unwrap().len(), 2);

    // Back on the first request, its entry is still there.
    let _entered = first.enter();
    my_fun.call((1, 2));
    assert_eq!(calls.lock().unwrap().len(), 2);

    first.clear();
    my_fun.call((1, 2));
    assert_eq!(calls.lock().unwrap().len(), 3);
}

#[test]
fn request_guard_restores_previous_request() {
    let outer = RequestContext::new();
    let inner = RequestContext::new();
    assert!(RequestContext::current().is_none());
    let _outer_guard = outer.enter();
    {
        let _inner_guard = inner.enter();
        let current = RequestContext::current().expect("inner request");
        assert!(Rc::ptr_eq(&current, &inner));
    }
    let current = RequestContext::current().expect("outer request");
    assert!(Rc::ptr_eq(&current, &outer));
}

#[test]
fn request_cache_without_request_calls_through() {
    let _lock = cache_lock().lock().unwrap();
    let (calls, func) = recorder();
    let my_fun = RequestCached::with_config(pair_key, func, &Config::default());

    my_fun.call((1, 2));
    my_fun.call((1, 2));
    assert_eq!(calls.lock().unwrap().len(), 2);
}

#[test]
fn request_caches_do_not_share_entries() {
    let _lock = cache_lock().lock().unwrap();
    let request = RequestContext::new();
    let _entered = request.enter();
    let add = RequestCached::with_config(pair_key, |(a, b): (i32, i32)| a + b, &Config::default());
    let mul = RequestCached::with_config(pair_key, |(a, b): (i32, i32)| a * b, &Config::default());

    assert_eq!(add.call((3, 4)), 7);
    assert_eq!(mul.call((3, 4)), 12);
}

#[test]
fn lru_cache_memoizes_per_key() {
    let _lock = cache_lock().lock().unwrap();
    let (calls, func) = recorder();
    let my_fun = LruCached::with_config(pair_key, func, &Config::default());

    my_fun.call((1, 2));
    my_fun.call((1, 2));
    assert_eq!(calls.lock().unwrap().len(), 1);
    my_fun.call((2, 1));
    assert_eq!(calls.lock().unwrap().len(), 2);

    clear_cache();
    my_fun.call((1, 2));
    assert_eq!(calls.lock().unwrap().len(), 3);
}

#[test]
fn lru_cache_dont_cache_always_calls_through() {
    let _lock = cache_lock().lock().unwrap();
    let (calls, func) = recorder();
    let my_fun = LruCached::with_config(dont_cache, func, &Config::default());

    my_fun.call((1, 2));
    my_fun.call((1, 2));
    assert_eq!(calls.lock().unwrap().len(), 2);
    assert!(my_fun.is_empty());
}

#[test]
fn lru_cache_respects_capacity() {
    let _lock = cache_lock().lock().unwrap();
    let (calls, func) = recorder();
    let my_fun = LruCached::with_capacity(pair_key, func, 2);

    my_fun.call((1, 1));
    my_fun.call((2, 2));
    my_fun.call((1, 1));
    my_fun.call((3, 3));
    assert_eq!(my_fun.len(), 2);
    assert_eq!(calls.lock().unwrap().len(), 3);

    // (2, 2) was least recently used and got evicted.
    my_fun.call((2, 2));
    assert_eq!(calls.lock().unwrap().len(), 4);
    my_fun.call((3, 3));
    assert_eq!(calls.lock().unwrap().len(), 4);
}

#[test]
fn disabled_config_bypasses_both_caches() {
    let _lock = cache_lock().lock().unwrap();
    let config = Config {
        disable_cache: true,
        ..Config::default()
    };
    let request = RequestContext::new();
    let _entered = request.enter();

    let (lru_calls, lru_func) = recorder();
    let lru = LruCached::with_config(pair_key, lru_func, &config);
    lru.call((1, 2));
    lru.call((1, 2));
    assert_eq!(lru_calls.lock().unwrap().len(), 2);

    let (req_calls, req_func) = recorder();
    let req = RequestCached::with_config(pair_key, req_func, &config);
    req.call((1, 2));
    req.call((1, 2));
    assert_eq!(req_calls.lock().unwrap().len(), 2);
}

#[test]
fn lru_cache_can_live_in_a_static() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::OnceLock;

    static COMPUTED: AtomicUsize = AtomicUsize::new(0);
    static SQUARE: OnceLock<LruCached<u64, u64, u64>> = OnceLock::new();

    let _lock = cache_lock().lock().unwrap();
    let square = SQUARE.get_or_init(|| {
        LruCached::with_config(
            |n: &u64| Ok(*n),
            |n: u64| {
                COMPUTED.fetch_add(1, Ordering::SeqCst);
                n * n
            },
            &Config::default(),
        )
    });
    assert_eq!(square.call(9), 81);
    assert_eq!(square.call(9), 81);
    assert_eq!(COMPUTED.load(Ordering::SeqCst), 1);
}

/// Returns a function yielding the data version, clearing every cache while
/// the first computation is still running.
fn clears_mid_compute() -> impl Fn(u32) -> usize + Send + Sync + 'static {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let version = Arc::new(AtomicUsize::new(0));
    move |_: u32| {
        let seen = version.fetch_add(1, Ordering::SeqCst) + 1;
        if seen == 1 {
            clear_cache();
        }
        seen
    }
}

#[test]
fn lru_cache_skips_results_computed_across_a_clear() {
    let _lock = cache_lock().lock().unwrap();
    let my_fun = LruCached::with_config(|n: &u32| Ok(*n), clears_mid_compute(), &Config::default());

    assert_eq!(my_fun.call(7), 1);
    assert!(my_fun.is_empty());
    assert_eq!(my_fun.call(7), 2);
    assert_eq!(my_fun.call(7), 2);
}

#[test]
fn request_cache_skips_results_computed_across_a_clear() {
    let _lock = cache_lock().lock().unwrap();
    let request = RequestContext::new();
    let _entered = request.enter();
    let my_fun =
        RequestCached::with_config(|n: &u32| Ok(*n), clears_mid_compute(), &Config::default());

    assert_eq!(my_fun.call(7), 1);
    assert_eq!(my_fun.call(7), 2);
    assert_eq!(my_fun.call(7), 2);
}
