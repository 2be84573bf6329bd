//! Shared test-only helpers for pagecraft_core.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::{Mutex, OnceLock};

/// Return the global lock used to serialize environment mutations in tests.
pub(crate) fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Return the lock serializing tests that call the process-wide `clear_cache`.
pub(crate) fn cache_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

// Rust toolchains differ on whether env mutation APIs are `unsafe`.
#[allow(unused_unsafe)]
fn write_env(key: &str, value: Option<&str>) {
    // SAFETY: callers hold `env_lock` while mutating the environment.
    unsafe {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }
}

/// Restores an environment variable value on drop.
pub(crate) struct EnvGuard {
    key: String,
    previous: Option<String>,
}

impl EnvGuard {
    /// Set `key=value` until the guard drops.
    pub(crate) fn set(key: &str, value: &str) -> Self {
        Self::replace(key, Some(value))
    }

    /// Remove `key` until the guard drops.
    pub(crate) fn remove(key: &str) -> Self {
        Self::replace(key, None)
    }

    fn replace(key: &str, value: Option<&str>) -> Self {
        let previous = std::env::var(key).ok();
        write_env(key, value);
        Self {
            key: key.to_string(),
            previous,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        write_env(self.key.as_str(), self.previous.as_deref());
    }
}

/// Counts invocations of a change callback.
#[derive(Clone, Default)]
pub(crate) struct CallCounter(Rc<Cell<usize>>);

impl CallCounter {
    /// Build a callback that bumps this counter.
    pub(crate) fn callback(&self) -> impl Fn() + 'static {
        let count = Rc::clone(&self.0);
        move || count.set(count.get() + 1)
    }

    pub(crate) fn count(&self) -> usize {
        self.0.get()
    }
}

#[cfg(test)]
mod tests {
    use super::{env_lock, CallCounter, EnvGuard};
    use crate::constants::{ENV_DISABLE_CACHE, ENV_LRU_CACHE_SIZE};
    use crate::Config;

    #[test]
    fn nested_guards_unwind_cache_size_override() {
        let _lock = env_lock().lock().expect("env lock");
        let _outer = EnvGuard::set(ENV_LRU_CACHE_SIZE, "64");
        {
            let _inner = EnvGuard::set(ENV_LRU_CACHE_SIZE, "8");
            assert_eq!(Config::from_env().lru_cache_size, 8);
        }
        assert_eq!(Config::from_env().lru_cache_size, 64);
    }

    #[test]
    fn removed_disable_flag_comes_back_on_drop() {
        let _lock = env_lock().lock().expect("env lock");
        let _enabled = EnvGuard::set(ENV_DISABLE_CACHE, "true");
        {
            let _removed = EnvGuard::remove(ENV_DISABLE_CACHE);
            assert!(!Config::from_env().disable_cache);
        }
        assert!(Config::from_env().disable_cache);
    }

    #[test]
    fn call_counter_tracks_every_invocation() {
        let counter = CallCounter::default();
        let callback = counter.callback();
        callback();
        callback();
        assert_eq!(counter.count(), 2);
    }
}
