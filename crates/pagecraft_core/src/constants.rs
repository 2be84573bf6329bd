//! Shared constants used across pagecraft crates.

/// Default capacity of a process-scoped LRU cache.
pub const DEFAULT_LRU_CACHE_SIZE: usize = 1000;

/// Maximum length of a slug produced by `title_to_name`.
pub const MAX_NAME_LENGTH: usize = 40;

/// Environment variable overriding [`DEFAULT_LRU_CACHE_SIZE`].
pub const ENV_LRU_CACHE_SIZE: &str = "PAGECRAFT_LRU_CACHE_SIZE";
/// Environment flag that turns every cache decorator into a pass-through.
pub const ENV_DISABLE_CACHE: &str = "PAGECRAFT_DISABLE_CACHE";
