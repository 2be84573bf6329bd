//! Configuration loading from environment variables.

use crate::constants::{DEFAULT_LRU_CACHE_SIZE, ENV_DISABLE_CACHE, ENV_LRU_CACHE_SIZE};
use serde::Deserialize;
use std::env;
use std::sync::OnceLock;

/// Runtime configuration for the caching layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Capacity of each process-scoped LRU cache.
    pub lru_cache_size: usize,
    /// Bypass every cache decorator when set.
    #[serde(default)]
    pub disable_cache: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lru_cache_size: DEFAULT_LRU_CACHE_SIZE,
            disable_cache: false,
        }
    }
}

/// Parse a boolean-like environment flag value.
///
/// # Supported Values
/// - Truthy: `1`, `true`, `yes`, `on`
/// - Falsy: `0`, `false`, `no`, `off`, empty string
///
/// Matching is case-insensitive and ignores surrounding whitespace.
///
/// # Returns
/// `Some(bool)` when the value is recognized, otherwise `None`.
pub fn parse_env_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Read a boolean flag from the environment.
///
/// Missing or unrecognized values are treated as `false`.
pub fn env_flag_enabled(name: &str) -> bool {
    env::var(name)
        .ok()
        .and_then(|value| parse_env_flag(&value))
        .unwrap_or(false)
}

fn parse_cache_size(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|size| *size > 0)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Returns
    /// A populated [`Config`] with defaults applied when env vars are missing
    /// or invalid.
    pub fn from_env() -> Self {
        let lru_cache_size = match env::var(ENV_LRU_CACHE_SIZE) {
            Ok(raw) => parse_cache_size(&raw).unwrap_or_else(|| {
                tracing::warn!(
                    "Ignoring invalid {}={:?}; using {}",
                    ENV_LRU_CACHE_SIZE,
                    raw,
                    DEFAULT_LRU_CACHE_SIZE
                );
                DEFAULT_LRU_CACHE_SIZE
            }),
            Err(_) => DEFAULT_LRU_CACHE_SIZE,
        };
        Self {
            lru_cache_size,
            disable_cache: env_flag_enabled(ENV_DISABLE_CACHE),
        }
    }

    /// Process-wide settings, read from the environment on first use.
    pub fn global() -> &'static Config {
        static GLOBAL: OnceLock<Config> = OnceLock::new();
        GLOBAL.get_or_init(Config::from_env)
    }
}
