//! Core utilities for pagecraft: change tracking, caching, naming, snippets.

/// Request- and process-scoped memoization.
pub mod cache;
/// Configuration loading and defaults.
pub mod config;
/// Shared constants.
pub mod constants;
/// Application error types.
pub mod error;
/// Change-tracking views over nested JSON containers.
pub mod mutation;
/// Page name helpers.
pub mod naming;
/// Snippet markup scanning and rendering.
pub mod snippet;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{clear_cache, lru_cache, request_cache, DontCache, RequestContext};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use mutation::{Nested, NestedMutationDict, NestedMutationList, SharedValue};
pub use naming::{disambiguate_name, title_to_name};
pub use snippet::{substitute, SnippetMatch, SnippetRegistry};
