//! Root crate facade for pagecraft content utilities.

pub use pagecraft_core::{
    cache, clear_cache, config, constants, disambiguate_name, error, lru_cache, mutation, naming,
    request_cache, snippet, substitute, title_to_name, AppError, AppResult, Config, DontCache,
    Nested, NestedMutationDict, NestedMutationList, RequestContext, SharedValue, SnippetMatch,
    SnippetRegistry,
};
