//! Snippet markup: bracketed directives embedding widgets in page content.

mod registry;
mod scanner;


pub use registry::{
    parse_arguments, ChildLink, ChildrenSnippet, SnippetCall, SnippetHandler, SnippetRegistry,
};
pub use scanner::{find_iter, substitute, try_substitute, Matches, SnippetMatch};
