//! Rendering snippet directives through registered handlers.

use super::scanner::{try_substitute, SnippetMatch};
use crate::error::{AppError, AppResult};
use std::collections::BTreeMap;
use std::fmt;

/// Parse raw snippet arguments into ordered `key=value` pairs.
///
/// Values may be bare words or wrapped in `'` or `"`. A key without `=` is a
/// flag and maps to an empty value.
///
/// # Returns
/// Pairs in source order; repeated keys are kept.
pub fn parse_arguments(raw: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut rest = raw.trim_start();
    while !rest.is_empty() {
        let key_len = rest
            .find(|ch: char| ch == '=' || ch.is_whitespace())
            .unwrap_or(rest.len());
        let key = &rest[..key_len];
        rest = &rest[key_len..];

        let value = match rest.strip_prefix('=') {
            Some(after) => {
                let (value, remaining) = split_value(after);
                rest = remaining;
                value
            }
            None => "",
        };
        if !key.is_empty() {
            pairs.push((key.to_string(), value.to_string()));
        }
        rest = rest.trim_start();
    }
    pairs
}

fn split_value(input: &str) -> (&str, &str) {
    for quote in ['\'', '"'] {
        if let Some(quoted) = input.strip_prefix(quote) {
            if let Some(end) = quoted.find(quote) {
                return (&quoted[..end], &quoted[end + 1..]);
            }
        }
    }
    let end = input.find(char::is_whitespace).unwrap_or(input.len());
    (&input[..end], &input[end..])
}

/// A directive handed to a [`SnippetHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetCall<'t> {
    pub name: &'t str,
    pub arguments: Vec<(String, String)>,
    pub content: Option<&'t str>,
}

impl<'t> SnippetCall<'t> {
    fn from_match(found: &SnippetMatch<'t>) -> Self {
        Self {
            name: found.name,
            arguments: parse_arguments(found.arguments),
            content: found.content,
        }
    }

    /// First value given for `key`.
    pub fn argument(&self, key: &str) -> Option<&str> {
        self.arguments
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

/// Produces the markup that replaces one directive.
pub trait SnippetHandler {
    fn render(&self, call: &SnippetCall<'_>) -> AppResult<String>;
}

impl<F> SnippetHandler for F
where
    F: Fn(&SnippetCall<'_>) -> AppResult<String>,
{
    fn render(&self, call: &SnippetCall<'_>) -> AppResult<String> {
        self(call)
    }
}

/// Name-to-handler table used when rendering page content.
#[derive(Default)]
pub struct SnippetRegistry {
    handlers: BTreeMap<String, Box<dyn SnippetHandler>>,
}

impl fmt::Debug for SnippetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnippetRegistry")
            .field("names", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SnippetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any previous handler.
    pub fn register(&mut self, name: impl Into<String>, handler: impl SnippetHandler + 'static) {
        let name = name.into();
        if self.handlers.insert(name.clone(), Box::new(handler)).is_some() {
            tracing::debug!("Replaced snippet handler for {:?}", name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Render every directive in `text`.
    ///
    /// Escaped directives come out as literal text without their escape
    /// brackets. Directives with no registered handler are left verbatim.
    ///
    /// # Errors
    /// The first error returned by a handler.
    pub fn render(&self, text: &str) -> AppResult<String> {
        try_substitute(text, |found| {
            if found.is_escaped() {
                return Ok(found.unescaped().to_string());
            }
            let Some(handler) = self.handlers.get(found.name) else {
                tracing::debug!("No snippet handler registered for {:?}", found.name);
                return Ok(found.as_str().to_string());
            };
            handler
                .render(&SnippetCall::from_match(found))
                .map_err(|err| match err {
                    AppError::Snippet(_) => err,
                    other => AppError::Snippet(format!("{}: {}", found.name, other)),
                })
        })
    }
}

/// Link to one child page listed by [`ChildrenSnippet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildLink {
    pub title: String,
    pub href: String,
}

impl ChildLink {
    pub fn new(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            href: href.into(),
        }
    }
}

/// Renders the children of the current page as a `<ul>` list.
///
/// Accepts an optional `class` argument set on the list element.
pub struct ChildrenSnippet<F> {
    children: F,
}

impl<F> ChildrenSnippet<F>
where
    F: Fn() -> Vec<ChildLink>,
{
    pub fn new(children: F) -> Self {
        Self { children }
    }
}

impl<F> SnippetHandler for ChildrenSnippet<F>
where
    F: Fn() -> Vec<ChildLink>,
{
    fn render(&self, call: &SnippetCall<'_>) -> AppResult<String> {
        let mut out = match call.argument("class").filter(|class| !class.is_empty()) {
            Some(class) => format!("<ul class=\"{}\">", escape_html(class)),
            None => String::from("<ul>"),
        };
        for child in (self.children)() {
            out.push_str(&format!(
                "<li><a href=\"{}\">{}</a></li>",
                escape_html(&child.href),
                escape_html(&child.title)
            ));
        }
        out.push_str("</ul>");
        Ok(out)
    }
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
