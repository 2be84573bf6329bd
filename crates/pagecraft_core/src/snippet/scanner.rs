//! Single-pass scanner for bracketed snippet directives.
//!
//! Recognized forms:
//! - `[name args/]` (self-closing)
//! - `[name args]content[/name]` (paired; the first matching close tag wins)
//! - either form wrapped in a second pair of brackets, `[[...]]`, to escape it
//!
//! An escape needs both outer brackets. In `[[foo/]` the first `[` is plain
//! text and `[foo/]` is an ordinary directive.
//!
//! Bracketed text that is neither self-closing nor closed by a tag with the
//! same name is not a match and passes through untouched.

use std::convert::Infallible;
use std::ops::Range;

/// One directive found in a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetMatch<'t> {
    text: &'t str,
    start: usize,
    end: usize,
    /// `"["` when the directive is escaped, otherwise empty.
    /// Always paired with a non-empty `escape_close`.
    pub escape_open: &'t str,
    pub name: &'t str,
    /// Raw text between the name and the tag close, leading space included.
    pub arguments: &'t str,
    /// `Some("/")` for self-closing directives.
    pub self_closing: Option<&'t str>,
    /// Inner text of a paired directive. Empty content is still `Some`.
    pub content: Option<&'t str>,
    /// `"]"` for escaped directives, otherwise empty.
    pub escape_close: &'t str,
}

impl<'t> SnippetMatch<'t> {
    /// The full matched text, escape brackets included.
    pub fn as_str(&self) -> &'t str {
        &self.text[self.start..self.end]
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn is_escaped(&self) -> bool {
        !self.escape_open.is_empty()
    }

    /// Whether this match is eligible for substitution.
    ///
    /// Always true for matches produced by [`find_iter`].
    pub fn is_directive(&self) -> bool {
        self.self_closing.is_some() || self.content.is_some()
    }

    /// The matched text with the escape brackets removed.
    pub fn unescaped(&self) -> &'t str {
        let full = self.as_str();
        &full[self.escape_open.len()..full.len() - self.escape_close.len()]
    }
}

/// Lazy iterator over the directives of a text, left to right.
#[derive(Debug, Clone)]
pub struct Matches<'t> {
    text: &'t str,
    pos: usize,
}

impl<'t> Iterator for Matches<'t> {
    type Item = SnippetMatch<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(offset) = self.text[self.pos..].find('[') {
            let start = self.pos + offset;
            if let Some(found) = match_at(self.text, start) {
                self.pos = found.end;
                return Some(found);
            }
            self.pos = start + 1;
        }
        self.pos = self.text.len();
        None
    }
}

/// Scan `text` for directives.
pub fn find_iter(text: &str) -> Matches<'_> {
    Matches { text, pos: 0 }
}

/// Replace every directive in `text` with the output of `replacer`.
///
/// Text outside directives is copied verbatim and replacements are not
/// scanned again.
pub fn substitute<'t, F>(text: &'t str, mut replacer: F) -> String
where
    F: FnMut(&SnippetMatch<'t>) -> String,
{
    match try_substitute(text, |found| Ok::<_, Infallible>(replacer(found))) {
        Ok(out) => out,
        Err(never) => match never {},
    }
}

/// Like [`substitute`], stopping at the first replacer error.
pub fn try_substitute<'t, F, E>(text: &'t str, mut replacer: F) -> Result<String, E>
where
    F: FnMut(&SnippetMatch<'t>) -> Result<String, E>,
{
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    for found in find_iter(text) {
        out.push_str(&text[copied..found.start]);
        out.push_str(&replacer(&found)?);
        copied = found.end;
    }
    out.push_str(&text[copied..]);
    Ok(out)
}

fn is_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '-'
}

fn match_at(text: &str, start: usize) -> Option<SnippetMatch<'_>> {
    let escaped = text.as_bytes().get(start + 1) == Some(&b'[');
    let tag_start = if escaped { start + 1 } else { start };
    let name_start = tag_start + 1;

    let name_len: usize = text[name_start..]
        .chars()
        .take_while(|ch| is_name_char(*ch))
        .map(char::len_utf8)
        .sum();
    if name_len == 0 {
        return None;
    }
    let name_end = name_start + name_len;
    let boundary = text[name_end..].chars().next()?;
    if !(boundary.is_whitespace() || boundary == '/' || boundary == ']') {
        return None;
    }
    let name = &text[name_start..name_end];

    let (arguments_end, self_closing) = scan_arguments(text, name_end)?;
    let (tag_end, content) = if self_closing {
        (arguments_end + 2, None)
    } else {
        let content_start = arguments_end + 1;
        let close_tag = format!("[/{}]", name);
        let content_len = text[content_start..].find(&close_tag)?;
        let content_end = content_start + content_len;
        (
            content_end + close_tag.len(),
            Some(&text[content_start..content_end]),
        )
    };

    let escaped = escaped && text[tag_end..].starts_with(']');
    let (start, escape_open, escape_close) = if escaped {
        (start, "[", "]")
    } else {
        (tag_start, "", "")
    };

    Some(SnippetMatch {
        text,
        start,
        end: tag_end + escape_close.len(),
        escape_open,
        name,
        arguments: &text[name_end..arguments_end],
        self_closing: self_closing.then(|| &text[arguments_end..arguments_end + 1]),
        content,
        escape_close,
    })
}

/// Find where the opening tag's arguments stop.
///
/// Returns the index of the `/` of a trailing `/]` (and `true`) or of the
/// closing `]` (and `false`). A quote directly after `=` or whitespace opens a
/// quoted run that hides brackets until the matching quote. A quote with no
/// match before the next newline or `[` is an ordinary character.
fn scan_arguments(text: &str, from: usize) -> Option<(usize, bool)> {
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"') if opens_quote(bytes, i, from) => {
                if let Some(len) = closing_quote(&bytes[i + 1..], quote) {
                    i += len + 2;
                    continue;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b']') => return Some((i, true)),
            b']' => return Some((i, false)),
            _ => {}
        }
        i += 1;
    }
    None
}

fn closing_quote(rest: &[u8], quote: u8) -> Option<usize> {
    rest.iter()
        .position(|&byte| byte == quote || byte == b'\n' || byte == b'[')
        .filter(|&pos| rest[pos] == quote)
}

fn opens_quote(bytes: &[u8], i: usize, from: usize) -> bool {
    i > from && (bytes[i - 1] == b'=' || bytes[i - 1].is_ascii_whitespace())
}
