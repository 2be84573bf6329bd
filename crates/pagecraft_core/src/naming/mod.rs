//! Utilities for turning page titles into URL-safe names.

use crate::constants::MAX_NAME_LENGTH;
use rand::Rng;

const ADJECTIVES: &[&str] = &[
    "amber", "ancient", "bold", "bright", "calm", "cosmic", "crystal", "dusty", "eager",
    "gentle", "golden", "hidden", "lunar", "mellow", "misty", "nimble", "quiet", "rapid",
    "rustic", "serene", "silver", "solar", "swift", "velvet", "vivid", "wild",
];

const NOUNS: &[&str] = &[
    "atlas", "beacon", "canyon", "cedar", "comet", "delta", "ember", "fjord", "garden",
    "harbor", "island", "lantern", "meadow", "nebula", "orchard", "page", "quill", "river",
    "summit", "thicket", "valley", "willow",
];

/// Turn a title into a name usable as a URL path segment.
///
/// Lower-cases, collapses every run of non-alphanumeric characters into one
/// `-`, trims hyphens from both ends, and caps the result at
/// [`MAX_NAME_LENGTH`] characters.
///
/// # Returns
/// The slug, empty when `title` has no alphanumeric characters.
pub fn title_to_name(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for ch in title.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        } else {
            pending_hyphen = true;
        }
    }
    truncate_name(&slug, MAX_NAME_LENGTH)
        .trim_end_matches('-')
        .to_string()
}

/// Bump a trailing `-<number>` suffix, or append `-1` when there is none.
///
/// `foo` becomes `foo-1` and `foo-3` becomes `foo-4`.
pub fn disambiguate_name(name: &str) -> String {
    if let Some((base, suffix)) = name.rsplit_once('-') {
        if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(number) = suffix.parse::<u64>() {
                if let Some(next) = number.checked_add(1) {
                    return format!("{}-{}", base, next);
                }
            }
        }
    }
    format!("{}-1", name)
}

/// Generate a random adjective-noun name.
pub fn generate_name() -> String {
    let mut rng = rand::thread_rng();
    let adj = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.gen_range(0..NOUNS.len())];
    format!("{}-{}", adj, noun)
}

/// Derive a name for `title` that does not collide according to `exists_check`.
///
/// Titles without usable characters fall back to [`generate_name`]. Collisions
/// are resolved with [`disambiguate_name`], so `about` may become `about-1`,
/// then `about-2`.
pub fn unique_name_for_title<F>(title: &str, exists_check: F) -> String
where
    F: Fn(&str) -> bool,
{
    let mut name = title_to_name(title);
    if name.is_empty() {
        name = generate_name();
    }
    while exists_check(&name) {
        name = disambiguate_name(&name);
    }
    name
}

fn truncate_name(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect::<String>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn title_to_name_caps_length() {
        assert_eq!(title_to_name(&"a".repeat(50)).chars().count(), 40);
    }

    #[test]
    fn title_to_name_slugifies() {
        assert_eq!(title_to_name("Foo Bar"), "foo-bar");
        assert_eq!(title_to_name("  Hello,   World!  "), "hello-world");
        assert_eq!(title_to_name("--Already-Slugged--"), "already-slugged");
        assert_eq!(title_to_name("Version 2.0 Notes"), "version-2-0-notes");
        assert_eq!(title_to_name("?!"), "");
    }

    #[test]
    fn title_to_name_truncates_after_transforming() {
        // Separators collapse before the cut, so more words survive.
        let title = format!("{}   {}", "a".repeat(20), "b".repeat(30));
        let name = title_to_name(&title);
        assert_eq!(name, format!("{}-{}", "a".repeat(20), "b".repeat(19)));
    }

    #[test]
    fn title_to_name_drops_hyphen_exposed_by_cut() {
        let title = format!("{} tail", "a".repeat(39));
        assert_eq!(title_to_name(&title), "a".repeat(39));
    }

    #[test]
    fn disambiguate_name_appends_or_increments() {
        assert_eq!(disambiguate_name("foo"), "foo-1");
        assert_eq!(disambiguate_name("foo-3"), "foo-4");
        assert_eq!(disambiguate_name("foo-bar-9"), "foo-bar-10");
        assert_eq!(disambiguate_name("foo-bar"), "foo-bar-1");
        assert_eq!(disambiguate_name("foo-"), "foo--1");
        assert_eq!(disambiguate_name("2024"), "2024-1");
    }

    #[test]
    fn unique_name_skips_taken_names() {
        let taken: HashSet<&str> = ["about", "about-1"].into_iter().collect();
        let name = unique_name_for_title("About", |candidate| taken.contains(candidate));
        assert_eq!(name, "about-2");
    }

    #[test]
    fn unique_name_falls_back_to_generated_name() {
        let name = unique_name_for_title("!!!", |_| false);
        let (adj, noun) = name.split_once('-').expect("adjective-noun");
        assert!(ADJECTIVES.contains(&adj));
        assert!(NOUNS.contains(&noun));
    }
}
