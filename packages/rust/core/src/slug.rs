//! Slug derivation and topic file naming.

use kbindex_shared::{KbIndexError, Result};

/// Minimum digits used for the order prefix in topic file names.
pub const MIN_NUMBER_WIDTH: usize = 2;

/// Derive a filename-safe slug from a topic title.
///
/// Lower-cases ASCII letters and collapses every run of other characters
/// into a single `-`. Leading and trailing separators are dropped, so the
/// result is empty only when the title has no ASCII alphanumerics at all.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(ch.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Check that a slug is non-empty lowercase kebab-case.
pub fn validate_slug(slug: &str) -> Result<()> {
    let is_valid = !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

    if is_valid {
        Ok(())
    } else {
        Err(KbIndexError::validation(format!(
            "slug {slug:?} is not lowercase kebab-case"
        )))
    }
}

/// Number of digits used for order prefixes in an index of `count` topics.
pub fn number_width(count: usize) -> usize {
    let digits = count.max(1).ilog10() as usize + 1;
    digits.max(MIN_NUMBER_WIDTH)
}

/// File name a topic links to, e.g. `07-mapped-types.md`.
pub fn topic_file_name(order: u32, slug: &str, width: usize) -> String {
    format!("{order:0width$}-{slug}.md")
}
