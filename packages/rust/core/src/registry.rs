//! Topic registry: the ordered, validated list of index entries.
//!
//! A registry is built once per run from a topic list and never mutated.
//! Construction fails fast on anything that would produce a broken or
//! ambiguous index (blank titles, gaps in ordering, colliding slugs).

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, instrument};

use kbindex_shared::{KbIndexError, Result, TopicEntry, TopicList};

use crate::slug::{number_width, slugify, topic_file_name};

/// Ordered topic entries with contiguous orders and unique slugs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRegistry {
    entries: Vec<TopicEntry>,
}

impl TopicRegistry {
    /// Number titles 1..=n in the given order and derive their slugs.
    #[instrument(skip_all, fields(count = titles.len()))]
    pub fn from_titles<S: AsRef<str>>(titles: &[S]) -> Result<Self> {
        let entries = titles
            .iter()
            .enumerate()
            .map(|(i, title)| {
                let order = u32::try_from(i + 1).map_err(|_| {
                    KbIndexError::validation("too many topics for a single index")
                })?;
                let title = title.as_ref().trim().to_string();
                Ok(TopicEntry {
                    order,
                    slug: slugify(&title),
                    title,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_entries(entries)
    }

    /// Accept pre-numbered entries, enforcing every registry invariant.
    pub fn from_entries(entries: Vec<TopicEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(KbIndexError::validation("topic list is empty"));
        }

        let mut seen: HashMap<&str, &TopicEntry> = HashMap::with_capacity(entries.len());

        for (i, entry) in entries.iter().enumerate() {
            let expected = i as u64 + 1;
            if u64::from(entry.order) != expected {
                return Err(KbIndexError::validation(format!(
                    "topic {:?} has order {} but position {expected}; orders must run 1..={} without gaps",
                    entry.title,
                    entry.order,
                    entries.len()
                )));
            }

            if entry.title.trim().is_empty() {
                return Err(KbIndexError::validation(format!(
                    "topic {} has a blank title",
                    entry.order
                )));
            }

            if entry.title.chars().any(char::is_control) {
                return Err(KbIndexError::validation(format!(
                    "topic {} ({:?}) contains a control character; titles must fit on one line",
                    entry.order, entry.title
                )));
            }

            let derived = slugify(&entry.title);
            if derived.is_empty() {
                return Err(KbIndexError::validation(format!(
                    "topic {} ({:?}) has no letters or digits to build a slug from",
                    entry.order, entry.title
                )));
            }
            if entry.slug != derived {
                return Err(KbIndexError::validation(format!(
                    "topic {} slug {:?} does not match title {:?} (expected {derived:?})",
                    entry.order, entry.slug, entry.title
                )));
            }

            if let Some(prev) = seen.insert(entry.slug.as_str(), entry) {
                return Err(KbIndexError::validation(format!(
                    "duplicate slug {:?}: topic {} ({:?}) and topic {} ({:?}) would link to the same file",
                    entry.slug, prev.order, prev.title, entry.order, entry.title
                )));
            }
        }

        debug!(count = entries.len(), "topic registry validated");
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[TopicEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a constructed registry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a topic by its 1-based order.
    pub fn get(&self, order: u32) -> Option<&TopicEntry> {
        let idx = usize::try_from(order).ok()?.checked_sub(1)?;
        self.entries.get(idx)
    }

    pub fn find_by_slug(&self, slug: &str) -> Option<&TopicEntry> {
        self.entries.iter().find(|e| e.slug == slug)
    }

    /// Digits used for order prefixes in link targets.
    pub fn width(&self) -> usize {
        number_width(self.entries.len())
    }

    /// Link target file name for an entry of this registry.
    pub fn file_name(&self, entry: &TopicEntry) -> String {
        topic_file_name(entry.order, &entry.slug, self.width())
    }
}

// ---------------------------------------------------------------------------
// Topic list loading
// ---------------------------------------------------------------------------

/// Load a topic list, picking the format from the file extension.
///
/// `.toml` and `.json` deserialize into [`TopicList`]; anything else is read
/// as plain text with one title per line.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_topic_list(path: &Path) -> Result<TopicList> {
    let content = std::fs::read_to_string(path).map_err(|e| KbIndexError::io(path, e))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let list = match ext.as_deref() {
        Some("toml") => toml::from_str(&content).map_err(|e| {
            KbIndexError::parse(format!("failed to parse {}: {e}", path.display()))
        })?,
        Some("json") => serde_json::from_str(&content).map_err(|e| {
            KbIndexError::parse(format!("failed to parse {}: {e}", path.display()))
        })?,
        _ => parse_plain_list(&content),
    };

    debug!(topics = list.topics.len(), "topic list loaded");
    Ok(list)
}

/// Parse a plain-text topic list.
///
/// Blank lines and `#` comments are skipped. A leading list marker
/// (`12.`, `12)`, `-`, `*`) is stripped so an existing numbered list can be
/// pasted in directly.
pub fn parse_plain_list(content: &str) -> TopicList {
    let topics = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| strip_list_marker(line).to_string())
        .filter(|title| !title.is_empty())
        .collect();

    TopicList {
        topics,
        ..TopicList::default()
    }
}

fn strip_list_marker(line: &str) -> &str {
    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return rest.trim();
    }

    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(after) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return after.trim();
        }
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(order: u32, title: &str) -> TopicEntry {
        TopicEntry {
            order,
            title: title.into(),
            slug: slugify(title),
        }
    }

    #[test]
    fn from_titles_numbers_contiguously() {
        let reg = TopicRegistry::from_titles(&["Enums", "Generics", "Decorators"]).unwrap();
        let orders: Vec<u32> = reg.entries().iter().map(|e| e.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
        assert_eq!(reg.get(2).unwrap().slug, "generics");
        assert!(reg.get(0).is_none());
        assert!(reg.get(4).is_none());
    }

    #[test]
    fn from_titles_trims_whitespace() {
        let reg = TopicRegistry::from_titles(&["  Enums  "]).unwrap();
        assert_eq!(reg.entries()[0].title, "Enums");
    }

    #[test]
    fn rejects_empty_list() {
        let err = TopicRegistry::from_titles::<&str>(&[]).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn rejects_duplicate_slugs() {
        let err = TopicRegistry::from_titles(&[
            "Type Guards",
            "Narrowing",
            "Type-Guards!",
        ])
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("duplicate slug \"type-guards\""), "{msg}");
        assert!(msg.contains("topic 1"));
        assert!(msg.contains("topic 3"));
    }

    #[test]
    fn rejects_titles_without_slug() {
        let err = TopicRegistry::from_titles(&["Enums", "???"]).unwrap_err();
        assert!(err.to_string().contains("topic 2"));
    }

    #[test]
    fn rejects_blank_title() {
        assert!(TopicRegistry::from_titles(&["Enums", "   "]).is_err());
    }

    #[test]
    fn rejects_control_characters_in_titles() {
        let err = TopicRegistry::from_titles(&["Enums\nand Flags", "Generics"]).unwrap_err();
        assert!(matches!(err, KbIndexError::Validation { .. }));
        assert!(err.to_string().contains("topic 1"), "{err}");

        assert!(TopicRegistry::from_titles(&["Tabs\tInside"]).is_err());
    }

    #[test]
    fn from_entries_rejects_gaps() {
        let err = TopicRegistry::from_entries(vec![entry(1, "Enums"), entry(3, "Generics")])
            .unwrap_err();
        assert!(err.to_string().contains("without gaps"));
    }

    #[test]
    fn from_entries_rejects_foreign_slug() {
        let mut bad = entry(1, "Enums");
        bad.slug = "enumerations".into();
        assert!(TopicRegistry::from_entries(vec![bad]).is_err());
    }

    #[test]
    fn width_tracks_count() {
        let titles: Vec<String> = (1..=100).map(|i| format!("Topic {i}")).collect();
        let reg = TopicRegistry::from_titles(&titles).unwrap();
        assert_eq!(reg.width(), 3);
        assert_eq!(reg.file_name(reg.get(7).unwrap()), "007-topic-7.md");

        let small = TopicRegistry::from_titles(&titles[..94]).unwrap();
        assert_eq!(small.width(), 2);
        assert_eq!(small.file_name(small.get(7).unwrap()), "07-topic-7.md");
    }

    #[test]
    fn find_by_slug_hits_and_misses() {
        let reg = TopicRegistry::from_titles(&["Enums", "Generics"]).unwrap();
        assert_eq!(reg.find_by_slug("generics").unwrap().order, 2);
        assert!(reg.find_by_slug("decorators").is_none());
    }

    #[test]
    fn plain_list_strips_markers_and_comments() {
        let list = parse_plain_list("# header\n\n1. Enums\n2) Generics\n- Decorators\n* Mixins\nModules\n");
        assert_eq!(
            list.topics,
            vec!["Enums", "Generics", "Decorators", "Mixins", "Modules"]
        );
    }

    #[test]
    fn plain_list_keeps_leading_numbers_in_titles() {
        let list = parse_plain_list("5.0 Decorators\n2022 Features\n");
        assert_eq!(list.topics, vec!["5.0 Decorators", "2022 Features"]);
    }

    #[test]
    fn load_topic_list_from_fixtures() {
        let toml_list =
            load_topic_list(Path::new("../../../fixtures/topics/typescript.toml")).unwrap();
        let txt_list =
            load_topic_list(Path::new("../../../fixtures/topics/typescript.txt")).unwrap();

        assert_eq!(toml_list.title.as_deref(), Some("TypeScript Interview Prep"));
        assert_eq!(toml_list.topics, txt_list.topics);
    }

    #[test]
    fn load_topic_list_json() {
        let dir = std::env::temp_dir().join(format!("kbindex-registry-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("topics.json");
        std::fs::write(&path, r#"{"context": "Rust", "topics": ["Ownership", "Lifetimes"]}"#)
            .unwrap();

        let list = load_topic_list(&path).unwrap();
        assert_eq!(list.context.as_deref(), Some("Rust"));
        assert_eq!(list.topics.len(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_topic_list_reports_bad_toml() {
        let dir = std::env::temp_dir().join(format!("kbindex-registry-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("topics.toml");
        std::fs::write(&path, "topics = [\"unterminated").unwrap();

        let err = load_topic_list(&path).unwrap_err();
        assert!(matches!(err, KbIndexError::Parse { .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
