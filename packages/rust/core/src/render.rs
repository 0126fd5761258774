//! Index renderer.
//!
//! Formats a [`TopicRegistry`] into the Markdown table of contents. Output
//! depends only on the inputs, so rendering the same registry with the same
//! metadata twice yields identical bytes.

use std::fmt;

use chrono::NaiveDate;
use tracing::{debug, instrument};

use kbindex_shared::TopicEntry;

use crate::registry::TopicRegistry;

/// Date format used in the banner and footer.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Document-level metadata printed around the topic list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMeta {
    /// Top-level heading.
    pub title: String,
    /// Subject named on the `**Context:**` line.
    pub context: String,
    /// Generator credited in banner and footer.
    pub generator: String,
    /// Date printed in banner and footer.
    pub generated_on: NaiveDate,
    /// Noun in the section heading, e.g. "Deep Dives".
    pub topic_noun: String,
}

/// Render the full index document.
#[instrument(skip_all, fields(title = %meta.title, topics = registry.len()))]
pub fn render_index(meta: &IndexMeta, registry: &TopicRegistry) -> String {
    let out = IndexDocument { meta, registry }.to_string();
    debug!(bytes = out.len(), "index rendered");
    out
}

/// Borrowed view of a whole index, formatted through [`fmt::Display`].
struct IndexDocument<'a> {
    meta: &'a IndexMeta,
    registry: &'a TopicRegistry,
}

impl fmt::Display for IndexDocument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meta = self.meta;
        let date = meta.generated_on.format(DATE_FORMAT);
        let generator = meta.generator.trim();

        writeln!(f, "# {}", meta.title.trim())?;
        writeln!(f)?;
        writeln!(f, "> Generated on {date} by {generator}")?;
        writeln!(f)?;
        writeln!(f, "**Context:** {}", meta.context.trim())?;
        writeln!(f)?;
        writeln!(
            f,
            "## Available Topics ({} {})",
            self.registry.len(),
            meta.topic_noun.trim()
        )?;
        writeln!(f)?;

        for entry in self.registry.entries() {
            writeln!(f, "{}", render_entry_line(self.registry, entry))?;
        }

        writeln!(f)?;
        writeln!(f, "---")?;
        writeln!(f)?;
        writeln!(f, "*Last updated: {date} by {generator}*")
    }
}

/// Render one list item, e.g. `3. [Generics](./03-generics.md)`.
pub fn render_entry_line(registry: &TopicRegistry, entry: &TopicEntry) -> String {
    format!(
        "{}. [{}](./{})",
        entry.order,
        escape_link_text(&entry.title),
        registry.file_name(entry)
    )
}

/// Escape characters that would end the link text early.
pub fn escape_link_text(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for ch in title.chars() {
        if matches!(ch, '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Inverse of [`escape_link_text`].
pub fn unescape_link_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(next @ ('[' | ']' | '\\')) => out.push(next),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> IndexMeta {
        IndexMeta {
            title: "TypeScript Interview Prep".into(),
            context: "TypeScript".into(),
            generator: "KB Builder".into(),
            generated_on: NaiveDate::from_ymd_opt(2025, 11, 30).unwrap(),
            topic_noun: "Deep Dives".into(),
        }
    }

    fn fixture_registry() -> TopicRegistry {
        TopicRegistry::from_titles(&[
            "Type Inference and Annotations",
            "Interfaces vs Type Aliases",
            "Generics: Constraints & Defaults",
            "Utility Types (Partial, Pick, Omit)",
            "Basic Types: string, number, boolean, null, undefined, symbol, bigint",
        ])
        .unwrap()
    }

    #[test]
    fn render_matches_golden_fixture() {
        let expected = std::fs::read_to_string("../../../fixtures/index/typescript.md")
            .expect("read fixture");
        assert_eq!(render_index(&meta(), &fixture_registry()), expected);
    }

    #[test]
    fn render_is_deterministic() {
        let a = render_index(&meta(), &fixture_registry());
        let b = render_index(&meta(), &fixture_registry());
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn entry_at_order_32() {
        let mut titles: Vec<String> = (1..=31).map(|i| format!("Filler Topic {i}")).collect();
        titles.push("Basic Types: string, number, boolean, null, undefined, symbol, bigint".into());
        titles.extend((33..=94).map(|i| format!("Filler Topic {i}")));
        let reg = TopicRegistry::from_titles(&titles).unwrap();

        let line = render_entry_line(&reg, reg.get(32).unwrap());
        assert_eq!(
            line,
            "32. [Basic Types: string, number, boolean, null, undefined, symbol, bigint](./32-basic-types-string-number-boolean-null-undefined-symbol-bigint.md)"
        );

        let doc = render_index(&meta(), &reg);
        assert!(doc.contains("## Available Topics (94 Deep Dives)\n"));
        assert!(doc.contains(&format!("\n{line}\n")));
    }

    #[test]
    fn heading_count_matches_entries() {
        let reg = fixture_registry();
        let doc = render_index(&meta(), &reg);
        let items = doc
            .lines()
            .filter(|l| l.split_once(". [").is_some_and(|(n, _)| n.parse::<u32>().is_ok()))
            .count();
        assert_eq!(items, reg.len());
        assert!(doc.contains(&format!("({} Deep Dives)", reg.len())));
    }

    #[test]
    fn banner_and_footer_share_date_and_generator() {
        let doc = render_index(&meta(), &fixture_registry());
        assert!(doc.contains("> Generated on 2025-11-30 by KB Builder\n"));
        assert!(doc.ends_with("*Last updated: 2025-11-30 by KB Builder*\n"));
    }

    #[test]
    fn wide_registry_pads_three_digits() {
        let titles: Vec<String> = (1..=120).map(|i| format!("Topic {i}")).collect();
        let reg = TopicRegistry::from_titles(&titles).unwrap();
        let doc = render_index(&meta(), &reg);
        assert!(doc.contains("\n1. [Topic 1](./001-topic-1.md)\n"));
        assert!(doc.contains("\n120. [Topic 120](./120-topic-120.md)\n"));
    }

    #[test]
    fn brackets_in_titles_are_escaped() {
        let reg = TopicRegistry::from_titles(&["Index Signatures [key: string]"]).unwrap();
        let line = render_entry_line(&reg, reg.get(1).unwrap());
        assert_eq!(
            line,
            r"1. [Index Signatures \[key: string\]](./01-index-signatures-key-string.md)"
        );
        assert_eq!(
            unescape_link_text(r"Index Signatures \[key: string\]"),
            "Index Signatures [key: string]"
        );
    }

    #[test]
    fn unescape_leaves_other_backslashes() {
        assert_eq!(unescape_link_text(r"a\nb"), r"a\nb");
        assert_eq!(unescape_link_text("trailing\\"), "trailing\\");
    }
}
