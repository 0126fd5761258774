//! Read an existing index document back into its parts.
//!
//! Parsing is lenient about the list itself (every candidate line is kept,
//! well-formed or not) so that [`crate::check`] can report each problem
//! instead of stopping at the first one. The document skeleton (heading,
//! banner, section heading) is required.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::{debug, instrument};

use kbindex_shared::{KbIndexError, Result};

use crate::render::{DATE_FORMAT, unescape_link_text};

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#\s+(.+?)\s*$").expect("valid regex"));
static BANNER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^>\s*Generated on\s+(\S+)\s+by\s+(.+?)\s*$").expect("valid regex"));
static CONTEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*\*Context:\*\*\s*(.*?)\s*$").expect("valid regex"));
static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^##\s+Available Topics\s+\((\d+)\s+(.+?)\)\s*$").expect("valid regex")
});
static ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.\s+\[(.*)\]\((\S+)\)\s*$").expect("valid regex")
});
static LIST_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s").expect("valid regex"));
static FOOTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\*Last updated:\s*(\S+)\s+by\s+(.+?)\*\s*$").expect("valid regex")
});

/// `<date> by <generator>` as printed in banner and footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    pub date: NaiveDate,
    pub generator: String,
}

/// One list item as it appears in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEntry {
    /// 1-based line number in the source document.
    pub line: usize,
    pub order: u32,
    /// Link text with escapes removed.
    pub title: String,
    /// Link target as written, e.g. `./03-generics.md`.
    pub target: String,
}

/// A list line that looks like an item but is not a `N. [Title](target)` link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedLine {
    pub line: usize,
    pub text: String,
}

/// Structured view of an index document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedIndex {
    pub title: String,
    pub banner: Stamp,
    pub context: Option<String>,
    /// Count stated in the section heading.
    pub stated_count: usize,
    pub topic_noun: String,
    pub entries: Vec<ParsedEntry>,
    pub malformed: Vec<MalformedLine>,
    pub footer: Option<Stamp>,
}

impl ParsedIndex {
    /// Link target with the leading `./` removed.
    pub fn file_of(entry: &ParsedEntry) -> &str {
        entry.target.strip_prefix("./").unwrap_or(&entry.target)
    }
}

/// Parse an index document.
#[instrument(skip_all, fields(bytes = markdown.len()))]
pub fn parse_index(markdown: &str) -> Result<ParsedIndex> {
    let mut title = None;
    let mut banner = None;
    let mut context = None;
    let mut section: Option<(usize, String)> = None;
    let mut entries = Vec::new();
    let mut malformed = Vec::new();
    let mut footer = None;
    let mut in_list = false;

    for (idx, raw) in markdown.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end();

        if in_list {
            if line.trim() == "---" || line.starts_with('#') {
                in_list = false;
            } else if let Some(caps) = ENTRY_RE.captures(line) {
                let order = caps[1].parse::<u32>().map_err(|e| {
                    KbIndexError::parse(format!("line {line_no}: bad order {:?}: {e}", &caps[1]))
                })?;
                entries.push(ParsedEntry {
                    line: line_no,
                    order,
                    title: unescape_link_text(&caps[2]),
                    target: caps[3].to_string(),
                });
                continue;
            } else if LIST_ITEM_RE.is_match(line) {
                malformed.push(MalformedLine {
                    line: line_no,
                    text: line.to_string(),
                });
                continue;
            } else {
                continue;
            }
        }

        if title.is_none() && !line.starts_with("##") {
            if let Some(caps) = HEADING_RE.captures(line) {
                title = Some(caps[1].to_string());
                continue;
            }
        }
        if banner.is_none() {
            if let Some(caps) = BANNER_RE.captures(line) {
                banner = Some(parse_stamp(&caps[1], &caps[2], line_no)?);
                continue;
            }
        }
        if context.is_none() {
            if let Some(caps) = CONTEXT_RE.captures(line) {
                context = Some(caps[1].to_string());
                continue;
            }
        }
        if section.is_none() {
            if let Some(caps) = SECTION_RE.captures(line) {
                let count = caps[1].parse::<usize>().map_err(|e| {
                    KbIndexError::parse(format!("line {line_no}: bad topic count: {e}"))
                })?;
                section = Some((count, caps[2].to_string()));
                in_list = true;
                continue;
            }
        }
        if let Some(caps) = FOOTER_RE.captures(line) {
            footer = Some(parse_stamp(&caps[1], &caps[2], line_no)?);
        }
    }

    let title = title.ok_or_else(|| KbIndexError::parse("missing `# <title>` heading"))?;
    let banner =
        banner.ok_or_else(|| KbIndexError::parse("missing `> Generated on <date> by <generator>` banner"))?;
    let (stated_count, topic_noun) = section
        .ok_or_else(|| KbIndexError::parse("missing `## Available Topics (<n> <noun>)` heading"))?;

    debug!(
        entries = entries.len(),
        malformed = malformed.len(),
        has_footer = footer.is_some(),
        "index parsed"
    );

    Ok(ParsedIndex {
        title,
        banner,
        context,
        stated_count,
        topic_noun,
        entries,
        malformed,
        footer,
    })
}

fn parse_stamp(date: &str, generator: &str, line_no: usize) -> Result<Stamp> {
    let date = NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|e| {
        KbIndexError::parse(format!("line {line_no}: bad date {date:?}: {e}"))
    })?;
    Ok(Stamp {
        date,
        generator: generator.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("../../../fixtures/index/{name}")).expect("read fixture")
    }

    #[test]
    fn parses_golden_fixture() {
        let parsed = parse_index(&fixture("typescript.md")).unwrap();
        assert_eq!(parsed.title, "TypeScript Interview Prep");
        assert_eq!(parsed.banner.generator, "KB Builder");
        assert_eq!(parsed.banner.date, NaiveDate::from_ymd_opt(2025, 11, 30).unwrap());
        assert_eq!(parsed.context.as_deref(), Some("TypeScript"));
        assert_eq!(parsed.stated_count, 5);
        assert_eq!(parsed.topic_noun, "Deep Dives");
        assert_eq!(parsed.entries.len(), 5);
        assert!(parsed.malformed.is_empty());
        assert_eq!(parsed.footer.as_ref(), Some(&parsed.banner));

        let third = &parsed.entries[2];
        assert_eq!(third.order, 3);
        assert_eq!(third.title, "Generics: Constraints & Defaults");
        assert_eq!(ParsedIndex::file_of(third), "03-generics-constraints-defaults.md");
        assert_eq!(third.line, 11);
    }

    #[test]
    fn keeps_bad_entries_for_checking() {
        let parsed = parse_index(&fixture("broken.md")).unwrap();
        assert_eq!(parsed.stated_count, 4);
        assert_eq!(parsed.entries.len(), 5);
        let orders: Vec<u32> = parsed.entries.iter().map(|e| e.order).collect();
        assert_eq!(orders, vec![1, 3, 4, 5, 6]);
        assert_eq!(
            parsed.footer.unwrap().date,
            NaiveDate::from_ymd_opt(2025, 12, 1).unwrap()
        );
    }

    #[test]
    fn collects_malformed_list_lines() {
        let doc = "# T\n\n> Generated on 2025-01-02 by KB Builder\n\n## Available Topics (2 Deep Dives)\n\n1. [Ok](./01-ok.md)\n2. Missing link\n\n---\n";
        let parsed = parse_index(doc).unwrap();
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.malformed.len(), 1);
        assert_eq!(parsed.malformed[0].line, 8);
        assert!(parsed.footer.is_none());
        assert!(parsed.context.is_none());
    }

    #[test]
    fn unescapes_titles() {
        let doc = "# T\n> Generated on 2025-01-02 by X\n## Available Topics (1 Notes)\n1. [Index \\[k\\]](./01-index-k.md)\n";
        let parsed = parse_index(doc).unwrap();
        assert_eq!(parsed.entries[0].title, "Index [k]");
    }

    #[test]
    fn missing_banner_is_an_error() {
        let err = parse_index("# T\n\n## Available Topics (0 Deep Dives)\n").unwrap_err();
        assert!(err.to_string().contains("banner"));
    }

    #[test]
    fn missing_section_is_an_error() {
        let err = parse_index("# T\n> Generated on 2025-01-02 by X\n").unwrap_err();
        assert!(err.to_string().contains("Available Topics"));
    }

    #[test]
    fn bad_banner_date_is_an_error() {
        let err = parse_index("# T\n> Generated on 2025-13-40 by X\n## Available Topics (0 X)\n")
            .unwrap_err();
        assert!(matches!(err, KbIndexError::Parse { .. }));
    }
}
