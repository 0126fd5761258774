//! Core domain types for kbindex topic indexes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Current schema version for the index manifest format.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// TopicEntry
// ---------------------------------------------------------------------------

/// One numbered line item in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicEntry {
    /// 1-based position in the index.
    pub order: u32,
    /// Display title, rendered verbatim as the link text.
    pub title: String,
    /// Filename-safe identifier derived from the title.
    pub slug: String,
}

// ---------------------------------------------------------------------------
// TopicList
// ---------------------------------------------------------------------------

/// Input document describing what to generate.
///
/// Metadata fields are optional so a bare list of titles is enough; the CLI
/// and config fill in whatever is missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicList {
    /// Document heading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Subject named on the `**Context:**` line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Generator credited in banner and footer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
    /// Noun used in the section heading count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_noun: Option<String>,
    /// Topic titles in index order.
    #[serde(default)]
    pub topics: Vec<String>,
}

// ---------------------------------------------------------------------------
// IndexManifest
// ---------------------------------------------------------------------------

/// The `manifest.json` written next to the rendered index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexManifest {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    /// Generator credited in the index.
    pub generator: String,
    /// Tool version that wrote this manifest.
    pub tool_version: String,
    /// Date printed in the banner and footer.
    pub generated_on: NaiveDate,
    /// Index file name relative to the manifest.
    pub index_file: String,
    /// SHA-256 of the rendered index bytes.
    pub index_sha256: String,
    /// Number of topics listed.
    pub topic_count: usize,
    /// Per-topic link records, in order.
    pub topics: Vec<TopicRecord>,
}

/// A single topic as recorded in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRecord {
    pub order: u32,
    pub title: String,
    pub slug: String,
    /// Link target file name, e.g. `01-type-inference.md`.
    pub file: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_list_minimal_toml() {
        let parsed: TopicList = toml::from_str(r#"topics = ["Generics", "Enums"]"#)
            .expect("parse minimal topic list");
        assert!(parsed.title.is_none());
        assert_eq!(parsed.topics.len(), 2);
    }

    #[test]
    fn manifest_serialization() {
        let manifest = IndexManifest {
            schema_version: CURRENT_SCHEMA_VERSION,
            generator: "KB Builder".into(),
            tool_version: "0.1.0".into(),
            generated_on: NaiveDate::from_ymd_opt(2025, 11, 30).expect("valid date"),
            index_file: "README.md".into(),
            index_sha256: "ab".repeat(32),
            topic_count: 1,
            topics: vec![TopicRecord {
                order: 1,
                title: "Generics".into(),
                slug: "generics".into(),
                file: "01-generics.md".into(),
            }],
        };

        let json = serde_json::to_string_pretty(&manifest).expect("serialize");
        assert!(json.contains("\"generated_on\": \"2025-11-30\""));
        let parsed: IndexManifest = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(parsed.topics[0].file, "01-generics.md");
    }

    #[test]
    fn topic_list_fixture_validates() {
        let fixture = std::fs::read_to_string("../../../fixtures/topics/typescript.toml")
            .expect("read fixture");
        let parsed: TopicList = toml::from_str(&fixture).expect("deserialize fixture");
        assert_eq!(parsed.context.as_deref(), Some("TypeScript"));
        assert_eq!(parsed.topics.len(), 5);
    }
}
