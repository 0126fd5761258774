//! Consistency checks for an existing index document.
//!
//! Verifies that a parsed index still satisfies the properties the renderer
//! guarantees: contiguous orders, link targets derived from titles, a
//! heading count that matches the list, unique slugs, and a footer that
//! agrees with the banner.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use tracing::{debug, instrument, warn};

use crate::parse::{ParsedIndex, Stamp};
use crate::render::DATE_FORMAT;
use crate::slug::{number_width, slugify, topic_file_name};

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// A single finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: Severity,
    /// Source line, when the finding is tied to one.
    pub line: Option<usize>,
    pub message: String,
}

impl Issue {
    fn error(line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            line,
            message: message.into(),
        }
    }

    fn warning(line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        match self.line {
            Some(line) => write!(f, "{level}: line {line}: {}", self.message),
            None => write!(f, "{level}: {}", self.message),
        }
    }
}

/// Outcome of [`check_index`].
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub entries_checked: usize,
    pub issues: Vec<Issue>,
}

impl CheckReport {
    /// True when no error-level issue was found.
    pub fn is_ok(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }
}

/// Check a parsed index. When `docs_dir` is given, linked topic files are
/// also looked up on disk.
#[instrument(skip_all, fields(entries = index.entries.len()))]
pub fn check_index(index: &ParsedIndex, docs_dir: Option<&Path>) -> CheckReport {
    let mut issues = Vec::new();

    for bad in &index.malformed {
        issues.push(Issue::error(
            Some(bad.line),
            format!("list item is not a `N. [Title](./NN-slug.md)` link: {:?}", bad.text),
        ));
    }

    if index.stated_count != index.entries.len() {
        issues.push(Issue::error(
            None,
            format!(
                "heading states {} topics but the list has {}",
                index.stated_count,
                index.entries.len()
            ),
        ));
    }

    let width = number_width(index.entries.len());
    let mut prev_order = 0u32;
    let mut seen: HashMap<String, u32> = HashMap::new();

    for entry in &index.entries {
        let line = Some(entry.line);

        if entry.order != prev_order.saturating_add(1) {
            issues.push(Issue::error(
                line,
                format!(
                    "order {} follows {prev_order}; expected {}",
                    entry.order,
                    prev_order.saturating_add(1)
                ),
            ));
        }
        prev_order = entry.order;

        let slug = slugify(&entry.title);
        if slug.is_empty() {
            issues.push(Issue::error(
                line,
                format!("title {:?} yields an empty slug", entry.title),
            ));
            continue;
        }

        let expected = format!("./{}", topic_file_name(entry.order, &slug, width));
        if entry.target != expected {
            issues.push(Issue::error(
                line,
                format!("link target {:?} should be {expected:?}", entry.target),
            ));
        }

        if let Some(first) = seen.get(&slug) {
            issues.push(Issue::error(
                line,
                format!(
                    "slug {slug:?} of topic {} duplicates topic {first}",
                    entry.order
                ),
            ));
        } else {
            seen.insert(slug, entry.order);
        }

        if let Some(dir) = docs_dir {
            let file = dir.join(ParsedIndex::file_of(entry));
            if !file.exists() {
                issues.push(Issue::warning(
                    line,
                    format!("linked file {} does not exist", file.display()),
                ));
            }
        }
    }

    match &index.footer {
        None => issues.push(Issue::warning(None, "missing `*Last updated: ...*` footer")),
        Some(footer) if footer != &index.banner => issues.push(Issue::error(
            None,
            format!(
                "footer says {} but banner says {}",
                describe(footer),
                describe(&index.banner)
            ),
        )),
        Some(_) => {}
    }

    if index.context.is_none() {
        issues.push(Issue::warning(None, "missing `**Context:**` line"));
    }

    let report = CheckReport {
        entries_checked: index.entries.len(),
        issues,
    };

    if report.is_ok() {
        debug!(warnings = report.warnings().count(), "index check passed");
    } else {
        warn!(errors = report.errors().count(), "index check found errors");
    }

    report
}

fn describe(stamp: &Stamp) -> String {
    format!("{} by {}", stamp.date.format(DATE_FORMAT), stamp.generator)
}
