//! End-to-end `generate` pipeline: topic list → registry → render → assemble.

use std::path::PathBuf;
use std::time::Instant;

use chrono::NaiveDate;
use tracing::{info, instrument};

use kbindex_shared::{DefaultsConfig, KbIndexError, Result, TopicList};

use crate::assembler::{self, AssembleConfig, IndexStatus};
use crate::registry::{TopicRegistry, load_topic_list};
use crate::render::IndexMeta;

/// Configuration for the `generate` pipeline.
///
/// `Option` fields are overrides; `None` falls back to the topic file's
/// metadata, then to `defaults`.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    /// Topic list to read (`.toml`, `.json`, or plain text).
    pub topics_path: PathBuf,
    /// Directory receiving the index.
    pub out_dir: PathBuf,
    pub title: Option<String>,
    pub context: Option<String>,
    pub generator: Option<String>,
    pub topic_noun: Option<String>,
    pub index_file: Option<String>,
    /// Date printed in banner and footer.
    pub generated_on: NaiveDate,
    pub scaffold: bool,
    pub prune: bool,
    /// Tool version string.
    pub tool_version: String,
    /// Config-file defaults.
    pub defaults: DefaultsConfig,
}

/// Result of the `generate` pipeline.
#[derive(Debug)]
pub struct GenerateResult {
    pub index_path: PathBuf,
    pub index_status: IndexStatus,
    pub topic_count: usize,
    pub stubs_created: usize,
    pub stale_files: Vec<PathBuf>,
    pub pruned: usize,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, result: &GenerateResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _result: &GenerateResult) {}
}

/// Run the full `generate` pipeline.
///
/// 1. Load the topic list
/// 2. Build and validate the registry
/// 3. Resolve document metadata
/// 4. Render and assemble the output directory
#[instrument(skip_all, fields(topics = %config.topics_path.display(), out = %config.out_dir.display()))]
pub fn generate(
    config: &GenerateConfig,
    progress: &dyn ProgressReporter,
) -> Result<GenerateResult> {
    let start = Instant::now();

    progress.phase("Loading topic list");
    let list = load_topic_list(&config.topics_path)?;

    progress.phase("Validating topics");
    let registry = TopicRegistry::from_titles(&list.topics)?;
    let meta = resolve_meta(config, &list)?;

    info!(
        topics = registry.len(),
        title = %meta.title,
        generator = %meta.generator,
        date = %meta.generated_on,
        "generating index"
    );

    progress.phase("Writing index");
    let assemble_config = AssembleConfig {
        out_dir: config.out_dir.clone(),
        index_file: config
            .index_file
            .clone()
            .unwrap_or_else(|| config.defaults.index_file.clone()),
        tool_version: config.tool_version.clone(),
        scaffold: config.scaffold,
        prune: config.prune,
    };
    let assembled = assembler::assemble(&assemble_config, &meta, &registry)?;

    let result = GenerateResult {
        index_path: assembled.index_path,
        index_status: assembled.index_status,
        topic_count: registry.len(),
        stubs_created: assembled.stubs_created.len(),
        stale_files: assembled.stale_files,
        pruned: assembled.pruned,
        elapsed: start.elapsed(),
    };

    progress.done(&result);
    Ok(result)
}

/// Merge CLI overrides, topic-file metadata and config defaults.
///
/// Title and context fall back to each other; at least one must be set.
pub fn resolve_meta(config: &GenerateConfig, list: &TopicList) -> Result<IndexMeta> {
    let pick = |cli: &Option<String>, file: &Option<String>| {
        [cli, file]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .map(str::to_string)
    };

    let title = pick(&config.title, &list.title);
    let context = pick(&config.context, &list.context);
    let (title, context) = match (title, context) {
        (Some(t), Some(c)) => (t, c),
        (Some(t), None) => (t.clone(), t),
        (None, Some(c)) => (c.clone(), c),
        (None, None) => {
            return Err(KbIndexError::config(
                "no title or context given; set one in the topic file or pass --title/--context",
            ));
        }
    };

    Ok(IndexMeta {
        title,
        context,
        generator: pick(&config.generator, &list.generator)
            .unwrap_or_else(|| config.defaults.generator.clone()),
        generated_on: config.generated_on,
        topic_noun: pick(&config.topic_noun, &list.topic_noun)
            .unwrap_or_else(|| config.defaults.topic_noun.clone()),
    })
}
