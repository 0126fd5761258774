//! Output directory assembler.
//!
//! Takes a validated registry and its rendered index, then writes the index,
//! its manifest, and (optionally) stub topic files to disk.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use kbindex_shared::{
    CURRENT_SCHEMA_VERSION, IndexManifest, KbIndexError, Result, TopicRecord,
};

use crate::registry::TopicRegistry;
use crate::render::{IndexMeta, render_index};

/// Manifest file written next to the index.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Matches file names shaped like topic documents (`NN-slug.md`).
static TOPIC_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+-[a-z0-9]+(?:-[a-z0-9]+)*\.md$").expect("valid regex"));

/// Configuration for output assembly.
#[derive(Debug, Clone)]
pub struct AssembleConfig {
    /// Directory receiving the index, manifest and topic files.
    pub out_dir: PathBuf,
    /// Index file name inside `out_dir`.
    pub index_file: String,
    /// Tool version string recorded in the manifest.
    pub tool_version: String,
    /// Create `# Title` stubs for topics without a file.
    pub scaffold: bool,
    /// Delete stale stubs the index no longer links to.
    pub prune: bool,
}

/// What happened to the index file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    Created,
    Updated,
    /// Existing file was byte-identical; nothing written.
    Unchanged,
}

impl std::fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        })
    }
}

/// Output from a successful assembly.
#[derive(Debug, Clone)]
pub struct AssembleResult {
    pub index_path: PathBuf,
    pub index_status: IndexStatus,
    /// The manifest that was written.
    pub manifest: IndexManifest,
    /// Stub topic files created during this run.
    pub stubs_created: Vec<PathBuf>,
    /// Files the previous manifest linked that the index no longer does.
    pub stale_files: Vec<PathBuf>,
    /// How many of `stale_files` were deleted.
    pub pruned: usize,
}

/// Render and write the index directory.
///
/// Layout:
/// ```text
/// <out_dir>/
/// ├── README.md          (index, regenerated in full)
/// ├── manifest.json
/// ├── 01-first-topic.md  (stub, only if missing)
/// └── ...
/// ```
#[instrument(skip_all, fields(out_dir = %config.out_dir.display(), topics = registry.len()))]
pub fn assemble(
    config: &AssembleConfig,
    meta: &IndexMeta,
    registry: &TopicRegistry,
) -> Result<AssembleResult> {
    validate_index_file(&config.index_file)?;
    if let Some(entry) = registry
        .entries()
        .iter()
        .find(|e| registry.file_name(e) == config.index_file)
    {
        return Err(KbIndexError::validation(format!(
            "index file {:?} is the link target of topic {}",
            config.index_file, entry.order
        )));
    }

    std::fs::create_dir_all(&config.out_dir)
        .map_err(|e| KbIndexError::io(&config.out_dir, e))?;

    let previous = previous_manifest(&config.out_dir);

    let rendered = render_index(meta, registry);
    let index_path = config.out_dir.join(&config.index_file);
    let index_status = write_if_changed(&index_path, &rendered)?;

    let manifest = build_manifest(config, meta, registry, &rendered);
    write_json(&config.out_dir.join(MANIFEST_FILE), &manifest)?;

    let stubs_created = if config.scaffold {
        write_stubs(&config.out_dir, registry)?
    } else {
        Vec::new()
    };

    let stale = find_stale_files(&config.out_dir, previous.as_ref(), registry);
    let mut pruned = 0;
    if config.prune {
        for (path, record) in &stale {
            if !is_untouched_stub(path, &record.title)? {
                warn!(path = %path.display(), "stale topic file has edits, keeping it");
                continue;
            }
            std::fs::remove_file(path).map_err(|e| KbIndexError::io(path, e))?;
            debug!(path = %path.display(), "pruned stale stub");
            pruned += 1;
        }
    } else if !stale.is_empty() {
        warn!(
            count = stale.len(),
            "topic files no longer linked from the index (use --prune to remove stubs)"
        );
    }
    let stale_files: Vec<PathBuf> = stale.into_iter().map(|(path, _)| path).collect();

    info!(
        path = %index_path.display(),
        status = %index_status,
        stubs = stubs_created.len(),
        stale = stale_files.len(),
        pruned,
        "index assembly complete"
    );

    Ok(AssembleResult {
        index_path,
        index_status,
        manifest,
        stubs_created,
        stale_files,
        pruned,
    })
}

/// Check that an index file name stays inside the output directory and
/// cannot collide with the manifest or a topic document.
pub fn validate_index_file(name: &str) -> Result<()> {
    let is_plain = !name.trim().is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.chars().any(char::is_control);
    if !is_plain {
        return Err(KbIndexError::validation(format!(
            "index file must be a plain file name, got {name:?}"
        )));
    }
    if name == MANIFEST_FILE {
        return Err(KbIndexError::validation(format!(
            "index file cannot be named {MANIFEST_FILE}"
        )));
    }
    if TOPIC_FILE_RE.is_match(name) {
        return Err(KbIndexError::validation(format!(
            "index file {name:?} is shaped like a topic document (NN-slug.md)"
        )));
    }
    Ok(())
}

/// Read `manifest.json` from an output directory.
pub fn load_manifest(out_dir: &Path) -> Result<IndexManifest> {
    let path = out_dir.join(MANIFEST_FILE);
    let content = std::fs::read_to_string(&path).map_err(|e| KbIndexError::io(&path, e))?;
    let manifest: IndexManifest = serde_json::from_str(&content)
        .map_err(|e| KbIndexError::validation(format!("invalid {MANIFEST_FILE}: {e}")))?;

    if manifest.schema_version != CURRENT_SCHEMA_VERSION {
        return Err(KbIndexError::validation(format!(
            "unsupported schema_version: {} (expected {})",
            manifest.schema_version, CURRENT_SCHEMA_VERSION
        )));
    }

    Ok(manifest)
}

/// Verify a specific index file against the manifest in its directory.
///
/// Fails when the manifest describes a different index file.
pub fn validate_index_file_against_manifest(index_path: &Path) -> Result<IndexManifest> {
    let name = index_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            KbIndexError::validation(format!("bad index path {}", index_path.display()))
        })?;
    let dir = match index_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let manifest = load_manifest(dir)?;
    if manifest.index_file != name {
        return Err(KbIndexError::validation(format!(
            "{MANIFEST_FILE} in {} describes {:?}, not {name:?}",
            dir.display(),
            manifest.index_file
        )));
    }

    validate_output(dir)
}

/// Verify that an output directory's index still matches its manifest.
pub fn validate_output(out_dir: &Path) -> Result<IndexManifest> {
    let manifest = load_manifest(out_dir)?;

    let index_path = out_dir.join(&manifest.index_file);
    if !index_path.exists() {
        return Err(KbIndexError::validation(format!(
            "missing index file {}",
            manifest.index_file
        )));
    }

    let content =
        std::fs::read_to_string(&index_path).map_err(|e| KbIndexError::io(&index_path, e))?;
    let hash = sha256_hex(&content);
    if hash != manifest.index_sha256 {
        return Err(KbIndexError::validation(format!(
            "{} was edited by hand (sha256 {hash} does not match manifest)",
            manifest.index_file
        )));
    }

    if manifest.topics.len() != manifest.topic_count {
        return Err(KbIndexError::validation(format!(
            "manifest lists {} topics but topic_count is {}",
            manifest.topics.len(),
            manifest.topic_count
        )));
    }

    Ok(manifest)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_manifest(
    config: &AssembleConfig,
    meta: &IndexMeta,
    registry: &TopicRegistry,
    rendered: &str,
) -> IndexManifest {
    IndexManifest {
        schema_version: CURRENT_SCHEMA_VERSION,
        generator: meta.generator.trim().to_string(),
        tool_version: config.tool_version.clone(),
        generated_on: meta.generated_on,
        index_file: config.index_file.clone(),
        index_sha256: sha256_hex(rendered),
        topic_count: registry.len(),
        topics: registry
            .entries()
            .iter()
            .map(|e| TopicRecord {
                order: e.order,
                title: e.title.clone(),
                slug: e.slug.clone(),
                file: registry.file_name(e),
            })
            .collect(),
    }
}

fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Write `content` atomically unless the file already holds exactly it.
fn write_if_changed(path: &Path, content: &str) -> Result<IndexStatus> {
    let status = match std::fs::read(path) {
        Ok(existing) if existing == content.as_bytes() => {
            debug!(path = %path.display(), "content unchanged, skipping write");
            return Ok(IndexStatus::Unchanged);
        }
        Ok(_) => IndexStatus::Updated,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => IndexStatus::Created,
        Err(e) => return Err(KbIndexError::io(path, e)),
    };

    write_atomic(path, content)?;
    Ok(status)
}

/// Write to a hidden temp file in the same directory, then rename over the target.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| KbIndexError::validation(format!("bad output path {}", path.display())))?;
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, content).map_err(|e| KbIndexError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| KbIndexError::io(path, e))?;

    debug!(path = %path.display(), bytes = content.len(), "wrote file");
    Ok(())
}

/// Write a JSON file (pretty-printed, trailing newline).
fn write_json<T: serde::Serialize>(path: &Path, data: &T) -> Result<()> {
    let mut json = serde_json::to_string_pretty(data).map_err(|e| {
        KbIndexError::validation(format!("JSON serialization failed: {e}"))
    })?;
    json.push('\n');
    write_atomic(path, &json)
}

fn write_stubs(out_dir: &Path, registry: &TopicRegistry) -> Result<Vec<PathBuf>> {
    let mut created = Vec::new();
    for entry in registry.entries() {
        let path = out_dir.join(registry.file_name(entry));
        if path.exists() {
            continue;
        }
        std::fs::write(&path, stub_content(&entry.title))
            .map_err(|e| KbIndexError::io(&path, e))?;
        debug!(path = %path.display(), title = %entry.title, "created stub");
        created.push(path);
    }
    Ok(created)
}

fn stub_content(title: &str) -> String {
    format!("# {title}\n")
}

/// Manifest from the previous run, if there is a readable one.
fn previous_manifest(out_dir: &Path) -> Option<IndexManifest> {
    if !out_dir.join(MANIFEST_FILE).exists() {
        return None;
    }
    match load_manifest(out_dir) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            warn!(error = %e, "ignoring unreadable previous manifest; no stale files tracked");
            None
        }
    }
}

/// Files the previous manifest linked that still exist but are no longer
/// linked, sorted by path.
fn find_stale_files(
    out_dir: &Path,
    previous: Option<&IndexManifest>,
    registry: &TopicRegistry,
) -> Vec<(PathBuf, TopicRecord)> {
    let Some(previous) = previous else {
        return Vec::new();
    };

    let linked: HashSet<String> = registry
        .entries()
        .iter()
        .map(|e| registry.file_name(e))
        .collect();

    let mut stale: Vec<(PathBuf, TopicRecord)> = previous
        .topics
        .iter()
        .filter(|r| !linked.contains(&r.file) && validate_topic_file_name(&r.file))
        .map(|r| (out_dir.join(&r.file), r.clone()))
        .filter(|(path, _)| path.is_file())
        .collect();

    stale.sort_by(|a, b| a.0.cmp(&b.0));
    stale
}

/// Manifest entries are data on disk; only trust names shaped like topic files.
fn validate_topic_file_name(name: &str) -> bool {
    TOPIC_FILE_RE.is_match(name)
}

/// True when the file still holds exactly the stub written for `title`.
fn is_untouched_stub(path: &Path, title: &str) -> Result<bool> {
    let content = std::fs::read(path).map_err(|e| KbIndexError::io(path, e))?;
    Ok(content == stub_content(title).as_bytes())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
