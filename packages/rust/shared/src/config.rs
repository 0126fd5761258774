//! Application configuration for kbindex.
//!
//! User config lives at `~/.kbindex/kbindex.toml`.
//! CLI flags override topic-file metadata, which overrides config values,
//! which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{KbIndexError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "kbindex.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".kbindex";

/// Generator name printed in the banner and footer when nothing else is set.
pub const DEFAULT_GENERATOR: &str = "KB Builder";

// ---------------------------------------------------------------------------
// Config structs (matching kbindex.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Name credited in the "Generated on" banner and footer.
    #[serde(default = "default_generator")]
    pub generator: String,

    /// File name of the rendered index inside the output directory.
    #[serde(default = "default_index_file")]
    pub index_file: String,

    /// Noun used in the section heading, e.g. "Deep Dives".
    #[serde(default = "default_topic_noun")]
    pub topic_noun: String,

    /// Default output directory.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Whether to create stub files for topics that have none yet.
    #[serde(default = "default_true")]
    pub scaffold: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            generator: default_generator(),
            index_file: default_index_file(),
            topic_noun: default_topic_noun(),
            output_dir: default_output_dir(),
            scaffold: true,
        }
    }
}

fn default_generator() -> String {
    DEFAULT_GENERATOR.into()
}
fn default_index_file() -> String {
    "README.md".into()
}
fn default_topic_noun() -> String {
    "Deep Dives".into()
}
fn default_output_dir() -> String {
    ".".into()
}
fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.kbindex/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| KbIndexError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.kbindex/kbindex.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| KbIndexError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        KbIndexError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    validate_config(&config)?;
    Ok(config)
}

/// Reject values that would render a broken index.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let d = &config.defaults;
    if d.generator.trim().is_empty() {
        return Err(KbIndexError::config("defaults.generator must not be empty"));
    }
    if d.index_file.trim().is_empty() || d.index_file.contains('/') {
        return Err(KbIndexError::config(format!(
            "defaults.index_file must be a plain file name, got {:?}",
            d.index_file
        )));
    }
    Ok(())
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| KbIndexError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| KbIndexError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| KbIndexError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("generator"));
        assert!(toml_str.contains("KB Builder"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
generator = "Prep Bot"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.generator, "Prep Bot");
        assert_eq!(config.defaults.index_file, "README.md");
        assert_eq!(config.defaults.topic_noun, "Deep Dives");
        assert!(config.defaults.scaffold);
    }

    #[test]
    fn empty_file_is_default() {
        let config: AppConfig = toml::from_str("").expect("parse");
        assert_eq!(config.defaults.generator, DEFAULT_GENERATOR);
    }

    #[test]
    fn rejects_nested_index_file() {
        let mut config = AppConfig::default();
        config.defaults.index_file = "docs/README.md".into();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("plain file name"));
    }

    #[test]
    fn rejects_blank_generator() {
        let mut config = AppConfig::default();
        config.defaults.generator = "  ".into();
        assert!(validate_config(&config).is_err());
    }
}
