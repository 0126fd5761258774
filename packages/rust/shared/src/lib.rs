//! Shared types, error model, and configuration for kbindex.
//!
//! This crate is the foundation depended on by all other kbindex crates.
//! It provides:
//! - [`KbIndexError`] — the unified error type
//! - Domain types ([`TopicEntry`], [`TopicList`], [`IndexManifest`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DEFAULT_GENERATOR, DefaultsConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, validate_config,
};
pub use error::{KbIndexError, Result};
pub use types::{CURRENT_SCHEMA_VERSION, IndexManifest, TopicEntry, TopicList, TopicRecord};
