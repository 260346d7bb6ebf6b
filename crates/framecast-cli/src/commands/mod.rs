//! CLI command implementations

pub mod generate;
pub mod graph;
pub mod init;
pub mod submit;
pub mod validate;

use anyhow::{Context, Result};
use framecast_core::Config;
use framecast_core::config::CONFIG_FILE_NAME;
use serde_json::Value;
use std::path::Path;

/// Load the configuration named on the command line, or the default file
/// if it exists
pub fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => {
            tracing::debug!("Loading configuration from {}", path);
            Config::load(path).with_context(|| format!("Failed to load configuration {}", path))
        }
        None => Config::load_or_default(CONFIG_FILE_NAME).context("Failed to load configuration"),
    }
}

/// Read a design file; `.yaml`/`.yml` files are parsed as YAML, anything
/// else as JSON
pub fn read_design(path: &Path) -> Result<Value> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read design file {}", path.display()))?;

    if is_yaml(path) {
        serde_yaml::from_str(&contents)
            .with_context(|| format!("Invalid YAML in {}", path.display()))
    } else {
        serde_json::from_str(&contents)
            .with_context(|| format!("Invalid JSON in {}", path.display()))
    }
}

/// Whether a path names a design file this tool reads
pub fn is_design_file(path: &Path) -> bool {
    is_yaml(path) || has_extension(path, "json")
}

fn is_yaml(path: &Path) -> bool {
    has_extension(path, "yaml") || has_extension(path, "yml")
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}
