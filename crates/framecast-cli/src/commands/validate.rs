//! Validate configuration and design files

use anyhow::{Result, bail};
use framecast_core::Normalizer;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{is_design_file, load_config, read_design};

/// Directory scanned when no paths are given
const DEFAULT_DESIGN_DIR: &str = "designs";

/// Run the validate command
pub async fn run(config_path: Option<&str>, paths: &[String]) -> Result<()> {
    let config = load_config(config_path)?;
    tracing::info!("✓ Configuration is valid");

    let roots: Vec<PathBuf> = if paths.is_empty() {
        let default = config.base_path.join(DEFAULT_DESIGN_DIR);
        if !default.is_dir() {
            tracing::info!("No design files to check");
            return Ok(());
        }
        vec![default]
    } else {
        paths.iter().map(PathBuf::from).collect()
    };

    let normalizer = Normalizer::new(config.project.pipeline.max_depth);
    let mut checked = 0;
    let mut failures = Vec::new();

    for file in roots.iter().flat_map(|root| design_files(root)) {
        checked += 1;
        let outcome = read_design(&file).and_then(|raw| Ok(normalizer.normalize(&raw)?));
        match outcome {
            Ok(tree) => tracing::info!("✓ {} ({} nodes)", file.display(), tree.node_count()),
            Err(e) => {
                tracing::error!("✗ {}: {:#}", file.display(), e);
                failures.push(format!("  {}: {:#}", file.display(), e));
            }
        }
    }

    if !failures.is_empty() {
        bail!(
            "{} of {} design file(s) invalid:\n{}",
            failures.len(),
            checked,
            failures.join("\n")
        );
    }

    tracing::info!("✓ {} design file(s) valid", checked);
    Ok(())
}

/// Design files under a path, in a stable order; a file path yields itself
fn design_files(root: &Path) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_design_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect()
}
