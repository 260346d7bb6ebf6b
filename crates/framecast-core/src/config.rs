//! Configuration parsing and validation
//!
//! This module handles loading and validating the `framecast.yaml` project
//! configuration. Every field has a default, so an empty file (or no file at
//! all, via [`Config::default`]) is a valid configuration.
//!
//! # Example
//!
//! ```yaml
//! pipeline:
//!   max_depth: 64
//! runtime:
//!   workers: 4
//!   run_timeout_secs: 120
//! theme:
//!   tokens:
//!     color/primary: primary
//! platforms:
//!   web:
//!     component_library: "@acme/uikit"
//!     components: [Button, Card]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::normalize::DEFAULT_MAX_DEPTH;

/// Name of the configuration file looked up inside a project directory
pub const CONFIG_FILE_NAME: &str = "framecast.yaml";

/// Root configuration from `framecast.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Task runtime settings
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Style-variable to theme-token mapping
    #[serde(default)]
    pub theme: ThemeConfig,

    /// Per-platform emitter settings
    #[serde(default)]
    pub platforms: PlatformsConfig,
}

/// Pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum nesting depth accepted by the normalizer
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

/// Task runtime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Maximum number of runs executing at once
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Wall-clock budget for a single run
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,

    /// How long finished task records are retained
    #[serde(default = "default_result_ttl_secs")]
    pub result_ttl_secs: u64,

    /// PostgreSQL URL for the persistent result store (in-memory when absent)
    #[serde(default)]
    pub database_url: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            run_timeout_secs: default_run_timeout_secs(),
            result_ttl_secs: default_result_ttl_secs(),
            database_url: None,
        }
    }
}

impl RuntimeConfig {
    /// Run timeout as a [`Duration`]
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    /// Result retention as a [`Duration`]
    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl_secs)
    }
}

fn default_workers() -> usize {
    4
}

fn default_run_timeout_secs() -> u64 {
    120
}

fn default_result_ttl_secs() -> u64 {
    60 * 60 * 24 * 14 // two weeks
}

/// Theme configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Style variable name -> theme token, e.g. `color/primary: primary`
    #[serde(default)]
    pub tokens: BTreeMap<String, String>,
}

/// Settings for every target platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformsConfig {
    /// Web (React) emitter settings
    #[serde(default = "PlatformConfig::web")]
    pub web: PlatformConfig,

    /// Mobile (React Native) emitter settings
    #[serde(default = "PlatformConfig::mobile")]
    pub mobile: PlatformConfig,
}

impl Default for PlatformsConfig {
    fn default() -> Self {
        Self {
            web: PlatformConfig::web(),
            mobile: PlatformConfig::mobile(),
        }
    }
}

/// Settings for one target platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Module that library components are imported from
    pub component_library: String,

    /// Components known to exist in the library; empty accepts any name
    #[serde(default)]
    pub components: Vec<String>,

    /// Directory generated files are placed under
    pub output_dir: String,

    /// Module exporting the `tokens` object referenced by theme-aware styles
    #[serde(default = "default_token_module")]
    pub token_module: String,
}

fn default_token_module() -> String {
    "@/theme/tokens".to_string()
}

impl PlatformConfig {
    /// Defaults for the web platform
    pub fn web() -> Self {
        Self {
            component_library: "@/components/ui".to_string(),
            components: Vec::new(),
            output_dir: "src/app/preview".to_string(),
            token_module: default_token_module(),
        }
    }

    /// Defaults for the mobile platform
    pub fn mobile() -> Self {
        Self {
            component_library: "@/components/ui".to_string(),
            components: Vec::new(),
            output_dir: "app/(screens)".to_string(),
            token_module: default_token_module(),
        }
    }

    /// Whether a component name is available in the library
    pub fn has_component(&self, name: &str) -> bool {
        self.components.is_empty() || self.components.iter().any(|c| c == name)
    }
}

/// Main configuration container
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Base path of the project
    pub base_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: ProjectConfig::default(),
            base_path: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load configuration from a directory or a `framecast.yaml` file
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config = Config::load("./my-project")?;
    /// println!("Workers: {}", config.project.runtime.workers);
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let (config_path, base_path) = if path.is_dir() {
            (path.join(CONFIG_FILE_NAME), path.to_path_buf())
        } else {
            (
                path.to_path_buf(),
                path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            )
        };

        if !config_path.exists() {
            return Err(Error::ConfigNotFound {
                path: config_path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let config = Self::from_yaml(&contents, base_path)?;
        tracing::debug!("Loaded configuration from {}", config_path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is missing
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match Self::load(path.as_ref()) {
            Err(Error::ConfigNotFound { path }) => {
                tracing::debug!("No configuration at {}, using defaults", path);
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(contents: &str, base_path: impl Into<PathBuf>) -> Result<Self> {
        // An empty document deserializes as null
        let project: ProjectConfig = if contents.trim().is_empty() {
            ProjectConfig::default()
        } else {
            serde_yaml::from_str(contents)?
        };
        let config = Self {
            project,
            base_path: base_path.into(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check values that parse but make no sense
    pub fn validate(&self) -> Result<()> {
        let runtime = &self.project.runtime;
        if runtime.workers == 0 {
            return Err(Error::ConfigInvalid {
                message: "runtime.workers must be at least 1".to_string(),
            });
        }
        if runtime.run_timeout_secs == 0 {
            return Err(Error::ConfigInvalid {
                message: "runtime.run_timeout_secs must be at least 1".to_string(),
            });
        }
        if self.project.pipeline.max_depth == 0 {
            return Err(Error::ConfigInvalid {
                message: "pipeline.max_depth must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
