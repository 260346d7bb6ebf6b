//! Framecast Core Library
//!
//! This crate provides the core functionality for Framecast:
//! - The canonical design tree model
//! - Design tree normalization and validation
//! - Project configuration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Raw design  │────▶│ Normalizer  │────▶│ DesignTree  │
//! │  (JSON)     │     │ (validate)  │     │ (read-only) │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use framecast_core::{Config, Normalizer};
//!
//! let config = Config::load("./framecast.yaml")?;
//! let normalizer = Normalizer::new(config.project.pipeline.max_depth);
//! let tree = normalizer.normalize(&raw_design)?;
//! println!("{} nodes", tree.node_count());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod design;
pub mod error;
pub mod normalize;

pub use config::{Config, ProjectConfig};
pub use design::{DesignNode, DesignTree, NodeKind};
pub use error::{Error, Result, ValidationError};
pub use normalize::Normalizer;
