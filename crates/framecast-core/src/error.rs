//! Error types for framecast-core

use thiserror::Error;

/// Result type alias for framecast-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in framecast-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse YAML configuration
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// A design node failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A malformed or incomplete design tree.
///
/// Always names the offending node. Nodes without an identifier are named by
/// their path from the root, e.g. `$.children[2]`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid design node '{node_id}': {message}")]
pub struct ValidationError {
    /// Identifier (or path) of the node that failed validation
    pub node_id: String,
    /// Description of the problem
    pub message: String,
}

impl ValidationError {
    /// Create a validation error for the given node
    pub fn new(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            message: message.into(),
        }
    }
}
