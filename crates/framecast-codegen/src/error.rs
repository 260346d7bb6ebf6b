//! Error types for code generation

use thiserror::Error;

pub use framecast_core::ValidationError;

/// Result type for codegen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or running the generation pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// The design tree failed normalization
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The requested platform has no emitter
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// The stage graph definition is inconsistent
    #[error("invalid stage graph '{graph}': {message}")]
    InvalidGraph {
        /// Graph name
        graph: String,
        /// Error description
        message: String,
    },

    /// A built-in template failed to compile or render
    #[error("invalid template: {0}")]
    InvalidTemplate(#[from] minijinja::Error),
}

/// A target platform identifier that no emitter is registered for
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized target platform '{platform}'")]
pub struct RoutingError {
    /// The identifier as requested
    pub platform: String,
}

impl RoutingError {
    /// Create a routing error for the given identifier
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
        }
    }
}
