//! The stage contract
//!
//! A stage is one named unit of work. It reads the current
//! [`GenerationState`], declares which fields it needs and which it writes,
//! and returns either a [`StateUpdate`] or a [`StageFailure`]. Stages are
//! synchronous; the runtime executes whole runs on blocking workers.

use std::fmt;

use crate::state::{GenerationState, StateField, StateUpdate};

/// A unit of work in the generation pipeline
pub trait Stage: Send + Sync {
    /// Unique name within a graph
    fn name(&self) -> &str;

    /// Fields that must be populated before the stage runs
    fn requires(&self) -> &[StateField] {
        &[]
    }

    /// Fields the stage may write
    fn produces(&self) -> &[StateField];

    /// Execute the stage against the current state
    fn run(&self, state: &GenerationState) -> Result<StateUpdate, StageFailure>;
}

/// A failed stage invocation
#[derive(Debug, Clone, PartialEq)]
pub struct StageFailure {
    /// Human-readable message
    pub message: String,
    /// Whether later stages can still run
    pub recoverable: bool,
    /// Output produced before the failure; applied to the state as-is
    pub partial: Option<StateUpdate>,
}

impl StageFailure {
    /// A failure the run continues past
    pub fn recoverable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            recoverable: true,
            partial: None,
        }
    }

    /// A failure that aborts the run
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            recoverable: false,
            partial: None,
        }
    }

    /// Keep the output produced before the failure
    pub fn with_partial(mut self, partial: StateUpdate) -> Self {
        self.partial = Some(partial);
        self
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.recoverable {
            "recoverable"
        } else {
            "fatal"
        };
        write!(f, "{} ({})", self.message, kind)
    }
}
