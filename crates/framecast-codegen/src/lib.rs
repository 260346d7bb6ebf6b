//! Framecast Code Generation
//!
//! This crate drives a normalized design tree through the generation stages
//! and reduces the outcome to a [`PipelineResult`].
//!
//! # Pipeline Overview
//!
//! ```text
//! ┌─────────┐     ┌─────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐
//! │ Design  │────▶│ Analyze │────▶│  Route   │────▶│ Emitter  │────▶│ Validate │
//! │ (tree)  │     │         │     │(platform)│     │(web|mob.)│     │          │
//! └─────────┘     └─────────┘     └──────────┘     └──────────┘     └──────────┘
//! ```
//!
//! Every stage call is wrapped by the [`ErrorAggregator`]: recoverable
//! failures are recorded and the run continues, fatal ones stop it. Work
//! done before a failure stays in the state and reaches the result.
//!
//! # Example
//!
//! ```rust,ignore
//! use framecast_codegen::{GenerationRequest, Pipeline};
//!
//! let pipeline = Pipeline::new(&config.project)?;
//! let result = pipeline.run(&GenerationRequest::new(design, "web"));
//! println!("{}: {} error(s)", result.status, result.errors.len());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod analyze;
pub mod emitters;
pub mod error;
pub mod graph;
pub mod naming;
pub mod pipeline;
pub mod result;
pub mod stage;
pub mod state;
pub mod validate;

pub use aggregate::ErrorAggregator;
pub use emitters::{Emitter, EmitterRegistry, EmitterStage};
pub use error::{Error, Result, RoutingError};
pub use graph::{GraphBuilder, StageGraph};
pub use pipeline::{GenerationRequest, Pipeline, RunPhase};
pub use result::{PipelineResult, RunStatus};
pub use stage::{Stage, StageFailure};
pub use state::{
    ErrorKind, ErrorRecord, GenerationState, StateField, StateUpdate, StyleApproach,
    TargetPlatform,
};
