//! Framecast Runtime
//!
//! This crate runs generation jobs asynchronously: a caller submits a job,
//! gets a task id back immediately, and polls for the outcome later.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐ submit ┌──────────┐ spawn ┌──────────────┐ run ┌──────────┐
//! │  Caller  │───────▶│ Runtime  │──────▶│ Worker slot  │────▶│ Pipeline │
//! └──────────┘        └──────────┘       │ (semaphore + │     └──────────┘
//!      ▲                   │             │   timeout)   │          │
//!      │ status/wait       ▼             └──────────────┘          │
//!      └──────────── ResultStore ◀─────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use framecast_runtime::{GenerationJob, Runtime};
//!
//! let runtime = Runtime::from_config(&config.project).await?;
//! let task_id = runtime.submit(GenerationJob::new(request)).await?;
//! let snapshot = runtime.wait(&task_id, Duration::from_millis(200)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod error;
pub mod jobs;
pub mod store;
pub mod task;

pub use engine::Runtime;
pub use error::{Error, Result};
pub use jobs::{GenerationJob, JobMetadata};
pub use store::{MemoryResultStore, PgResultStore, ResultStore};
pub use task::{TaskId, TaskRecord, TaskSnapshot, TaskStatus};
