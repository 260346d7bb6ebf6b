//! Task identity and lifecycle records
//!
//! A task moves `queued → running → {completed, completed_with_errors,
//! failed}`. Terminal tasks carry the [`PipelineResult`] of their run and are
//! kept until their expiry time.

use chrono::{DateTime, Utc};
use framecast_codegen::{PipelineResult, RunStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::jobs::GenerationJob;

/// Opaque task identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// A fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Lifecycle status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Accepted, waiting for a worker
    Queued,
    /// A worker is executing the run
    Running,
    /// Finished without errors
    Completed,
    /// Finished with recoverable errors only
    CompletedWithErrors,
    /// Finished with a fatal error, or timed out
    Failed,
}

impl TaskStatus {
    /// Canonical identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::CompletedWithErrors => "completed_with_errors",
            Self::Failed => "failed",
        }
    }

    /// Whether the task will change no further
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Queued | Self::Running)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RunStatus> for TaskStatus {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Completed => Self::Completed,
            RunStatus::CompletedWithErrors => Self::CompletedWithErrors,
            RunStatus::Failed => Self::Failed,
        }
    }
}

/// Stored state of one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Task identifier
    pub task_id: TaskId,

    /// Current status
    pub status: TaskStatus,

    /// Requester identifier, if the job carried one
    pub requester_id: Option<String>,

    /// Requester display name
    pub requester_name: Option<String>,

    /// Target platform as requested
    pub target_platform: String,

    /// Run outcome, present once terminal
    pub result: Option<PipelineResult>,

    /// When the task was accepted
    pub created_at: DateTime<Utc>,

    /// Last status change
    pub updated_at: DateTime<Utc>,

    /// After this instant the record may be purged
    pub expires_at: DateTime<Utc>,
}

impl TaskRecord {
    /// A freshly accepted task
    pub fn queued(job: &GenerationJob, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            task_id: TaskId::new(),
            status: TaskStatus::Queued,
            requester_id: job.metadata.requester_id.clone(),
            requester_name: job.metadata.requester_name.clone(),
            target_platform: job.request.target_platform.clone(),
            result: None,
            created_at: now,
            updated_at: now,
            expires_at: expiry(now, ttl),
        }
    }

    /// Mark the task as picked up by a worker
    pub fn start(mut self) -> Self {
        self.status = TaskStatus::Running;
        self.updated_at = Utc::now();
        self
    }

    /// Attach the run outcome; retention restarts from completion
    pub fn finish(mut self, result: PipelineResult, ttl: Duration) -> Self {
        let now = Utc::now();
        self.status = result.status.into();
        self.result = Some(result);
        self.updated_at = now;
        self.expires_at = expiry(now, ttl);
        self
    }

    /// Whether the record is past its retention window
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// The client-facing view
    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            task_id: self.task_id,
            status: self.status,
            result: self.result.clone(),
        }
    }
}

fn expiry(from: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| from.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// What a status query returns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    /// Task identifier
    pub task_id: TaskId,

    /// Current status
    pub status: TaskStatus,

    /// Run outcome, once terminal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<PipelineResult>,
}
