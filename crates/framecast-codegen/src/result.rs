//! Run results

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::state::{
    AnalysisSummary, ErrorKind, ErrorRecord, EventStatus, GeneratedCode, GenerationState,
    StatusEvent,
};

/// Terminal status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every stage succeeded
    Completed,
    /// Only recoverable errors were recorded
    CompletedWithErrors,
    /// A fatal error stopped the run
    Failed,
}

impl RunStatus {
    /// Canonical identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::CompletedWithErrors => "completed_with_errors",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The reduced outcome of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Terminal status
    pub status: RunStatus,
    /// Component identifier (absent when the design was rejected)
    pub component_name: Option<String>,
    /// Requested platform, as given
    pub target_platform: String,
    /// Generated code; `None` on failure or when no emitter produced any
    pub code: Option<GeneratedCode>,
    /// Errors in the order they were recorded
    pub errors: Vec<ErrorRecord>,
    /// Analysis summary, if produced
    pub analysis: Option<AnalysisSummary>,
    /// Auxiliary artifacts
    #[serde(default)]
    pub artifacts: BTreeMap<String, Value>,
    /// Status events
    #[serde(default)]
    pub events: Vec<StatusEvent>,
    /// Content hash of the normalized design
    pub source_hash: Option<String>,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl PipelineResult {
    /// Reduce a finished state. Generated code is dropped when the run
    /// failed, so a failed result never carries half-built output.
    pub fn from_state(state: GenerationState, target_platform: &str, elapsed: Duration) -> Self {
        let parts = state.into_parts();
        let status = if parts.errors.iter().any(|e| !e.recoverable) {
            RunStatus::Failed
        } else if parts.errors.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::CompletedWithErrors
        };
        let code = match status {
            RunStatus::Failed => None,
            _ => parts.code,
        };

        Self {
            status,
            component_name: Some(parts.component_name),
            target_platform: target_platform.to_string(),
            code,
            errors: parts.errors,
            analysis: parts.analysis,
            artifacts: parts.artifacts,
            events: parts.events,
            source_hash: Some(parts.source_hash),
            duration_ms: elapsed.as_millis() as u64,
        }
    }

    /// A run that failed before any stage executed
    pub fn rejected(
        record: ErrorRecord,
        target_platform: &str,
        state: Option<GenerationState>,
        elapsed: Duration,
    ) -> Self {
        let event = StatusEvent::new(&record.stage, EventStatus::Error, &record.message);
        match state {
            Some(state) => {
                let state = state.record_error(record).record_event(event);
                Self::from_state(state, target_platform, elapsed)
            }
            None => Self {
                status: RunStatus::Failed,
                component_name: None,
                target_platform: target_platform.to_string(),
                code: None,
                errors: vec![record],
                analysis: None,
                artifacts: BTreeMap::new(),
                events: vec![event],
                source_hash: None,
                duration_ms: elapsed.as_millis() as u64,
            },
        }
    }

    /// A run abandoned after exceeding its time budget; nothing it produced
    /// is kept
    pub fn timed_out(target_platform: &str, budget: Duration) -> Self {
        let record = ErrorRecord::fatal(
            "pipeline",
            ErrorKind::Timeout,
            format!("run exceeded its {:?} budget", budget),
        );
        Self::rejected(record, target_platform, None, budget)
    }

    /// Whether the run produced usable code
    pub fn is_success(&self) -> bool {
        self.status != RunStatus::Failed && self.code.is_some()
    }

    /// Errors of one kind
    pub fn errors_of(&self, kind: ErrorKind) -> impl Iterator<Item = &ErrorRecord> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timed_out_result() {
        let result = PipelineResult::timed_out("web", Duration::from_secs(30));
        assert_eq!(result.status, RunStatus::Failed);
        assert!(result.code.is_none());
        assert_eq!(result.errors_of(ErrorKind::Timeout).count(), 1);
        assert!(result.errors[0].message.contains("30s"));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(RunStatus::CompletedWithErrors).unwrap(),
            "completed_with_errors"
        );
    }
}
