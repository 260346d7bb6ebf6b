//! Generation jobs submitted to the runtime

use chrono::{DateTime, Utc};
use framecast_codegen::GenerationRequest;
use serde::{Deserialize, Serialize};

/// A generation request plus who asked for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJob {
    /// The run parameters
    pub request: GenerationRequest,

    /// Requester metadata
    #[serde(default)]
    pub metadata: JobMetadata,
}

/// Who submitted a job, and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct JobMetadata {
    /// Stable requester identifier, used for task history
    pub requester_id: Option<String>,

    /// Display name of the requester
    pub requester_name: Option<String>,

    /// Submission time as seen by the client
    pub submitted_at: Option<DateTime<Utc>>,
}

impl GenerationJob {
    /// Wrap a request with empty metadata
    pub fn new(request: GenerationRequest) -> Self {
        Self {
            request,
            metadata: JobMetadata::default(),
        }
    }

    /// Set the requester identifier
    pub fn with_requester(mut self, requester_id: impl Into<String>) -> Self {
        self.metadata.requester_id = Some(requester_id.into());
        self
    }

    /// Set the requester display name
    pub fn with_requester_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.requester_name = Some(name.into());
        self
    }

    /// Set the client-side submission time
    pub fn with_submitted_at(mut self, at: DateTime<Utc>) -> Self {
        self.metadata.submitted_at = Some(at);
        self
    }
}
