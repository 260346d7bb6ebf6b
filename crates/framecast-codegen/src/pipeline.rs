//! The pipeline facade
//!
//! [`Pipeline`] owns the normalizer and a compiled [`StageGraph`]; each call
//! to [`Pipeline::run`] performs one run with a fresh state and walks the run
//! phases:
//!
//! ```text
//! Pending → Normalizing → Routing → Emitting → Reducing → Completed
//!               │            │                      ├──▶ CompletedWithErrors
//!               └────────────┴──────────────────────┴──▶ Failed
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::time::Instant;
use thiserror::Error;

use framecast_core::{Normalizer, ProjectConfig};

use crate::aggregate::ErrorAggregator;
use crate::analyze::AnalyzeDesign;
use crate::emitters::EmitterRegistry;
use crate::error::Result;
use crate::graph::{END, GraphBuilder, START, StageGraph};
use crate::result::{PipelineResult, RunStatus};
use crate::stage::Stage;
use crate::state::{
    ErrorKind, ErrorRecord, EventStatus, GenerationState, StatusEvent, TargetPlatform,
};
use crate::validate::ValidateCode;

/// Name of the router node in the default graph
pub const ROUTER: &str = "route_platform";

/// Phase of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Not started
    Pending,
    /// Validating the raw design
    Normalizing,
    /// Resolving the platform route
    Routing,
    /// Executing stages
    Emitting,
    /// Reducing the state to a result
    Reducing,
    /// Finished without errors
    Completed,
    /// Finished with recoverable errors
    CompletedWithErrors,
    /// Stopped by a fatal error
    Failed,
}

/// A phase change that the run state machine does not allow
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("illegal phase transition {from} -> {to}")]
pub struct InvalidTransition {
    /// Current phase
    pub from: RunPhase,
    /// Requested phase
    pub to: RunPhase,
}

impl RunPhase {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::CompletedWithErrors | Self::Failed)
    }

    /// Move to `next` if the state machine allows it
    pub fn advance(self, next: RunPhase) -> std::result::Result<RunPhase, InvalidTransition> {
        use RunPhase::*;
        let allowed = matches!(
            (self, next),
            (Pending, Normalizing)
                | (Normalizing, Routing)
                | (Normalizing, Failed)
                | (Routing, Emitting)
                | (Routing, Failed)
                | (Emitting, Reducing)
                | (Reducing, Completed)
                | (Reducing, CompletedWithErrors)
                | (Reducing, Failed)
        );
        if allowed {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Normalizing => "normalizing",
            Self::Routing => "routing",
            Self::Emitting => "emitting",
            Self::Reducing => "reducing",
            Self::Completed => "completed",
            Self::CompletedWithErrors => "completed_with_errors",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl From<RunStatus> for RunPhase {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Completed => Self::Completed,
            RunStatus::CompletedWithErrors => Self::CompletedWithErrors,
            RunStatus::Failed => Self::Failed,
        }
    }
}

/// Tracks the phase of one run and logs each transition
struct PhaseTracker {
    phase: RunPhase,
}

impl PhaseTracker {
    fn new() -> Self {
        Self {
            phase: RunPhase::Pending,
        }
    }

    /// Move to `next`, returning the status event for the transition. An
    /// illegal transition leaves the phase unchanged and yields no event.
    fn enter(&mut self, next: RunPhase) -> Option<StatusEvent> {
        let from = self.phase;
        match from.advance(next) {
            Ok(phase) => {
                tracing::debug!(from = %from, to = %phase, "Run phase");
                self.phase = phase;
            }
            Err(e) => {
                tracing::error!("{}", e);
                return None;
            }
        }
        let status = match next {
            RunPhase::Failed => EventStatus::Error,
            RunPhase::CompletedWithErrors => EventStatus::Warning,
            RunPhase::Completed => EventStatus::Success,
            _ => EventStatus::Pending,
        };
        Some(
            StatusEvent::new("pipeline", status, next.to_string())
                .with_details(json!({ "from": from.to_string() })),
        )
    }

    /// Move to `next` and record the transition on the state
    fn enter_with(&mut self, next: RunPhase, state: GenerationState) -> GenerationState {
        match self.enter(next) {
            Some(event) => state.record_event(event),
            None => state,
        }
    }
}

/// Parameters of one generation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Raw design tree
    pub design: Value,
    /// Target platform identifier (`web`, `mobile`)
    pub target_platform: String,
    /// Style approach identifier (`tailwind`, `css-modules`, `nativewind`, `stylesheet`)
    pub style_approach: String,
    /// Free-text instruction from the requester
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_instruction: Option<String>,
    /// Component name; derived from the root node when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_name: Option<String>,
}

impl GenerationRequest {
    /// Request with the platform's default style approach
    pub fn new(design: Value, target_platform: impl Into<String>) -> Self {
        let target_platform = target_platform.into();
        let style_approach = match target_platform.parse::<TargetPlatform>() {
            Ok(TargetPlatform::Mobile) => "nativewind",
            _ => "tailwind",
        };
        Self {
            design,
            target_platform,
            style_approach: style_approach.to_string(),
            user_instruction: None,
            component_name: None,
        }
    }

    /// Set the style approach
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style_approach = style.into();
        self
    }

    /// Set the user instruction
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.user_instruction = Some(instruction.into());
        self
    }

    /// Set the component name
    pub fn with_component_name(mut self, name: impl Into<String>) -> Self {
        self.component_name = Some(name.into());
        self
    }
}

/// Build the standard graph: analyze, route to one emitter per registered
/// platform, then validate
pub fn default_graph(registry: &EmitterRegistry) -> Result<StageGraph> {
    let mut builder = GraphBuilder::new("framecast")
        .stage(AnalyzeDesign)
        .router(ROUTER)
        .stage(ValidateCode)
        .edge(START, AnalyzeDesign::NAME)
        .edge(AnalyzeDesign::NAME, ROUTER)
        .edge(ValidateCode::NAME, END);

    for (platform, stage) in registry.stages() {
        let name = stage.name().to_string();
        builder = builder
            .stage(stage)
            .route(ROUTER, platform, name.as_str())
            .edge(name.as_str(), ValidateCode::NAME);
    }

    builder.compile()
}

/// A configured generation pipeline, shareable across threads
pub struct Pipeline {
    normalizer: Normalizer,
    graph: StageGraph,
    aggregator: ErrorAggregator,
}

impl Pipeline {
    /// Build the pipeline with the built-in emitters
    pub fn new(config: &ProjectConfig) -> Result<Self> {
        let registry = EmitterRegistry::builtin(config)?;
        let graph = default_graph(&registry)?;
        Ok(Self::with_graph(
            Normalizer::new(config.pipeline.max_depth),
            graph,
        ))
    }

    /// Build a pipeline around a custom graph
    pub fn with_graph(normalizer: Normalizer, graph: StageGraph) -> Self {
        Self {
            normalizer,
            graph,
            aggregator: ErrorAggregator,
        }
    }

    /// The compiled stage graph
    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    /// Perform one run
    pub fn run(&self, request: &GenerationRequest) -> PipelineResult {
        let started = Instant::now();
        let platform = request.target_platform.as_str();
        let mut phases = PhaseTracker::new();

        let normalizing = phases.enter(RunPhase::Normalizing);
        let tree = match self.normalizer.normalize(&request.design) {
            Ok(tree) => tree,
            Err(e) => {
                tracing::warn!(node = %e.node_id, "Design rejected: {}", e.message);
                phases.enter(RunPhase::Failed);
                let record = ErrorRecord::fatal("normalize", ErrorKind::Validation, e.to_string());
                return PipelineResult::rejected(record, platform, None, started.elapsed());
            }
        };

        let mut state = GenerationState::new(tree, platform, request.style_approach.as_str())
            .with_instruction(request.user_instruction.clone());
        if let Some(name) = &request.component_name {
            state = state.with_component_name(name);
        }
        if let Some(event) = normalizing {
            state = state.record_event(event);
        }
        state = phases.enter_with(RunPhase::Routing, state);

        let route = match self.graph.resolve_route(&state) {
            Ok(route) => route,
            Err(e) => {
                tracing::warn!("{}", e);
                let state = phases.enter_with(RunPhase::Failed, state);
                let record = ErrorRecord::fatal("route", ErrorKind::Routing, e.to_string());
                return PipelineResult::rejected(record, platform, Some(state), started.elapsed());
            }
        };

        tracing::info!(
            component = %state.component_name(),
            route = ?route,
            nodes = state.tree().node_count(),
            "Generating"
        );
        let state = phases.enter_with(RunPhase::Emitting, state);
        let run = self.graph.run(state, route, &self.aggregator);
        let state = phases.enter_with(RunPhase::Reducing, run.state);

        let mut result = PipelineResult::from_state(state, platform, started.elapsed());
        result.events.extend(phases.enter(result.status.into()));

        tracing::info!(
            status = %result.status,
            errors = result.errors.len(),
            duration_ms = result.duration_ms,
            "Run finished"
        );
        result
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("normalizer", &self.normalizer)
            .field("graph", &self.graph)
            .finish()
    }
}
