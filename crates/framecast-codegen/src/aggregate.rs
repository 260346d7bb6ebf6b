//! Error aggregation around stage invocations
//!
//! Every stage call goes through [`ErrorAggregator::invoke`], which turns
//! whatever the stage does (success, a reported failure, a panic) into a
//! new state plus a decision to continue or abort. Errors never propagate
//! as `Err` past this point; they become [`ErrorRecord`]s.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use serde_json::json;

use crate::stage::Stage;
use crate::state::{ErrorRecord, EventStatus, GenerationState, StatusEvent};

/// What the orchestrator should do after a stage
#[derive(Debug)]
pub enum Invocation {
    /// Run the next stage
    Continue(GenerationState),
    /// Stop; a fatal error has been recorded
    Abort(GenerationState),
}

impl Invocation {
    /// The resulting state, whichever way the stage went
    pub fn into_state(self) -> GenerationState {
        match self {
            Self::Continue(state) | Self::Abort(state) => state,
        }
    }

    /// Whether the run was aborted
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Abort(_))
    }
}

/// Wraps stage invocations with error capture
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorAggregator;

impl ErrorAggregator {
    /// Run one stage against `state`
    pub fn invoke(&self, stage: &dyn Stage, state: GenerationState) -> Invocation {
        let name = stage.name().to_string();

        let missing: Vec<String> = stage
            .requires()
            .iter()
            .filter(|field| !state.is_populated(field))
            .map(|field| field.key())
            .collect();
        if !missing.is_empty() {
            let message = format!("skipped: missing required input {}", missing.join(", "));
            tracing::warn!(stage = %name, "{}", message);
            return Invocation::Continue(self.recover(state, &name, message));
        }

        tracing::debug!(stage = %name, "Running stage");
        let started = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| stage.run(&state)));
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(update)) => {
                if let Some(field) = update.undeclared_field(stage.produces()) {
                    let message = format!("wrote undeclared field {}", field);
                    return Invocation::Abort(self.fail(state, &name, message));
                }
                tracing::debug!(stage = %name, elapsed_ms, "Stage completed");
                let event = StatusEvent::new(&name, EventStatus::Success, "completed")
                    .with_details(json!({ "elapsed_ms": elapsed_ms }));
                Invocation::Continue(state.apply(update).record_event(event))
            }
            Ok(Err(failure)) => {
                let mut state = state;
                if let Some(partial) = failure.partial {
                    if let Some(field) = partial.undeclared_field(stage.produces()) {
                        let message = format!("wrote undeclared field {}", field);
                        return Invocation::Abort(self.fail(state, &name, message));
                    }
                    state = state.apply(partial);
                }
                if failure.recoverable {
                    tracing::warn!(stage = %name, "{}", failure.message);
                    Invocation::Continue(self.recover(state, &name, failure.message))
                } else {
                    Invocation::Abort(self.fail(state, &name, failure.message))
                }
            }
            Err(payload) => {
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Invocation::Abort(self.fail(state, &name, format!("panicked: {}", detail)))
            }
        }
    }

    fn recover(&self, state: GenerationState, stage: &str, message: String) -> GenerationState {
        let event = StatusEvent::new(stage, EventStatus::Warning, &message);
        state
            .record_error(ErrorRecord::stage(stage, message, true))
            .record_event(event)
    }

    fn fail(&self, state: GenerationState, stage: &str, message: String) -> GenerationState {
        tracing::error!(stage = %stage, "{}", message);
        let event = StatusEvent::new(stage, EventStatus::Error, &message);
        state
            .record_error(ErrorRecord::stage(stage, message, false))
            .record_event(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StageFailure;
    use crate::state::{StateField, StateUpdate};
    use framecast_core::Normalizer;
    use serde_json::json;

    struct Scripted {
        name: &'static str,
        requires: Vec<StateField>,
        produces: Vec<StateField>,
        outcome: fn() -> Result<StateUpdate, StageFailure>,
    }

    impl Stage for Scripted {
        fn name(&self) -> &str {
            self.name
        }
        fn requires(&self) -> &[StateField] {
            &self.requires
        }
        fn produces(&self) -> &[StateField] {
            &self.produces
        }
        fn run(&self, _state: &GenerationState) -> Result<StateUpdate, StageFailure> {
            (self.outcome)()
        }
    }

    fn stage(outcome: fn() -> Result<StateUpdate, StageFailure>) -> Scripted {
        Scripted {
            name: "scripted",
            requires: Vec::new(),
            produces: vec![StateField::Artifact("out")],
            outcome,
        }
    }

    fn state() -> GenerationState {
        let tree = Normalizer::default()
            .normalize(&json!({"kind": "frame", "id": "1"}))
            .unwrap();
        GenerationState::new(tree, "web", "tailwind")
    }

    #[test]
    fn test_success_applies_update() {
        let scripted = stage(|| Ok(StateUpdate::new().with_artifact("out", json!(1))));
        let result = ErrorAggregator.invoke(&scripted, state());

        assert!(!result.is_abort());
        let state = result.into_state();
        assert_eq!(state.artifact("out"), Some(&json!(1)));
        assert!(state.errors().is_empty());
        assert_eq!(state.events().last().unwrap().status, EventStatus::Success);
    }

    #[test]
    fn test_recoverable_failure_keeps_partial() {
        let scripted = stage(|| {
            Err(StageFailure::recoverable("token miss")
                .with_partial(StateUpdate::new().with_artifact("out", json!("partial"))))
        });
        let result = ErrorAggregator.invoke(&scripted, state());

        assert!(!result.is_abort());
        let state = result.into_state();
        assert_eq!(state.artifact("out"), Some(&json!("partial")));
        assert_eq!(state.errors().len(), 1);
        assert!(state.errors()[0].recoverable);
        assert_eq!(state.errors()[0].stage, "scripted");
    }

    #[test]
    fn test_fatal_failure_aborts() {
        let scripted = stage(|| Err(StageFailure::fatal("broken")));
        let result = ErrorAggregator.invoke(&scripted, state());

        assert!(result.is_abort());
        assert!(result.into_state().has_fatal_error());
    }

    #[test]
    fn test_panic_is_fatal() {
        let scripted = stage(|| panic!("stage exploded"));
        let state = ErrorAggregator.invoke(&scripted, state()).into_state();

        assert!(state.has_fatal_error());
        assert!(state.errors()[0].message.contains("stage exploded"));
    }

    #[test]
    fn test_missing_input_skips_stage() {
        let mut scripted = stage(|| panic!("must not run"));
        scripted.requires = vec![StateField::Code];

        let result = ErrorAggregator.invoke(&scripted, state());
        assert!(!result.is_abort());
        let state = result.into_state();
        assert!(state.errors()[0].recoverable);
        assert!(state.errors()[0].message.contains("code"));
    }

    #[test]
    fn test_undeclared_write_is_fatal() {
        let scripted = stage(|| Ok(StateUpdate::new().with_artifact("typo", json!(1))));
        let state = ErrorAggregator.invoke(&scripted, state()).into_state();

        assert!(state.has_fatal_error());
        assert!(state.artifact("typo").is_none());
    }
}
