//! End-to-end tests for the generation pipeline
//!
//! These drive whole runs through [`Pipeline::run`] and check:
//! - Clean runs for both platforms
//! - Validation and routing failures before any stage executes
//! - Partial results surviving a recoverable emission failure
//! - Deterministic routing and append-only state

use std::sync::{Arc, Mutex};

use rstest::rstest;
use serde_json::{Value, json};

use framecast_codegen::analyze::AnalyzeDesign;
use framecast_codegen::graph::{END, START};
use framecast_codegen::pipeline::ROUTER;
use framecast_codegen::validate::ValidateCode;
use framecast_codegen::{
    ErrorKind, GenerationRequest, GenerationState, GraphBuilder, Pipeline, RunStatus, Stage,
    StageFailure, StateField, StateUpdate, TargetPlatform,
};
use framecast_core::{Normalizer, ProjectConfig};

fn pipeline() -> Pipeline {
    Pipeline::new(&ProjectConfig::default()).unwrap()
}

fn frame_with_text() -> Value {
    json!({
        "kind": "frame", "id": "1:1",
        "children": [{"kind": "text", "id": "1:2", "text": {"content": "Hi"}}]
    })
}

fn profile_card() -> Value {
    json!({
        "type": "FRAME", "id": "10:1", "name": "Profile Card",
        "layout": {"width": 360, "height": 240, "direction": "VERTICAL", "spacing": 12, "padding": 16},
        "styles": {"fill": "color/surface"},
        "children": [
            {"type": "TEXT", "id": "10:2", "name": "Name", "text": "Ada Lovelace"},
            {"type": "TEXT", "id": "10:3", "name": "Role", "text": "Analyst"},
            {"type": "INSTANCE", "id": "10:4", "name": "Button",
             "componentProperties": {"Label#1:0": {"type": "TEXT", "value": "Follow"}}}
        ]
    })
}

#[test]
fn test_single_frame_completes_with_children_in_order() {
    let result = pipeline().run(&GenerationRequest::new(frame_with_text(), "web"));

    assert_eq!(result.status, RunStatus::Completed, "errors: {:?}", result.errors);
    assert!(result.errors.is_empty());

    let code = result.code.as_ref().unwrap();
    let entry = code.entry().unwrap();
    assert!(entry.contents.contains("export default function"));
    let frame = entry.contents.find("data-node-id=\"1:1\"").unwrap();
    let text = entry.contents.find(">Hi</p>").unwrap();
    assert!(frame < text);
}

#[test]
fn test_children_order_is_preserved() {
    let result = pipeline().run(&GenerationRequest::new(profile_card(), "web"));
    let contents = &result.code.as_ref().unwrap().files[0].contents;

    let name = contents.find("Ada Lovelace").unwrap();
    let role = contents.find("Analyst").unwrap();
    let button = contents.find("<Button label=\"Follow\" />").unwrap();
    assert!(name < role && role < button);
}

#[test]
fn test_missing_kind_fails_before_any_stage() {
    let design = json!({
        "kind": "frame", "id": "1:1",
        "children": [{"id": "1:7", "name": "Broken"}]
    });
    let result = pipeline().run(&GenerationRequest::new(design, "web"));

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.code.is_none());
    assert!(result.analysis.is_none());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, ErrorKind::Validation);
    assert!(result.errors[0].message.contains("1:7"));
    assert!(!result.events.iter().any(|e| e.scope == "analyze"));
}

#[test]
fn test_unknown_platform_is_a_routing_error() {
    let result = pipeline().run(&GenerationRequest::new(frame_with_text(), "quantum-holo-ui"));

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, ErrorKind::Routing);
    assert!(result.errors[0].message.contains("quantum-holo-ui"));
    assert!(result.analysis.is_none(), "no stage may run before routing");
    assert!(result.code.is_none());
}

#[rstest]
#[case("web", TargetPlatform::Web, "src/app/preview/ProfileCard/page.tsx")]
#[case("WEB", TargetPlatform::Web, "src/app/preview/ProfileCard/page.tsx")]
#[case("mobile", TargetPlatform::Mobile, "app/(screens)/ProfileCard.tsx")]
#[case("react-native", TargetPlatform::Mobile, "app/(screens)/ProfileCard.tsx")]
fn test_routing_is_deterministic(
    #[case] requested: &str,
    #[case] platform: TargetPlatform,
    #[case] path: &str,
) {
    let pipeline = pipeline();
    for _ in 0..3 {
        let result = pipeline.run(&GenerationRequest::new(profile_card(), requested));
        let code = result.code.unwrap();
        assert_eq!(code.platform, platform);
        assert_eq!(code.files[0].path, path);
    }
}

#[test]
fn test_mobile_stylesheet_run() {
    let request = GenerationRequest::new(profile_card(), "mobile")
        .with_style("stylesheet")
        .with_instruction("use brand colours")
        .with_component_name("profile summary");
    let result = pipeline().run(&request);

    assert_eq!(result.status, RunStatus::Completed, "errors: {:?}", result.errors);
    assert_eq!(result.component_name.as_deref(), Some("ProfileSummary"));
    let contents = &result.code.unwrap().files[0].contents;
    assert!(contents.contains("// use brand colours"));
    assert!(contents.contains("export default function ProfileSummary()"));
    assert!(contents.contains("StyleSheet.create({"));
    assert_eq!(result.artifacts["diagnostics"][0]["problems"], json!([]));
}

#[test]
fn test_unsupported_style_fails_run_but_keeps_analysis() {
    let request = GenerationRequest::new(profile_card(), "web").with_style("stylesheet");
    let result = pipeline().run(&request);

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.code.is_none());
    assert!(result.analysis.is_some());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].stage, "emit_web");
    assert!(!result.errors[0].recoverable);
}

#[rstest]
#[case("web", "tailwind")]
#[case("web", "css-modules")]
#[case("mobile", "nativewind")]
#[case("mobile", "stylesheet")]
fn test_punctuation_in_text_keeps_run_clean(#[case] platform: &str, #[case] style: &str) {
    let design = json!({
        "kind": "frame", "id": "3:1", "name": "Steps",
        "children": [
            {"kind": "text", "id": "3:2", "text": "1) Open the app"},
            {"kind": "text", "id": "3:3", "text": "Done :) see https://example.com/help)"},
            {"kind": "text", "id": "3:4", "text": "[beta] Don't worry (really"}
        ]
    });
    let result = pipeline().run(&GenerationRequest::new(design, platform).with_style(style));

    assert_eq!(result.status, RunStatus::Completed, "errors: {:?}", result.errors);
    assert!(result.code.unwrap().files[0].contents.contains("1) Open the app"));
}

#[test]
fn test_catalog_miss_completes_with_errors() {
    let mut config = ProjectConfig::default();
    config.platforms.web.components = vec!["Avatar".to_string()];
    let pipeline = Pipeline::new(&config).unwrap();

    let result = pipeline.run(&GenerationRequest::new(profile_card(), "web"));

    assert_eq!(result.status, RunStatus::CompletedWithErrors);
    assert!(result.code.is_some(), "degraded output is still returned");
    assert_eq!(result.errors[0].stage, "emit_web");
    assert!(result.errors[0].recoverable);
    assert!(result.artifacts.contains_key("style_map"));
}

/// Emission stand-in that always fails recoverably
struct FailingEmitter;

impl Stage for FailingEmitter {
    fn name(&self) -> &str {
        "emit_stub"
    }

    fn produces(&self) -> &[StateField] {
        &[StateField::Code]
    }

    fn run(&self, _state: &GenerationState) -> Result<StateUpdate, StageFailure> {
        Err(StageFailure::recoverable("emitter unavailable"))
    }
}

#[test]
fn test_partial_result_survives_recoverable_emission_failure() {
    let graph = GraphBuilder::new("stubbed")
        .stage(AnalyzeDesign)
        .router(ROUTER)
        .stage(FailingEmitter)
        .stage(ValidateCode)
        .edge(START, AnalyzeDesign::NAME)
        .edge(AnalyzeDesign::NAME, ROUTER)
        .route(ROUTER, TargetPlatform::Web, "emit_stub")
        .edge("emit_stub", ValidateCode::NAME)
        .edge(ValidateCode::NAME, END)
        .compile()
        .unwrap();
    let pipeline = Pipeline::with_graph(Normalizer::default(), graph);

    let result = pipeline.run(&GenerationRequest::new(profile_card(), "web"));

    assert_eq!(result.status, RunStatus::CompletedWithErrors);
    assert_eq!(result.analysis.as_ref().unwrap().node_count, 4);
    assert!(result.code.is_none(), "code must not be fabricated");
    // the emitter failure, then validate skipped for lack of code
    assert_eq!(result.errors.len(), 2);
    assert_eq!(result.errors[0].stage, "emit_stub");
    assert_eq!(result.errors[1].stage, "validate");
    assert!(result.errors.iter().all(|e| e.recoverable));
}

/// Records the populated fields it sees, then passes
struct Probe {
    name: &'static str,
    seen: Arc<Mutex<Vec<usize>>>,
    produces: &'static [StateField],
}

impl Stage for Probe {
    fn name(&self) -> &str {
        self.name
    }

    fn produces(&self) -> &[StateField] {
        self.produces
    }

    fn run(&self, state: &GenerationState) -> Result<StateUpdate, StageFailure> {
        let fields = state.populated_fields();
        let mut seen = self.seen.lock().unwrap();
        if let Some(previous) = seen.last() {
            assert!(fields.len() >= *previous);
        }
        seen.push(fields.len());

        let mut update = StateUpdate::new();
        for field in self.produces {
            if let StateField::Artifact(name) = field {
                update = update.with_artifact(*name, json!(self.name));
            }
        }
        if self.name == "probe_b" {
            return Err(StageFailure::recoverable("probe b degraded").with_partial(update));
        }
        Ok(update)
    }
}

#[test]
fn test_populated_fields_never_shrink() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let probe = |name: &'static str, produces: &'static [StateField]| Probe {
        name,
        seen: Arc::clone(&seen),
        produces,
    };

    let graph = GraphBuilder::new("probes")
        .stage(AnalyzeDesign)
        .stage(probe("probe_a", &[StateField::Artifact("a")]))
        .stage(probe("probe_b", &[StateField::Artifact("b")]))
        .stage(probe("probe_c", &[StateField::Artifact("a")]))
        .stage(probe("probe_d", &[]))
        .edge(START, AnalyzeDesign::NAME)
        .edge(AnalyzeDesign::NAME, "probe_a")
        .edge("probe_a", "probe_b")
        .edge("probe_b", "probe_c")
        .edge("probe_c", "probe_d")
        .edge("probe_d", END)
        .compile()
        .unwrap();
    let pipeline = Pipeline::with_graph(Normalizer::default(), graph);

    let result = pipeline.run(&GenerationRequest::new(frame_with_text(), "web"));

    assert_eq!(result.status, RunStatus::CompletedWithErrors);
    assert_eq!(seen.lock().unwrap().len(), 4);
    assert_eq!(result.artifacts["a"], json!("probe_c"));
    assert_eq!(result.artifacts["b"], json!("probe_b"));
    assert!(result.analysis.is_some());
}

#[test]
fn test_phase_events_are_recorded() {
    let result = pipeline().run(&GenerationRequest::new(frame_with_text(), "web"));
    let phases: Vec<&str> = result
        .events
        .iter()
        .filter(|e| e.scope == "pipeline")
        .map(|e| e.message.as_str())
        .collect();

    assert_eq!(
        phases,
        vec!["normalizing", "routing", "emitting", "reducing", "completed"]
    );
}

#[test]
fn test_same_design_same_hash() {
    let pipeline = pipeline();
    let first = pipeline.run(&GenerationRequest::new(profile_card(), "web"));
    let second = pipeline.run(&GenerationRequest::new(profile_card(), "mobile"));
    assert_eq!(first.source_hash, second.source_hash);
    assert!(first.source_hash.is_some());
}
