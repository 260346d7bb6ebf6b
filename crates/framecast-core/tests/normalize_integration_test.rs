//! Integration tests for loading design payloads from disk and normalizing them
//!
//! Tests use temporary directories with real file fixtures to verify:
//! - Design files in JSON and YAML normalize to the same tree
//! - Configuration limits flow into the normalizer
//! - Validation errors name the offending node

use rstest::rstest;
use serde_json::{Value, json};
use tempfile::TempDir;
use framecast_core::design::{LayoutDirection, SizingMode};
use framecast_core::{Config, NodeKind, Normalizer};

fn card_design() -> Value {
    json!({
        "type": "FRAME",
        "id": "10:1",
        "name": "Profile Card",
        "layout": {
            "width": 360, "height": 240,
            "direction": "VERTICAL", "spacing": 12,
            "padding": {"top": 16, "bottom": 16, "left": 24, "right": 24},
            "sizing": {"horizontal": "FILL", "vertical": "HUG"}
        },
        "styles": {"fill": "color/surface"},
        "children": [
            {"type": "TEXT", "id": "10:2", "name": "Title", "text": {"content": "Ada Lovelace"},
             "styles": {"text": "color/on-surface"}},
            {"type": "INSTANCE", "id": "10:3", "name": "Button",
             "componentProperties": {"Label#12:0": {"type": "TEXT", "value": "Follow"}}}
        ]
    })
}

fn read_design(path: &std::path::Path) -> Value {
    let contents = std::fs::read_to_string(path).unwrap();
    if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&contents).unwrap()
    } else {
        serde_yaml::from_str(&contents).unwrap()
    }
}

#[test]
fn test_json_and_yaml_designs_normalize_identically() {
    let dir = TempDir::new().unwrap();
    let json_path = dir.path().join("card.json");
    let yaml_path = dir.path().join("card.yaml");
    std::fs::write(&json_path, serde_json::to_string_pretty(&card_design()).unwrap()).unwrap();
    std::fs::write(&yaml_path, serde_yaml::to_string(&card_design()).unwrap()).unwrap();

    let normalizer = Normalizer::default();
    let from_json = normalizer.normalize(&read_design(&json_path)).unwrap();
    let from_yaml = normalizer.normalize(&read_design(&yaml_path)).unwrap();

    assert_eq!(from_json, from_yaml);
    assert_eq!(from_json.content_hash(), from_yaml.content_hash());
}

#[test]
fn test_card_design_is_fully_canonicalized() {
    let tree = Normalizer::default().normalize(&card_design()).unwrap();
    let root = tree.root();

    assert_eq!(root.kind, NodeKind::Frame);
    let layout = root.layout.as_ref().unwrap();
    assert_eq!(layout.direction, LayoutDirection::Vertical);
    assert_eq!(layout.sizing.horizontal, SizingMode::Fill);
    assert_eq!(layout.sizing.vertical, SizingMode::Hug);
    assert_eq!(layout.padding.left, 24.0);

    assert_eq!(tree.node_count(), 3);
    assert_eq!(
        tree.component_names().into_iter().collect::<Vec<_>>(),
        vec!["Button".to_string()]
    );
    assert_eq!(tree.style_variables().len(), 2);
}

#[test]
fn test_canonical_form_is_a_fixed_point() {
    let normalizer = Normalizer::default();
    let once = normalizer.normalize(&card_design()).unwrap();
    let twice = normalizer.normalize(&once.to_value()).unwrap();
    let thrice = normalizer.normalize(&twice.to_value()).unwrap();

    assert_eq!(once, twice);
    assert_eq!(twice.to_value(), thrice.to_value());
}

#[test]
fn test_config_depth_limit_applies() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("framecast.yaml"), "pipeline:\n  max_depth: 1\n").unwrap();
    let config = Config::load(dir.path()).unwrap();

    let normalizer = Normalizer::new(config.project.pipeline.max_depth);
    let err = normalizer.normalize(&card_design()).unwrap_err();
    assert_eq!(err.node_id, "10:2");
}

#[rstest]
#[case::missing_kind(json!({"id": "5:5"}), "5:5", "kind")]
#[case::missing_width(json!({"kind": "frame", "id": "5:6", "layout": {"height": 3}}), "5:6", "width")]
#[case::negative_height(json!({"kind": "frame", "id": "5:7", "layout": {"width": 3, "height": -1}}), "5:7", "height")]
#[case::bad_direction(json!({"kind": "frame", "id": "5:8", "layout": {"width": 1, "height": 1, "direction": "diagonal"}}), "5:8", "diagonal")]
#[case::bad_children(json!({"kind": "frame", "id": "5:9", "children": {"a": 1}}), "5:9", "sequence")]
#[case::bad_text(json!({"kind": "text", "id": "5:10", "text": {"size": 12}}), "5:10", "content")]
fn test_invalid_child_is_reported(
    #[case] child: Value,
    #[case] expected_id: &str,
    #[case] expected_fragment: &str,
) {
    let raw = json!({"kind": "frame", "id": "root", "children": [child]});
    let err = Normalizer::default().normalize(&raw).unwrap_err();
    assert_eq!(err.node_id, expected_id);
    assert!(
        err.message.contains(expected_fragment),
        "message '{}' should mention '{}'",
        err.message,
        expected_fragment
    );
}
