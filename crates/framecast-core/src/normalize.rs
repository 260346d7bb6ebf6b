//! Design tree normalizer
//!
//! Validates a raw design payload and converts it into a canonical
//! [`DesignTree`]. The normalizer never fills in missing required data: a node
//! without an id, without a kind, or with incomplete geometry is rejected with
//! a [`ValidationError`] naming that node.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

use crate::design::{
    DesignNode, DesignTree, Layout, LayoutDirection, NodeKind, Padding, Sizing, SizingMode,
    TextContent,
};
use crate::error::ValidationError;

/// Default maximum nesting depth
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Attributes with a dedicated field on [`DesignNode`]
const KNOWN_NODE_KEYS: &[&str] = &[
    "id",
    "name",
    "kind",
    "type",
    "layout",
    "styles",
    "text",
    "componentProperties",
    "children",
];

const KNOWN_LAYOUT_KEYS: &[&str] = &[
    "width",
    "height",
    "direction",
    "spacing",
    "padding",
    "sizing",
];

type Checked<T> = std::result::Result<T, ValidationError>;

/// Converts raw design payloads into canonical trees
#[derive(Debug, Clone)]
pub struct Normalizer {
    max_depth: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl Normalizer {
    /// Create a normalizer that rejects trees nested deeper than `max_depth`
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    /// Normalize a raw payload into a design tree
    pub fn normalize(&self, raw: &Value) -> Checked<DesignTree> {
        let mut seen = HashSet::new();
        let root = self.normalize_node(raw, "$", 1, &mut seen)?;
        tracing::debug!(nodes = seen.len(), root = %root.id, "normalized design tree");
        Ok(DesignTree::new(root))
    }

    fn normalize_node(
        &self,
        raw: &Value,
        path: &str,
        depth: usize,
        seen: &mut HashSet<String>,
    ) -> Checked<DesignNode> {
        let obj = raw
            .as_object()
            .ok_or_else(|| ValidationError::new(path, "node must be a mapping"))?;

        let id = match obj.get("id") {
            Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
            Some(Value::String(_)) => {
                return Err(ValidationError::new(path, "node id must not be empty"));
            }
            Some(_) => return Err(ValidationError::new(path, "node id must be a string")),
            None => return Err(ValidationError::new(path, "missing required field 'id'")),
        };

        if depth > self.max_depth {
            return Err(ValidationError::new(
                &id,
                format!("tree is nested deeper than {} levels", self.max_depth),
            ));
        }

        if !seen.insert(id.clone()) {
            return Err(ValidationError::new(&id, "duplicate node id"));
        }

        let kind = match obj.get("kind").or_else(|| obj.get("type")) {
            Some(Value::String(kind)) if !kind.trim().is_empty() => NodeKind::parse(kind),
            Some(_) => return Err(ValidationError::new(&id, "node kind must be a non-empty string")),
            None => return Err(ValidationError::new(&id, "missing required field 'kind'")),
        };

        let name = match obj.get("name") {
            Some(Value::String(name)) => name.clone(),
            Some(Value::Null) | None => id.clone(),
            Some(_) => return Err(ValidationError::new(&id, "node name must be a string")),
        };

        let layout = match obj.get("layout") {
            Some(Value::Null) | None => None,
            Some(raw_layout) => Some(normalize_layout(&id, raw_layout)?),
        };

        let styles = match obj.get("styles") {
            Some(Value::Null) | None => BTreeMap::new(),
            Some(Value::Object(styles)) => normalize_styles(&id, styles)?,
            Some(_) => return Err(ValidationError::new(&id, "styles must be a mapping")),
        };

        let text = match obj.get("text") {
            Some(Value::Null) | None => None,
            Some(raw_text) => Some(normalize_text(&id, raw_text)?),
        };

        let component_properties = match obj.get("componentProperties") {
            Some(Value::Null) | None => None,
            Some(Value::Object(props)) => Some(
                props
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect::<BTreeMap<_, _>>(),
            ),
            Some(_) => {
                return Err(ValidationError::new(
                    &id,
                    "componentProperties must be a mapping",
                ));
            }
        };

        let children = match obj.get("children") {
            Some(Value::Null) | None => Vec::new(),
            Some(Value::Array(items)) => {
                let mut children = Vec::with_capacity(items.len());
                for (index, child) in items.iter().enumerate() {
                    let child_path = format!("{}.children[{}]", path, index);
                    children.push(self.normalize_node(child, &child_path, depth + 1, seen)?);
                }
                children
            }
            Some(_) => return Err(ValidationError::new(&id, "children must be a sequence")),
        };

        Ok(DesignNode {
            id,
            name,
            kind,
            layout,
            styles,
            text,
            component_properties,
            children,
            extra: node_extras(obj),
        })
    }
}

// `type` is only consumed as an alias when `kind` is absent
fn node_extras(obj: &Map<String, Value>) -> BTreeMap<String, Value> {
    let mut extra = extra_attributes(obj, KNOWN_NODE_KEYS);
    if let (Some(_), Some(alias)) = (obj.get("kind"), obj.get("type")) {
        extra.insert("type".to_string(), alias.clone());
    }
    extra
}

fn extra_attributes(obj: &Map<String, Value>, known: &[&str]) -> BTreeMap<String, Value> {
    obj.iter()
        .filter(|(key, _)| !known.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn normalize_layout(id: &str, raw: &Value) -> Checked<Layout> {
    let obj = raw
        .as_object()
        .ok_or_else(|| ValidationError::new(id, "layout must be a mapping"))?;

    let width = required_dimension(id, obj, "width")?;
    let height = required_dimension(id, obj, "height")?;

    let direction = match obj.get("direction") {
        Some(Value::Null) | None => LayoutDirection::None,
        Some(Value::String(dir)) => match dir.to_ascii_lowercase().as_str() {
            "none" => LayoutDirection::None,
            "horizontal" | "row" => LayoutDirection::Horizontal,
            "vertical" | "column" => LayoutDirection::Vertical,
            other => {
                return Err(ValidationError::new(
                    id,
                    format!("unknown layout direction '{}'", other),
                ));
            }
        },
        Some(_) => return Err(ValidationError::new(id, "layout direction must be a string")),
    };

    let spacing = match obj.get("spacing") {
        Some(Value::Null) | None => 0.0,
        Some(value) => finite_number(id, "spacing", value)?,
    };

    let padding = match obj.get("padding") {
        Some(Value::Null) | None => Padding::default(),
        Some(Value::Object(sides)) => Padding {
            top: optional_side(id, sides, "top")?,
            right: optional_side(id, sides, "right")?,
            bottom: optional_side(id, sides, "bottom")?,
            left: optional_side(id, sides, "left")?,
        },
        Some(value) => {
            let uniform = finite_number(id, "padding", value)?;
            if uniform < 0.0 {
                return Err(ValidationError::new(id, "padding must not be negative"));
            }
            Padding::uniform(uniform)
        }
    };

    let sizing = match obj.get("sizing") {
        Some(Value::Null) | None => Sizing::default(),
        Some(Value::Object(axes)) => Sizing {
            horizontal: sizing_mode(id, axes.get("horizontal"))?,
            vertical: sizing_mode(id, axes.get("vertical"))?,
        },
        Some(_) => return Err(ValidationError::new(id, "layout sizing must be a mapping")),
    };

    Ok(Layout {
        width,
        height,
        direction,
        spacing,
        padding,
        sizing,
        extra: extra_attributes(obj, KNOWN_LAYOUT_KEYS),
    })
}

fn required_dimension(id: &str, obj: &Map<String, Value>, field: &str) -> Checked<f64> {
    let value = obj.get(field).ok_or_else(|| {
        ValidationError::new(id, format!("missing required geometry field '{}'", field))
    })?;
    let number = finite_number(id, field, value)?;
    if number < 0.0 {
        return Err(ValidationError::new(
            id,
            format!("geometry field '{}' must not be negative", field),
        ));
    }
    Ok(number)
}

fn finite_number(id: &str, field: &str, value: &Value) -> Checked<f64> {
    value
        .as_f64()
        .filter(|n| n.is_finite())
        .ok_or_else(|| ValidationError::new(id, format!("'{}' must be a finite number", field)))
}

fn optional_side(id: &str, sides: &Map<String, Value>, side: &str) -> Checked<f64> {
    match sides.get(side) {
        Some(Value::Null) | None => Ok(0.0),
        Some(value) => {
            let n = finite_number(id, side, value)?;
            if n < 0.0 {
                return Err(ValidationError::new(id, "padding must not be negative"));
            }
            Ok(n)
        }
    }
}

fn sizing_mode(id: &str, raw: Option<&Value>) -> Checked<SizingMode> {
    match raw {
        Some(Value::Null) | None => Ok(SizingMode::Fixed),
        Some(Value::String(mode)) => match mode.to_ascii_lowercase().as_str() {
            "fixed" => Ok(SizingMode::Fixed),
            "hug" => Ok(SizingMode::Hug),
            "fill" => Ok(SizingMode::Fill),
            other => Err(ValidationError::new(
                id,
                format!("unknown sizing mode '{}'", other),
            )),
        },
        Some(_) => Err(ValidationError::new(id, "sizing mode must be a string")),
    }
}

fn normalize_styles(id: &str, styles: &Map<String, Value>) -> Checked<BTreeMap<String, String>> {
    styles
        .iter()
        .map(|(property, variable)| match variable {
            Value::String(name) if !name.is_empty() => Ok((property.clone(), name.clone())),
            _ => Err(ValidationError::new(
                id,
                format!("style '{}' must reference a variable name", property),
            )),
        })
        .collect()
}

fn normalize_text(id: &str, raw: &Value) -> Checked<TextContent> {
    match raw {
        Value::String(content) => Ok(TextContent {
            content: content.clone(),
            extra: BTreeMap::new(),
        }),
        Value::Object(obj) => {
            let content = match obj.get("content") {
                Some(Value::String(content)) => content.clone(),
                _ => {
                    return Err(ValidationError::new(
                        id,
                        "text payload must carry a string 'content'",
                    ));
                }
            };
            Ok(TextContent {
                content,
                extra: extra_attributes(obj, &["content"]),
            })
        }
        _ => Err(ValidationError::new(id, "text must be a string or a mapping")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(raw: Value) -> Checked<DesignTree> {
        Normalizer::default().normalize(&raw)
    }

    #[test]
    fn test_minimal_tree() {
        let tree = normalize(json!({
            "kind": "frame",
            "id": "1:1",
            "children": [{"kind": "text", "id": "1:2", "text": {"content": "Hi"}}]
        }))
        .unwrap();

        assert_eq!(tree.root().kind, NodeKind::Frame);
        assert_eq!(tree.root().name, "1:1");
        assert_eq!(tree.root().children[0].text_content(), Some("Hi"));
    }

    #[test]
    fn test_type_alias_for_kind() {
        let tree = normalize(json!({"type": "INSTANCE", "id": "2:1", "name": "Button"})).unwrap();
        assert_eq!(tree.root().kind, NodeKind::Instance);
        assert!(!tree.root().extra.contains_key("type"));
    }

    #[test]
    fn test_missing_kind_names_node() {
        let err = normalize(json!({
            "kind": "frame",
            "id": "1:1",
            "children": [{"id": "1:7"}]
        }))
        .unwrap_err();
        assert_eq!(err.node_id, "1:7");
        assert!(err.message.contains("kind"));
    }

    #[test]
    fn test_missing_id_names_path() {
        let err = normalize(json!({
            "kind": "frame",
            "id": "1:1",
            "children": [{"kind": "text"}, {"kind": "frame"}]
        }))
        .unwrap_err();
        assert_eq!(err.node_id, "$.children[0]");
    }

    #[test]
    fn test_partial_geometry_rejected() {
        let err = normalize(json!({
            "kind": "frame",
            "id": "1:1",
            "layout": {"width": 100}
        }))
        .unwrap_err();
        assert_eq!(err.node_id, "1:1");
        assert!(err.message.contains("height"));
    }

    #[test]
    fn test_non_numeric_geometry_rejected() {
        let err = normalize(json!({
            "kind": "frame",
            "id": "1:1",
            "layout": {"width": "wide", "height": 10}
        }))
        .unwrap_err();
        assert!(err.message.contains("width"));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = normalize(json!({
            "kind": "frame",
            "id": "1:1",
            "children": [{"kind": "text", "id": "1:2"}, {"kind": "text", "id": "1:2"}]
        }))
        .unwrap_err();
        assert_eq!(err.node_id, "1:2");
        assert!(err.message.contains("duplicate"));
    }

    #[test]
    fn test_depth_limit() {
        let raw = json!({
            "kind": "frame", "id": "a",
            "children": [{"kind": "frame", "id": "b",
                "children": [{"kind": "frame", "id": "c"}]}]
        });
        let err = Normalizer::new(2).normalize(&raw).unwrap_err();
        assert_eq!(err.node_id, "c");
    }

    #[test]
    fn test_layout_defaults_and_padding_shorthand() {
        let tree = normalize(json!({
            "kind": "frame",
            "id": "1:1",
            "layout": {"width": 320, "height": 200, "direction": "VERTICAL", "padding": 12}
        }))
        .unwrap();
        let layout = tree.root().layout.as_ref().unwrap();
        assert_eq!(layout.direction, LayoutDirection::Vertical);
        assert_eq!(layout.padding, Padding::uniform(12.0));
        assert_eq!(layout.sizing.horizontal, SizingMode::Fixed);
    }

    #[test]
    fn test_unknown_attributes_preserved() {
        let tree = normalize(json!({
            "kind": "frame",
            "id": "1:1",
            "opacity": 0.5,
            "layout": {"width": 1, "height": 1, "constraints": {"x": "LEFT"}},
            "text": {"content": "x", "fontFamily": "Inter"}
        }))
        .unwrap();
        let root = tree.root();
        assert_eq!(root.extra.get("opacity"), Some(&json!(0.5)));
        assert!(root.layout.as_ref().unwrap().extra.contains_key("constraints"));
        assert!(root.text.as_ref().unwrap().extra.contains_key("fontFamily"));

        let value = tree.to_value();
        assert_eq!(value["opacity"], json!(0.5));
        assert_eq!(value["text"]["fontFamily"], "Inter");
    }

    #[test]
    fn test_child_order_preserved() {
        let tree = normalize(json!({
            "kind": "frame",
            "id": "r",
            "children": [
                {"kind": "text", "id": "c"},
                {"kind": "text", "id": "a"},
                {"kind": "text", "id": "b"}
            ]
        }))
        .unwrap();
        let ids: Vec<&str> = tree.root().children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_renormalization_is_identity() {
        let tree = normalize(json!({
            "type": "FRAME",
            "id": "1:1",
            "name": "Card",
            "layout": {"width": 320, "height": 180, "direction": "row", "spacing": 8, "padding": 4},
            "styles": {"fill": "color/surface"},
            "pluginData": {"k": "v"},
            "children": [
                {"kind": "INSTANCE", "id": "1:2", "name": "Button",
                 "componentProperties": {"Variant": {"type": "VARIANT", "value": "primary"}}},
                {"kind": "text", "id": "1:3", "text": "Hello"}
            ]
        }))
        .unwrap();

        let again = Normalizer::default().normalize(&tree.to_value()).unwrap();
        assert_eq!(tree, again);
        assert_eq!(tree.content_hash(), again.content_hash());
    }

    #[test]
    fn test_non_string_style_rejected() {
        let err = normalize(json!({
            "kind": "frame",
            "id": "1:1",
            "styles": {"fill": 3}
        }))
        .unwrap_err();
        assert!(err.message.contains("fill"));
    }
}
