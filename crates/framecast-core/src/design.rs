//! Canonical design tree
//!
//! A design tree is the normalized form of the component hierarchy exported
//! from a design tool. Trees are only built by the
//! [`Normalizer`](crate::normalize::Normalizer) and are read-only afterwards:
//! every field is public for reading, but nothing in the pipeline holds a
//! mutable reference to a tree once a run has started.
//!
//! # Canonical form
//!
//! ```yaml
//! id: "1:1"
//! name: Card
//! kind: frame
//! layout:
//!   width: 320
//!   height: 180
//!   direction: vertical
//!   spacing: 8
//!   padding: { top: 16, right: 16, bottom: 16, left: 16 }
//!   sizing: { horizontal: fixed, vertical: hug }
//! styles:
//!   fill: color/surface
//! children:
//!   - id: "1:2"
//!     name: Title
//!     kind: text
//!     text: { content: "Hello" }
//! ```

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Kind of a design node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    /// Layout container
    Frame,
    /// Grouping without layout semantics
    Group,
    /// Component definition
    Component,
    /// Instance of a library component
    Instance,
    /// Text layer
    Text,
    /// Plain shape
    Rectangle,
    /// Vector graphic
    Vector,
    /// Kind not known to this version (kept verbatim, lower-cased)
    Other(String),
}

impl NodeKind {
    /// Parse a kind name. Matching is case-insensitive so that both
    /// `frame` and design-tool style `FRAME` are accepted.
    pub fn parse(raw: &str) -> Self {
        let lowered = raw.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "frame" => Self::Frame,
            "group" => Self::Group,
            "component" => Self::Component,
            "instance" => Self::Instance,
            "text" => Self::Text,
            "rectangle" => Self::Rectangle,
            "vector" => Self::Vector,
            _ => Self::Other(lowered),
        }
    }

    /// Canonical name of the kind
    pub fn as_str(&self) -> &str {
        match self {
            Self::Frame => "frame",
            Self::Group => "group",
            Self::Component => "component",
            Self::Instance => "instance",
            Self::Text => "text",
            Self::Rectangle => "rectangle",
            Self::Vector => "vector",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NodeKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Auto-layout direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutDirection {
    /// Absolute positioning, no auto-layout
    #[default]
    None,
    /// Children laid out in a row
    Horizontal,
    /// Children laid out in a column
    Vertical,
}

/// How a node is sized along one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SizingMode {
    /// Exact size from the layout geometry
    #[default]
    Fixed,
    /// Shrink to fit the content
    Hug,
    /// Stretch to fill the parent
    Fill,
}

/// Per-axis sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Sizing {
    /// Horizontal sizing mode
    pub horizontal: SizingMode,
    /// Vertical sizing mode
    pub vertical: SizingMode,
}

/// Inner padding in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Padding {
    /// Top padding
    pub top: f64,
    /// Right padding
    pub right: f64,
    /// Bottom padding
    pub bottom: f64,
    /// Left padding
    pub left: f64,
}

impl Padding {
    /// Same padding on every side
    pub fn uniform(value: f64) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// Whether all four sides are equal
    pub fn is_uniform(&self) -> bool {
        self.top == self.right && self.right == self.bottom && self.bottom == self.left
    }

    /// Whether no side has padding
    pub fn is_zero(&self) -> bool {
        self.is_uniform() && self.top == 0.0
    }
}

/// Layout attributes of a node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    /// Width in pixels
    pub width: f64,
    /// Height in pixels
    pub height: f64,
    /// Auto-layout direction
    pub direction: LayoutDirection,
    /// Gap between children in pixels
    pub spacing: f64,
    /// Inner padding
    pub padding: Padding,
    /// Sizing modes
    pub sizing: Sizing,
    /// Unrecognised layout attributes, preserved as given
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Text payload of a text node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextContent {
    /// Literal text
    pub content: String,
    /// Unrecognised text attributes, preserved as given
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One node of a design tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignNode {
    /// Identifier, unique within the tree
    pub id: String,

    /// Display name
    pub name: String,

    /// Node kind
    pub kind: NodeKind,

    /// Layout attributes; absent when the node is sized by its content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,

    /// Style-variable references: style property -> variable name
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub styles: BTreeMap<String, String>,

    /// Text payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextContent>,

    /// Component-instance properties
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_properties: Option<BTreeMap<String, Value>>,

    /// Children in render order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DesignNode>,

    /// Unrecognised attributes, preserved as given
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl DesignNode {
    /// Text content, if this node carries any
    pub fn text_content(&self) -> Option<&str> {
        self.text.as_ref().map(|t| t.content.as_str())
    }

    /// Whether this node is an instance of a library component
    pub fn is_instance(&self) -> bool {
        self.kind == NodeKind::Instance
    }
}

/// A normalized, rooted design tree
#[derive(Debug, Clone, PartialEq)]
pub struct DesignTree {
    root: DesignNode,
}

impl DesignTree {
    pub(crate) fn new(root: DesignNode) -> Self {
        Self { root }
    }

    /// The root node
    pub fn root(&self) -> &DesignNode {
        &self.root
    }

    /// Pre-order iteration over every node, root first
    pub fn iter(&self) -> Nodes<'_> {
        Nodes {
            stack: vec![&self.root],
        }
    }

    /// Total number of nodes
    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Depth of the tree (a lone root has depth 1)
    pub fn depth(&self) -> usize {
        fn depth_of(node: &DesignNode) -> usize {
            1 + node.children.iter().map(depth_of).max().unwrap_or(0)
        }
        depth_of(&self.root)
    }

    /// Find a node by identifier
    pub fn find(&self, id: &str) -> Option<&DesignNode> {
        self.iter().find(|node| node.id == id)
    }

    /// Unique names of the library components instanced in the tree
    pub fn component_names(&self) -> BTreeSet<String> {
        self.iter()
            .filter(|node| node.is_instance())
            .map(|node| node.name.clone())
            .collect()
    }

    /// Unique style variables referenced anywhere in the tree
    pub fn style_variables(&self) -> BTreeSet<String> {
        self.iter()
            .flat_map(|node| node.styles.values().cloned())
            .collect()
    }

    /// Canonical JSON form of the tree
    pub fn to_value(&self) -> Value {
        // DesignNode only holds JSON-compatible data; serialization cannot fail
        serde_json::to_value(&self.root).unwrap_or(Value::Null)
    }

    /// Get a hash of the canonical tree (stable across re-normalization)
    pub fn content_hash(&self) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(self.to_value().to_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Pre-order iterator over a design tree
pub struct Nodes<'a> {
    stack: Vec<&'a DesignNode>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a DesignNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(id: &str, kind: NodeKind) -> DesignNode {
        DesignNode {
            id: id.to_string(),
            name: id.to_string(),
            kind,
            layout: None,
            styles: BTreeMap::new(),
            text: None,
            component_properties: None,
            children: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    fn sample_tree() -> DesignTree {
        let mut root = leaf("1:1", NodeKind::Frame);
        let mut row = leaf("1:2", NodeKind::Frame);
        let mut button = leaf("1:3", NodeKind::Instance);
        button.name = "Button".to_string();
        button
            .styles
            .insert("fill".to_string(), "color/primary".to_string());
        row.children.push(button);
        row.children.push(leaf("1:4", NodeKind::Text));
        root.children.push(row);
        root.children.push(leaf("1:5", NodeKind::Vector));
        DesignTree::new(root)
    }

    #[test]
    fn test_kind_parse_is_case_insensitive() {
        assert_eq!(NodeKind::parse("FRAME"), NodeKind::Frame);
        assert_eq!(NodeKind::parse("Instance"), NodeKind::Instance);
        assert_eq!(
            NodeKind::parse("BOOLEAN_OPERATION"),
            NodeKind::Other("boolean_operation".to_string())
        );
    }

    #[test]
    fn test_preorder_iteration() {
        let tree = sample_tree();
        let ids: Vec<&str> = tree.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["1:1", "1:2", "1:3", "1:4", "1:5"]);
    }

    #[test]
    fn test_depth_and_count() {
        let tree = sample_tree();
        assert_eq!(tree.node_count(), 5);
        assert_eq!(tree.depth(), 3);
    }

    #[test]
    fn test_component_names_and_variables() {
        let tree = sample_tree();
        assert!(tree.component_names().contains("Button"));
        assert_eq!(tree.component_names().len(), 1);
        assert!(tree.style_variables().contains("color/primary"));
    }

    #[test]
    fn test_find() {
        let tree = sample_tree();
        assert_eq!(tree.find("1:4").map(|n| &n.kind), Some(&NodeKind::Text));
        assert!(tree.find("9:9").is_none());
    }

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(sample_tree().content_hash(), sample_tree().content_hash());

        let mut other = sample_tree();
        other.root.name = "Renamed".to_string();
        assert_ne!(sample_tree().content_hash(), other.content_hash());
    }

    #[test]
    fn test_serialized_kind_is_lowercase() {
        let value = sample_tree().to_value();
        assert_eq!(value["kind"], "frame");
        assert_eq!(value["children"][0]["children"][0]["kind"], "instance");
        assert!(value.get("layout").is_none());
    }
}
