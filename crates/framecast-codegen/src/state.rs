//! Typed generation state
//!
//! A [`GenerationState`] is the record threaded through every stage of one
//! run. Stages never mutate it: they return a [`StateUpdate`] and the
//! orchestrator folds that update into the next state. Updates can only set
//! or replace named fields and append to the error and event logs, so no
//! stage can erase what an earlier stage produced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use framecast_core::DesignTree;

use crate::error::RoutingError;
use crate::naming;

/// Platform a run emits code for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetPlatform {
    /// React for the browser
    Web,
    /// React Native
    Mobile,
}

impl TargetPlatform {
    /// Every platform, in routing order
    pub const ALL: [TargetPlatform; 2] = [TargetPlatform::Web, TargetPlatform::Mobile];

    /// Canonical identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Mobile => "mobile",
        }
    }
}

impl fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetPlatform {
    type Err = RoutingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "web" | "react" => Ok(Self::Web),
            "mobile" | "react-native" | "react_native" => Ok(Self::Mobile),
            _ => Err(RoutingError::new(raw)),
        }
    }
}

/// Styling convention of the emitted code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StyleApproach {
    /// Tailwind utility classes
    Tailwind,
    /// A co-located `.module.css` file
    CssModules,
    /// Tailwind classes on React Native primitives
    Nativewind,
    /// React Native `StyleSheet.create`
    StyleSheet,
}

impl StyleApproach {
    /// Canonical identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tailwind => "tailwind",
            Self::CssModules => "css-modules",
            Self::Nativewind => "nativewind",
            Self::StyleSheet => "stylesheet",
        }
    }

    /// Whether styles are expressed as utility class names
    pub fn is_utility(&self) -> bool {
        matches!(self, Self::Tailwind | Self::Nativewind)
    }
}

impl fmt::Display for StyleApproach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StyleApproach {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "tailwind" => Ok(Self::Tailwind),
            "css" | "css-modules" | "css_modules" => Ok(Self::CssModules),
            "nativewind" => Ok(Self::Nativewind),
            "stylesheet" | "style-sheet" => Ok(Self::StyleSheet),
            other => Err(format!("unknown style approach '{}'", other)),
        }
    }
}

/// A state field a stage can require or produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StateField {
    /// The structural analysis summary
    Analysis,
    /// The generated source files
    Code,
    /// A named auxiliary artifact
    Artifact(&'static str),
}

impl StateField {
    /// Key used when listing populated fields
    pub fn key(&self) -> String {
        match self {
            Self::Analysis => "analysis".to_string(),
            Self::Code => "code".to_string(),
            Self::Artifact(name) => format!("artifact:{}", name),
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Structural summary of a design tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Name of the root node
    pub root_name: String,
    /// Total number of nodes
    pub node_count: usize,
    /// Nesting depth
    pub depth: usize,
    /// Node count per kind
    pub kind_counts: BTreeMap<String, usize>,
    /// Number of text nodes
    pub text_nodes: usize,
    /// Library components instanced in the tree
    pub components: Vec<String>,
    /// Style variables referenced in the tree
    pub style_variables: Vec<String>,
}

/// One generated source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Project-relative path
    pub path: String,
    /// Language tag (`tsx`, `css`)
    pub language: String,
    /// File contents
    pub contents: String,
}

/// Output of an emitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCode {
    /// Component identifier used in the files
    pub component_name: String,
    /// Platform the code targets
    pub platform: TargetPlatform,
    /// Styling convention used
    pub style: StyleApproach,
    /// Files, entry file first
    pub files: Vec<SourceFile>,
}

impl GeneratedCode {
    /// The component entry file
    pub fn entry(&self) -> Option<&SourceFile> {
        self.files.first()
    }
}

/// Error category recorded by the aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The design tree was rejected
    Validation,
    /// No emitter for the requested platform
    Routing,
    /// A stage failed while running
    Stage,
    /// The run exceeded its time budget
    Timeout,
}

/// A single error recorded during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Stage (or phase) that raised the error
    pub stage: String,
    /// Error category
    pub kind: ErrorKind,
    /// Human-readable message
    pub message: String,
    /// Whether the run continued after this error
    pub recoverable: bool,
}

impl ErrorRecord {
    /// Error raised by a stage
    pub fn stage(stage: impl Into<String>, message: impl Into<String>, recoverable: bool) -> Self {
        Self {
            stage: stage.into(),
            kind: ErrorKind::Stage,
            message: message.into(),
            recoverable,
        }
    }

    /// Fatal error outside any stage
    pub fn fatal(stage: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            kind,
            message: message.into(),
            recoverable: false,
        }
    }
}

/// Severity of a status event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Work is starting
    Pending,
    /// Work finished cleanly
    Success,
    /// Work finished with recoverable problems
    Warning,
    /// Work failed
    Error,
}

/// Timestamped progress entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// When the event was recorded
    pub timestamp: DateTime<Utc>,
    /// Stage name, or `pipeline` for phase changes
    pub scope: String,
    /// Severity
    pub status: EventStatus,
    /// Human-readable message
    pub message: String,
    /// Structured details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl StatusEvent {
    /// Create an event stamped with the current time
    pub fn new(scope: impl Into<String>, status: EventStatus, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            scope: scope.into(),
            status,
            message: message.into(),
            details: None,
        }
    }

    /// Attach structured details
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// The record threaded through one run
#[derive(Debug, Clone)]
pub struct GenerationState {
    tree: Arc<DesignTree>,
    target_platform: String,
    style_approach: String,
    user_instruction: Option<String>,
    component_name: String,
    analysis: Option<AnalysisSummary>,
    code: Option<GeneratedCode>,
    artifacts: BTreeMap<String, Value>,
    errors: Vec<ErrorRecord>,
    events: Vec<StatusEvent>,
}

impl GenerationState {
    /// Create the initial state for a run. The component name defaults to
    /// the root node's name in PascalCase.
    pub fn new(
        tree: DesignTree,
        target_platform: impl Into<String>,
        style_approach: impl Into<String>,
    ) -> Self {
        let component_name = naming::component_identifier(&tree.root().name);
        Self {
            tree: Arc::new(tree),
            target_platform: target_platform.into(),
            style_approach: style_approach.into(),
            user_instruction: None,
            component_name,
            analysis: None,
            code: None,
            artifacts: BTreeMap::new(),
            errors: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Set the free-text instruction; blank text is ignored
    pub fn with_instruction(mut self, instruction: Option<String>) -> Self {
        self.user_instruction = instruction.filter(|text| !text.trim().is_empty());
        self
    }

    /// Override the derived component name
    pub fn with_component_name(mut self, name: &str) -> Self {
        self.component_name = naming::component_identifier(name);
        self
    }

    /// The normalized design tree
    pub fn tree(&self) -> &DesignTree {
        &self.tree
    }

    /// Requested platform, as given by the caller
    pub fn target_platform(&self) -> &str {
        &self.target_platform
    }

    /// Requested style approach, as given by the caller
    pub fn style_approach(&self) -> &str {
        &self.style_approach
    }

    /// Free-text instruction from the requester
    pub fn user_instruction(&self) -> Option<&str> {
        self.user_instruction.as_deref()
    }

    /// Component identifier for generated code
    pub fn component_name(&self) -> &str {
        &self.component_name
    }

    /// Analysis summary, once produced
    pub fn analysis(&self) -> Option<&AnalysisSummary> {
        self.analysis.as_ref()
    }

    /// Generated code, once produced
    pub fn code(&self) -> Option<&GeneratedCode> {
        self.code.as_ref()
    }

    /// A named artifact
    pub fn artifact(&self, name: &str) -> Option<&Value> {
        self.artifacts.get(name)
    }

    /// Every artifact produced so far
    pub fn artifacts(&self) -> &BTreeMap<String, Value> {
        &self.artifacts
    }

    /// Errors recorded so far, in order
    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    /// Status events recorded so far, in order
    pub fn events(&self) -> &[StatusEvent] {
        &self.events
    }

    /// Whether a fatal error has been recorded
    pub fn has_fatal_error(&self) -> bool {
        self.errors.iter().any(|e| !e.recoverable)
    }

    /// Whether a field has been produced
    pub fn is_populated(&self, field: &StateField) -> bool {
        match field {
            StateField::Analysis => self.analysis.is_some(),
            StateField::Code => self.code.is_some(),
            StateField::Artifact(name) => self.artifacts.contains_key(*name),
        }
    }

    /// Keys of every produced field, plus `errors` and `events` when non-empty
    pub fn populated_fields(&self) -> BTreeSet<String> {
        let mut fields = BTreeSet::new();
        if self.analysis.is_some() {
            fields.insert(StateField::Analysis.key());
        }
        if self.code.is_some() {
            fields.insert(StateField::Code.key());
        }
        for name in self.artifacts.keys() {
            fields.insert(format!("artifact:{}", name));
        }
        if !self.errors.is_empty() {
            fields.insert("errors".to_string());
        }
        if !self.events.is_empty() {
            fields.insert("events".to_string());
        }
        fields
    }

    /// Fold an update into a new state
    pub fn apply(mut self, update: StateUpdate) -> Self {
        if let Some(analysis) = update.analysis {
            self.analysis = Some(analysis);
        }
        if let Some(code) = update.code {
            self.code = Some(code);
        }
        self.artifacts.extend(update.artifacts);
        self.events.extend(update.events);
        self
    }

    pub(crate) fn record_error(mut self, record: ErrorRecord) -> Self {
        self.errors.push(record);
        self
    }

    pub(crate) fn record_event(mut self, event: StatusEvent) -> Self {
        self.events.push(event);
        self
    }

    pub(crate) fn into_parts(self) -> StateParts {
        StateParts {
            component_name: self.component_name,
            source_hash: self.tree.content_hash(),
            analysis: self.analysis,
            code: self.code,
            artifacts: self.artifacts,
            errors: self.errors,
            events: self.events,
        }
    }
}

/// Owned contents of a finished state
pub(crate) struct StateParts {
    pub component_name: String,
    pub source_hash: String,
    pub analysis: Option<AnalysisSummary>,
    pub code: Option<GeneratedCode>,
    pub artifacts: BTreeMap<String, Value>,
    pub errors: Vec<ErrorRecord>,
    pub events: Vec<StatusEvent>,
}

/// Changes a stage asks the orchestrator to apply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    analysis: Option<AnalysisSummary>,
    code: Option<GeneratedCode>,
    artifacts: BTreeMap<String, Value>,
    events: Vec<StatusEvent>,
}

impl StateUpdate {
    /// An empty update
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the analysis summary
    pub fn with_analysis(mut self, analysis: AnalysisSummary) -> Self {
        self.analysis = Some(analysis);
        self
    }

    /// Set the generated code
    pub fn with_code(mut self, code: GeneratedCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Set a named artifact
    pub fn with_artifact(mut self, name: impl Into<String>, value: Value) -> Self {
        self.artifacts.insert(name.into(), value);
        self
    }

    /// Append a status event
    pub fn with_event(mut self, event: StatusEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Whether the update changes nothing
    pub fn is_empty(&self) -> bool {
        self.analysis.is_none()
            && self.code.is_none()
            && self.artifacts.is_empty()
            && self.events.is_empty()
    }

    /// First field this update writes that is not in `declared`
    pub fn undeclared_field(&self, declared: &[StateField]) -> Option<String> {
        if self.analysis.is_some() && !declared.contains(&StateField::Analysis) {
            return Some(StateField::Analysis.key());
        }
        if self.code.is_some() && !declared.contains(&StateField::Code) {
            return Some(StateField::Code.key());
        }
        self.artifacts
            .keys()
            .find(|name| {
                !declared
                    .iter()
                    .any(|field| matches!(field, StateField::Artifact(n) if n == name))
            })
            .map(|name| format!("artifact:{}", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framecast_core::Normalizer;
    use rstest::rstest;
    use serde_json::json;

    fn state() -> GenerationState {
        let tree = Normalizer::default()
            .normalize(&json!({"kind": "frame", "id": "1:1", "name": "profile card"}))
            .unwrap();
        GenerationState::new(tree, "web", "tailwind")
    }

    #[rstest]
    #[case("web", TargetPlatform::Web)]
    #[case("WEB", TargetPlatform::Web)]
    #[case("react", TargetPlatform::Web)]
    #[case("mobile", TargetPlatform::Mobile)]
    #[case(" react-native ", TargetPlatform::Mobile)]
    fn test_platform_parse(#[case] raw: &str, #[case] expected: TargetPlatform) {
        assert_eq!(raw.parse::<TargetPlatform>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_platform_is_routing_error() {
        let err = "desktop".parse::<TargetPlatform>().unwrap_err();
        assert_eq!(err.platform, "desktop");
    }

    #[rstest]
    #[case("tailwind", StyleApproach::Tailwind)]
    #[case("css", StyleApproach::CssModules)]
    #[case("CSS-Modules", StyleApproach::CssModules)]
    #[case("nativewind", StyleApproach::Nativewind)]
    #[case("stylesheet", StyleApproach::StyleSheet)]
    fn test_style_parse(#[case] raw: &str, #[case] expected: StyleApproach) {
        assert_eq!(raw.parse::<StyleApproach>().unwrap(), expected);
    }

    #[test]
    fn test_component_name_derived_from_root() {
        assert_eq!(state().component_name(), "ProfileCard");
        assert_eq!(
            state().with_component_name("hero banner").component_name(),
            "HeroBanner"
        );
    }

    #[test]
    fn test_blank_instruction_is_dropped() {
        assert_eq!(state().with_instruction(Some("  ".into())).user_instruction(), None);
        assert_eq!(
            state()
                .with_instruction(Some("make it blue".into()))
                .user_instruction(),
            Some("make it blue")
        );
    }

    #[test]
    fn test_apply_sets_and_appends() {
        let state = state()
            .apply(StateUpdate::new().with_artifact("a", json!(1)))
            .apply(
                StateUpdate::new()
                    .with_artifact("b", json!(2))
                    .with_event(StatusEvent::new("s", EventStatus::Success, "done")),
            );

        assert_eq!(state.artifact("a"), Some(&json!(1)));
        assert_eq!(state.artifact("b"), Some(&json!(2)));
        assert_eq!(state.events().len(), 1);
        assert!(state.is_populated(&StateField::Artifact("a")));
        assert!(!state.is_populated(&StateField::Code));
    }

    #[test]
    fn test_populated_fields_grow() {
        let before = state().populated_fields();
        let after = state()
            .apply(StateUpdate::new().with_artifact("style_map", json!({})))
            .record_error(ErrorRecord::stage("x", "boom", true))
            .populated_fields();

        assert!(before.is_subset(&after));
        assert!(after.contains("artifact:style_map"));
        assert!(after.contains("errors"));
    }

    #[test]
    fn test_undeclared_field_detection() {
        let update = StateUpdate::new()
            .with_artifact("style_map", json!({}))
            .with_artifact("extra", json!({}));
        assert_eq!(
            update.undeclared_field(&[StateField::Artifact("style_map")]),
            Some("artifact:extra".to_string())
        );
        assert_eq!(
            update.undeclared_field(&[
                StateField::Artifact("style_map"),
                StateField::Artifact("extra")
            ]),
            None
        );
    }
}
