//! Platform emitter family
//!
//! Each emitter turns the normalized tree into source files for one
//! [`TargetPlatform`]. Internally an emitter maps style variables
//! ([`style`]), writes per-node markup ([`markup`]) and assembles files from
//! templates ([`templates`]); to the orchestrator it is a single stage,
//! wrapped by [`EmitterStage`].
//!
//! Emitters are only reachable through the [`EmitterRegistry`], which the
//! pipeline uses to wire one routing branch per platform.

pub mod markup;
pub mod mobile;
pub mod style;
pub mod templates;
pub mod web;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::json;

use framecast_core::config::PlatformConfig;
use framecast_core::{DesignNode, DesignTree, ProjectConfig};

use crate::error::Result;
use crate::naming;
use crate::stage::{Stage, StageFailure};
use crate::state::{
    GeneratedCode, GenerationState, SourceFile, StateField, StateUpdate, StyleApproach,
    TargetPlatform,
};

pub use mobile::MobileEmitter;
pub use web::WebEmitter;

use markup::Attr;
use style::{Dialect, StyleMapper, TokenUsage};
use templates::{DeclarationContext, ImportContext, RuleContext};

/// Files and side information produced by an emitter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOutput {
    /// Files, entry file first
    pub files: Vec<SourceFile>,
    /// Style variable -> token used
    pub style_map: BTreeMap<String, String>,
    /// Recoverable problems (token and catalog misses)
    pub warnings: Vec<String>,
}

/// Produces source code for one platform
pub trait Emitter: Send + Sync {
    /// Platform served
    fn platform(&self) -> TargetPlatform;

    /// Style approaches this emitter can produce
    fn supported_styles(&self) -> &[StyleApproach];

    /// Emit files for the tree
    fn emit(
        &self,
        tree: &DesignTree,
        state: &GenerationState,
        style: StyleApproach,
    ) -> std::result::Result<EmitOutput, StageFailure>;
}

/// Adapts an [`Emitter`] to the stage contract
pub struct EmitterStage {
    name: String,
    emitter: Arc<dyn Emitter>,
}

impl EmitterStage {
    /// Artifact holding the style-variable mapping
    pub const STYLE_MAP: &'static str = "style_map";

    const PRODUCES: [StateField; 2] = [StateField::Code, StateField::Artifact(Self::STYLE_MAP)];

    /// Wrap an emitter; the stage is named `emit_<platform>`
    pub fn new(emitter: Arc<dyn Emitter>) -> Self {
        Self {
            name: format!("emit_{}", emitter.platform()),
            emitter,
        }
    }
}

impl Stage for EmitterStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn produces(&self) -> &[StateField] {
        &Self::PRODUCES
    }

    fn run(&self, state: &GenerationState) -> std::result::Result<StateUpdate, StageFailure> {
        let style: StyleApproach = state
            .style_approach()
            .parse()
            .map_err(StageFailure::fatal)?;
        if !self.emitter.supported_styles().contains(&style) {
            return Err(StageFailure::fatal(format!(
                "style approach '{}' is not supported for {}",
                style,
                self.emitter.platform()
            )));
        }

        let output = self.emitter.emit(state.tree(), state, style)?;
        tracing::debug!(
            stage = %self.name,
            files = output.files.len(),
            warnings = output.warnings.len(),
            "Emitted code"
        );

        let code = GeneratedCode {
            component_name: state.component_name().to_string(),
            platform: self.emitter.platform(),
            style,
            files: output.files,
        };
        let update = StateUpdate::new()
            .with_code(code)
            .with_artifact(Self::STYLE_MAP, json!(output.style_map));

        if output.warnings.is_empty() {
            Ok(update)
        } else {
            Err(StageFailure::recoverable(output.warnings.join("; ")).with_partial(update))
        }
    }
}

/// Emitters keyed by platform
#[derive(Default, Clone)]
pub struct EmitterRegistry {
    emitters: BTreeMap<TargetPlatform, Arc<dyn Emitter>>,
}

impl EmitterRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in web and mobile emitters
    pub fn builtin(config: &ProjectConfig) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(WebEmitter::new(config)?));
        registry.register(Arc::new(MobileEmitter::new(config)?));
        Ok(registry)
    }

    /// Add or replace the emitter for its platform
    pub fn register(&mut self, emitter: Arc<dyn Emitter>) {
        self.emitters.insert(emitter.platform(), emitter);
    }

    /// Emitter for a platform
    pub fn get(&self, platform: TargetPlatform) -> Option<&Arc<dyn Emitter>> {
        self.emitters.get(&platform)
    }

    /// Registered platforms, in order
    pub fn platforms(&self) -> Vec<TargetPlatform> {
        self.emitters.keys().copied().collect()
    }

    /// One stage per registered emitter
    pub fn stages(&self) -> Vec<(TargetPlatform, EmitterStage)> {
        self.emitters
            .iter()
            .map(|(platform, emitter)| (*platform, EmitterStage::new(Arc::clone(emitter))))
            .collect()
    }
}

impl std::fmt::Debug for EmitterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmitterRegistry")
            .field("platforms", &self.platforms())
            .finish()
    }
}

/// Per-emission bookkeeping shared by the web and mobile emitters
pub(crate) struct Emission<'a> {
    config: &'a PlatformConfig,
    mapper: &'a StyleMapper,
    style: StyleApproach,
    usage: TokenUsage,
    components: BTreeSet<String>,
    catalog_misses: BTreeSet<String>,
    rules: Vec<RuleContext>,
}

impl<'a> Emission<'a> {
    pub(crate) fn new(config: &'a PlatformConfig, mapper: &'a StyleMapper, style: StyleApproach) -> Self {
        Self {
            config,
            mapper,
            style,
            usage: TokenUsage::default(),
            components: BTreeSet::new(),
            catalog_misses: BTreeSet::new(),
            rules: Vec::new(),
        }
    }

    /// Tag of the library component an instance maps to, or `None` when
    /// the component is not in the catalog (recorded as a miss)
    pub(crate) fn library_component(&mut self, node: &DesignNode) -> Option<String> {
        let tag = naming::pascal_case(&node.name);
        let known = self.config.has_component(&node.name) || self.config.has_component(&tag);
        if tag.is_empty() || !known {
            self.catalog_misses.insert(node.name.clone());
            return None;
        }
        self.components.insert(tag.clone());
        Some(tag)
    }

    /// Styling attribute for a node, if it has any styling
    pub(crate) fn style_attr(&mut self, node: &DesignNode) -> Option<Attr> {
        match self.style {
            StyleApproach::Tailwind | StyleApproach::Nativewind => {
                let classes = self.mapper.utility_classes(node, &mut self.usage);
                (!classes.is_empty()).then(|| Attr::text("className", classes.join(" ")))
            }
            StyleApproach::CssModules => self
                .rule(node, Dialect::Css)
                .map(|key| Attr::expr("className", format!("styles.{}", key))),
            StyleApproach::StyleSheet => self
                .rule(node, Dialect::Native)
                .map(|key| Attr::expr("style", format!("styles.{}", key))),
        }
    }

    fn rule(&mut self, node: &DesignNode, dialect: Dialect) -> Option<String> {
        let declarations = self.mapper.declarations(node, dialect, &mut self.usage);
        if declarations.is_empty() {
            return None;
        }
        let key = naming::style_key(&node.name, &node.id);
        self.rules.push(RuleContext {
            name: key.clone(),
            declarations: declarations
                .iter()
                .map(|d| DeclarationContext {
                    property: d.property_for(dialect),
                    value: d.value.render(dialect),
                })
                .collect(),
        });
        Some(key)
    }

    /// Import statements for the library components used
    pub(crate) fn imports(&self) -> Vec<ImportContext> {
        if self.components.is_empty() {
            return Vec::new();
        }
        vec![ImportContext {
            module: self.config.component_library.clone(),
            names: self.components.iter().cloned().collect(),
        }]
    }

    pub(crate) fn uses_tokens(&self) -> bool {
        !self.usage.style_map.is_empty()
    }

    pub(crate) fn token_module(&self) -> &str {
        &self.config.token_module
    }

    pub(crate) fn output_dir(&self) -> &str {
        self.config.output_dir.trim_end_matches('/')
    }

    pub(crate) fn take_rules(&mut self) -> Vec<RuleContext> {
        std::mem::take(&mut self.rules)
    }

    /// Finish with the given files
    pub(crate) fn finish(self, files: Vec<SourceFile>) -> EmitOutput {
        let mut warnings = Vec::new();
        if !self.usage.misses.is_empty() {
            warnings.push(format!(
                "unknown style variables: {}",
                self.usage.misses.iter().cloned().collect::<Vec<_>>().join(", ")
            ));
        }
        if !self.catalog_misses.is_empty() {
            warnings.push(format!(
                "components not in the {} catalog: {}",
                self.config.component_library,
                self.catalog_misses.iter().cloned().collect::<Vec<_>>().join(", ")
            ));
        }
        EmitOutput {
            files,
            style_map: self.usage.style_map,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framecast_core::Normalizer;

    fn state(platform: &str, style: &str) -> GenerationState {
        let tree = Normalizer::default()
            .normalize(&json!({
                "kind": "frame", "id": "1:1", "name": "Card",
                "styles": {"fill": "color/surface"},
                "children": [{"kind": "text", "id": "1:2", "name": "Title", "text": "Hello"}]
            }))
            .unwrap();
        GenerationState::new(tree, platform, style)
    }

    fn stage_for(platform: TargetPlatform) -> EmitterStage {
        let registry = EmitterRegistry::builtin(&ProjectConfig::default()).unwrap();
        registry
            .stages()
            .into_iter()
            .find(|(p, _)| *p == platform)
            .map(|(_, stage)| stage)
            .unwrap()
    }

    #[test]
    fn test_registry_has_both_platforms() {
        let registry = EmitterRegistry::builtin(&ProjectConfig::default()).unwrap();
        assert_eq!(
            registry.platforms(),
            vec![TargetPlatform::Web, TargetPlatform::Mobile]
        );
        assert_eq!(
            registry.get(TargetPlatform::Mobile).unwrap().platform(),
            TargetPlatform::Mobile
        );
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(stage_for(TargetPlatform::Web).name(), "emit_web");
        assert_eq!(stage_for(TargetPlatform::Mobile).name(), "emit_mobile");
    }

    #[test]
    fn test_stage_writes_code_and_style_map() {
        let update = stage_for(TargetPlatform::Web)
            .run(&state("web", "tailwind"))
            .unwrap();
        let state = state("web", "tailwind").apply(update);

        let code = state.code().unwrap();
        assert_eq!(code.component_name, "Card");
        assert_eq!(code.style, StyleApproach::Tailwind);
        assert_eq!(
            state.artifact(EmitterStage::STYLE_MAP),
            Some(&json!({"color/surface": "color-surface"}))
        );
    }

    #[test]
    fn test_unsupported_style_is_fatal() {
        let failure = stage_for(TargetPlatform::Web)
            .run(&state("web", "stylesheet"))
            .unwrap_err();
        assert!(!failure.recoverable);
        assert!(failure.message.contains("not supported"));

        let failure = stage_for(TargetPlatform::Mobile)
            .run(&state("mobile", "sass"))
            .unwrap_err();
        assert!(!failure.recoverable);
        assert!(failure.message.contains("sass"));
    }
}
