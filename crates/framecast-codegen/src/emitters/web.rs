//! React emitter

use framecast_core::config::PlatformConfig;
use framecast_core::{DesignNode, DesignTree, NodeKind, ProjectConfig};

use super::markup::{self, Attr, JsxWriter};
use super::style::StyleMapper;
use super::templates::{self, Templates, WebComponentContext};
use super::{EmitOutput, Emission, Emitter};
use crate::error::Result;
use crate::stage::StageFailure;
use crate::state::{GenerationState, SourceFile, StyleApproach, TargetPlatform};

const STYLES: &[StyleApproach] = &[StyleApproach::Tailwind, StyleApproach::CssModules];

/// Emits a Next.js preview page: `<output_dir>/<Component>/page.tsx`
pub struct WebEmitter {
    config: PlatformConfig,
    mapper: StyleMapper,
    templates: Templates,
}

impl WebEmitter {
    /// Create the emitter from project configuration
    pub fn new(config: &ProjectConfig) -> Result<Self> {
        Ok(Self {
            config: config.platforms.web.clone(),
            mapper: StyleMapper::new(&config.theme),
            templates: Templates::new()?,
        })
    }
}

impl Emitter for WebEmitter {
    fn platform(&self) -> TargetPlatform {
        TargetPlatform::Web
    }

    fn supported_styles(&self) -> &[StyleApproach] {
        STYLES
    }

    fn emit(
        &self,
        tree: &DesignTree,
        state: &GenerationState,
        style: StyleApproach,
    ) -> std::result::Result<EmitOutput, StageFailure> {
        let mut emission = Emission::new(&self.config, &self.mapper, style);
        let mut writer = JsxWriter::new(2);
        render_node(tree.root(), &mut emission, &mut writer);

        let component = state.component_name();
        let dir = format!("{}/{}", emission.output_dir(), component);
        let rules = emission.take_rules();
        let stylesheet = (style == StyleApproach::CssModules && !rules.is_empty())
            .then(|| format!("{}.module.css", component));

        let entry = self
            .templates
            .render(
                Templates::WEB_COMPONENT,
                WebComponentContext {
                    component: component.to_string(),
                    imports: emission.imports(),
                    stylesheet: stylesheet.clone(),
                    instruction: state.user_instruction().map(templates::comment_line),
                    body: writer.finish(),
                },
            )
            .map_err(|e| StageFailure::fatal(format!("template rendering failed: {}", e)))?;

        let mut files = vec![SourceFile {
            path: format!("{}/page.tsx", dir),
            language: "tsx".to_string(),
            contents: entry,
        }];
        if let Some(name) = stylesheet {
            let css = self
                .templates
                .render(Templates::CSS_MODULE, minijinja::context! { rules })
                .map_err(|e| StageFailure::fatal(format!("template rendering failed: {}", e)))?;
            files.push(SourceFile {
                path: format!("{}/{}", dir, name),
                language: "css".to_string(),
                contents: css,
            });
        }

        Ok(emission.finish(files))
    }
}

fn render_node(node: &DesignNode, emission: &mut Emission<'_>, writer: &mut JsxWriter) {
    let mut attrs = vec![Attr::text("data-node-id", &node.id)];
    attrs.extend(emission.style_attr(node));

    match node.kind {
        NodeKind::Text => {
            writer.text("p", &attrs, node.text_content().unwrap_or_default(), "<br />");
        }
        NodeKind::Vector => {
            attrs.push(Attr::text("aria-hidden", "true"));
            writer.empty("span", &attrs);
        }
        NodeKind::Instance => match emission.library_component(node) {
            Some(tag) => {
                let mut props = node
                    .component_properties
                    .as_ref()
                    .map(markup::component_props)
                    .unwrap_or_default();
                props.extend(attrs.into_iter().skip(1));
                writer.empty(&tag, &props);
            }
            None => {
                attrs.insert(1, Attr::text("data-component", &node.name));
                container(node, &attrs, emission, writer);
            }
        },
        _ => container(node, &attrs, emission, writer),
    }
}

fn container(node: &DesignNode, attrs: &[Attr], emission: &mut Emission<'_>, writer: &mut JsxWriter) {
    if node.children.is_empty() {
        writer.empty("div", attrs);
        return;
    }
    writer.open("div", attrs);
    for child in &node.children {
        render_node(child, emission, writer);
    }
    writer.close("div");
}
