//! React Native emitter

use std::collections::BTreeSet;

use framecast_core::config::PlatformConfig;
use framecast_core::{DesignNode, DesignTree, NodeKind, ProjectConfig};

use super::markup::{self, Attr, JsxWriter};
use super::style::StyleMapper;
use super::templates::{self, MobileComponentContext, Templates};
use super::{EmitOutput, Emission, Emitter};
use crate::error::Result;
use crate::stage::StageFailure;
use crate::state::{GenerationState, SourceFile, StyleApproach, TargetPlatform};

const STYLES: &[StyleApproach] = &[StyleApproach::Nativewind, StyleApproach::StyleSheet];

/// Emits an Expo Router screen: `<output_dir>/<Component>.tsx`
pub struct MobileEmitter {
    config: PlatformConfig,
    mapper: StyleMapper,
    templates: Templates,
}

impl MobileEmitter {
    /// Create the emitter from project configuration
    pub fn new(config: &ProjectConfig) -> Result<Self> {
        Ok(Self {
            config: config.platforms.mobile.clone(),
            mapper: StyleMapper::new(&config.theme),
            templates: Templates::new()?,
        })
    }
}

impl Emitter for MobileEmitter {
    fn platform(&self) -> TargetPlatform {
        TargetPlatform::Mobile
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
        let mut primitives = BTreeSet::new();
        let mut writer = JsxWriter::new(2);
        render_node(tree.root(), &mut emission, &mut primitives, &mut writer);

        let rules = emission.take_rules();
        if !rules.is_empty() {
            primitives.insert("StyleSheet");
        }
        let token_module = (style == StyleApproach::StyleSheet && emission.uses_tokens())
            .then(|| emission.token_module().to_string());

        let component = state.component_name();
        let contents = self
            .templates
            .render(
                Templates::MOBILE_COMPONENT,
                MobileComponentContext {
                    component: component.to_string(),
                    primitives: primitives.iter().map(|p| p.to_string()).collect(),
                    imports: emission.imports(),
                    token_module,
                    instruction: state.user_instruction().map(templates::comment_line),
                    body: writer.finish(),
                    rules,
                },
            )
            .map_err(|e| StageFailure::fatal(format!("template rendering failed: {}", e)))?;

        let file = SourceFile {
            path: format!("{}/{}.tsx", emission.output_dir(), component),
            language: "tsx".to_string(),
            contents,
        };
        Ok(emission.finish(vec![file]))
    }
}

fn render_node(
    node: &DesignNode,
    emission: &mut Emission<'_>,
    primitives: &mut BTreeSet<&'static str>,
    writer: &mut JsxWriter,
) {
    let mut attrs = vec![Attr::text("nativeID", &node.id)];
    attrs.extend(emission.style_attr(node));

    match node.kind {
        NodeKind::Text => {
            primitives.insert("Text");
            writer.text("Text", &attrs, node.text_content().unwrap_or_default(), "{'\\n'}");
        }
        NodeKind::Vector => {
            primitives.insert("View");
            attrs.push(Attr::flag("accessibilityElementsHidden"));
            writer.empty("View", &attrs);
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
                attrs.insert(1, Attr::text("testID", &node.name));
                container(node, &attrs, emission, primitives, writer);
            }
        },
        _ => container(node, &attrs, emission, primitives, writer),
    }
}

fn container(
    node: &DesignNode,
    attrs: &[Attr],
    emission: &mut Emission<'_>,
    primitives: &mut BTreeSet<&'static str>,
    writer: &mut JsxWriter,
) {
    primitives.insert("View");
    if node.children.is_empty() {
        writer.empty("View", attrs);
        return;
    }
    writer.open("View", attrs);
    for child in &node.children {
        render_node(child, emission, primitives, writer);
    }
    writer.close("View");
}

#[cfg(test)]
mod tests {
    use super::*;
    use framecast_core::Normalizer;
    use serde_json::{Value, json};

    fn emit(design: Value, config: ProjectConfig, style: StyleApproach) -> EmitOutput {
        let tree = Normalizer::default().normalize(&design).unwrap();
        let state = GenerationState::new(tree.clone(), "mobile", style.as_str());
        MobileEmitter::new(&config)
            .unwrap()
            .emit(&tree, &state, style)
            .unwrap()
    }

    fn screen() -> Value {
        json!({
            "kind": "frame", "id": "2:1", "name": "Login",
            "layout": {"width": 390, "height": 844, "direction": "vertical", "spacing": 12,
                       "sizing": {"horizontal": "fill", "vertical": "fill"}},
            "styles": {"fill": "color/background"},
            "children": [
                {"kind": "text", "id": "2:2", "name": "Heading", "text": "Welcome\nback"},
                {"kind": "instance", "id": "2:3", "name": "Text Field"}
            ]
        })
    }

    #[test]
    fn test_nativewind_screen() {
        let output = emit(screen(), ProjectConfig::default(), StyleApproach::Nativewind);
        let file = &output.files[0];

        assert_eq!(file.path, "app/(screens)/Login.tsx");
        assert_eq!(
            file.contents,
            "import React from 'react'\n\
             import { Text, View } from 'react-native'\n\
             import { TextField } from '@/components/ui'\n\
             \n\
             export default function Login() {\n  return (\n    \
             <View nativeID=\"2:1\" className=\"flex flex-col gap-3 w-full h-full bg-color-background\">\n      \
             <Text nativeID=\"2:2\">Welcome{'\\n'}back</Text>\n      \
             <TextField />\n    \
             </View>\n  )\n}\n"
        );
    }

    #[test]
    fn test_stylesheet_screen() {
        let mut config = ProjectConfig::default();
        config
            .theme
            .tokens
            .insert("color/background".to_string(), "background".to_string());

        let output = emit(screen(), config, StyleApproach::StyleSheet);
        let contents = &output.files[0].contents;

        assert!(contents.contains("import { StyleSheet, Text, View } from 'react-native'"));
        assert!(contents.contains("import { tokens } from '@/theme/tokens'"));
        assert!(contents.contains("<View nativeID=\"2:1\" style={styles.login_2_1}>"));
        assert!(contents.contains(
            "const styles = StyleSheet.create({\n  login_2_1: {\n    flexDirection: 'column',\n    gap: 12,\n    width: '100%',\n    height: '100%',\n    backgroundColor: tokens['background'],\n  },\n})\n"
        ));
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn test_token_miss_is_reported() {
        let mut config = ProjectConfig::default();
        config
            .theme
            .tokens
            .insert("color/primary".to_string(), "primary".to_string());

        let output = emit(screen(), config, StyleApproach::Nativewind);
        assert_eq!(output.warnings.len(), 1);
        assert!(output.warnings[0].contains("color/background"));
        // the fallback slug is still emitted
        assert!(output.files[0].contents.contains("bg-color-background"));
    }
}
