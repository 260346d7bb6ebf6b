//! File-assembly templates

use minijinja::{AutoEscape, Environment};
use serde::Serialize;

const WEB_COMPONENT: &str = r#"import React from 'react'
{% for imp in imports %}
import { {{ imp.names | join(", ") }} } from '{{ imp.module }}'
{% endfor %}
{% if stylesheet %}
import styles from './{{ stylesheet }}'
{% endif %}
{% if instruction %}

// {{ instruction }}
{% endif %}

export default function {{ component }}() {
  return (
{{ body }}
  )
}
"#;

const CSS_MODULE: &str = r#"{% for rule in rules %}
{% if not loop.first %}

{% endif %}
.{{ rule.name }} {
{% for decl in rule.declarations %}
  {{ decl.property }}: {{ decl.value }};
{% endfor %}
}
{% endfor %}
"#;

const MOBILE_COMPONENT: &str = r#"import React from 'react'
import { {{ primitives | join(", ") }} } from 'react-native'
{% for imp in imports %}
import { {{ imp.names | join(", ") }} } from '{{ imp.module }}'
{% endfor %}
{% if token_module %}
import { tokens } from '{{ token_module }}'
{% endif %}
{% if instruction %}

// {{ instruction }}
{% endif %}

export default function {{ component }}() {
  return (
{{ body }}
  )
}
{% if rules %}

const styles = StyleSheet.create({
{% for rule in rules %}
  {{ rule.name }}: {
{% for decl in rule.declarations %}
    {{ decl.property }}: {{ decl.value }},
{% endfor %}
  },
{% endfor %}
})
{% endif %}
"#;

/// An import statement: `import { names } from 'module'`
#[derive(Debug, Clone, Serialize)]
pub struct ImportContext {
    /// Module specifier
    pub module: String,
    /// Imported names, sorted
    pub names: Vec<String>,
}

/// A named style rule
#[derive(Debug, Clone, Serialize)]
pub struct RuleContext {
    /// Class or style-sheet key
    pub name: String,
    /// Rendered declarations
    pub declarations: Vec<DeclarationContext>,
}

/// A rendered declaration
#[derive(Debug, Clone, Serialize)]
pub struct DeclarationContext {
    /// Property name in the target dialect
    pub property: String,
    /// Value in the target dialect
    pub value: String,
}

/// Context for the web component template
#[derive(Debug, Clone, Serialize)]
pub struct WebComponentContext {
    /// Component identifier
    pub component: String,
    /// Library imports
    pub imports: Vec<ImportContext>,
    /// File name of the co-located style module
    pub stylesheet: Option<String>,
    /// Instruction comment
    pub instruction: Option<String>,
    /// Indented JSX body
    pub body: String,
}

/// Context for the mobile component template
#[derive(Debug, Clone, Serialize)]
pub struct MobileComponentContext {
    /// Component identifier
    pub component: String,
    /// React Native primitives to import
    pub primitives: Vec<String>,
    /// Library imports
    pub imports: Vec<ImportContext>,
    /// Token module, when styles reference theme tokens
    pub token_module: Option<String>,
    /// Instruction comment
    pub instruction: Option<String>,
    /// Indented JSX body
    pub body: String,
    /// Style-sheet rules
    pub rules: Vec<RuleContext>,
}

/// The compiled template set
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// Web component entry file
    pub const WEB_COMPONENT: &'static str = "web/component.tsx";
    /// CSS module
    pub const CSS_MODULE: &'static str = "web/styles.module.css";
    /// Mobile component entry file
    pub const MOBILE_COMPONENT: &'static str = "mobile/component.tsx";

    /// Compile the built-in templates
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_template(Self::WEB_COMPONENT, WEB_COMPONENT)?;
        env.add_template(Self::CSS_MODULE, CSS_MODULE)?;
        env.add_template(Self::MOBILE_COMPONENT, MOBILE_COMPONENT)?;
        Ok(Self { env })
    }

    /// Render a template by name
    pub fn render<S: Serialize>(&self, name: &str, context: S) -> Result<String, minijinja::Error> {
        self.env.get_template(name)?.render(context)
    }
}

impl std::fmt::Debug for Templates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Templates").finish_non_exhaustive()
    }
}

/// One-line comment text for an instruction
pub fn comment_line(instruction: &str) -> String {
    instruction.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_component_layout() {
        let templates = Templates::new().unwrap();
        let rendered = templates
            .render(
                Templates::WEB_COMPONENT,
                WebComponentContext {
                    component: "Card".into(),
                    imports: vec![ImportContext {
                        module: "@/components/ui".into(),
                        names: vec!["Avatar".into(), "Button".into()],
                    }],
                    stylesheet: None,
                    instruction: Some("make it pop".into()),
                    body: "    <div />".into(),
                },
            )
            .unwrap();

        assert_eq!(
            rendered,
            "import React from 'react'\n\
             import { Avatar, Button } from '@/components/ui'\n\
             \n\
             // make it pop\n\
             \n\
             export default function Card() {\n  return (\n    <div />\n  )\n}\n"
        );
    }

    #[test]
    fn test_css_module_rules() {
        let templates = Templates::new().unwrap();
        let rendered = templates
            .render(
                Templates::CSS_MODULE,
                minijinja::context! {
                    rules => vec![
                        RuleContext {
                            name: "card_1".into(),
                            declarations: vec![DeclarationContext {
                                property: "gap".into(),
                                value: "8px".into(),
                            }],
                        },
                        RuleContext {
                            name: "title_2".into(),
                            declarations: vec![DeclarationContext {
                                property: "color".into(),
                                value: "var(--ink)".into(),
                            }],
                        },
                    ],
                },
            )
            .unwrap();

        assert_eq!(
            rendered,
            ".card_1 {\n  gap: 8px;\n}\n\n.title_2 {\n  color: var(--ink);\n}\n"
        );
    }

    #[test]
    fn test_comment_line_collapses_whitespace() {
        assert_eq!(comment_line("make\n  it   blue"), "make it blue");
    }
}
