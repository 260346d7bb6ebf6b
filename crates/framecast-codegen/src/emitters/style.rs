//! Layout and style-variable mapping
//!
//! Turns a node's layout block and style-variable references into either
//! utility classes (Tailwind, NativeWind) or property declarations (CSS
//! modules, React Native style sheets). Pixel values are expressed on a
//! 4px grid for utility classes: values up to 40px round to the nearest
//! half unit, larger values to the nearest whole unit.

use std::collections::{BTreeMap, BTreeSet};

use framecast_core::config::ThemeConfig;
use framecast_core::design::{Layout, LayoutDirection, Padding, SizingMode};
use framecast_core::DesignNode;

use crate::naming;

/// Style-variable resolutions collected during one emission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    /// Variable -> token used in the output
    pub style_map: BTreeMap<String, String>,
    /// Variables the theme does not define
    pub misses: BTreeSet<String>,
}

/// Target of a declaration list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// CSS properties, kebab-case
    Css,
    /// React Native style properties, camelCase
    Native,
}

/// A declaration value, rendered per dialect
#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
    /// Pixel length
    Px(f64),
    /// Percentage
    Percent(u32),
    /// Literal keyword such as `row`
    Keyword(String),
    /// Theme token reference
    Token(String),
}

impl StyleValue {
    /// Render for a dialect
    pub fn render(&self, dialect: Dialect) -> String {
        match (self, dialect) {
            (Self::Px(px), Dialect::Css) => format!("{}px", format_number(*px)),
            (Self::Px(px), Dialect::Native) => format_number(*px),
            (Self::Percent(p), Dialect::Css) => format!("{}%", p),
            (Self::Percent(p), Dialect::Native) => format!("'{}%'", p),
            (Self::Keyword(k), Dialect::Css) => k.clone(),
            (Self::Keyword(k), Dialect::Native) => format!("'{}'", k),
            (Self::Token(t), Dialect::Css) => format!("var(--{})", t),
            (Self::Token(t), Dialect::Native) => format!("tokens['{}']", t),
        }
    }
}

/// One style property
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// Property name in CSS (kebab-case) form
    pub property: String,
    /// Value
    pub value: StyleValue,
}

impl Declaration {
    fn new(property: impl Into<String>, value: StyleValue) -> Self {
        Self {
            property: property.into(),
            value,
        }
    }

    /// Property name for a dialect
    pub fn property_for(&self, dialect: Dialect) -> String {
        match dialect {
            Dialect::Css => self.property.clone(),
            Dialect::Native => kebab_to_camel(&self.property),
        }
    }
}

/// Maps layout attributes and style variables to platform styling
#[derive(Debug, Clone, Default)]
pub struct StyleMapper {
    tokens: BTreeMap<String, String>,
}

impl StyleMapper {
    /// Create a mapper over a theme
    pub fn new(theme: &ThemeConfig) -> Self {
        Self {
            tokens: theme.tokens.clone(),
        }
    }

    /// Resolve a style variable to a theme token. Without any theme tokens
    /// configured the slug is the intended token; with tokens configured an
    /// unknown variable falls back to its slug and is reported as a miss.
    pub fn token(&self, variable: &str, usage: &mut TokenUsage) -> String {
        let token = match self.tokens.get(variable) {
            Some(token) => token.clone(),
            None => {
                if !self.tokens.is_empty() {
                    usage.misses.insert(variable.to_string());
                }
                naming::slug(variable)
            }
        };
        usage
            .style_map
            .insert(variable.to_string(), token.clone());
        token
    }

    /// Utility classes for a node, in a stable order
    pub fn utility_classes(&self, node: &DesignNode, usage: &mut TokenUsage) -> Vec<String> {
        let mut classes: Vec<String> = Vec::new();

        if let Some(layout) = &node.layout {
            match layout.direction {
                LayoutDirection::Horizontal => classes.extend(["flex".into(), "flex-row".into()]),
                LayoutDirection::Vertical => classes.extend(["flex".into(), "flex-col".into()]),
                LayoutDirection::None => {}
            }
            if layout.direction != LayoutDirection::None && layout.spacing > 0.0 {
                classes.push(format!("gap-{}", grid_unit(layout.spacing)));
            }
            classes.extend(padding_classes(&layout.padding));
            classes.push(size_class("w", layout.sizing.horizontal, layout.width));
            classes.push(size_class("h", layout.sizing.vertical, layout.height));
        }

        for (property, variable) in &node.styles {
            let token = self.token(variable, usage);
            classes.push(format!("{}-{}", utility_prefix(property), token));
        }

        classes
    }

    /// Property declarations for a node
    pub fn declarations(
        &self,
        node: &DesignNode,
        dialect: Dialect,
        usage: &mut TokenUsage,
    ) -> Vec<Declaration> {
        let mut declarations = Vec::new();

        if let Some(layout) = &node.layout {
            layout_declarations(layout, dialect, &mut declarations);
        }

        for (property, variable) in &node.styles {
            let name = match css_property(property) {
                Some(css) => css.to_string(),
                None if dialect == Dialect::Css => format!("--{}", naming::slug(property)),
                // custom properties have no React Native equivalent
                None => continue,
            };
            let token = self.token(variable, usage);
            declarations.push(Declaration::new(name, StyleValue::Token(token)));
        }

        declarations
    }
}

fn layout_declarations(layout: &Layout, dialect: Dialect, out: &mut Vec<Declaration>) {
    let direction = match layout.direction {
        LayoutDirection::Horizontal => Some("row"),
        LayoutDirection::Vertical => Some("column"),
        LayoutDirection::None => None,
    };
    if let Some(direction) = direction {
        if dialect == Dialect::Css {
            out.push(Declaration::new("display", StyleValue::Keyword("flex".into())));
        }
        out.push(Declaration::new(
            "flex-direction",
            StyleValue::Keyword(direction.into()),
        ));
        if layout.spacing > 0.0 {
            out.push(Declaration::new("gap", StyleValue::Px(layout.spacing)));
        }
    }

    let padding = &layout.padding;
    if !padding.is_zero() {
        if padding.is_uniform() {
            out.push(Declaration::new("padding", StyleValue::Px(padding.top)));
        } else if dialect == Dialect::Css {
            let shorthand = [padding.top, padding.right, padding.bottom, padding.left]
                .iter()
                .map(|px| StyleValue::Px(*px).render(Dialect::Css))
                .collect::<Vec<_>>()
                .join(" ");
            out.push(Declaration::new("padding", StyleValue::Keyword(shorthand)));
        } else {
            for (side, px) in [
                ("padding-top", padding.top),
                ("padding-right", padding.right),
                ("padding-bottom", padding.bottom),
                ("padding-left", padding.left),
            ] {
                if px > 0.0 {
                    out.push(Declaration::new(side, StyleValue::Px(px)));
                }
            }
        }
    }

    for (property, mode, px) in [
        ("width", layout.sizing.horizontal, layout.width),
        ("height", layout.sizing.vertical, layout.height),
    ] {
        match (mode, dialect) {
            (SizingMode::Fill, _) => out.push(Declaration::new(property, StyleValue::Percent(100))),
            (SizingMode::Hug, Dialect::Css) => out.push(Declaration::new(
                property,
                StyleValue::Keyword("fit-content".into()),
            )),
            // native views hug their content unless sized
            (SizingMode::Hug, Dialect::Native) => {}
            (SizingMode::Fixed, _) => out.push(Declaration::new(property, StyleValue::Px(px))),
        }
    }
}

fn padding_classes(padding: &Padding) -> Vec<String> {
    if padding.is_zero() {
        return Vec::new();
    }
    if padding.is_uniform() {
        return vec![format!("p-{}", grid_unit(padding.top))];
    }

    let mut classes = Vec::new();
    let mut push = |prefix: &str, px: f64| {
        if px > 0.0 {
            classes.push(format!("{}-{}", prefix, grid_unit(px)));
        }
    };
    if padding.top == padding.bottom && padding.left == padding.right {
        push("px", padding.left);
        push("py", padding.top);
    } else {
        push("pt", padding.top);
        push("pr", padding.right);
        push("pb", padding.bottom);
        push("pl", padding.left);
    }
    classes
}

fn size_class(axis: &str, mode: SizingMode, px: f64) -> String {
    match mode {
        SizingMode::Fill => format!("{}-full", axis),
        SizingMode::Hug => format!("{}-fit", axis),
        SizingMode::Fixed => format!("{}-{}", axis, grid_unit(px)),
    }
}

fn utility_prefix(property: &str) -> String {
    match property {
        "fill" | "background" => "bg".to_string(),
        "text" | "color" => "text".to_string(),
        "stroke" | "border" => "border".to_string(),
        "radius" => "rounded".to_string(),
        "shadow" | "effect" => "shadow".to_string(),
        "font" | "typography" => "font".to_string(),
        other => naming::slug(other),
    }
}

fn css_property(property: &str) -> Option<&'static str> {
    match property {
        "fill" | "background" => Some("background-color"),
        "text" | "color" => Some("color"),
        "stroke" | "border" => Some("border-color"),
        "radius" => Some("border-radius"),
        "shadow" | "effect" => Some("box-shadow"),
        "font" | "typography" => Some("font-family"),
        _ => None,
    }
}

/// Express a pixel length in 4px grid units
pub fn grid_unit(px: f64) -> String {
    let units = px / 4.0;
    let rounded = if px <= 40.0 {
        (units * 2.0).round() / 2.0
    } else {
        units.round()
    };
    format_number(rounded)
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

fn kebab_to_camel(property: &str) -> String {
    let mut out = String::with_capacity(property.len());
    let mut upper = false;
    for c in property.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
