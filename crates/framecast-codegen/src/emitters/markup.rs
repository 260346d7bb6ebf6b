//! JSX writing helpers

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::naming;

/// Value of a JSX attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    /// String literal, `name="value"`
    Text(String),
    /// Expression, `name={value}`
    Expr(String),
    /// Bare boolean attribute
    Flag,
}

/// A JSX attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    /// Attribute name
    pub name: String,
    /// Attribute value
    pub value: AttrValue,
}

impl Attr {
    /// `name="value"`
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AttrValue::Text(value.into()),
        }
    }

    /// `name={expr}`
    pub fn expr(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AttrValue::Expr(expr.into()),
        }
    }

    /// `name`
    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AttrValue::Flag,
        }
    }

    fn render(&self) -> String {
        match &self.value {
            AttrValue::Text(text) => format!("{}=\"{}\"", self.name, escape_attr(text)),
            AttrValue::Expr(expr) => format!("{}={{{}}}", self.name, expr),
            AttrValue::Flag => self.name.clone(),
        }
    }
}

/// Indented JSX writer
#[derive(Debug, Default)]
pub struct JsxWriter {
    out: String,
    depth: usize,
}

impl JsxWriter {
    /// Start writing at an indentation depth (two spaces per level)
    pub fn new(depth: usize) -> Self {
        Self {
            out: String::new(),
            depth,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn tag(name: &str, attrs: &[Attr]) -> String {
        let mut tag = name.to_string();
        for attr in attrs {
            tag.push(' ');
            tag.push_str(&attr.render());
        }
        tag
    }

    /// `<name ...>` and indent
    pub fn open(&mut self, name: &str, attrs: &[Attr]) {
        let tag = Self::tag(name, attrs);
        self.line(&format!("<{}>", tag));
        self.depth += 1;
    }

    /// Dedent and `</name>`
    pub fn close(&mut self, name: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line(&format!("</{}>", name));
    }

    /// `<name ... />`
    pub fn empty(&mut self, name: &str, attrs: &[Attr]) {
        let tag = Self::tag(name, attrs);
        self.line(&format!("<{} />", tag));
    }

    /// `<name ...>text</name>` on one line. `line_break` joins the lines of
    /// multi-line text.
    pub fn text(&mut self, name: &str, attrs: &[Attr], text: &str, line_break: &str) {
        let tag = Self::tag(name, attrs);
        let body = text
            .split('\n')
            .map(escape_text)
            .collect::<Vec<_>>()
            .join(line_break);
        self.line(&format!("<{}>{}</{}>", tag, body, name));
    }

    /// The written markup, without the trailing newline
    pub fn finish(mut self) -> String {
        if self.out.ends_with('\n') {
            self.out.pop();
        }
        self.out
    }
}

/// Escape text content so JSX renders it literally
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a string attribute value
pub fn escape_attr(text: &str) -> String {
    text.replace('&', "&amp;").replace('"', "&quot;")
}

/// JSX props for component properties. `Label#12:0` becomes `label`;
/// `{type, value}` wrappers are unwrapped; null values are dropped.
pub fn component_props(properties: &BTreeMap<String, Value>) -> Vec<Attr> {
    let mut seen = BTreeSet::new();
    let mut attrs = Vec::new();

    for (key, raw) in properties {
        let base = key.split('#').next().unwrap_or(key);
        let name = naming::camel_case(base);
        if name.is_empty() || !seen.insert(name.clone()) {
            continue;
        }

        let value = match raw {
            Value::Object(map) if map.contains_key("value") => &map["value"],
            other => other,
        };
        let attr = match value {
            Value::Null => continue,
            Value::Bool(true) => Attr::flag(name),
            Value::Bool(false) => Attr::expr(name, "false"),
            Value::Number(n) => Attr::expr(name, n.to_string()),
            Value::String(s) => Attr::text(name, s.clone()),
            other => Attr::expr(name, other.to_string()),
        };
        attrs.push(attr);
    }

    attrs
}
