//! Render functions and the virtual nodes they produce.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::codegen;
use crate::validate::{AttributeValue, ElementNode, TemplateNode, TextSegment};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VNode {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<VNode>,
        #[serde(default)]
        is_static: bool,
    },
    Text {
        text: String,
    },
    Comment {
        text: String,
    },
    Empty,
}

impl VNode {
    /// Serialize to HTML. Attribute values and text are escaped.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            VNode::Element {
                tag,
                attrs,
                children,
                ..
            } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push_str(&format!(" {}=\"{}\"", name, escape_html(value, true)));
                }
                out.push('>');
                if is_void_element(tag) {
                    return;
                }
                for child in children {
                    child.write_html(out);
                }
                out.push_str(&format!("</{}>", tag));
            }
            VNode::Text { text } => out.push_str(&escape_html(text, false)),
            VNode::Comment { text } => out.push_str(&format!("<!--{}-->", text)),
            VNode::Empty => out.push_str("<!---->"),
        }
    }
}

fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta"
            | "source" | "track" | "wbr"
    )
}

fn escape_html(s: &str, attr: bool) -> String {
    let escaped = s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;");
    if attr {
        escaped.replace('"', "&quot;")
    } else {
        escaped
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RENDER FUNCTION
// ═══════════════════════════════════════════════════════════════════════════════

/// A compiled render function: generated code plus the tree it evaluates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderFn {
    code: String,
    tree: Option<Arc<TemplateNode>>,
}

impl RenderFn {
    pub fn new(tree: Option<TemplateNode>) -> Self {
        Self {
            code: codegen::generate(tree.as_ref()),
            tree: tree.map(Arc::new),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Evaluate against `data`. `statics` resolves `_m(index)` references.
    pub fn call(&self, data: &Value, statics: &[RenderFn]) -> VNode {
        match &self.tree {
            Some(tree) => render_node(tree, data, statics, false),
            None => VNode::Empty,
        }
    }
}

fn render_node(node: &TemplateNode, data: &Value, statics: &[RenderFn], in_static: bool) -> VNode {
    match node {
        TemplateNode::Element(el) => render_element(el, data, statics, in_static),
        TemplateNode::Text { segments } => VNode::Text {
            text: segments
                .iter()
                .map(|s| match s {
                    TextSegment::Literal(text) => text.clone(),
                    TextSegment::Interpolation(expr) => to_display_string(&evaluate(expr, data)),
                })
                .collect(),
        },
        TemplateNode::Comment { text } => VNode::Comment { text: text.clone() },
        TemplateNode::Static { index } => match statics.get(*index).and_then(|s| s.tree.as_ref()) {
            Some(tree) => render_node(tree, data, statics, true),
            None => {
                tracing::warn!(index, "static render fn missing");
                VNode::Empty
            }
        },
    }
}

fn render_element(el: &ElementNode, data: &Value, statics: &[RenderFn], in_static: bool) -> VNode {
    let attrs = el
        .attributes
        .iter()
        .filter_map(|a| match &a.value {
            AttributeValue::Static(v) => Some((a.name.clone(), v.clone())),
            AttributeValue::Bound(expr) => match evaluate(expr, data) {
                Value::Null | Value::Bool(false) => None,
                value => Some((a.name.clone(), to_display_string(&value))),
            },
        })
        .collect();
    VNode::Element {
        tag: el.tag.clone(),
        attrs,
        children: el
            .children
            .iter()
            .map(|child| render_node(child, data, statics, in_static))
            .collect(),
        is_static: in_static,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPRESSIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Evaluate a literal or a property path (`a.b`, `items[0].name`) against `data`.
/// Anything unresolvable is `Null`.
pub fn evaluate(expr: &str, data: &Value) -> Value {
    let expr = expr.trim();
    if let Some(literal) = parse_literal(expr) {
        return literal;
    }

    let mut current = data;
    for segment in path_segments(expr) {
        let next = match current {
            Value::Object(map) => map.get(segment.as_str()),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return Value::Null,
        }
    }
    current.clone()
}

fn parse_literal(expr: &str) -> Option<Value> {
    match expr {
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        "null" | "undefined" => return Some(Value::Null),
        _ => {}
    }
    for quote in ['\'', '"', '`'] {
        if expr.len() >= 2 && expr.starts_with(quote) && expr.ends_with(quote) {
            return Some(Value::String(expr[1..expr.len() - 1].to_string()));
        }
    }
    if expr.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
        return serde_json::from_str::<serde_json::Number>(expr).ok().map(Value::Number);
    }
    None
}

fn path_segments(expr: &str) -> Vec<String> {
    let expr = expr.strip_prefix("this.").unwrap_or(expr);
    expr.replace('[', ".")
        .replace(']', "")
        .split('.')
        .map(|s| s.trim().trim_matches(|c| c == '\'' || c == '"').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `_s`: strings as-is, null as empty, containers as pretty JSON.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string_pretty(value).unwrap_or_default()
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_evaluate_paths() {
        let data = json!({ "user": { "name": "Ada", "tags": ["a", "b"] } });
        assert_eq!(evaluate("user.name", &data), json!("Ada"));
        assert_eq!(evaluate("user.tags[1]", &data), json!("b"));
        assert_eq!(evaluate("this.user.tags.0", &data), json!("a"));
        assert_eq!(evaluate("user.missing.deep", &data), Value::Null);
    }

    #[test]
    fn test_evaluate_literals() {
        let data = json!({});
        assert_eq!(evaluate("'hi'", &data), json!("hi"));
        assert_eq!(evaluate("42", &data), json!(42));
        assert_eq!(evaluate("-1.5", &data), json!(-1.5));
        assert_eq!(evaluate("true", &data), json!(true));
    }

    #[test]
    fn test_display_string() {
        assert_eq!(to_display_string(&Value::Null), "");
        assert_eq!(to_display_string(&json!(3)), "3");
        assert_eq!(to_display_string(&json!([1])), "[\n  1\n]");
    }

    #[test]
    fn test_vnode_html_escaping() {
        let node = VNode::Element {
            tag: "p".into(),
            attrs: vec![("title".into(), "a\"b".into())],
            children: vec![
                VNode::Text { text: "1 < 2".into() },
                VNode::Element {
                    tag: "br".into(),
                    attrs: vec![],
                    children: vec![],
                    is_static: false,
                },
            ],
            is_static: false,
        };
        assert_eq!(node.to_html(), "<p title=\"a&quot;b\">1 &lt; 2<br></p>");
    }

    #[test]
    fn test_empty_render_fn() {
        let render = RenderFn::new(None);
        assert_eq!(render.call(&json!({}), &[]), VNode::Empty);
        assert_eq!(render.code(), "with(this){return _e()}");
    }
}
