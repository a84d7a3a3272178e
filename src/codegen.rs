//! Codegen module
//!
//! Emits the render code string for a template tree. The output uses the usual
//! runtime helper vocabulary:
//!
//! - `_c(tag, data?, children?)` creates an element
//! - `_v(text)` creates a text node, `_s(expr)` stringifies a value
//! - `_e(text)` creates a comment
//! - `_m(index)` renders a hoisted static tree

use crate::validate::{AttributeValue, ElementNode, TemplateNode, TextSegment};

/// Wrap the root expression into a complete render body.
pub fn generate(root: Option<&TemplateNode>) -> String {
    let body = match root {
        Some(node) => generate_node(node),
        None => "_e()".to_string(),
    };
    format!("with(this){{return {}}}", body)
}

pub fn generate_node(node: &TemplateNode) -> String {
    match node {
        TemplateNode::Element(el) => generate_element(el),
        TemplateNode::Text { segments } => {
            let parts: Vec<String> = segments
                .iter()
                .map(|s| match s {
                    TextSegment::Literal(text) => format!("\"{}\"", escape_js_string(text)),
                    TextSegment::Interpolation(expr) => format!("_s({})", expr),
                })
                .collect();
            format!("_v({})", parts.join("+"))
        }
        TemplateNode::Comment { text } => format!("_e(\"{}\")", escape_js_string(text)),
        TemplateNode::Static { index } => format!("_m({})", index),
    }
}

fn generate_element(el: &ElementNode) -> String {
    let mut code = format!("_c('{}'", el.tag);

    if !el.attributes.is_empty() {
        let attrs: Vec<String> = el
            .attributes
            .iter()
            .map(|a| match &a.value {
                AttributeValue::Static(v) => {
                    format!("\"{}\":\"{}\"", escape_js_string(&a.name), escape_js_string(v))
                }
                AttributeValue::Bound(expr) => {
                    format!("\"{}\":{}", escape_js_string(&a.name), expr)
                }
            })
            .collect();
        code.push_str(&format!(",{{attrs:{{{}}}}}", attrs.join(",")));
    }

    if !el.children.is_empty() {
        let children: Vec<String> = el.children.iter().map(generate_node).collect();
        code.push_str(&format!(",[{}]", children.join(",")));
    }

    code.push(')');
    code
}

fn escape_js_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}
