//! Template IR and structural validation.
//!
//! ## Root Invariants
//!
//! 1. A template compiles to exactly one root element.
//! 2. Text alone is not a valid root.
//! 3. `<template>` and `<slot>` cannot be the root, since either may expand to
//!    multiple nodes.
//!
//! Violations are reported as [`CompilerError`]s. Compilation still produces an
//! artifact from the first root element, if there is one.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_PARSE: &str = "TPL-ERR-PARSE-001";
pub const ERR_NO_ROOT: &str = "TPL-ERR-ROOT-001";
pub const ERR_MULTIPLE_ROOTS: &str = "TPL-ERR-ROOT-002";
pub const ERR_ROOT_TAG: &str = "TPL-ERR-ROOT-003";
pub const ERR_UNSUPPORTED_DIRECTIVE: &str = "TPL-ERR-DIRECTIVE-001";
pub const ERR_EMPTY_EXPRESSION: &str = "TPL-ERR-EXPR-001";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("{code}: {message}")]
pub struct CompilerError {
    pub code: String,
    pub message: String,
    pub hints: Vec<String>,
}

impl CompilerError {
    pub fn new(code: &str, message: &str) -> Self {
        Self::with_hints(code, message, vec![])
    }

    pub fn with_hints(code: &str, message: &str, hints: Vec<String>) -> Self {
        CompilerError {
            code: code.to_string(),
            message: message.to_string(),
            hints,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// IR TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum AttributeValue {
    Static(String),
    /// Expression evaluated against the data scope at render time.
    Bound(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeIR {
    pub name: String,
    pub value: AttributeValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum TextSegment {
    Literal(String),
    Interpolation(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementNode {
    pub tag: String,
    pub attributes: Vec<AttributeIR>,
    pub children: Vec<TemplateNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TemplateNode {
    Element(ElementNode),
    Text { segments: Vec<TextSegment> },
    Comment { text: String },
    /// Reference to a hoisted static subtree by index.
    Static { index: usize },
}

impl TemplateNode {
    pub fn text(value: &str) -> Self {
        TemplateNode::Text {
            segments: vec![TextSegment::Literal(value.to_string())],
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, TemplateNode::Text { .. })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Check the top-level nodes of a parsed template against the root invariants.
pub fn validate_root(nodes: &[TemplateNode]) -> Vec<CompilerError> {
    let mut errors = Vec::new();
    let roots: Vec<&ElementNode> = nodes
        .iter()
        .filter_map(|n| match n {
            TemplateNode::Element(el) => Some(el),
            _ => None,
        })
        .collect();

    match roots.as_slice() {
        [] => {
            let message = if nodes.iter().any(TemplateNode::is_text) {
                "Component template requires a root element, rather than just text."
            } else {
                "Component template requires a root element."
            };
            errors.push(CompilerError::new(ERR_NO_ROOT, message));
        }
        [_] => {}
        [..] => errors.push(CompilerError::with_hints(
            ERR_MULTIPLE_ROOTS,
            "Component template should contain exactly one root element.",
            vec!["Wrap the elements in a single container element.".to_string()],
        )),
    }

    if let Some(root) = roots.first() {
        if root.tag == "template" || root.tag == "slot" {
            errors.push(CompilerError::new(
                ERR_ROOT_TAG,
                &format!(
                    "Cannot use <{}> as component root element because it may contain multiple nodes.",
                    root.tag
                ),
            ));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tag: &str) -> TemplateNode {
        TemplateNode::Element(ElementNode {
            tag: tag.to_string(),
            attributes: vec![],
            children: vec![],
        })
    }

    #[test]
    fn test_single_root_is_valid() {
        assert!(validate_root(&[element("div")]).is_empty());
        assert!(validate_root(&[TemplateNode::Comment { text: "c".into() }, element("div")]).is_empty());
    }

    #[test]
    fn test_text_only_root() {
        let errors = validate_root(&[TemplateNode::text("hello")]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ERR_NO_ROOT);
        assert!(errors[0].message.contains("rather than just text"));
    }

    #[test]
    fn test_multiple_roots() {
        let errors = validate_root(&[element("div"), element("p")]);
        assert_eq!(errors[0].code, ERR_MULTIPLE_ROOTS);
        assert_eq!(errors[0].hints.len(), 1);
    }

    #[test]
    fn test_forbidden_root_tags() {
        for tag in ["template", "slot"] {
            let errors = validate_root(&[element(tag)]);
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].code, ERR_ROOT_TAG);
        }
    }

    #[test]
    fn test_error_display_includes_code() {
        let err = CompilerError::new(ERR_PARSE, "boom");
        assert_eq!(err.to_string(), "TPL-ERR-PARSE-001: boom");
    }
}
