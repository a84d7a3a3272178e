//! Static subtree hoisting.
//!
//! A node is static when nothing in it depends on the data scope. Static elements
//! with real content (anything beyond a single text child) are hoisted into their
//! own render fns and replaced by [`TemplateNode::Static`] references, so a
//! re-render can reuse them untouched.

use crate::validate::{AttributeValue, TemplateNode, TextSegment};

pub fn is_static(node: &TemplateNode) -> bool {
    match node {
        TemplateNode::Text { segments } => segments
            .iter()
            .all(|s| matches!(s, TextSegment::Literal(_))),
        TemplateNode::Comment { .. } | TemplateNode::Static { .. } => true,
        TemplateNode::Element(el) => {
            el.attributes
                .iter()
                .all(|a| matches!(a.value, AttributeValue::Static(_)))
                && el.children.iter().all(is_static)
        }
    }
}

fn is_static_root(node: &TemplateNode) -> bool {
    let TemplateNode::Element(el) = node else {
        return false;
    };
    // A lone text child is cheaper to re-create than to hoist.
    let trivial = el.children.is_empty() || (el.children.len() == 1 && el.children[0].is_text());
    !trivial && is_static(node)
}

/// Hoist static roots out of `root`, returning the rewritten tree and the hoisted
/// subtrees in index order.
pub fn optimize(root: TemplateNode) -> (TemplateNode, Vec<TemplateNode>) {
    let mut statics = Vec::new();
    let root = hoist(root, &mut statics);
    (root, statics)
}

fn hoist(node: TemplateNode, statics: &mut Vec<TemplateNode>) -> TemplateNode {
    if is_static_root(&node) {
        statics.push(node);
        return TemplateNode::Static {
            index: statics.len() - 1,
        };
    }
    match node {
        TemplateNode::Element(mut el) => {
            el.children = el
                .children
                .into_iter()
                .map(|child| hoist(child, statics))
                .collect();
            TemplateNode::Element(el)
        }
        other => other,
    }
}
