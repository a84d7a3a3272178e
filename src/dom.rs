//! Document Model
//!
//! A thin layer over `scraper` that gives the mount gate the handful of DOM
//! capabilities it consumes: selector queries, inner/outer serialization,
//! detached element construction and deep cloning.
//!
//! Queries go through `scraper::Selector`, so anything `querySelector` accepts
//! (combinators, selector lists, attribute operators, `:not(..)`) works here.
//! A selector that fails to parse matches nothing.

use ego_tree::NodeId;
use scraper::{ElementRef, Html, Node, Selector};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type SharedTree = Rc<RefCell<Html>>;

/// Elements whose text children serialize without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

// ═══════════════════════════════════════════════════════════════════════════════
// DOM QUERY SERVICE
// ═══════════════════════════════════════════════════════════════════════════════

/// The DOM capabilities the mount gate depends on.
pub trait DomQuery {
    /// Resolve a selector to the first matching element, in document order.
    fn query(&self, selector: &str) -> Option<Element>;

    /// True for the document root (`<html>`) and `<body>`.
    fn is_unsafe_target(&self, el: &Element) -> bool;

    /// Outer serialization of `el`, or `None` when the platform cannot produce it.
    fn outer_html(&self, el: &Element) -> Option<String> {
        Some(el.outer_html())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ELEMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// A handle to a node in a document (or a detached tree).
///
/// Cloning an `Element` clones the handle, not the node; use
/// [`Element::deep_clone`] for a structural copy.
#[derive(Clone)]
pub struct Element {
    tree: SharedTree,
    id: NodeId,
}

impl Element {
    /// Create a detached HTML element with no attributes or children.
    pub fn detached(tag: &str) -> Self {
        let html = Html::parse_fragment(&format!("<{0}></{0}>", tag));
        let id = fragment_content(&html)
            .and_then(|node| node.children().find(|c| c.value().is_element()))
            .map(|node| node.id())
            .unwrap_or_else(|| html.tree.root().id());
        Self::new(Rc::new(RefCell::new(html)), id)
    }

    /// Create a detached text node.
    pub fn text(contents: &str) -> Self {
        let mut html = Html::new_fragment();
        let id = html
            .tree
            .root_mut()
            .append(Node::Text(scraper::node::Text {
                text: contents.into(),
            }))
            .id();
        Self::new(Rc::new(RefCell::new(html)), id)
    }

    fn new(tree: SharedTree, id: NodeId) -> Self {
        Self { tree, id }
    }

    fn with_node<R>(&self, f: impl FnOnce(&Node) -> R) -> Option<R> {
        let html = self.tree.borrow();
        html.tree.get(self.id).map(|node| f(node.value()))
    }

    pub fn is_element(&self) -> bool {
        self.with_node(Node::is_element).unwrap_or(false)
    }

    /// Lowercase local name for elements, `#text`/`#comment`/... otherwise.
    pub fn tag_name(&self) -> String {
        self.with_node(|node| match node {
            Node::Element(el) => el.name().to_string(),
            Node::Text(_) => "#text".to_string(),
            Node::Comment(_) => "#comment".to_string(),
            Node::Document => "#document".to_string(),
            Node::Fragment => "#document-fragment".to_string(),
            Node::Doctype(_) => "#doctype".to_string(),
            Node::ProcessingInstruction(_) => "#processing-instruction".to_string(),
        })
        .unwrap_or_default()
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        self.with_node(|node| match node {
            Node::Element(el) => el.attr(name).map(str::to_string),
            _ => None,
        })
        .flatten()
    }

    /// Serialized children of this node.
    pub fn inner_html(&self) -> String {
        let html = self.tree.borrow();
        let Some(el) = html.tree.get(self.id).and_then(ElementRef::wrap) else {
            return String::new();
        };
        // The serializer escapes every text node; raw-text content must stay verbatim.
        if RAW_TEXT_ELEMENTS.contains(&el.value().name()) {
            return el.text().collect();
        }
        el.inner_html()
    }

    /// Serialized node including its own tag.
    pub fn outer_html(&self) -> String {
        let element_html = {
            let html = self.tree.borrow();
            html.tree.get(self.id).and_then(ElementRef::wrap).map(|el| el.html())
        };
        element_html.unwrap_or_else(|| {
            let wrapper = Element::detached("div");
            wrapper.append_clone(self);
            wrapper.inner_html()
        })
    }

    /// Structural copy of this node and its descendants, detached from any parent.
    pub fn deep_clone(&self) -> Self {
        let mut html = Html::new_fragment();
        let root = html.tree.root().id();
        let id = graft(&mut html, root, self.snapshot()).unwrap_or(root);
        Self::new(Rc::new(RefCell::new(html)), id)
    }

    /// Append a structural copy of `source` as the last child of this node.
    pub fn append_clone(&self, source: &Element) {
        let nodes = source.snapshot();
        let mut html = self.tree.borrow_mut();
        graft(&mut html, self.id, nodes);
    }

    pub fn children(&self) -> Vec<Element> {
        let html = self.tree.borrow();
        match html.tree.get(self.id) {
            Some(node) => node
                .children()
                .map(|child| Self::new(self.tree.clone(), child.id()))
                .collect(),
            None => Vec::new(),
        }
    }

    /// The parent node. Detached roots and nodes directly under a fragment have none.
    pub fn parent(&self) -> Option<Element> {
        let html = self.tree.borrow();
        let parent = html.tree.get(self.id)?.parent()?;
        if parent.value().is_fragment() {
            return None;
        }
        Some(Self::new(self.tree.clone(), parent.id()))
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.tree, &other.tree) && self.id == other.id
    }

    /// The node and its descendants in pre-order, each paired with its parent's
    /// position in the list.
    fn snapshot(&self) -> Vec<(Option<usize>, Node)> {
        let html = self.tree.borrow();
        let Some(root) = html.tree.get(self.id) else {
            return Vec::new();
        };

        let mut nodes = Vec::new();
        let mut stack = vec![(root, None)];
        while let Some((node, parent)) = stack.pop() {
            let index = nodes.len();
            nodes.push((parent, node.value().clone()));
            let children: Vec<_> = node.children().collect();
            stack.extend(children.into_iter().rev().map(|child| (child, Some(index))));
        }
        nodes
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.attr("id") {
            Some(id) => write!(f, "Element(<{}#{}>)", self.tag_name(), id),
            None => write!(f, "Element(<{}>)", self.tag_name()),
        }
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// Rebuild a snapshot under `parent`, returning the id of the copied root.
fn graft(html: &mut Html, parent: NodeId, nodes: Vec<(Option<usize>, Node)>) -> Option<NodeId> {
    let mut ids: Vec<NodeId> = Vec::with_capacity(nodes.len());
    for (parent_index, value) in nodes {
        let target = match parent_index {
            Some(index) => *ids.get(index)?,
            None => parent,
        };
        let id = html.tree.get_mut(target)?.append(value).id();
        ids.push(id);
    }
    ids.first().copied()
}

/// Fragment parsing nests the content under a synthetic `<html>` element.
fn fragment_content(html: &Html) -> Option<ego_tree::NodeRef<'_, Node>> {
    html.tree
        .root()
        .children()
        .find(|node| is_tag(node.value(), "html"))
}

fn is_tag(node: &Node, tag: &str) -> bool {
    matches!(node, Node::Element(el) if el.name() == tag)
}

// ═══════════════════════════════════════════════════════════════════════════════
// DOCUMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// A parsed HTML document.
pub struct Document {
    html: SharedTree,
    supports_outer_html: bool,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Rc::new(RefCell::new(Html::parse_document(html))),
            supports_outer_html: true,
        }
    }

    /// Behave like a platform without direct outer serialization.
    pub fn without_outer_html(mut self) -> Self {
        self.supports_outer_html = false;
        self
    }

    /// The `<html>` element.
    pub fn document_element(&self) -> Option<Element> {
        let html = self.html.borrow();
        let id = html
            .tree
            .root()
            .children()
            .find(|node| is_tag(node.value(), "html"))?
            .id();
        Some(Element::new(self.html.clone(), id))
    }

    pub fn body(&self) -> Option<Element> {
        let root = self.document_element()?;
        root.children().into_iter().find(|child| child.tag_name() == "body")
    }

    pub fn create_element(&self, tag: &str) -> Element {
        Element::detached(tag)
    }

    pub fn query_selector(&self, selector: &str) -> Option<Element> {
        let parsed = match Selector::parse(selector) {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::debug!(selector, error = ?error, "unparseable selector");
                return None;
            }
        };
        let html = self.html.borrow();
        let id = html.select(&parsed).next()?.id();
        Some(Element::new(self.html.clone(), id))
    }
}

impl DomQuery for Document {
    fn query(&self, selector: &str) -> Option<Element> {
        self.query_selector(selector)
    }

    fn is_unsafe_target(&self, el: &Element) -> bool {
        let is_root = self.document_element().is_some_and(|root| root.ptr_eq(el));
        is_root || self.body().is_some_and(|body| body.ptr_eq(el))
    }

    fn outer_html(&self, el: &Element) -> Option<String> {
        self.supports_outer_html.then(|| el.outer_html())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html><html><head></head><body>
<div id="app" class="shell main"><p class="lead">hi</p></div>
<section data-role="list"><ul><li class="item">a</li><li class="item" id="second">b</li></ul></section>
<a href="/docs/intro">docs</a>
</body></html>"#;

    #[test]
    fn test_query_by_id_and_class() {
        let doc = Document::parse(PAGE);
        let app = doc.query_selector("#app").unwrap();
        assert_eq!(app.tag_name(), "div");
        assert_eq!(doc.query_selector(".lead").unwrap().tag_name(), "p");
        assert_eq!(doc.query_selector("div.shell.main").unwrap(), app);
        assert!(doc.query_selector("#nope").is_none());
    }

    #[test]
    fn test_query_descendant_and_attributes() {
        let doc = Document::parse(PAGE);
        let li = doc.query_selector("section li.item").unwrap();
        assert_eq!(li.inner_html(), "a");
        assert_eq!(
            doc.query_selector("[data-role=\"list\"] #second").unwrap().inner_html(),
            "b"
        );
        assert!(doc.query_selector("div li").is_none());
        assert!(doc.query_selector("[data-role]").is_some());
    }

    #[test]
    fn test_query_full_selector_grammar() {
        let doc = Document::parse(PAGE);
        assert_eq!(doc.query_selector("#app > p").unwrap().inner_html(), "hi");
        assert!(doc.query_selector("body > p").is_none());
        assert_eq!(doc.query_selector("li:not(.item), #second").unwrap().inner_html(), "b");
        assert_eq!(doc.query_selector("a[href*='docs']").unwrap().inner_html(), "docs");
        assert!(doc.query_selector("a[href^='/docs']").is_some());
        assert_eq!(doc.query_selector("ul li:last-child").unwrap().attr("id").as_deref(), Some("second"));
    }

    #[test]
    fn test_invalid_selector_matches_nothing() {
        let doc = Document::parse(PAGE);
        assert!(doc.query_selector("").is_none());
        assert!(doc.query_selector("#").is_none());
        assert!(doc.query_selector("[unterminated").is_none());
        assert!(doc.query_selector("div >").is_none());
    }

    #[test]
    fn test_inner_and_outer_html() {
        let doc = Document::parse("<div id=\"x\"><span>x</span></div>");
        let el = doc.query_selector("#x").unwrap();
        assert_eq!(el.inner_html(), "<span>x</span>");
        assert_eq!(el.outer_html(), "<div id=\"x\"><span>x</span></div>");
    }

    #[test]
    fn test_raw_text_inner_html_is_verbatim() {
        let doc = Document::parse(
            "<script type=\"text/x-template\" id=\"tpl\"><b class=\"a\">y & z</b></script>",
        );
        let tpl = doc.query_selector("#tpl").unwrap();
        assert_eq!(tpl.inner_html(), "<b class=\"a\">y & z</b>");
    }

    #[test]
    fn test_text_node_serialization() {
        let text = Element::text("a < b");
        assert!(!text.is_element());
        assert_eq!(text.tag_name(), "#text");
        assert_eq!(text.inner_html(), "");
        assert_eq!(text.outer_html(), "a &lt; b");
    }

    #[test]
    fn test_root_and_body_are_unsafe_targets() {
        let doc = Document::parse(PAGE);
        let root = doc.document_element().unwrap();
        let body = doc.body().unwrap();
        assert_eq!(root.tag_name(), "html");
        assert_eq!(body.tag_name(), "body");
        assert!(doc.is_unsafe_target(&root));
        assert!(doc.is_unsafe_target(&body));
        assert!(!doc.is_unsafe_target(&doc.query_selector("#app").unwrap()));
    }

    #[test]
    fn test_deep_clone_is_detached_copy() {
        let doc = Document::parse(PAGE);
        let app = doc.query_selector("#app").unwrap();
        let copy = app.deep_clone();
        assert!(!copy.ptr_eq(&app));
        assert!(copy.parent().is_none());
        assert!(app.parent().is_some());
        assert_eq!(copy.outer_html(), app.outer_html());
        assert_eq!(copy.children().len(), app.children().len());
    }

    #[test]
    fn test_wrapper_serialization_matches_outer_html() {
        let doc = Document::parse(PAGE).without_outer_html();
        let app = doc.query_selector("#app").unwrap();
        assert!(DomQuery::outer_html(&doc, &app).is_none());

        let wrapper = doc.create_element("div");
        wrapper.append_clone(&app);
        assert_eq!(wrapper.inner_html(), app.outer_html());
        assert_eq!(wrapper.children()[0].parent(), Some(wrapper.clone()));
    }

    #[test]
    fn test_append_clone_within_one_tree() {
        let doc = Document::parse(PAGE);
        let app = doc.query_selector("#app").unwrap();
        let lead = doc.query_selector(".lead").unwrap();
        app.append_clone(&lead);
        assert_eq!(app.inner_html(), "<p class=\"lead\">hi</p><p class=\"lead\">hi</p>");
    }
}
