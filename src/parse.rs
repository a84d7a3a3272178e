//! Parse Module
//!
//! HTML5-compliant template parsing with interpolation extraction. Templates are
//! parsed as a `<body>` fragment by html5ever and lowered into [`TemplateNode`]s.

use html5ever::tendril::TendrilSink;
use html5ever::{local_name, namespace_url, ns, parse_fragment, ParseOpts, QualName};
use lazy_static::lazy_static;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use regex::Regex;
use std::borrow::Cow;

use crate::compiler::CompileOptions;
use crate::validate::{
    AttributeIR, AttributeValue, CompilerError, ElementNode, TemplateNode, TextSegment,
    ERR_EMPTY_EXPRESSION, ERR_PARSE, ERR_UNSUPPORTED_DIRECTIVE,
};

pub const DEFAULT_DELIMITERS: (&str, &str) = ("{{", "}}");

lazy_static! {
    static ref DEFAULT_TAG_RE: Regex =
        build_tag_regex(DEFAULT_DELIMITERS.0, DEFAULT_DELIMITERS.1).unwrap();

    /// Opening tags, quote-aware so `>` inside attribute values does not end the tag.
    static ref OPEN_TAG_RE: Regex =
        Regex::new(r#"<[a-zA-Z](?:"[^"]*"|'[^']*'|[^'">])*>"#).unwrap();

    static ref ATTR_VALUE_RE: Regex =
        Regex::new(r#"([^\s"'<>/=]+)(\s*=\s*)("[^"]*"|'[^']*')"#).unwrap();

    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

fn build_tag_regex(open: &str, close: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        "(?s){}(.*?){}",
        regex::escape(open),
        regex::escape(close)
    ))
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENCODED NEWLINE PROTECTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Keep `&#10;` and `&#9;` inside attribute values literal unless decoding is on.
///
/// html5ever always decodes character references, so a value the platform left
/// encoded has to be re-escaped before parsing. `href` follows its own flag.
fn protect_encoded_newlines<'a>(template: &'a str, options: &CompileOptions) -> Cow<'a, str> {
    if options.should_decode_newlines && options.should_decode_newlines_for_href {
        return Cow::Borrowed(template);
    }
    if !template.contains("&#10;") && !template.contains("&#9;") {
        return Cow::Borrowed(template);
    }

    OPEN_TAG_RE.replace_all(template, |tag: &regex::Captures| {
        ATTR_VALUE_RE
            .replace_all(&tag[0], |attr: &regex::Captures| {
                let name = &attr[1];
                let decode = if name.eq_ignore_ascii_case("href") {
                    options.should_decode_newlines_for_href
                } else {
                    options.should_decode_newlines
                };
                if decode {
                    attr[0].to_string()
                } else {
                    let value = attr[3].replace("&#10;", "&amp;#10;").replace("&#9;", "&amp;#9;");
                    format!("{}{}{}", name, &attr[2], value)
                }
            })
            .into_owned()
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// Split text on interpolation delimiters.
fn parse_text(text: &str, tag_re: &Regex, errors: &mut Vec<CompilerError>) -> Vec<TextSegment> {
    let mut segments = Vec::new();
    let mut last_end = 0;

    for caps in tag_re.captures_iter(text) {
        let (Some(whole), Some(expr)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last_end {
            segments.push(TextSegment::Literal(text[last_end..whole.start()].to_string()));
        }
        let expr = expr.as_str().trim();
        if expr.is_empty() {
            errors.push(CompilerError::new(
                ERR_EMPTY_EXPRESSION,
                &format!("Empty interpolation: {}", whole.as_str()),
            ));
        } else {
            segments.push(TextSegment::Interpolation(expr.to_string()));
        }
        last_end = whole.end();
    }

    if last_end < text.len() {
        segments.push(TextSegment::Literal(text[last_end..].to_string()));
    }
    segments
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODE LOWERING
// ═══════════════════════════════════════════════════════════════════════════════

struct Lowering<'a> {
    options: &'a CompileOptions,
    tag_re: Cow<'a, Regex>,
    errors: Vec<CompilerError>,
}

impl Lowering<'_> {
    fn lower_children(&mut self, handle: &Handle, in_pre: bool) -> Vec<TemplateNode> {
        let mut nodes = Vec::new();
        for child in handle.children.borrow().iter() {
            if let Some(node) = self.lower_node(child, in_pre) {
                nodes.push(node);
            }
        }
        nodes
    }

    fn lower_node(&mut self, handle: &Handle, in_pre: bool) -> Option<TemplateNode> {
        match &handle.data {
            NodeData::Text { contents } => {
                let raw = contents.borrow().to_string();
                let text = if in_pre {
                    raw
                } else if raw.trim().is_empty() {
                    // Whitespace spanning lines is layout, not content.
                    if raw.contains('\n') {
                        return None;
                    }
                    " ".to_string()
                } else {
                    WHITESPACE_RE.replace_all(&raw, " ").into_owned()
                };
                let segments = parse_text(&text, &self.tag_re, &mut self.errors);
                (!segments.is_empty()).then_some(TemplateNode::Text { segments })
            }

            NodeData::Comment { contents } => self.options.comments.then(|| TemplateNode::Comment {
                text: contents.to_string(),
            }),

            NodeData::Element {
                name,
                attrs,
                template_contents,
                ..
            } => {
                let tag = name.local.to_string();
                let attributes = self.lower_attributes(&tag, &attrs.borrow());
                let in_pre = in_pre || tag == "pre";
                // <template> keeps its children in a separate document fragment.
                let children = match template_contents.borrow().as_ref() {
                    Some(fragment) => self.lower_children(fragment, in_pre),
                    None => self.lower_children(handle, in_pre),
                };
                Some(TemplateNode::Element(ElementNode {
                    tag,
                    attributes,
                    children,
                }))
            }

            NodeData::Document
            | NodeData::Doctype { .. }
            | NodeData::ProcessingInstruction { .. } => None,
        }
    }

    fn lower_attributes(&mut self, tag: &str, attrs: &[html5ever::Attribute]) -> Vec<AttributeIR> {
        let mut lowered = Vec::new();
        for attr in attrs {
            let name = attr.name.local.to_string();
            let value = attr.value.to_string();

            let bound = name
                .strip_prefix(':')
                .or_else(|| name.strip_prefix("v-bind:"));
            if let Some(target) = bound {
                if value.trim().is_empty() {
                    self.errors.push(CompilerError::new(
                        ERR_EMPTY_EXPRESSION,
                        &format!("Empty binding expression for \"{}\" on <{}>.", name, tag),
                    ));
                    continue;
                }
                lowered.push(AttributeIR {
                    name: target.to_string(),
                    value: AttributeValue::Bound(value.trim().to_string()),
                });
                continue;
            }

            if name.starts_with("v-") || name.starts_with('@') {
                self.errors.push(CompilerError::with_hints(
                    ERR_UNSUPPORTED_DIRECTIVE,
                    &format!("Unsupported directive \"{}\" on <{}>.", name, tag),
                    vec!["Only attribute bindings (:name / v-bind:name) are compiled.".to_string()],
                ));
                continue;
            }

            lowered.push(AttributeIR {
                name,
                value: AttributeValue::Static(value),
            });
        }
        lowered
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MAIN PARSING FUNCTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse a template string into top-level nodes plus any errors found on the way.
pub fn parse_template(
    template: &str,
    options: &CompileOptions,
) -> (Vec<TemplateNode>, Vec<CompilerError>) {
    let source = protect_encoded_newlines(template, options);

    let context = QualName::new(None, ns!(html), local_name!("body"));
    let dom = parse_fragment(RcDom::default(), ParseOpts::default(), context, vec![])
        .one(source.as_ref());

    let mut errors = Vec::new();
    let tag_re = match &options.delimiters {
        Some((open, close)) => match build_tag_regex(open, close) {
            Ok(re) => Cow::Owned(re),
            Err(e) => {
                errors.push(CompilerError::new(
                    ERR_PARSE,
                    &format!("Invalid delimiters {:?}: {}", (open, close), e),
                ));
                Cow::Borrowed(&*DEFAULT_TAG_RE)
            }
        },
        None => Cow::Borrowed(&*DEFAULT_TAG_RE),
    };
    let mut lowering = Lowering {
        options,
        tag_re,
        errors,
    };

    // Fragment parsing nests the content under a synthetic <html> element.
    let mut nodes = Vec::new();
    for child in dom.document.children.borrow().iter() {
        match &child.data {
            NodeData::Element { name, .. } if &*name.local == "html" => {
                nodes.extend(lowering.lower_children(child, false));
            }
            _ => nodes.extend(lowering.lower_node(child, false)),
        }
    }

    // Whitespace between root nodes carries no meaning.
    nodes.retain(|n| match n {
        TemplateNode::Text { segments } => segments.iter().any(|s| match s {
            TextSegment::Literal(text) => !text.trim().is_empty(),
            TextSegment::Interpolation(_) => true,
        }),
        _ => true,
    });

    (nodes, lowering.errors)
}
