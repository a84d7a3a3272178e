//! Template → render function compilation.
//!
//! `compile` runs the pipeline (parse, validate, optimize, codegen) without any
//! caching. [`CachingCompiler`] is the memoizing front end the mount gate uses by
//! default; it compiles each distinct (options, template) key exactly once.

#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::cache::CompileCache;
use crate::component::ComponentInstance;
use crate::optimize::optimize;
use crate::parse::parse_template;
use crate::render::{RenderFn, VNode};
use crate::validate::{validate_root, CompilerError, TemplateNode};

// ═══════════════════════════════════════════════════════════════════════════════
// INPUT/OUTPUT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Interpolation delimiters, `{{`/`}}` when unset.
    pub delimiters: Option<(String, String)>,
    /// Keep HTML comments in the output.
    pub comments: bool,
    /// Decode `&#10;`/`&#9;` inside attribute values.
    pub should_decode_newlines: bool,
    /// Same as `should_decode_newlines`, for `href` only.
    pub should_decode_newlines_for_href: bool,
}

/// The render artifact: a render fn plus the hoisted static render fns it refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledArtifact {
    pub render: RenderFn,
    pub static_render_fns: Vec<RenderFn>,
}

impl CompiledArtifact {
    pub fn call(&self, data: &Value) -> VNode {
        self.render.call(data, &self.static_render_fns)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResult {
    pub artifact: CompiledArtifact,
    pub errors: Vec<CompilerError>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER SERVICE
// ═══════════════════════════════════════════════════════════════════════════════

pub trait TemplateCompiler {
    fn compile(
        &self,
        template: &str,
        options: &CompileOptions,
        owner: &ComponentInstance,
    ) -> CompileResult;
}

/// Compile a template string directly, bypassing every cache.
pub fn compile(template: &str, options: &CompileOptions) -> CompileResult {
    let (nodes, mut errors) = parse_template(template, options);
    errors.extend(validate_root(&nodes));

    let root = nodes
        .into_iter()
        .find(|n| matches!(n, TemplateNode::Element(_)));
    let (root, statics) = match root {
        Some(root) => {
            let (root, statics) = optimize(root);
            (Some(root), statics)
        }
        None => (None, Vec::new()),
    };

    CompileResult {
        artifact: CompiledArtifact {
            render: RenderFn::new(root),
            static_render_fns: statics.into_iter().map(|s| RenderFn::new(Some(s))).collect(),
        },
        errors,
    }
}

/// Memoizing compiler. Clones share one cache.
#[derive(Debug, Clone, Default)]
pub struct CachingCompiler {
    cache: Arc<CompileCache>,
}

impl CachingCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(cache: Arc<CompileCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &CompileCache {
        &self.cache
    }

    pub fn compile_to_functions(&self, template: &str, options: &CompileOptions) -> CompileResult {
        self.cache
            .get_or_compile(template, options, || compile(template, options))
    }
}

impl TemplateCompiler for CachingCompiler {
    fn compile(
        &self,
        template: &str,
        options: &CompileOptions,
        owner: &ComponentInstance,
    ) -> CompileResult {
        let _span = tracing::debug_span!("compile", component = %owner.name()).entered();
        self.compile_to_functions(template, options)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI EXPORT
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
#[napi]
pub fn compile_to_functions_native(
    template: String,
    options_json: Option<String>,
) -> napi::Result<serde_json::Value> {
    let options: CompileOptions = match options_json {
        Some(json) => {
            serde_json::from_str(&json).map_err(|e| napi::Error::from_reason(e.to_string()))?
        }
        None => CompileOptions::default(),
    };
    serde_json::to_value(compile(&template, &options))
        .map_err(|e| napi::Error::from_reason(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{ERR_MULTIPLE_ROOTS, ERR_NO_ROOT};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_compile_and_render() {
        let result = compile(
            "<div id=\"app\"><h1>{{ title }}</h1><ul><li>static</li></ul></div>",
            &CompileOptions::default(),
        );
        assert!(result.errors.is_empty());
        assert_eq!(result.artifact.static_render_fns.len(), 1);

        let vnode = result.artifact.call(&json!({ "title": "Hello" }));
        assert_eq!(
            vnode.to_html(),
            "<div id=\"app\"><h1>Hello</h1><ul><li>static</li></ul></div>"
        );
    }

    #[test]
    fn test_static_nodes_are_flagged() {
        let result = compile("<div><p><b>s</b></p>{{ x }}</div>", &CompileOptions::default());
        let VNode::Element { children, .. } = result.artifact.call(&json!({})) else {
            panic!("expected element");
        };
        assert!(matches!(children[0], VNode::Element { is_static: true, .. }));
    }

    #[test]
    fn test_root_errors_still_produce_artifact() {
        let result = compile("<p>a</p><p>b</p>", &CompileOptions::default());
        assert_eq!(result.errors[0].code, ERR_MULTIPLE_ROOTS);
        assert_eq!(result.artifact.call(&json!({})).to_html(), "<p>a</p>");

        let result = compile("just text", &CompileOptions::default());
        assert_eq!(result.errors[0].code, ERR_NO_ROOT);
        assert_eq!(result.artifact.call(&json!({})), VNode::Empty);
    }

    #[test]
    fn test_bound_attribute_rendering() {
        let result = compile(
            r#"<input :value="form.name" :disabled="locked" :placeholder="hint">"#,
            &CompileOptions::default(),
        );
        let html = result
            .artifact
            .call(&json!({ "form": { "name": "Ada" }, "locked": false, "hint": null }))
            .to_html();
        assert_eq!(html, "<input value=\"Ada\">");
    }

    #[test]
    fn test_caching_compiler_memoizes_by_key() {
        let compiler = CachingCompiler::new();
        let options = CompileOptions::default();
        let first = compiler.compile_to_functions("<p>{{ a }}</p>", &options);
        let second = compiler.compile_to_functions("<p>{{ a }}</p>", &options);
        assert_eq!(first, second);
        assert_eq!(compiler.cache().len(), 1);

        let custom = CompileOptions {
            delimiters: Some(("[[".into(), "]]".into())),
            ..Default::default()
        };
        compiler.compile_to_functions("<p>{{ a }}</p>", &custom);
        assert_eq!(compiler.cache().len(), 2);
    }

    #[test]
    fn test_artifact_serializes() {
        let result = compile("<p>{{ a }}</p>", &CompileOptions::default());
        let json = serde_json::to_string(&result.artifact).unwrap();
        let back: CompiledArtifact = serde_json::from_str(&json).unwrap();
        assert_eq!(back.render.code(), result.artifact.render.code());
    }

    #[test]
    fn test_options_from_json() {
        let options: CompileOptions =
            serde_json::from_str(r#"{"delimiters": ["${", "}"], "comments": true}"#).unwrap();
        assert_eq!(options.delimiters, Some(("${".into(), "}".into())));
        assert!(options.comments);
        assert!(!options.should_decode_newlines);
    }
}
