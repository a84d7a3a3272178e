//! Component configuration and instances.

use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::compiler::{CompileOptions, CompiledArtifact};
use crate::config::ConfigError;
use crate::dom::Element;
use crate::render::{RenderFn, VNode};

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE SOURCE
// ═══════════════════════════════════════════════════════════════════════════════

/// Where a component's template comes from.
#[derive(Debug, Clone)]
pub enum TemplateSource {
    /// `#id` lookup, resolved through the template cache.
    Selector(String),
    /// Markup used verbatim.
    Markup(String),
    /// The inner content of this node.
    Node(Element),
    /// Already compiled; installed without compilation.
    Compiled(CompiledArtifact),
    /// A configured value of unrecognized shape, described for diagnostics.
    Invalid(String),
}

impl TemplateSource {
    /// Normalize a template string: a leading `#` means an id selector.
    pub fn from_string(template: impl Into<String>) -> Self {
        let template = template.into();
        if template.starts_with('#') {
            TemplateSource::Selector(template)
        } else {
            TemplateSource::Markup(template)
        }
    }

    /// An empty selector or markup string, which configures no template at all.
    pub fn is_blank(&self) -> bool {
        matches!(self, TemplateSource::Selector(s) | TemplateSource::Markup(s) if s.is_empty())
    }

    /// Normalize a loosely typed configuration value.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(Self::from_string(s.as_str())),
            Value::Bool(false) => None,
            other => Some(TemplateSource::Invalid(other.to_string())),
        }
    }
}

impl From<&str> for TemplateSource {
    fn from(template: &str) -> Self {
        Self::from_string(template)
    }
}

impl From<String> for TemplateSource {
    fn from(template: String) -> Self {
        Self::from_string(template)
    }
}

impl From<Element> for TemplateSource {
    fn from(node: Element) -> Self {
        TemplateSource::Node(node)
    }
}

impl From<CompiledArtifact> for TemplateSource {
    fn from(artifact: CompiledArtifact) -> Self {
        TemplateSource::Compiled(artifact)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct ComponentOptions {
    pub name: Option<String>,
    pub template: Option<TemplateSource>,
    pub render: Option<RenderFn>,
    pub static_render_fns: Vec<RenderFn>,
    pub delimiters: Option<(String, String)>,
    pub comments: bool,
}

impl ComponentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the template source. An empty string leaves it unset.
    pub fn template(mut self, template: impl Into<TemplateSource>) -> Self {
        let template = template.into();
        self.template = (!template.is_blank()).then_some(template);
        self
    }

    pub fn render(mut self, artifact: CompiledArtifact) -> Self {
        self.install(artifact);
        self
    }

    pub fn delimiters(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.delimiters = Some((open.into(), close.into()));
        self
    }

    pub fn comments(mut self, comments: bool) -> Self {
        self.comments = comments;
        self
    }

    /// Load options from JSON. Recognized keys: `name`, `template`,
    /// `delimiters` and `comments`.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(json)?;
        let Value::Object(map) = value else {
            return Err(ConfigError::InvalidField(
                "component options must be an object".to_string(),
            ));
        };

        let mut options = ComponentOptions::new();
        if let Some(name) = map.get("name") {
            let name = name
                .as_str()
                .ok_or_else(|| ConfigError::InvalidField("name must be a string".to_string()))?;
            options.name = Some(name.to_string());
        }
        if let Some(template) = map.get("template") {
            options.template = TemplateSource::from_value(template);
        }
        if let Some(delimiters) = map.get("delimiters") {
            options.delimiters = serde_json::from_value(delimiters.clone())?;
        }
        if let Some(comments) = map.get("comments") {
            options.comments = comments.as_bool().ok_or_else(|| {
                ConfigError::InvalidField("comments must be a boolean".to_string())
            })?;
        }
        Ok(options)
    }

    pub fn has_render(&self) -> bool {
        self.render.is_some()
    }

    /// Store a render artifact. A configuration that already has one keeps it.
    pub fn install(&mut self, artifact: CompiledArtifact) -> bool {
        if self.render.is_some() {
            return false;
        }
        self.render = Some(artifact.render);
        self.static_render_fns = artifact.static_render_fns;
        true
    }

    /// The installed artifact, if any.
    pub fn artifact(&self) -> Option<CompiledArtifact> {
        self.render.as_ref().map(|render| CompiledArtifact {
            render: render.clone(),
            static_render_fns: self.static_render_fns.clone(),
        })
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            delimiters: self.delimiters.clone(),
            comments: self.comments,
            ..Default::default()
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// INSTANCES
// ═══════════════════════════════════════════════════════════════════════════════

static INSTANCE_UID: AtomicU64 = AtomicU64::new(0);

/// Where to mount: a selector to query, or an element already in hand.
#[derive(Debug, Clone)]
pub enum MountTarget {
    Selector(String),
    Element(Element),
}

impl From<&str> for MountTarget {
    fn from(selector: &str) -> Self {
        MountTarget::Selector(selector.to_string())
    }
}

impl From<String> for MountTarget {
    fn from(selector: String) -> Self {
        MountTarget::Selector(selector)
    }
}

impl From<Element> for MountTarget {
    fn from(el: Element) -> Self {
        MountTarget::Element(el)
    }
}

#[derive(Debug, Clone)]
pub struct ComponentInstance {
    uid: u64,
    pub options: ComponentOptions,
    pub data: Value,
    pub el: Option<Element>,
    pub vnode: Option<VNode>,
    pub is_mounted: bool,
    pub hydrated: bool,
}

impl ComponentInstance {
    pub fn new(options: ComponentOptions) -> Self {
        Self {
            uid: INSTANCE_UID.fetch_add(1, Ordering::SeqCst),
            options,
            data: Value::Object(Default::default()),
            el: None,
            vnode: None,
            is_mounted: false,
            hydrated: false,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// Display name, `<Anonymous>` when unnamed.
    pub fn name(&self) -> String {
        match &self.options.name {
            Some(name) => format!("<{}>", name),
            None => "<Anonymous>".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;

    #[test]
    fn test_template_string_normalization() {
        assert!(matches!(TemplateSource::from("#tpl"), TemplateSource::Selector(s) if s == "#tpl"));
        assert!(matches!(TemplateSource::from("<p></p>"), TemplateSource::Markup(_)));
        assert!(matches!(TemplateSource::from(" #tpl"), TemplateSource::Markup(_)));
    }

    #[test]
    fn test_from_json_normalizes_template() {
        let options = ComponentOptions::from_json(
            r##"{"name": "App", "template": "#app-tpl", "delimiters": ["[[", "]]"], "comments": true}"##,
        )
        .unwrap();
        assert_eq!(options.name.as_deref(), Some("App"));
        assert!(matches!(options.template, Some(TemplateSource::Selector(_))));
        assert_eq!(options.delimiters, Some(("[[".into(), "]]".into())));
        assert!(options.comments);
    }

    #[test]
    fn test_from_json_marks_invalid_shapes() {
        let options = ComponentOptions::from_json(r#"{"template": 42}"#).unwrap();
        assert!(matches!(&options.template, Some(TemplateSource::Invalid(s)) if s == "42"));

        let options = ComponentOptions::from_json(r#"{"template": null}"#).unwrap();
        assert!(options.template.is_none());
    }

    #[test]
    fn test_empty_template_string_is_unset() {
        assert!(ComponentOptions::new().template("").template.is_none());
        assert!(ComponentOptions::new().template(String::new()).template.is_none());
        assert!(ComponentOptions::from_json(r#"{"template": ""}"#)
            .unwrap()
            .template
            .is_none());
        assert!(TemplateSource::Markup(String::new()).is_blank());
        assert!(!TemplateSource::Markup(" ".into()).is_blank());
    }

    #[test]
    fn test_from_json_rejects_bad_fields() {
        assert!(ComponentOptions::from_json("[]").is_err());
        assert!(ComponentOptions::from_json(r#"{"comments": "yes"}"#).is_err());
        assert!(ComponentOptions::from_json(r#"{"delimiters": "{{"}"#).is_err());
    }

    #[test]
    fn test_install_is_write_once() {
        let first = compile("<p>1</p>", &CompileOptions::default()).artifact;
        let second = compile("<p>2</p>", &CompileOptions::default()).artifact;

        let mut options = ComponentOptions::new();
        assert!(options.install(first.clone()));
        assert!(!options.install(second));
        assert_eq!(options.artifact(), Some(first));
    }

    #[test]
    fn test_instance_uids_increase() {
        let a = ComponentInstance::new(ComponentOptions::new());
        let b = ComponentInstance::new(ComponentOptions::new().name("Card"));
        assert!(b.uid() > a.uid());
        assert_eq!(a.name(), "<Anonymous>");
        assert_eq!(b.name(), "<Card>");
    }
}
