//! # Mount Gate
//!
//! Runs once per component instance, right before the base mount attaches it.
//!
//! ## Pipeline
//!
//! 1. **Target**: a selector target is resolved with a single DOM query. A miss
//!    means a detached mount, not an error.
//! 2. **Guard**: `<html>` and `<body>` are refused. The instance comes back
//!    unchanged and neither the compiler nor the base mount runs.
//! 3. **Short-circuit**: a configuration that already has a render fn skips
//!    template acquisition and compilation entirely.
//! 4. **Acquisition**, first match wins: `#id` selector (through the
//!    [`TemplateCache`]), node inner content, markup verbatim, precompiled artifact,
//!    and finally the target's own outer markup.
//! 5. **Compilation** of a non-empty template, bracketed by performance marks.
//! 6. **Assignment** of the artifact onto the configuration, once.
//! 7. **Delegation** to the base mount with the resolved element.
//!
//! Nothing here returns an error. Anomalies become [`MountDiagnostic`]s carried in
//! [`Mounted`] and forwarded to the configured sink.

use std::rc::Rc;
use std::sync::Arc;

use crate::compiler::{CachingCompiler, CompiledArtifact, TemplateCompiler};
use crate::component::{ComponentInstance, MountTarget, TemplateSource};
use crate::config::{MountConfig, DEV_BUILD};
use crate::diagnostics::{DiagnosticSink, MountDiagnostic, Reporter, TracingSink};
use crate::dom::{DomQuery, Element};
use crate::perf::{NoopReporter, PerformanceReporter};
use crate::render::VNode;
use crate::template_cache::TemplateCache;

// ═══════════════════════════════════════════════════════════════════════════════
// BASE MOUNT
// ═══════════════════════════════════════════════════════════════════════════════

/// The compiler-agnostic attachment step.
pub trait BaseMount {
    fn mount(&self, vm: ComponentInstance, el: Option<Element>, hydrating: bool)
        -> ComponentInstance;
}

impl<T: BaseMount + ?Sized> BaseMount for Rc<T> {
    fn mount(
        &self,
        vm: ComponentInstance,
        el: Option<Element>,
        hydrating: bool,
    ) -> ComponentInstance {
        (**self).mount(vm, el, hydrating)
    }
}

/// Renders the installed artifact against the instance data and marks it mounted.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderMount;

impl BaseMount for RenderMount {
    fn mount(
        &self,
        mut vm: ComponentInstance,
        el: Option<Element>,
        hydrating: bool,
    ) -> ComponentInstance {
        let vnode = match vm.options.artifact() {
            Some(artifact) => artifact.call(&vm.data),
            None => {
                tracing::warn!(
                    component = %vm.name(),
                    "Failed to mount component: template or render function not defined."
                );
                VNode::Empty
            }
        };
        vm.vnode = Some(vnode);
        vm.el = el;
        vm.is_mounted = true;
        vm.hydrated = hydrating;
        vm
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MOUNT RESULT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountStatus {
    /// The base mount ran; `instance` is its result.
    Delegated,
    /// The gate stopped early; `instance` is unchanged.
    Aborted,
}

#[derive(Debug)]
pub struct Mounted {
    pub instance: ComponentInstance,
    pub status: MountStatus,
    pub diagnostics: Vec<MountDiagnostic>,
}

impl Mounted {
    fn aborted(instance: ComponentInstance, diagnostics: Vec<MountDiagnostic>) -> Self {
        Self {
            instance,
            status: MountStatus::Aborted,
            diagnostics,
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.status == MountStatus::Aborted
    }
}

enum Acquired {
    Template(String),
    Artifact(CompiledArtifact),
    Abort,
    Nothing,
}

// ═══════════════════════════════════════════════════════════════════════════════
// MOUNT GATE
// ═══════════════════════════════════════════════════════════════════════════════

pub struct MountGate<B> {
    base: B,
    dom: Rc<dyn DomQuery>,
    templates: Arc<TemplateCache>,
    compiler: Box<dyn TemplateCompiler>,
    reporter: Box<dyn PerformanceReporter>,
    sink: Box<dyn DiagnosticSink>,
    config: MountConfig,
}

/// Wrap a base mount into a mount that resolves and compiles templates first.
pub fn with_compiler<B: BaseMount>(base: B, dom: Rc<dyn DomQuery>) -> MountGate<B> {
    MountGate {
        base,
        dom,
        templates: Arc::new(TemplateCache::new()),
        compiler: Box::new(CachingCompiler::new()),
        reporter: Box::new(NoopReporter),
        sink: Box::new(TracingSink),
        config: MountConfig::default(),
    }
}

impl<B: BaseMount> MountGate<B> {
    pub fn with_cache(mut self, templates: Arc<TemplateCache>) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_template_compiler(mut self, compiler: impl TemplateCompiler + 'static) -> Self {
        self.compiler = Box::new(compiler);
        self
    }

    pub fn with_reporter(mut self, reporter: impl PerformanceReporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    pub fn with_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn with_config(mut self, config: MountConfig) -> Self {
        self.config = config;
        self
    }

    pub fn template_cache(&self) -> &Arc<TemplateCache> {
        &self.templates
    }

    pub fn config(&self) -> &MountConfig {
        &self.config
    }

    /// Resolve, compile if needed, then delegate to the base mount.
    pub fn mount(
        &self,
        mut vm: ComponentInstance,
        target: Option<MountTarget>,
        hydrating: bool,
    ) -> Mounted {
        let mut report = Reporter::new(self.config.silent, &*self.sink);
        let el = target.and_then(|t| self.resolve_target(t, &vm, &mut report));

        if let Some(el) = &el {
            if self.dom.is_unsafe_target(el) {
                report.warn(
                    MountDiagnostic::UnsafeMountTarget { tag: el.tag_name() },
                    &vm,
                );
                return Mounted::aborted(vm, report.finish());
            }
        }

        if !vm.options.has_render() {
            match self.acquire_template(&vm, el.as_ref(), &mut report) {
                Acquired::Template(template) => self.compile_into(&mut vm, &template, &mut report),
                Acquired::Artifact(artifact) => {
                    vm.options.install(artifact);
                }
                Acquired::Abort => return Mounted::aborted(vm, report.finish()),
                Acquired::Nothing => {}
            }
        }

        let instance = self.base.mount(vm, el, hydrating);
        Mounted {
            instance,
            status: MountStatus::Delegated,
            diagnostics: report.finish(),
        }
    }

    fn resolve_target(
        &self,
        target: MountTarget,
        vm: &ComponentInstance,
        report: &mut Reporter<'_>,
    ) -> Option<Element> {
        match target {
            MountTarget::Element(el) => Some(el),
            MountTarget::Selector(selector) => {
                let found = self.dom.query(&selector);
                if found.is_none() {
                    report.warn(MountDiagnostic::TargetNotFound { selector }, vm);
                }
                found
            }
        }
    }

    fn acquire_template(
        &self,
        vm: &ComponentInstance,
        el: Option<&Element>,
        report: &mut Reporter<'_>,
    ) -> Acquired {
        let source = vm.options.template.as_ref().filter(|t| !t.is_blank());
        let template = match source {
            Some(TemplateSource::Selector(selector)) if selector.starts_with('#') => {
                let found = self
                    .templates
                    .resolve(selector, &*self.dom)
                    .filter(|t| !t.is_empty());
                if found.is_none() {
                    report.warn(
                        MountDiagnostic::MissingOrEmptyTemplate {
                            selector: selector.clone(),
                        },
                        vm,
                    );
                }
                found
            }
            Some(TemplateSource::Selector(markup)) | Some(TemplateSource::Markup(markup)) => {
                Some(markup.clone())
            }
            Some(TemplateSource::Node(node)) => Some(node.inner_html()),
            Some(TemplateSource::Compiled(artifact)) => {
                return Acquired::Artifact(artifact.clone());
            }
            Some(TemplateSource::Invalid(shape)) => {
                report.warn(
                    MountDiagnostic::InvalidTemplateSourceShape {
                        shape: shape.clone(),
                    },
                    vm,
                );
                return Acquired::Abort;
            }
            None => el.map(|el| self.outer_html(el)),
        };

        match template {
            Some(template) if !template.is_empty() => Acquired::Template(template),
            _ => Acquired::Nothing,
        }
    }

    /// Outer markup of `el`, via a detached wrapper when the DOM cannot serialize it.
    fn outer_html(&self, el: &Element) -> String {
        self.dom.outer_html(el).unwrap_or_else(|| {
            let container = Element::detached("div");
            container.append_clone(el);
            container.inner_html()
        })
    }

    fn compile_into(&self, vm: &mut ComponentInstance, template: &str, report: &mut Reporter<'_>) {
        let timed = DEV_BUILD && self.config.performance;
        let mut options = vm.options.compile_options();
        options.should_decode_newlines = self.config.should_decode_newlines;
        options.should_decode_newlines_for_href = self.config.should_decode_newlines_for_href;

        if timed {
            self.reporter.mark("compile");
        }
        let result = self.compiler.compile(template, &options, vm);
        if timed {
            self.reporter.mark("compile end");
            let name = format!("template-mount {} compile", vm.name());
            self.reporter.measure(&name, "compile", "compile end");
        }

        for error in result.errors {
            report.warn(MountDiagnostic::CompileError(error), vm);
        }
        vm.options.install(result.artifact);
    }
}
