//! Advisory diagnostics for the mount gate.
//!
//! None of these stop a mount. They are a development aid: in optimized builds
//! (`debug_assertions` off) nothing is reported at all, and with
//! [`MountConfig::silent`](crate::config::MountConfig) they are suppressed in
//! debug builds too.

use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

use crate::component::ComponentInstance;
use crate::config::DEV_BUILD;
use crate::validate::CompilerError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MountDiagnostic {
    #[error("Do not mount to <{tag}> - mount to normal elements instead.")]
    UnsafeMountTarget { tag: String },

    #[error("Template element not found or is empty: {selector}")]
    MissingOrEmptyTemplate { selector: String },

    #[error("invalid template option: {shape}")]
    InvalidTemplateSourceShape { shape: String },

    #[error("Cannot find element: {selector}")]
    TargetNotFound { selector: String },

    #[error("Error compiling template: {0}")]
    CompileError(CompilerError),
}

pub trait DiagnosticSink {
    fn warn(&self, diagnostic: &MountDiagnostic, owner: &ComponentInstance);
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for Rc<T> {
    fn warn(&self, diagnostic: &MountDiagnostic, owner: &ComponentInstance) {
        (**self).warn(diagnostic, owner)
    }
}

/// Emits every diagnostic as a `tracing` warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn warn(&self, diagnostic: &MountDiagnostic, owner: &ComponentInstance) {
        tracing::warn!(component = %owner.name(), uid = owner.uid(), "{}", diagnostic);
    }
}

/// Keeps diagnostics in memory, tagged with the owner's display name.
#[derive(Debug, Default)]
pub struct CollectingSink {
    entries: RefCell<Vec<(String, MountDiagnostic)>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(String, MountDiagnostic)> {
        self.entries.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl DiagnosticSink for CollectingSink {
    fn warn(&self, diagnostic: &MountDiagnostic, owner: &ComponentInstance) {
        self.entries
            .borrow_mut()
            .push((owner.name(), diagnostic.clone()));
    }
}

/// Per-mount collector: forwards to the sink and remembers what was reported.
pub(crate) struct Reporter<'a> {
    enabled: bool,
    sink: &'a dyn DiagnosticSink,
    reported: Vec<MountDiagnostic>,
}

impl<'a> Reporter<'a> {
    pub(crate) fn new(silent: bool, sink: &'a dyn DiagnosticSink) -> Self {
        Self {
            enabled: DEV_BUILD && !silent,
            sink,
            reported: Vec::new(),
        }
    }

    pub(crate) fn warn(&mut self, diagnostic: MountDiagnostic, owner: &ComponentInstance) {
        if !self.enabled {
            return;
        }
        self.sink.warn(&diagnostic, owner);
        self.reported.push(diagnostic);
    }

    pub(crate) fn finish(self) -> Vec<MountDiagnostic> {
        self.reported
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentOptions;

    #[test]
    fn test_messages() {
        let diag = MountDiagnostic::UnsafeMountTarget { tag: "body".into() };
        assert_eq!(
            diag.to_string(),
            "Do not mount to <body> - mount to normal elements instead."
        );
        let diag = MountDiagnostic::MissingOrEmptyTemplate {
            selector: "#tpl".into(),
        };
        assert_eq!(diag.to_string(), "Template element not found or is empty: #tpl");
    }

    #[test]
    fn test_collecting_sink_records_owner() {
        let sink = CollectingSink::new();
        let vm = ComponentInstance::new(ComponentOptions::new().name("Card"));
        sink.warn(
            &MountDiagnostic::TargetNotFound {
                selector: "#x".into(),
            },
            &vm,
        );
        assert_eq!(sink.entries()[0].0, "<Card>");
    }

    #[test]
    fn test_silent_reporter_drops_everything() {
        let sink = CollectingSink::new();
        let vm = ComponentInstance::new(ComponentOptions::new());
        let mut reporter = Reporter::new(true, &sink);
        reporter.warn(
            MountDiagnostic::InvalidTemplateSourceShape { shape: "1".into() },
            &vm,
        );
        assert!(reporter.finish().is_empty());
        assert!(sink.is_empty());
    }
}
