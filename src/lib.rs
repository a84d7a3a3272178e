//! # Template Mount Ground Truth
//!
//! ## Mount Invariants
//!
//! 1. **Write-Once Artifact**: a component configuration receives a render artifact
//!    at most once. If one is present, template resolution and compilation are
//!    skipped entirely.
//!
//! 2. **Selector-Only Cache**: the template cache stores `#id` lookups and nothing
//!    else. Raw markup and DOM nodes never touch it. Misses are cached too, so a
//!    selector costs at most one DOM query.
//!
//! 3. **Unsafe Targets**: mounting onto `<html>` or `<body>` returns the instance
//!    unchanged. Neither the compiler nor the base mount is invoked.
//!
//! 4. **No Hard Failures**: the gate never returns an error. Unsafe targets,
//!    missing templates and invalid template shapes degrade to diagnostics, which
//!    exist only in non-optimized builds.
//!
//! 5. **One Compile Per Key**: the default compiler memoizes by a SHA-256 of the
//!    compile options and template string.
//!
//! ## Composition
//!
//! [`with_compiler`] wraps any [`BaseMount`] into a [`MountGate`]. Every
//! collaborator (DOM, cache, compiler, performance reporter, diagnostic sink) is
//! injected, so each gate (and each test) owns its own state.

#[cfg(feature = "napi")]
use napi_derive::napi;

mod cache;
mod codegen;
mod compiler;
mod component;
mod config;
mod diagnostics;
mod dom;
mod mount;
mod optimize;
mod parse;
mod perf;
mod render;
mod template_cache;
mod validate;


pub use cache::CompileCache;
pub use compiler::{
    compile, CachingCompiler, CompileOptions, CompileResult, CompiledArtifact, TemplateCompiler,
};
pub use component::{ComponentInstance, ComponentOptions, MountTarget, TemplateSource};
pub use config::{ConfigError, MountConfig, DEV_BUILD};
pub use diagnostics::{CollectingSink, DiagnosticSink, MountDiagnostic, TracingSink};
pub use dom::{Document, DomQuery, Element};
pub use mount::{with_compiler, BaseMount, MountGate, MountStatus, Mounted, RenderMount};
pub use perf::{Measure, NoopReporter, PerformanceReporter, Timeline};
pub use render::{RenderFn, VNode};
pub use template_cache::TemplateCache;
pub use validate::{CompilerError, TemplateNode};

#[cfg(feature = "napi")]
pub use compiler::compile_to_functions_native;

#[cfg(feature = "napi")]
#[napi]
pub fn compile_bridge() -> String {
    "Template Mount Native Bridge Connected".to_string()
}
