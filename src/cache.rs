use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::compiler::{CompileOptions, CompileResult};

/// In-memory compile results keyed by a SHA-256 of the options and template.
#[derive(Debug, Default)]
pub struct CompileCache {
    entries: Mutex<HashMap<String, CompileResult>>,
}

impl CompileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every variable-length field is length-prefixed so no two distinct inputs
    /// share a byte stream.
    pub fn compute_key(template: &str, options: &CompileOptions) -> String {
        let mut hasher = Sha256::new();
        match &options.delimiters {
            Some((open, close)) => {
                hasher.update([1u8]);
                update_field(&mut hasher, open);
                update_field(&mut hasher, close);
            }
            None => hasher.update([0u8]),
        }
        hasher.update([
            options.comments as u8,
            options.should_decode_newlines as u8,
            options.should_decode_newlines_for_href as u8,
        ]);
        update_field(&mut hasher, template);
        format!("{:x}", hasher.finalize())
    }

    /// Return the cached result for this key, running `compile` only on a miss.
    pub fn get_or_compile(
        &self,
        template: &str,
        options: &CompileOptions,
        compile: impl FnOnce() -> CompileResult,
    ) -> CompileResult {
        let key = Self::compute_key(template, options);
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(hit) = entries.get(&key) {
            tracing::trace!(key = %key, "compile cache hit");
            return hit.clone();
        }

        tracing::trace!(key = %key, "compile cache miss");
        let result = compile();
        entries.insert(key, result.clone());
        result
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn update_field(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}
