//! Selector → template markup memoization.
//!
//! Entries are never evicted and negative results are stored, so each distinct
//! selector costs at most one DOM query for the lifetime of the cache.

use crate::dom::DomQuery;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: Mutex<HashMap<String, Option<String>>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inner markup of the element matched by `selector`, or `None` if nothing matches.
    pub fn resolve(&self, selector: &str, dom: &dyn DomQuery) -> Option<String> {
        // Check and fill under one lock so concurrent callers never query twice.
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(hit) = entries.get(selector) {
            return hit.clone();
        }

        let markup = dom.query(selector).map(|el| el.inner_html());
        entries.insert(selector.to_string(), markup.clone());
        markup
    }

    pub fn contains(&self, selector: &str) -> bool {
        self.entries
            .lock()
            .map(|entries| entries.contains_key(selector))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
