//! Performance marks around template compilation.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

pub trait PerformanceReporter {
    fn mark(&self, label: &str);
    fn measure(&self, name: &str, start_label: &str, end_label: &str);
}

impl<T: PerformanceReporter + ?Sized> PerformanceReporter for Rc<T> {
    fn mark(&self, label: &str) {
        (**self).mark(label)
    }

    fn measure(&self, name: &str, start_label: &str, end_label: &str) {
        (**self).measure(name, start_label, end_label)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl PerformanceReporter for NoopReporter {
    fn mark(&self, _label: &str) {}
    fn measure(&self, _name: &str, _start_label: &str, _end_label: &str) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measure {
    pub name: String,
    pub duration: Duration,
}

/// Records marks as `Instant`s and measures as durations between two marks.
#[derive(Debug, Default)]
pub struct Timeline {
    marks: RefCell<HashMap<String, Instant>>,
    measures: RefCell<Vec<Measure>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn measures(&self) -> Vec<Measure> {
        self.measures.borrow().clone()
    }

    pub fn has_mark(&self, label: &str) -> bool {
        self.marks.borrow().contains_key(label)
    }
}

impl PerformanceReporter for Timeline {
    fn mark(&self, label: &str) {
        self.marks.borrow_mut().insert(label.to_string(), Instant::now());
    }

    fn measure(&self, name: &str, start_label: &str, end_label: &str) {
        let marks = self.marks.borrow();
        let (Some(start), Some(end)) = (marks.get(start_label), marks.get(end_label)) else {
            tracing::debug!(name, start_label, end_label, "measure skipped: missing mark");
            return;
        };
        let duration = end.saturating_duration_since(*start);
        tracing::debug!(name, ?duration, "measure");
        self.measures.borrow_mut().push(Measure {
            name: name.to_string(),
            duration,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_between_marks() {
        let timeline = Timeline::new();
        timeline.mark("compile");
        timeline.mark("compile end");
        timeline.measure("<App> compile", "compile", "compile end");

        let measures = timeline.measures();
        assert_eq!(measures.len(), 1);
        assert_eq!(measures[0].name, "<App> compile");
    }

    #[test]
    fn test_measure_without_marks_is_ignored() {
        let timeline = Timeline::new();
        timeline.mark("compile");
        timeline.measure("x", "compile", "never");
        assert!(timeline.measures().is_empty());
    }
}
