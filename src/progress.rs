//! Status-reporting trait for conversion lifecycle events.
//!
//! Inject an `Arc<dyn StatusReporter>` via
//! [`crate::config::ConversionConfigBuilder::status_reporter`] to receive the
//! job record updates as the pipeline moves through its checkpoints.
//!
//! Status writes are an injected capability rather than ambient global state
//! so the pipeline stays a pure function of its inputs for testing: callers
//! can forward events to a database record, a message bus, or a terminal
//! progress bar without the library knowing which.

use crate::pipeline::validate::ValidationReport;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The quality summary attached to a completed conversion record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub word_ratio: Option<f64>,
    pub source_words: usize,
    pub rendered_words: usize,
    pub chapter_count: usize,
    pub image_count: usize,
    pub passed: bool,
}

impl From<&ValidationReport> for QualitySummary {
    fn from(r: &ValidationReport) -> Self {
        Self {
            word_ratio: r.word_ratio,
            source_words: r.source_words,
            rendered_words: r.rendered_words,
            chapter_count: r.chapter_count,
            image_count: r.image_count,
            passed: r.passed,
        }
    }
}

/// Receives job-record updates from a single conversion invocation.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. One logical actor writes the record: calls arrive
/// strictly in invocation order, and `on_processing` values are
/// monotonically non-decreasing.
pub trait StatusReporter: Send + Sync {
    /// The invocation is underway; `progress` is a checkpoint in `[0, 100]`.
    fn on_processing(&self, progress: u8) {
        let _ = progress;
    }

    /// The invocation finished and an artifact exists.
    fn on_completed(&self, summary: &QualitySummary) {
        let _ = summary;
    }

    /// The invocation failed; no artifact was published.
    fn on_error(&self, message: &str) {
        let _ = message;
    }
}

/// A no-op implementation for callers that don't need status events.
pub struct NoopStatusReporter;

impl StatusReporter for NoopStatusReporter {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type StatusSink = Arc<dyn StatusReporter>;

/// Enforces the monotonically non-decreasing progress contract.
///
/// The pipeline's checkpoint arithmetic already never goes backwards, but
/// the sink contract is load-bearing for consumers (a UI seeing 90 → 45
/// would re-render a regression), so the tracker clamps regardless.
pub struct ProgressTracker {
    sink: StatusSink,
    last: u8,
}

impl ProgressTracker {
    pub fn new(sink: StatusSink) -> Self {
        Self { sink, last: 0 }
    }

    /// Report `progress`, clamped to never fall below the last checkpoint.
    pub fn advance(&mut self, progress: u8) {
        let p = progress.min(100).max(self.last);
        self.last = p;
        self.sink.on_processing(p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Recording {
        checkpoints: Mutex<Vec<u8>>,
        completions: AtomicUsize,
        last: AtomicU8,
    }

    impl StatusReporter for Recording {
        fn on_processing(&self, progress: u8) {
            self.checkpoints.lock().unwrap().push(progress);
            self.last.store(progress, Ordering::SeqCst);
        }

        fn on_completed(&self, _summary: &QualitySummary) {
            self.completions.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_reporter_does_not_panic() {
        let r = NoopStatusReporter;
        r.on_processing(5);
        r.on_error("boom");
    }

    #[test]
    fn tracker_never_regresses() {
        let rec = Arc::new(Recording {
            checkpoints: Mutex::new(Vec::new()),
            completions: AtomicUsize::new(0),
            last: AtomicU8::new(0),
        });
        let mut tracker = ProgressTracker::new(rec.clone());
        tracker.advance(10);
        tracker.advance(35);
        tracker.advance(20); // out-of-order checkpoint must clamp up
        tracker.advance(90);
        tracker.advance(250); // and cap at 100

        let seen = rec.checkpoints.lock().unwrap().clone();
        assert_eq!(seen, vec![10, 35, 35, 90, 100]);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn summary_derives_from_report() {
        let report = ValidationReport {
            passed: false,
            word_ratio: Some(0.85),
            source_words: 1000,
            rendered_words: 850,
            chapter_count: 4,
            image_count: 2,
            failure_mode: Some(crate::pipeline::validate::FailureMode::ModerateWordLoss),
        };
        let summary = QualitySummary::from(&report);
        assert_eq!(summary.word_ratio, Some(0.85));
        assert_eq!(summary.chapter_count, 4);
        assert!(!summary.passed);
    }
}
