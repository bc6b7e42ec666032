//! Progress-callback trait for per-document run events.
//!
//! Inject an [`Arc<dyn RunProgressCallback>`] via
//! [`crate::config::RunConfigBuilder::progress_callback`] to receive events
//! as the coordinator works through the input directory. The CLI uses this to
//! drive a terminal progress bar; library callers can forward events to a
//! log, a channel, or a database without the coordinator knowing about it.
//!
//! # Example
//!
//! ```rust
//! use pdf2note::{DocumentOutcome, RunConfig, RunProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct FailureCounter(AtomicUsize);
//!
//! impl RunProgressCallback for FailureCounter {
//!     fn on_document_complete(&self, _name: &str, outcome: &DocumentOutcome) {
//!         if outcome.is_failed() {
//!             self.0.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//!
//! let config = RunConfig::builder()
//!     .pdf_dir("papers")
//!     .output_dir("notes")
//!     .progress_callback(Arc::new(FailureCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::DocumentOutcome;
use std::sync::Arc;

/// Called by the coordinator as it processes each document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Documents are processed one at a time, but the trait
/// is `Send + Sync` so implementations can be shared with other tasks.
pub trait RunProgressCallback: Send + Sync {
    /// Called once after discovery and registry filtering.
    ///
    /// # Arguments
    /// * `discovered`: PDFs found in the input directory
    /// * `pending`: PDFs not yet in the registry
    fn on_run_start(&self, discovered: usize, pending: usize) {
        let _ = (discovered, pending);
    }

    /// Called before a pending document is classified.
    ///
    /// # Arguments
    /// * `index`: 1-based position among pending documents
    /// * `name`: document filename
    fn on_document_start(&self, index: usize, pending: usize, name: &str) {
        let _ = (index, pending, name);
    }

    /// Called when a stage of the current document begins, e.g. "extracting
    /// text", "remote parse", "generating via siliconflow".
    fn on_stage(&self, name: &str, stage: &str) {
        let _ = (name, stage);
    }

    /// Called once the document reaches a terminal state (including skips).
    fn on_document_complete(&self, name: &str, outcome: &DocumentOutcome) {
        let _ = (name, outcome);
    }

    /// Called once after every document has been visited.
    ///
    /// # Arguments
    /// * `written`: notes written this run
    /// * `failed`: documents that failed this run
    fn on_run_complete(&self, written: usize, failed: usize) {
        let _ = (written, failed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RunProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RunConfig`].
pub type ProgressCallback = Arc<dyn RunProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::FailureStage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        failures: AtomicUsize,
        pending: AtomicUsize,
    }

    impl RunProgressCallback for TrackingCallback {
        fn on_run_start(&self, _discovered: usize, pending: usize) {
            self.pending.store(pending, Ordering::SeqCst);
        }

        fn on_document_start(&self, _index: usize, _pending: usize, _name: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _name: &str, outcome: &DocumentOutcome) {
            self.completes.fetch_add(1, Ordering::SeqCst);
            if outcome.is_failed() {
                self.failures.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(3, 2);
        cb.on_document_start(1, 2, "a.pdf");
        cb.on_stage("a.pdf", "extracting text");
        cb.on_document_complete("a.pdf", &DocumentOutcome::Skipped);
        cb.on_run_complete(1, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_run_start(3, 2);
        tracker.on_document_start(1, 2, "a.pdf");
        tracker.on_document_complete("a.pdf", &DocumentOutcome::Skipped);
        tracker.on_document_start(2, 2, "b.pdf");
        tracker.on_document_complete(
            "b.pdf",
            &DocumentOutcome::Failed {
                stage: FailureStage::Parse,
                reason: "gave up".into(),
            },
        );

        assert_eq!(tracker.pending.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.failures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_run_start(10, 10);
        cb.on_document_start(1, 10, "x.pdf");
    }
}
