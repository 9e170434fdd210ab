//! Observer trait for wizard events.
//!
//! Inject an [`Arc<dyn WizardObserver>`] via
//! [`crate::config::WizardConfigBuilder::observer`] to receive events as the
//! session moves between steps and talks to its collaborators.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2audio::{Step, WizardConfig, WizardObserver};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct StepLog(Mutex<Vec<Step>>);
//!
//! impl WizardObserver for StepLog {
//!     fn on_step_changed(&self, _from: Step, to: Step) {
//!         self.0.lock().unwrap().push(to);
//!     }
//! }
//!
//! let log = Arc::new(StepLog::default());
//! let config = WizardConfig::builder()
//!     .observer(log.clone() as Arc<dyn WizardObserver>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::Stage;
use crate::model::{Generation, Step};
use std::sync::Arc;

/// Called by [`crate::session::WizardSession`] as the wizard progresses.
///
/// Implementations must be `Send + Sync`: a reset may be issued from a
/// different task than the one awaiting a collaborator. All methods have
/// default no-op implementations so callers only override what they care
/// about.
pub trait WizardObserver: Send + Sync {
    /// The active step changed (including a reset back to `Upload`).
    fn on_step_changed(&self, from: Step, to: Step) {
        let _ = (from, to);
    }

    /// A collaborator call is about to be issued.
    fn on_collaborator_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// A collaborator call succeeded. A stale result is reported separately
    /// through `on_stale_completion`.
    fn on_collaborator_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// A collaborator call failed after all retries.
    fn on_collaborator_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }

    /// A completion arrived for a session that has since been reset.
    fn on_stale_completion(&self, stage: Stage, tag: Generation, current: Generation) {
        let _ = (stage, tag, current);
    }

    /// The wizard was reset; `generation` is the new session tag.
    fn on_reset(&self, generation: Generation) {
        let _ = generation;
    }
}

/// A no-op observer for callers that don't need events.
pub struct NoopObserver;

impl WizardObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::config::WizardConfig`].
pub type Observer = Arc<dyn WizardObserver>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        steps: AtomicUsize,
        errors: AtomicUsize,
        stale: AtomicUsize,
    }

    impl WizardObserver for Counting {
        fn on_step_changed(&self, _from: Step, _to: Step) {
            self.steps.fetch_add(1, Ordering::SeqCst);
        }

        fn on_collaborator_error(&self, _stage: Stage, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_stale_completion(&self, _stage: Stage, _tag: Generation, _current: Generation) {
            self.stale.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let o = NoopObserver;
        o.on_step_changed(Step::Upload, Step::PageSelection);
        o.on_collaborator_start(Stage::Upload);
        o.on_collaborator_complete(Stage::Upload, 12);
        o.on_collaborator_error(Stage::Extraction, "boom");
        o.on_stale_completion(Stage::AudioGeneration, Generation::default(), Generation::default());
        o.on_reset(Generation::default());
    }

    #[test]
    fn overridden_methods_receive_events() {
        let c = Counting::default();
        c.on_step_changed(Step::Upload, Step::PageSelection);
        c.on_step_changed(Step::PageSelection, Step::TextReview);
        c.on_collaborator_error(Stage::AudioGeneration, "503");
        c.on_collaborator_complete(Stage::Upload, 5);
        assert_eq!(c.steps.load(Ordering::SeqCst), 2);
        assert_eq!(c.errors.load(Ordering::SeqCst), 1);
        assert_eq!(c.stale.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn arc_dyn_observer_works() {
        let o: Observer = Arc::new(NoopObserver);
        o.on_reset(Generation::default());
    }
}
