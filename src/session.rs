//! Async driver that connects a [`WizardController`] to its collaborators.
//!
//! ## Why generation tags?
//!
//! Collaborator calls take seconds. While one is in flight the user may hit
//! "Convert another PDF", which resets the wizard. When the old call finally
//! returns, its result belongs to a session that no longer exists. Each call
//! therefore captures the controller's [`Generation`] before it starts and
//! presents it again on completion; a mismatch turns the completion into a
//! no-op ([`Outcome::Discarded`]).
//!
//! The controller sits behind a `std::sync::Mutex` that is only held for the
//! synchronous state changes, never across an `.await`, so a `reset()` from
//! another task is never blocked by a slow collaborator.
//!
//! ## Failure handling
//!
//! A collaborator error or timeout leaves the step untouched and is returned
//! as [`WizardError::CollaboratorFailure`]; the caller can simply call the
//! same operation again. With `max_retries > 0` the session retries by itself
//! using exponential backoff (`retry_backoff_ms * 2^(attempt-1)`), and gives
//! up early once the session has been reset.

use crate::config::WizardConfig;
use crate::controller::{Completion, WizardController};
use crate::error::{CollaboratorError, Stage, WizardError};
use crate::model::{AudioArtifactRef, Generation, Step, WizardSnapshot};
use crate::pipeline::mock::{MockAudioGenerator, MockConfig, MockTextExtractor, MockUploader};
use crate::pipeline::{AudioGenerator, CollaboratorFuture, SourceFile, TextExtractor, Uploader};
use crate::progress::WizardObserver;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// What happened to a collaborator result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The result belonged to the current session and was applied.
    Applied(T),
    /// The session was reset while the call was in flight; nothing changed.
    Discarded,
}

impl<T> Outcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(v) => Some(v),
            Outcome::Discarded => None,
        }
    }
}

/// One conversion session: a controller plus the three collaborators.
pub struct WizardSession {
    state: Mutex<WizardController>,
    uploader: Arc<dyn Uploader>,
    extractor: Arc<dyn TextExtractor>,
    generator: Arc<dyn AudioGenerator>,
    config: WizardConfig,
}

impl WizardSession {
    pub fn new(
        config: WizardConfig,
        uploader: Arc<dyn Uploader>,
        extractor: Arc<dyn TextExtractor>,
        generator: Arc<dyn AudioGenerator>,
    ) -> Self {
        Self {
            state: Mutex::new(WizardController::with_chars_per_audio_minute(
                config.chars_per_audio_minute,
            )),
            uploader,
            extractor,
            generator,
            config,
        }
    }

    /// Session backed by the mock collaborators.
    pub fn with_mocks(config: WizardConfig, mock: &MockConfig) -> Self {
        Self::new(
            config,
            Arc::new(MockUploader::new(mock)),
            Arc::new(MockTextExtractor::new(mock)),
            Arc::new(MockAudioGenerator::new(mock)),
        )
    }

    pub fn config(&self) -> &WizardConfig {
        &self.config
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn step(&self) -> Step {
        self.lock().step()
    }

    pub fn generation(&self) -> Generation {
        self.lock().generation()
    }

    pub fn can_advance_from_selection(&self) -> bool {
        self.lock().can_advance_from_selection()
    }

    pub fn snapshot(&self) -> WizardSnapshot {
        self.lock().snapshot()
    }

    /// Run `f` against the current state.
    pub fn with_state<R>(&self, f: impl FnOnce(&WizardController) -> R) -> R {
        f(&*self.lock())
    }

    // ── Synchronous operations ───────────────────────────────────────────

    pub fn toggle_page(&self, index: usize) -> Result<bool, WizardError> {
        self.lock().toggle_delete_page(index)
    }

    pub fn edit_text(&self, text: impl Into<String>) -> Result<(), WizardError> {
        self.lock().edit_text(text)
    }

    pub fn revert_text(&self) -> Result<(), WizardError> {
        self.lock().revert_text()
    }

    /// Discard the current session. Returns the new generation.
    pub fn reset(&self) -> Generation {
        let (from, generation) = {
            let mut c = self.lock();
            let from = c.step();
            c.reset();
            (from, c.generation())
        };
        info!("Wizard reset (generation {})", generation);
        self.notify(|o| o.on_reset(generation));
        if from != Step::Upload {
            self.notify(|o| o.on_step_changed(from, Step::Upload));
        }
        generation
    }

    // ── Collaborator-backed operations ───────────────────────────────────

    /// Upload `file` and move to page selection.
    pub async fn upload(&self, file: &SourceFile) -> Result<Outcome<()>, WizardError> {
        let tag = {
            let c = self.lock();
            if c.step() != Step::Upload {
                return Err(WizardError::InvalidTransition {
                    operation: "upload a document",
                    step: c.step(),
                });
            }
            c.generation()
        };
        info!("Uploading '{}' ({} bytes)", file.name(), file.size_bytes());

        let uploader = Arc::clone(&self.uploader);
        let pages = match self
            .call(Stage::Upload, tag, || uploader.upload(file))
            .await?
        {
            Some(pages) => pages,
            None => return Ok(Outcome::Discarded),
        };

        self.apply(Stage::Upload, |c| c.complete_upload(tag, file.name(), pages))
    }

    /// Extract the text of the kept pages and move to text review.
    ///
    /// The kept pages are captured when the call starts. Toggles made while
    /// extraction runs do not change the text, but the selection is checked
    /// again on completion: if every page has been deleted by then, the
    /// result is rejected with `InvalidTransition`.
    pub async fn extract(&self) -> Result<Outcome<()>, WizardError> {
        let (tag, document_id, kept) = {
            let c = self.lock();
            let document_id = match c.document() {
                Some(d) if c.can_advance_from_selection() => d.id(),
                _ => {
                    return Err(WizardError::InvalidTransition {
                        operation: "extract text",
                        step: c.step(),
                    })
                }
            };
            (c.generation(), document_id, c.kept_pages())
        };
        info!("Extracting text from {} pages", kept.len());

        let extractor = Arc::clone(&self.extractor);
        let text = match self
            .call(Stage::Extraction, tag, || {
                extractor.extract(document_id, kept.clone())
            })
            .await?
        {
            Some(text) => text,
            None => return Ok(Outcome::Discarded),
        };

        self.apply(Stage::Extraction, |c| c.complete_extraction(tag, text))
    }

    /// Generate audio from the review text and move to audio ready.
    ///
    /// When two requests overlap in the same session, the first to finish is
    /// applied and the other returns [`Outcome::Discarded`].
    pub async fn generate_audio(&self) -> Result<Outcome<AudioArtifactRef>, WizardError> {
        let request = self.lock().request_audio_generation()?;
        let tag = request.generation;
        info!(
            "Generating audio for document {} ({} characters)",
            request.document_id,
            request.text.chars().count()
        );

        let generator = Arc::clone(&self.generator);
        let artifact = match self
            .call(Stage::AudioGeneration, tag, || {
                generator.generate(request.clone())
            })
            .await?
        {
            Some(artifact) => artifact,
            None => return Ok(Outcome::Discarded),
        };

        // A concurrent request in the same session may already have moved
        // the wizard to AudioReady; that result wins and this one is dropped.
        let applied = self.apply(Stage::AudioGeneration, |c| {
            if c.generation() == tag && c.step() == Step::AudioReady {
                return Ok(Completion::Applied(false));
            }
            Ok(match c.complete_audio(tag)? {
                Completion::Applied(()) => Completion::Applied(true),
                Completion::Stale { tag, current } => Completion::Stale { tag, current },
            })
        })?;

        match applied {
            Outcome::Applied(true) => {
                info!("Audio ready: {}", artifact);
                Ok(Outcome::Applied(artifact))
            }
            Outcome::Applied(false) => {
                debug!("Audio already ready; dropping duplicate artifact {}", artifact);
                Ok(Outcome::Discarded)
            }
            Outcome::Discarded => Ok(Outcome::Discarded),
        }
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, WizardController> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, f: impl FnOnce(&dyn WizardObserver)) {
        if let Some(ref observer) = self.config.observer {
            f(observer.as_ref());
        }
    }

    /// Drive one collaborator call with timeout and retries.
    ///
    /// Returns `Ok(None)` when the session was reset while the call was in
    /// flight, whether the call itself succeeded or not.
    async fn call<'f, T, F>(
        &self,
        stage: Stage,
        tag: Generation,
        mut op: F,
    ) -> Result<Option<T>, WizardError>
    where
        F: FnMut() -> CollaboratorFuture<'f, T>,
    {
        let start = Instant::now();
        let timeout_secs = self.config.collaborator_timeout_secs;
        self.notify(|o| o.on_collaborator_start(stage));

        let mut last_err: Option<CollaboratorError> = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                if self.generation() != tag {
                    break;
                }
                let backoff = self
                    .config
                    .retry_backoff_ms
                    .saturating_mul(2u64.saturating_pow(attempt - 1));
                warn!(
                    "{}: retry {}/{} after {}ms",
                    stage, attempt, self.config.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match timeout(Duration::from_secs(timeout_secs), op()).await {
                Ok(Ok(value)) => {
                    let elapsed_ms = start.elapsed().as_millis() as u64;
                    debug!("{} finished in {}ms", stage, elapsed_ms);
                    self.notify(|o| o.on_collaborator_complete(stage, elapsed_ms));
                    return Ok(Some(value));
                }
                Ok(Err(e)) => {
                    warn!("{}: attempt {} failed: {}", stage, attempt + 1, e);
                    last_err = Some(e);
                }
                Err(_) => {
                    warn!("{}: attempt {} timed out after {}s", stage, attempt + 1, timeout_secs);
                    last_err = Some(CollaboratorError::Timeout { secs: timeout_secs });
                }
            }
        }

        let current = self.generation();
        if current != tag {
            warn!("{}: failure for stale generation {} ignored", stage, tag);
            self.notify(|o| o.on_stale_completion(stage, tag, current));
            return Ok(None);
        }

        let source = last_err.unwrap_or_else(|| CollaboratorError::failed("unknown error"));
        self.notify(|o| o.on_collaborator_error(stage, &source.to_string()));
        Err(WizardError::CollaboratorFailure { stage, source })
    }

    /// Apply a tagged completion and report step changes after the lock is
    /// released.
    fn apply<T>(
        &self,
        stage: Stage,
        f: impl FnOnce(&mut WizardController) -> Result<Completion<T>, WizardError>,
    ) -> Result<Outcome<T>, WizardError> {
        let (from, to, result) = {
            let mut c = self.lock();
            let from = c.step();
            let result = f(&mut *c);
            (from, c.step(), result)
        };

        match result? {
            Completion::Applied(value) => {
                if from != to {
                    self.notify(|o| o.on_step_changed(from, to));
                }
                Ok(Outcome::Applied(value))
            }
            Completion::Stale { tag, current } => {
                warn!(
                    "{}: discarding completion for generation {} (current {})",
                    stage, tag, current
                );
                self.notify(|o| o.on_stale_completion(stage, tag, current));
                Ok(Outcome::Discarded)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::mock::placeholder_text;

    fn pdf() -> SourceFile {
        SourceFile::from_bytes("report.pdf", b"%PDF-1.7\n", 1024).unwrap()
    }

    fn session(pages: usize) -> WizardSession {
        WizardSession::with_mocks(WizardConfig::default(), &MockConfig::instant(pages))
    }

    #[tokio::test]
    async fn upload_then_extract() {
        let s = session(4);
        assert_eq!(s.upload(&pdf()).await.unwrap(), Outcome::Applied(()));
        assert_eq!(s.step(), Step::PageSelection);

        s.toggle_page(0).unwrap();
        assert!(s.extract().await.unwrap().is_applied());
        assert_eq!(s.step(), Step::TextReview);
        assert_eq!(s.snapshot().extracted_text, placeholder_text(3));
    }

    #[tokio::test]
    async fn upload_twice_is_rejected_before_calling_uploader() {
        let s = session(2);
        s.upload(&pdf()).await.unwrap();
        let err = s.upload(&pdf()).await.unwrap_err();
        assert!(matches!(err, WizardError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn extract_with_nothing_kept_is_invalid() {
        let s = session(1);
        s.upload(&pdf()).await.unwrap();
        s.toggle_page(0).unwrap();
        let err = s.extract().await.unwrap_err();
        assert!(matches!(err, WizardError::InvalidTransition { .. }));
        assert_eq!(s.step(), Step::PageSelection);
    }

    #[tokio::test]
    async fn failed_generation_keeps_text_review() {
        let mock = MockConfig::instant(2);
        let s = WizardSession::new(
            WizardConfig::default(),
            Arc::new(MockUploader::new(&mock)),
            Arc::new(MockTextExtractor::new(&mock)),
            Arc::new(MockAudioGenerator::new(&mock).failing(1)),
        );
        s.upload(&pdf()).await.unwrap();
        s.extract().await.unwrap();
        s.edit_text("keep me").unwrap();

        let err = s.generate_audio().await.unwrap_err();
        assert!(matches!(
            err,
            WizardError::CollaboratorFailure {
                stage: Stage::AudioGeneration,
                ..
            }
        ));
        assert_eq!(s.step(), Step::TextReview);
        assert_eq!(s.snapshot().extracted_text, "keep me");

        let artifact = s.generate_audio().await.unwrap().applied().unwrap();
        assert!(artifact.0.ends_with(".mp3"));
        assert_eq!(s.step(), Step::AudioReady);
    }

    #[tokio::test]
    async fn retries_recover_from_transient_failure() {
        let mock = MockConfig::instant(2);
        let config = WizardConfig::builder()
            .max_retries(2)
            .retry_backoff_ms(1)
            .build()
            .unwrap();
        let s = WizardSession::new(
            config,
            Arc::new(MockUploader::new(&mock).failing(2)),
            Arc::new(MockTextExtractor::new(&mock)),
            Arc::new(MockAudioGenerator::new(&mock)),
        );
        assert!(s.upload(&pdf()).await.unwrap().is_applied());
        assert_eq!(s.step(), Step::PageSelection);
    }

    #[tokio::test]
    async fn slow_collaborator_times_out() {
        let mock = MockConfig {
            upload_delay_ms: 1_500,
            ..MockConfig::instant(2)
        };
        let config = WizardConfig::builder()
            .collaborator_timeout_secs(1)
            .build()
            .unwrap();
        let s = WizardSession::with_mocks(config, &mock);
        let err = s.upload(&pdf()).await.unwrap_err();
        assert!(matches!(
            err,
            WizardError::CollaboratorFailure {
                source: CollaboratorError::Timeout { secs: 1 },
                ..
            }
        ));
        assert_eq!(s.step(), Step::Upload);
    }

    #[tokio::test]
    async fn reset_returns_new_generation() {
        let s = session(1);
        let g0 = s.generation();
        let g1 = s.reset();
        assert_ne!(g0, g1);
        assert_eq!(s.generation(), g1);
    }
}
