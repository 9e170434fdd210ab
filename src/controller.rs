//! The wizard state machine.
//!
//! ```text
//! Upload ──submit_upload──▶ PageSelection ──advance_to_text_review──▶ TextReview ──complete_audio_generation──▶ AudioReady
//!   ▲                                                                                                              │
//!   └─────────────────────────────────────────────── reset ◀──────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation validates the active step first. A call that does not
//! match an edge above fails with [`WizardError::InvalidTransition`] and
//! leaves the state untouched; state is never coerced.
//!
//! Completions of asynchronous collaborator calls go through the
//! `complete_*` methods, which carry the [`Generation`] captured when the call
//! was issued. A completion whose generation no longer matches (because
//! [`WizardController::reset`] ran in between) is reported as
//! [`Completion::Stale`] and changes nothing.

use crate::error::WizardError;
use crate::model::{
    AudioRequest, Document, DocumentView, Generation, PageSelectionState, Step, TextStats,
    WizardSnapshot,
};
use tracing::{debug, info};

/// Result of applying a generation-tagged completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion<T> {
    /// The tag matched the current generation and the transition ran.
    Applied(T),
    /// The session was reset after the call was issued; nothing changed.
    Stale { tag: Generation, current: Generation },
}

impl<T> Completion<T> {
    pub fn is_stale(&self) -> bool {
        matches!(self, Completion::Stale { .. })
    }
}

/// Owns the workflow state of one conversion session.
#[derive(Debug, Clone)]
pub struct WizardController {
    step: Step,
    document: Option<Document>,
    page_selection: PageSelectionState,
    extracted_text: String,
    /// Text as first extracted, restored by [`WizardController::revert_text`].
    original_text: String,
    generation: Generation,
    chars_per_audio_minute: usize,
}

impl Default for WizardController {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardController {
    pub fn new() -> Self {
        Self::with_chars_per_audio_minute(200)
    }

    /// Controller whose [`TextStats`] estimate uses `chars_per_minute`.
    pub fn with_chars_per_audio_minute(chars_per_minute: usize) -> Self {
        Self {
            step: Step::Upload,
            document: None,
            page_selection: PageSelectionState::default(),
            extracted_text: String::new(),
            original_text: String::new(),
            generation: Generation::default(),
            chars_per_audio_minute: chars_per_minute.max(1),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn page_selection(&self) -> &PageSelectionState {
        &self.page_selection
    }

    pub fn extracted_text(&self) -> &str {
        &self.extracted_text
    }

    pub fn page_count(&self) -> usize {
        self.document.as_ref().map_or(0, Document::page_count)
    }

    /// Indices of pages that survive the current selection.
    pub fn kept_pages(&self) -> Vec<usize> {
        self.page_selection.kept_indices(self.page_count())
    }

    pub fn text_stats(&self) -> TextStats {
        TextStats::measure(&self.extracted_text, self.chars_per_audio_minute)
    }

    /// True iff the wizard is on page selection and at least one page is kept.
    pub fn can_advance_from_selection(&self) -> bool {
        self.step == Step::PageSelection
            && self.page_selection.deleted_count() < self.page_count()
    }

    /// Serialisable view of the current state.
    pub fn snapshot(&self) -> WizardSnapshot {
        WizardSnapshot {
            step: self.step,
            generation: self.generation,
            document: self
                .document
                .as_ref()
                .map(|d| DocumentView::new(d, &self.page_selection)),
            extracted_text: self.extracted_text.clone(),
            text_stats: self.text_stats(),
        }
    }

    // ── Transitions ──────────────────────────────────────────────────────

    /// Store the uploaded document and move to page selection.
    ///
    /// `pages` are the thumbnail references produced by the uploader, in page
    /// order.
    pub fn submit_upload(
        &mut self,
        filename: &str,
        pages: Vec<String>,
    ) -> Result<(), WizardError> {
        self.require_step(Step::Upload, "submit an upload")?;
        if pages.is_empty() {
            return Err(WizardError::InvalidDocument {
                filename: filename.to_string(),
                reason: "the document has no pages".into(),
            });
        }

        let document = Document::new(filename, pages);
        info!(
            "Document {} '{}' uploaded with {} pages",
            document.id(),
            document.filename(),
            document.page_count()
        );
        self.document = Some(document);
        self.page_selection.clear();
        self.step = Step::PageSelection;
        Ok(())
    }

    /// Flip the deleted flag of page `index`. Returns `true` if the page is
    /// now deleted.
    pub fn toggle_delete_page(&mut self, index: usize) -> Result<bool, WizardError> {
        self.require_step(Step::PageSelection, "change the page selection")?;
        let page_count = self.page_count();
        if index >= page_count {
            return Err(WizardError::IndexOutOfRange { index, page_count });
        }

        let deleted = self.page_selection.toggle(index);
        debug!(
            "Page {} {} ({}/{} kept)",
            index + 1,
            if deleted { "deleted" } else { "restored" },
            self.page_selection.kept_count(page_count),
            page_count
        );
        Ok(deleted)
    }

    /// Store the extracted text and move to text review.
    pub fn advance_to_text_review(
        &mut self,
        extraction_result: impl Into<String>,
    ) -> Result<(), WizardError> {
        self.require_step(Step::PageSelection, "advance to text review")?;
        if !self.can_advance_from_selection() {
            return Err(WizardError::InvalidTransition {
                operation: "advance to text review with every page deleted",
                step: self.step,
            });
        }

        let text = extraction_result.into();
        self.original_text.clone_from(&text);
        self.extracted_text = text;
        self.step = Step::TextReview;
        info!(
            "Text review started ({} characters from {} pages)",
            self.extracted_text.chars().count(),
            self.page_selection.kept_count(self.page_count())
        );
        Ok(())
    }

    /// Replace the review text verbatim. Empty text is accepted here and
    /// rejected by [`WizardController::request_audio_generation`].
    pub fn edit_text(&mut self, new_text: impl Into<String>) -> Result<(), WizardError> {
        self.require_step(Step::TextReview, "edit text")?;
        self.extracted_text = new_text.into();
        Ok(())
    }

    /// Discard edits and restore the text as it was extracted.
    pub fn revert_text(&mut self) -> Result<(), WizardError> {
        self.require_step(Step::TextReview, "revert text")?;
        self.extracted_text.clone_from(&self.original_text);
        Ok(())
    }

    /// Snapshot the review text for the audio generator. Does not change step.
    pub fn request_audio_generation(&self) -> Result<AudioRequest, WizardError> {
        self.require_step(Step::TextReview, "request audio generation")?;
        if self.extracted_text.trim().is_empty() {
            return Err(WizardError::EmptyInput);
        }
        let document_id = match self.document.as_ref() {
            Some(d) => d.id(),
            None => {
                return Err(WizardError::InvalidTransition {
                    operation: "request audio generation without a document",
                    step: self.step,
                })
            }
        };

        Ok(AudioRequest {
            text: self.extracted_text.clone(),
            document_id,
            generation: self.generation,
        })
    }

    /// Record that the audio generator reported success.
    pub fn complete_audio_generation(&mut self) -> Result<(), WizardError> {
        self.require_step(Step::TextReview, "complete audio generation")?;
        self.step = Step::AudioReady;
        info!("Audio ready for document {}", self.document_id_label());
        Ok(())
    }

    /// Discard all state and start a new session.
    pub fn reset(&mut self) {
        let previous = self.generation;
        self.step = Step::Upload;
        self.document = None;
        self.page_selection.clear();
        self.extracted_text.clear();
        self.original_text.clear();
        self.generation = previous.next();
        debug!("Reset: generation {} → {}", previous, self.generation);
    }

    // ── Generation-tagged completions ────────────────────────────────────

    /// Apply an upload completion issued under `tag`.
    pub fn complete_upload(
        &mut self,
        tag: Generation,
        filename: &str,
        pages: Vec<String>,
    ) -> Result<Completion<()>, WizardError> {
        if let Some(stale) = self.stale(tag) {
            return Ok(stale);
        }
        self.submit_upload(filename, pages).map(Completion::Applied)
    }

    /// Apply an extraction completion issued under `tag`.
    pub fn complete_extraction(
        &mut self,
        tag: Generation,
        text: impl Into<String>,
    ) -> Result<Completion<()>, WizardError> {
        if let Some(stale) = self.stale(tag) {
            return Ok(stale);
        }
        self.advance_to_text_review(text).map(Completion::Applied)
    }

    /// Apply an audio-generation completion issued under `tag`.
    pub fn complete_audio(&mut self, tag: Generation) -> Result<Completion<()>, WizardError> {
        if let Some(stale) = self.stale(tag) {
            return Ok(stale);
        }
        self.complete_audio_generation().map(Completion::Applied)
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn require_step(&self, expected: Step, operation: &'static str) -> Result<(), WizardError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(WizardError::InvalidTransition {
                operation,
                step: self.step,
            })
        }
    }

    fn stale<T>(&self, tag: Generation) -> Option<Completion<T>> {
        (tag != self.generation).then_some(Completion::Stale {
            tag,
            current: self.generation,
        })
    }

    fn document_id_label(&self) -> String {
        self.document
            .as_ref()
            .map(|d| d.id().to_string())
            .unwrap_or_else(|| "<none>".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thumbs(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("page_{i}.jpg")).collect()
    }

    fn in_selection(n: usize) -> WizardController {
        let mut c = WizardController::new();
        c.submit_upload("doc.pdf", thumbs(n)).unwrap();
        c
    }

    fn in_review(text: &str) -> WizardController {
        let mut c = in_selection(3);
        c.advance_to_text_review(text).unwrap();
        c
    }

    #[test]
    fn upload_moves_to_page_selection() {
        for n in 1..=5 {
            let c = in_selection(n);
            assert_eq!(c.step(), Step::PageSelection);
            assert_eq!(c.page_count(), n);
            assert_eq!(c.page_selection().deleted_count(), 0);
        }
    }

    #[test]
    fn empty_upload_is_invalid_document() {
        let mut c = WizardController::new();
        let err = c.submit_upload("empty.pdf", vec![]).unwrap_err();
        assert!(matches!(err, WizardError::InvalidDocument { .. }));
        assert_eq!(c.step(), Step::Upload);
        assert!(c.document().is_none());
    }

    #[test]
    fn second_upload_is_invalid_transition() {
        let mut c = in_selection(2);
        let id = c.document().unwrap().id();
        let err = c.submit_upload("other.pdf", thumbs(4)).unwrap_err();
        assert!(matches!(err, WizardError::InvalidTransition { .. }));
        assert_eq!(c.document().unwrap().id(), id);
        assert_eq!(c.page_count(), 2);
    }

    #[test]
    fn toggle_twice_restores_membership() {
        let mut c = in_selection(4);
        assert!(c.toggle_delete_page(2).unwrap());
        assert!(!c.toggle_delete_page(2).unwrap());
        assert!(!c.page_selection().is_deleted(2));
        assert_eq!(c.page_selection().deleted_count(), 0);
    }

    #[test]
    fn toggle_out_of_range() {
        let mut c = in_selection(3);
        let err = c.toggle_delete_page(3).unwrap_err();
        assert!(matches!(
            err,
            WizardError::IndexOutOfRange {
                index: 3,
                page_count: 3
            }
        ));
    }

    #[test]
    fn toggle_before_upload_is_invalid_transition() {
        let mut c = WizardController::new();
        assert!(matches!(
            c.toggle_delete_page(0),
            Err(WizardError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn advance_predicate_tracks_deleted_count() {
        let mut c = in_selection(3);
        assert!(c.can_advance_from_selection());
        c.toggle_delete_page(0).unwrap();
        c.toggle_delete_page(1).unwrap();
        assert!(c.can_advance_from_selection());
        c.toggle_delete_page(2).unwrap();
        assert!(!c.can_advance_from_selection());
        c.toggle_delete_page(1).unwrap();
        assert!(c.can_advance_from_selection());
    }

    #[test]
    fn advance_predicate_false_outside_selection() {
        assert!(!WizardController::new().can_advance_from_selection());
        assert!(!in_review("text").can_advance_from_selection());
    }

    #[test]
    fn advance_with_every_page_deleted_fails() {
        let mut c = in_selection(2);
        c.toggle_delete_page(0).unwrap();
        c.toggle_delete_page(1).unwrap();
        let err = c.advance_to_text_review("anything").unwrap_err();
        assert!(matches!(err, WizardError::InvalidTransition { .. }));
        assert_eq!(c.step(), Step::PageSelection);
        assert_eq!(c.extracted_text(), "");
    }

    #[test]
    fn kept_pages_excludes_deleted() {
        let mut c = in_selection(4);
        c.toggle_delete_page(1).unwrap();
        assert_eq!(c.kept_pages(), vec![0, 2, 3]);
    }

    #[test]
    fn edit_and_revert_text() {
        let mut c = in_review("extracted");
        c.edit_text("edited").unwrap();
        assert_eq!(c.extracted_text(), "edited");
        c.revert_text().unwrap();
        assert_eq!(c.extracted_text(), "extracted");
    }

    #[test]
    fn edit_outside_review_fails() {
        let mut c = in_selection(1);
        assert!(matches!(
            c.edit_text("x"),
            Err(WizardError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn blank_text_is_empty_input() {
        let mut c = in_review("text");
        c.edit_text("  \n\t ").unwrap();
        assert!(matches!(
            c.request_audio_generation(),
            Err(WizardError::EmptyInput)
        ));
        assert_eq!(c.step(), Step::TextReview);
    }

    #[test]
    fn audio_request_snapshots_text() {
        let mut c = in_review("first");
        let req = c.request_audio_generation().unwrap();
        c.edit_text("second").unwrap();
        assert_eq!(req.text, "first");
        assert_eq!(req.document_id, c.document().unwrap().id());
        assert_eq!(req.generation, c.generation());
        assert_eq!(c.step(), Step::TextReview);
    }

    #[test]
    fn complete_audio_moves_to_ready_once() {
        let mut c = in_review("text");
        c.complete_audio_generation().unwrap();
        assert_eq!(c.step(), Step::AudioReady);
        assert!(matches!(
            c.complete_audio_generation(),
            Err(WizardError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn reset_clears_everything_and_bumps_generation() {
        let mut c = in_review("text");
        let before = c.generation();
        c.reset();
        assert_eq!(c.step(), Step::Upload);
        assert!(c.document().is_none());
        assert_eq!(c.page_selection().deleted_count(), 0);
        assert_eq!(c.extracted_text(), "");
        assert!(c.generation() > before);
    }

    #[test]
    fn stale_completion_never_mutates() {
        let mut c = WizardController::new();
        let tag = c.generation();
        c.reset();
        let before = c.snapshot();

        let r = c.complete_upload(tag, "late.pdf", thumbs(3)).unwrap();
        assert!(r.is_stale());
        assert_eq!(c.snapshot(), before);

        c.submit_upload("doc.pdf", thumbs(2)).unwrap();
        let tag = c.generation();
        c.reset();
        c.submit_upload("fresh.pdf", thumbs(2)).unwrap();
        let before = c.snapshot();
        assert!(c.complete_extraction(tag, "old text").unwrap().is_stale());
        assert_eq!(c.snapshot(), before);
    }

    #[test]
    fn stale_audio_completion_is_discarded() {
        let mut c = in_review("text");
        let req = c.request_audio_generation().unwrap();
        c.reset();
        c.submit_upload("doc.pdf", thumbs(1)).unwrap();
        c.advance_to_text_review("new").unwrap();

        let r = c.complete_audio(req.generation).unwrap();
        assert_eq!(
            r,
            Completion::Stale {
                tag: req.generation,
                current: c.generation()
            }
        );
        assert_eq!(c.step(), Step::TextReview);
    }

    #[test]
    fn matching_tag_applies() {
        let mut c = WizardController::new();
        let tag = c.generation();
        assert_eq!(
            c.complete_upload(tag, "doc.pdf", thumbs(2)).unwrap(),
            Completion::Applied(())
        );
        assert_eq!(c.step(), Step::PageSelection);
    }

    #[test]
    fn end_to_end_three_pages() {
        let mut c = WizardController::new();
        c.submit_upload("doc.pdf", thumbs(3)).unwrap();
        c.toggle_delete_page(1).unwrap();
        assert_eq!(c.kept_pages().len(), 2);
        c.advance_to_text_review("extracted").unwrap();
        c.edit_text("hello").unwrap();
        let req = c.request_audio_generation().unwrap();
        assert_eq!(req.text, "hello");
        c.complete_audio_generation().unwrap();
        assert_eq!(c.step(), Step::AudioReady);
        assert_eq!(c.extracted_text(), "hello");
    }

    #[test]
    fn snapshot_reports_selection() {
        let mut c = in_selection(3);
        c.toggle_delete_page(0).unwrap();
        let snap = c.snapshot();
        let doc = snap.document.unwrap();
        assert_eq!(doc.total_pages, 3);
        assert_eq!(doc.pages_deleted, vec![0]);
        assert_eq!(doc.active_pages, vec![1, 2]);
        assert!(doc.thumbnails[0].is_deleted);
        assert_eq!(doc.thumbnails[2].page_number, 3);
    }

    #[test]
    fn text_stats_use_configured_rate() {
        let mut c = WizardController::with_chars_per_audio_minute(10);
        c.submit_upload("doc.pdf", thumbs(1)).unwrap();
        c.advance_to_text_review("x".repeat(25)).unwrap();
        assert_eq!(c.text_stats().estimated_audio_minutes, 3);
    }
}
