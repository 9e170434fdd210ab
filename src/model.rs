//! Data model shared by the controller, the session and the collaborators.
//!
//! Every type here is plain data. Mutation rules (which step may change what)
//! live in [`crate::controller::WizardController`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

// ── Identifiers ──────────────────────────────────────────────────────────

/// Identifier assigned to a [`Document`] when its upload completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Session tag. Bumped on every reset; completions carrying an older tag are
/// discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }

    pub(crate) fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ── Wizard step ──────────────────────────────────────────────────────────

/// The active wizard step. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    #[default]
    Upload,
    PageSelection,
    TextReview,
    AudioReady,
}

impl Step {
    /// All steps in workflow order.
    pub const ALL: [Step; 4] = [
        Step::Upload,
        Step::PageSelection,
        Step::TextReview,
        Step::AudioReady,
    ];

    /// 0-based position in the workflow.
    pub fn index(self) -> usize {
        match self {
            Step::Upload => 0,
            Step::PageSelection => 1,
            Step::TextReview => 2,
            Step::AudioReady => 3,
        }
    }

    /// Human label used by step indicators and error messages.
    pub fn label(self) -> &'static str {
        match self {
            Step::Upload => "upload",
            Step::PageSelection => "page selection",
            Step::TextReview => "text review",
            Step::AudioReady => "audio ready",
        }
    }

    /// `true` when `self` comes before `current`, i.e. it has been completed.
    pub fn is_completed_before(self, current: Step) -> bool {
        self.index() < current.index()
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Document ─────────────────────────────────────────────────────────────

/// One rasterised page, addressed by a stable 0-based index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub index: usize,
    /// Opaque thumbnail reference (path or URI) produced by the uploader.
    pub thumbnail: String,
}

/// The working document. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    id: DocumentId,
    filename: String,
    pages: Vec<Page>,
}

impl Document {
    /// Build a document from the uploader's ordered thumbnail list.
    pub(crate) fn new(filename: impl Into<String>, thumbnails: Vec<String>) -> Self {
        let pages = thumbnails
            .into_iter()
            .enumerate()
            .map(|(index, thumbnail)| Page { index, thumbnail })
            .collect();
        Self {
            id: DocumentId::new(),
            filename: filename.into(),
            pages,
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

// ── Page selection ───────────────────────────────────────────────────────

/// Set of logically deleted page indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSelectionState {
    deleted: BTreeSet<usize>,
}

impl PageSelectionState {
    /// Flip membership of `index`. Returns `true` if the page is now deleted.
    pub(crate) fn toggle(&mut self, index: usize) -> bool {
        if self.deleted.remove(&index) {
            false
        } else {
            self.deleted.insert(index);
            true
        }
    }

    pub(crate) fn clear(&mut self) {
        self.deleted.clear();
    }

    pub fn is_deleted(&self, index: usize) -> bool {
        self.deleted.contains(&index)
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }

    /// Deleted indices in ascending order.
    pub fn deleted(&self) -> impl Iterator<Item = usize> + '_ {
        self.deleted.iter().copied()
    }

    /// Indices in `0..page_count` that are not deleted, ascending.
    pub fn kept_indices(&self, page_count: usize) -> Vec<usize> {
        (0..page_count).filter(|i| !self.deleted.contains(i)).collect()
    }

    pub fn kept_count(&self, page_count: usize) -> usize {
        page_count.saturating_sub(self.deleted.len())
    }
}

// ── Text ─────────────────────────────────────────────────────────────────

/// Length and duration estimate for the review text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStats {
    pub characters: usize,
    pub estimated_audio_minutes: usize,
}

impl TextStats {
    /// `estimated_audio_minutes = ceil(characters / chars_per_minute)`.
    pub fn measure(text: &str, chars_per_minute: usize) -> Self {
        let characters = text.chars().count();
        let per_minute = chars_per_minute.max(1);
        Self {
            characters,
            estimated_audio_minutes: characters.div_ceil(per_minute),
        }
    }
}

// ── Audio ────────────────────────────────────────────────────────────────

/// Immutable snapshot handed to the audio generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioRequest {
    pub text: String,
    pub document_id: DocumentId,
    pub generation: Generation,
}

/// Reference to the downloadable audio, owned by the audio generator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioArtifactRef(pub String);

impl fmt::Display for AudioArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Snapshot ─────────────────────────────────────────────────────────────

/// One thumbnail row in a [`DocumentView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailView {
    /// 1-based page number for display.
    pub page_number: usize,
    pub thumbnail: String,
    pub is_deleted: bool,
}

/// Serialisable view of the working document and its selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentView {
    pub id: DocumentId,
    pub filename: String,
    pub total_pages: usize,
    /// 0-based deleted indices, ascending.
    pub pages_deleted: Vec<usize>,
    /// 0-based kept indices, ascending.
    pub active_pages: Vec<usize>,
    pub thumbnails: Vec<ThumbnailView>,
}

impl DocumentView {
    pub(crate) fn new(document: &Document, selection: &PageSelectionState) -> Self {
        Self {
            id: document.id(),
            filename: document.filename().to_string(),
            total_pages: document.page_count(),
            pages_deleted: selection.deleted().collect(),
            active_pages: selection.kept_indices(document.page_count()),
            thumbnails: document
                .pages()
                .iter()
                .map(|p| ThumbnailView {
                    page_number: p.index + 1,
                    thumbnail: p.thumbnail.clone(),
                    is_deleted: selection.is_deleted(p.index),
                })
                .collect(),
        }
    }
}

/// Serialisable view of the whole wizard state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardSnapshot {
    pub step: Step,
    pub generation: Generation,
    pub document: Option<DocumentView>,
    pub extracted_text: String,
    pub text_stats: TextStats,
}
