//! External collaborators of the wizard.
//!
//! Each trait stands for one service the wizard hands work to. None of them
//! is implemented for real in this crate: PDF rasterisation, text
//! extraction and speech synthesis are someone else's job. [`mock`] provides
//! stand-ins with fixed latency for demos and tests.
//!
//! ## Data Flow
//!
//! ```text
//! SourceFile ──▶ Uploader ──▶ thumbnails ──▶ (page selection) ──▶ TextExtractor ──▶ text
//!                                                                                  │
//!                          AudioArtifactRef ◀── AudioGenerator ◀── AudioRequest ◀──┘
//! ```
//!
//! 1. [`input`]: validate the user-supplied file before any collaborator
//!    sees it (exists, readable, `%PDF` magic, size cap)
//! 2. [`Uploader`]: store the file and rasterise one thumbnail per page
//! 3. [`TextExtractor`]: read the text of the kept pages
//! 4. [`AudioGenerator`]: synthesise speech from the reviewed text
//!
//! The traits return boxed futures so they stay object-safe and can be
//! stored as `Arc<dyn …>` inside [`crate::session::WizardSession`].

pub mod input;
pub mod mock;

use crate::error::CollaboratorError;
use crate::model::{AudioArtifactRef, AudioRequest, DocumentId};
use futures::future::BoxFuture;

pub use input::SourceFile;

/// Future returned by every collaborator call.
pub type CollaboratorFuture<'a, T> = BoxFuture<'a, Result<T, CollaboratorError>>;

/// Upload/rasterise service: `upload(file) -> Page[]`.
pub trait Uploader: Send + Sync {
    /// Returns one thumbnail reference per page, in page order.
    fn upload<'a>(&'a self, file: &'a SourceFile) -> CollaboratorFuture<'a, Vec<String>>;
}

/// Text extraction service: `extract(documentId, keptPageIndices) -> string`.
pub trait TextExtractor: Send + Sync {
    fn extract(
        &self,
        document_id: DocumentId,
        kept_pages: Vec<usize>,
    ) -> CollaboratorFuture<'_, String>;
}

/// Audio generation service: `generate(AudioRequest) -> AudioArtifactRef`.
pub trait AudioGenerator: Send + Sync {
    fn generate(&self, request: AudioRequest) -> CollaboratorFuture<'_, AudioArtifactRef>;
}
