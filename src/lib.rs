//! # edgequake-pdf2audio
//!
//! Workflow state for turning a PDF into audio: upload the document, pick the
//! pages to keep, review and edit the extracted text, generate speech.
//!
//! ## Why a state machine?
//!
//! Every step depends on the one before: you cannot extract text before the
//! document has pages, and you must not synthesise audio from text that
//! belonged to a document the user has already thrown away. Keeping the
//! wizard in one explicit [`WizardController`] makes those rules testable and
//! lets any presentation layer (web, TUI, CLI) drive it the same way.
//!
//! ## Workflow Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Upload          validate %PDF + size, rasterise thumbnails   (Uploader)
//!  ├─ 2. PageSelection   toggle pages; at least one must stay kept
//!  ├─ 3. TextReview      extract kept pages, edit freely            (TextExtractor)
//!  └─ 4. AudioReady      synthesise speech from the reviewed text   (AudioGenerator)
//!
//!  reset ──▶ back to Upload from anywhere; in-flight results are discarded
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2audio::{MockConfig, SourceFile, WizardConfig, WizardSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WizardConfig::default();
//!     let session = WizardSession::with_mocks(config.clone(), &MockConfig::default());
//!
//!     let file = SourceFile::open("document.pdf", config.max_upload_bytes)?;
//!     session.upload(&file).await?;
//!     session.toggle_page(0)?;           // drop the cover page
//!     session.extract().await?;
//!     session.edit_text("Hello there")?;
//!     if let Some(audio) = session.generate_audio().await?.applied() {
//!         println!("audio at {audio}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2audio` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{WizardConfig, WizardConfigBuilder};
pub use controller::{Completion, WizardController};
pub use error::{CollaboratorError, Stage, WizardError};
pub use model::{
    AudioArtifactRef, AudioRequest, Document, DocumentId, DocumentView, Generation, Page,
    PageSelectionState, Step, TextStats, ThumbnailView, WizardSnapshot,
};
pub use pipeline::mock::{MockAudioGenerator, MockConfig, MockTextExtractor, MockUploader};
pub use pipeline::{AudioGenerator, CollaboratorFuture, SourceFile, TextExtractor, Uploader};
pub use progress::{NoopObserver, Observer, WizardObserver};
pub use session::{Outcome, WizardSession};
