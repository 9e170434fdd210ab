//! Error types for the edgequake-pdf2audio library.
//!
//! Two distinct error types reflect two distinct failure sources:
//!
//! * [`WizardError`]: returned by every wizard operation. Validation
//!   failures (`InvalidDocument`, `IndexOutOfRange`, `InvalidTransition`,
//!   `EmptyInput`) are local and synchronous; the wizard state is left exactly
//!   as it was before the call.
//!
//! * [`CollaboratorError`]: produced by an external collaborator (upload,
//!   text extraction, audio generation). The session wraps it in
//!   [`WizardError::CollaboratorFailure`] together with the [`Stage`] that
//!   failed, so the caller can retry that same step without losing the state
//!   gathered so far.

use crate::model::Step;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by wizard operations.
#[derive(Debug, Error)]
pub enum WizardError {
    // ── Workflow errors ───────────────────────────────────────────────────
    /// The upload collaborator produced no pages.
    #[error("Invalid document '{filename}': {reason}")]
    InvalidDocument { filename: String, reason: String },

    /// A page index outside `0..page_count`.
    #[error("Page index {index} is out of range (document has {page_count} pages)")]
    IndexOutOfRange { index: usize, page_count: usize },

    /// Operation called while the wizard is on a step that does not allow it.
    #[error("Cannot {operation} while on step '{step}'")]
    InvalidTransition {
        operation: &'static str,
        step: Step,
    },

    /// Audio generation requested while the text is blank.
    #[error("No text available for audio generation")]
    EmptyInput,

    /// An external collaborator rejected or timed out. State is unchanged.
    #[error("{stage} failed: {source}")]
    CollaboratorFailure {
        stage: Stage,
        #[source]
        source: CollaboratorError,
    },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Upload file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file was read, but is not a PDF.
    #[error("Please select a PDF file: '{name}' is not a PDF (first bytes: {magic:?})")]
    NotAPdf { name: String, magic: Vec<u8> },

    /// The file is larger than the configured upload limit.
    #[error("File '{name}' is {size} bytes; the upload limit is {limit} bytes")]
    FileTooLarge { name: String, size: u64, limit: u64 },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl WizardError {
    /// `true` for errors that come from an external collaborator and can be
    /// retried on the same step.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WizardError::CollaboratorFailure { .. })
    }
}

/// The collaborator stage a [`CollaboratorError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Upload,
    Extraction,
    AudioGeneration,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Upload => "Upload",
            Stage::Extraction => "Text extraction",
            Stage::AudioGeneration => "Audio generation",
        };
        f.write_str(s)
    }
}

/// A failure reported by an external collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollaboratorError {
    /// The collaborator rejected the request.
    #[error("{detail}")]
    Failed { detail: String },

    /// The collaborator did not answer in time.
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },
}

impl CollaboratorError {
    pub fn failed(detail: impl Into<String>) -> Self {
        CollaboratorError::Failed {
            detail: detail.into(),
        }
    }
}
