//! Stand-in collaborators with fixed latency.
//!
//! They reproduce what the product demo did before real services existed:
//! every upload yields `page_N.jpg` thumbnails, extraction returns placeholder
//! prose that mentions how many pages were kept, and audio generation hands
//! back a made-up `.mp3` path. Each mock can be told to fail its next `n`
//! calls to exercise retry and failure handling.

use super::{AudioGenerator, CollaboratorFuture, SourceFile, TextExtractor, Uploader};
use crate::error::CollaboratorError;
use crate::model::{AudioArtifactRef, AudioRequest, DocumentId};
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::time::{sleep, Duration};
use tracing::debug;

const PLACEHOLDER_BODY: &str = "\
Lorem ipsum dolor sit amet, consectetur adipiscing elit. Sed do eiusmod tempor \
incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, quis nostrud \
exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat.

Duis aute irure dolor in reprehenderit in voluptate velit esse cillum dolore eu \
fugiat nulla pariatur. Excepteur sint occaecat cupidatat non proident, sunt in \
culpa qui officia deserunt mollit anim id est laborum.

Sed ut perspiciatis unde omnis iste natus error sit voluptatem accusantium \
doloremque laudantium, totam rem aperiam, eaque ipsa quae ab illo inventore \
veritatis et quasi architecto beatae vitae dicta sunt explicabo.";

/// Latency and size knobs for the mock collaborators.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Pages produced by every upload. Default: 24.
    pub page_count: usize,
    /// Default: 2000.
    pub upload_delay_ms: u64,
    /// Default: 1000.
    pub extract_delay_ms: u64,
    /// Default: 3000.
    pub audio_delay_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            page_count: 24,
            upload_delay_ms: 2000,
            extract_delay_ms: 1000,
            audio_delay_ms: 3000,
        }
    }
}

impl MockConfig {
    /// No latency at all; handy in tests.
    pub fn instant(page_count: usize) -> Self {
        Self {
            page_count,
            upload_delay_ms: 0,
            extract_delay_ms: 0,
            audio_delay_ms: 0,
        }
    }
}

/// Counts down injected failures.
#[derive(Debug, Default)]
struct FailureBudget(AtomicU32);

impl FailureBudget {
    fn new(n: u32) -> Self {
        Self(AtomicU32::new(n))
    }

    /// `true` if this call should fail.
    fn take(&self) -> bool {
        self.0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

async fn delay(ms: u64) {
    if ms > 0 {
        sleep(Duration::from_millis(ms)).await;
    }
}

// ── Uploader ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockUploader {
    page_count: usize,
    delay_ms: u64,
    failures: FailureBudget,
}

impl MockUploader {
    pub fn new(config: &MockConfig) -> Self {
        Self {
            page_count: config.page_count,
            delay_ms: config.upload_delay_ms,
            failures: FailureBudget::default(),
        }
    }

    /// Fail the next `n` uploads.
    pub fn failing(mut self, n: u32) -> Self {
        self.failures = FailureBudget::new(n);
        self
    }
}

impl Uploader for MockUploader {
    fn upload<'a>(&'a self, file: &'a SourceFile) -> CollaboratorFuture<'a, Vec<String>> {
        Box::pin(async move {
            delay(self.delay_ms).await;
            if self.failures.take() {
                return Err(CollaboratorError::failed(format!(
                    "upload of '{}' was rejected",
                    file.name()
                )));
            }
            debug!("Mock upload of '{}': {} pages", file.name(), self.page_count);
            Ok((1..=self.page_count)
                .map(|n| format!("page_{n}.jpg"))
                .collect())
        })
    }
}

// ── Text extractor ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockTextExtractor {
    delay_ms: u64,
    failures: FailureBudget,
}

impl MockTextExtractor {
    pub fn new(config: &MockConfig) -> Self {
        Self {
            delay_ms: config.extract_delay_ms,
            failures: FailureBudget::default(),
        }
    }

    /// Fail the next `n` extractions.
    pub fn failing(mut self, n: u32) -> Self {
        self.failures = FailureBudget::new(n);
        self
    }
}

/// Placeholder text for `kept` pages.
pub fn placeholder_text(kept: usize) -> String {
    format!("This is extracted text from {kept} pages of your PDF document.\n\n{PLACEHOLDER_BODY}")
}

impl TextExtractor for MockTextExtractor {
    fn extract(
        &self,
        document_id: DocumentId,
        kept_pages: Vec<usize>,
    ) -> CollaboratorFuture<'_, String> {
        Box::pin(async move {
            delay(self.delay_ms).await;
            if self.failures.take() {
                return Err(CollaboratorError::failed(format!(
                    "text extraction failed for document {document_id}"
                )));
            }
            if kept_pages.is_empty() {
                return Err(CollaboratorError::failed("no pages to extract"));
            }
            Ok(placeholder_text(kept_pages.len()))
        })
    }
}

// ── Audio generator ──────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockAudioGenerator {
    delay_ms: u64,
    failures: FailureBudget,
}

impl MockAudioGenerator {
    pub fn new(config: &MockConfig) -> Self {
        Self {
            delay_ms: config.audio_delay_ms,
            failures: FailureBudget::default(),
        }
    }

    /// Fail the next `n` generations.
    pub fn failing(mut self, n: u32) -> Self {
        self.failures = FailureBudget::new(n);
        self
    }
}

impl AudioGenerator for MockAudioGenerator {
    fn generate(&self, request: AudioRequest) -> CollaboratorFuture<'_, AudioArtifactRef> {
        Box::pin(async move {
            delay(self.delay_ms).await;
            if self.failures.take() {
                return Err(CollaboratorError::failed("speech service unavailable"));
            }
            Ok(AudioArtifactRef(format!(
                "audio/audio_{}_{}.mp3",
                request.document_id,
                request.generation.value()
            )))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Generation;

    fn pdf() -> SourceFile {
        SourceFile::from_bytes("doc.pdf", b"%PDF-1.7", 1024).unwrap()
    }

    #[tokio::test]
    async fn uploader_numbers_pages_from_one() {
        let up = MockUploader::new(&MockConfig::instant(3));
        let pages = up.upload(&pdf()).await.unwrap();
        assert_eq!(pages, vec!["page_1.jpg", "page_2.jpg", "page_3.jpg"]);
    }

    #[tokio::test]
    async fn failures_are_consumed() {
        let up = MockUploader::new(&MockConfig::instant(1)).failing(2);
        let file = pdf();
        assert!(up.upload(&file).await.is_err());
        assert!(up.upload(&file).await.is_err());
        assert!(up.upload(&file).await.is_ok());
    }

    #[tokio::test]
    async fn extractor_mentions_kept_count() {
        let ex = MockTextExtractor::new(&MockConfig::instant(0));
        let text = ex.extract(DocumentId::new(), vec![0, 2]).await.unwrap();
        assert!(text.starts_with("This is extracted text from 2 pages"));
    }

    #[tokio::test]
    async fn extractor_rejects_empty_selection() {
        let ex = MockTextExtractor::new(&MockConfig::instant(0));
        assert!(ex.extract(DocumentId::new(), vec![]).await.is_err());
    }

    #[tokio::test]
    async fn generator_returns_mp3_reference() {
        let generator = MockAudioGenerator::new(&MockConfig::instant(0));
        let id = DocumentId::new();
        let artifact = generator
            .generate(AudioRequest {
                text: "hello".into(),
                document_id: id,
                generation: Generation::default(),
            })
            .await
            .unwrap();
        assert!(artifact.0.contains(&id.to_string()));
        assert!(artifact.0.ends_with(".mp3"));
    }
}
