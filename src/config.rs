//! Configuration for a wizard session.
//!
//! All session behaviour is controlled through [`WizardConfig`], built via
//! its [`WizardConfigBuilder`]. The controller itself only reads
//! `chars_per_audio_minute`; the remaining knobs govern how
//! [`crate::session::WizardSession`] validates uploads and drives the external
//! collaborators.

use crate::error::WizardError;
use crate::progress::WizardObserver;
use std::fmt;
use std::sync::Arc;

/// Default upload limit: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Configuration for a wizard session.
///
/// # Example
/// ```rust
/// use edgequake_pdf2audio::WizardConfig;
///
/// let config = WizardConfig::builder()
///     .collaborator_timeout_secs(30)
///     .max_retries(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_retries, 2);
/// ```
#[derive(Clone)]
pub struct WizardConfig {
    /// Largest accepted upload in bytes. Default: 10 MiB.
    pub max_upload_bytes: u64,

    /// Characters of text per minute of generated audio, used for the
    /// duration estimate shown during text review. Default: 200.
    pub chars_per_audio_minute: usize,

    /// Per-collaborator-call timeout in seconds. Default: 60.
    pub collaborator_timeout_secs: u64,

    /// Automatic retries of a failed collaborator call. Default: 0.
    ///
    /// Retries stop as soon as the session is reset; a stale retry would be
    /// discarded anyway.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    pub retry_backoff_ms: u64,

    /// Receives step changes and collaborator events.
    pub observer: Option<Arc<dyn WizardObserver>>,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            chars_per_audio_minute: 200,
            collaborator_timeout_secs: 60,
            max_retries: 0,
            retry_backoff_ms: 500,
            observer: None,
        }
    }
}

impl fmt::Debug for WizardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WizardConfig")
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("chars_per_audio_minute", &self.chars_per_audio_minute)
            .field("collaborator_timeout_secs", &self.collaborator_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("observer", &self.observer.as_ref().map(|_| "<dyn WizardObserver>"))
            .finish()
    }
}

impl WizardConfig {
    /// Create a new builder for `WizardConfig`.
    pub fn builder() -> WizardConfigBuilder {
        WizardConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`WizardConfig`].
#[derive(Debug)]
pub struct WizardConfigBuilder {
    config: WizardConfig,
}

impl WizardConfigBuilder {
    pub fn max_upload_bytes(mut self, bytes: u64) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn chars_per_audio_minute(mut self, n: usize) -> Self {
        self.config.chars_per_audio_minute = n;
        self
    }

    pub fn collaborator_timeout_secs(mut self, secs: u64) -> Self {
        self.config.collaborator_timeout_secs = secs.max(1);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn WizardObserver>) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<WizardConfig, WizardError> {
        let c = &self.config;
        if c.max_upload_bytes == 0 {
            return Err(WizardError::InvalidConfig(
                "Upload limit must be at least 1 byte".into(),
            ));
        }
        if c.chars_per_audio_minute == 0 {
            return Err(WizardError::InvalidConfig(
                "Characters per audio minute must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopObserver;

    #[test]
    fn defaults() {
        let c = WizardConfig::default();
        assert_eq!(c.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(c.chars_per_audio_minute, 200);
        assert_eq!(c.max_retries, 0);
        assert!(c.observer.is_none());
    }

    #[test]
    fn zero_upload_limit_rejected() {
        let err = WizardConfig::builder().max_upload_bytes(0).build().unwrap_err();
        assert!(matches!(err, WizardError::InvalidConfig(_)));
    }

    #[test]
    fn zero_chars_per_minute_rejected() {
        let err = WizardConfig::builder()
            .chars_per_audio_minute(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("per audio minute"));
    }

    #[test]
    fn timeout_is_at_least_one_second() {
        let c = WizardConfig::builder()
            .collaborator_timeout_secs(0)
            .build()
            .unwrap();
        assert_eq!(c.collaborator_timeout_secs, 1);
    }

    #[test]
    fn debug_hides_observer() {
        let c = WizardConfig::builder()
            .observer(Arc::new(NoopObserver))
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("<dyn WizardObserver>"));
    }
}
