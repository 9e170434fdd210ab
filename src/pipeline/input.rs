//! Upload validation: turn a user-supplied path or buffer into a
//! [`SourceFile`] the uploader can trust.
//!
//! Rejections happen here, before any collaborator is called, so a wrong file
//! type never costs a round trip. We check the `%PDF` magic bytes rather than
//! the file extension: a renamed `.txt` is still caught.

use crate::error::WizardError;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A validated upload handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    name: String,
    path: Option<PathBuf>,
    size_bytes: u64,
}

impl SourceFile {
    /// Validate a local file: it must exist, be readable, start with `%PDF`
    /// and be at most `max_bytes` long.
    pub fn open(path: impl AsRef<Path>, max_bytes: u64) -> Result<Self, WizardError> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(WizardError::FileNotFound { path });
        }

        let mut file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(WizardError::PermissionDenied { path });
            }
            Err(_) => return Err(WizardError::FileNotFound { path }),
        };

        let name = display_name(&path);
        let size_bytes = file
            .metadata()
            .map(|m| m.len())
            .map_err(|_| WizardError::FileNotFound { path: path.clone() })?;
        check_size(&name, size_bytes, max_bytes)?;

        let mut magic = Vec::with_capacity(PDF_MAGIC.len());
        file.by_ref()
            .take(PDF_MAGIC.len() as u64)
            .read_to_end(&mut magic)
            .map_err(|_| WizardError::PermissionDenied { path: path.clone() })?;
        check_magic(&name, &magic)?;

        debug!("Validated upload: {} ({} bytes)", path.display(), size_bytes);
        Ok(Self {
            name,
            path: Some(path),
            size_bytes,
        })
    }

    /// Validate an in-memory upload (e.g. a multipart body).
    pub fn from_bytes(
        name: impl Into<String>,
        bytes: &[u8],
        max_bytes: u64,
    ) -> Result<Self, WizardError> {
        let name = name.into();
        let size_bytes = bytes.len() as u64;
        check_size(&name, size_bytes, max_bytes)?;
        check_magic(&name, &bytes[..bytes.len().min(PDF_MAGIC.len())])?;

        debug!("Validated in-memory upload: {} ({} bytes)", name, size_bytes);
        Ok(Self {
            name,
            path: None,
            size_bytes,
        })
    }

    /// Original filename, without directories.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Local path, when the upload came from disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn check_size(name: &str, size: u64, limit: u64) -> Result<(), WizardError> {
    if size > limit {
        return Err(WizardError::FileTooLarge {
            name: name.to_string(),
            size,
            limit,
        });
    }
    Ok(())
}

fn check_magic(name: &str, magic: &[u8]) -> Result<(), WizardError> {
    if magic != &PDF_MAGIC[..] {
        return Err(WizardError::NotAPdf {
            name: name.to_string(),
            magic: magic.to_vec(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LIMIT: u64 = 1024;

    #[test]
    fn accepts_pdf_bytes() {
        let f = SourceFile::from_bytes("a.pdf", b"%PDF-1.7\n...", LIMIT).unwrap();
        assert_eq!(f.name(), "a.pdf");
        assert_eq!(f.size_bytes(), 12);
        assert!(f.path().is_none());
    }

    #[test]
    fn rejects_non_pdf_bytes() {
        let err = SourceFile::from_bytes("a.txt", b"hello", LIMIT).unwrap_err();
        assert!(matches!(err, WizardError::NotAPdf { .. }));
    }

    #[test]
    fn rejects_truncated_header() {
        let err = SourceFile::from_bytes("a.pdf", b"%P", LIMIT).unwrap_err();
        assert!(matches!(err, WizardError::NotAPdf { .. }));
    }

    #[test]
    fn rejects_oversized_upload() {
        let body = vec![b'%'; 2048];
        let err = SourceFile::from_bytes("big.pdf", &body, LIMIT).unwrap_err();
        assert!(matches!(
            err,
            WizardError::FileTooLarge {
                size: 2048,
                limit: LIMIT,
                ..
            }
        ));
    }

    #[test]
    fn opens_pdf_on_disk() {
        let mut tmp = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        tmp.write_all(b"%PDF-1.4\n%%EOF\n").unwrap();
        let f = SourceFile::open(tmp.path(), LIMIT).unwrap();
        assert_eq!(f.path(), Some(tmp.path()));
        assert!(f.name().ends_with(".pdf"));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = SourceFile::open("/definitely/not/here.pdf", LIMIT).unwrap_err();
        assert!(matches!(err, WizardError::FileNotFound { .. }));
    }

    #[test]
    fn text_file_on_disk_is_rejected() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"plain text").unwrap();
        let err = SourceFile::open(tmp.path(), LIMIT).unwrap_err();
        assert!(err.to_string().contains("Please select a PDF file"));
    }
}
