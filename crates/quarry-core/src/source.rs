use std::path::{Path, PathBuf};

use crate::ingest::{DecodeError, DecodeResult, DocumentFormat};

/// Handle to one input document: a path on disk, optionally with its bytes
/// already in memory (uploads, tests).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    path: PathBuf,
    bytes: Option<Vec<u8>>,
}

impl RawFile {
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            bytes: None,
        }
    }

    #[must_use]
    pub fn from_bytes(name: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        Self {
            path: name.into(),
            bytes: Some(bytes),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    /// Name of the directory holding the file, if it has one.
    #[must_use]
    pub fn parent_name(&self) -> Option<&str> {
        self.path
            .parent()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
    }

    #[must_use]
    pub fn format(&self) -> DocumentFormat {
        DocumentFormat::from_path(&self.path)
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        self.path.display().to_string()
    }

    pub async fn load(&self) -> DecodeResult<Vec<u8>> {
        if let Some(bytes) = &self.bytes {
            return Ok(bytes.clone());
        }

        tokio::fs::read(&self.path).await.map_err(|source| DecodeError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
