//! Upload storage.
//!
//! Uploaded files are handed to a [`FileStorage`] sink. The only
//! implementation writes them into a local directory.

mod local;

pub use local::LocalFileStorage;

use async_trait::async_trait;
use std::path::PathBuf;

/// A file that has been written to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Name the file was stored under.
    pub filename: String,
    /// Location of the stored file.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: usize,
}

/// Errors that can occur while storing a file.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The upload directory could not be created.
    #[error("failed to create upload directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Write-only sink for uploaded files.
#[async_trait]
pub trait FileStorage: Send + Sync + std::fmt::Debug {
    /// Persist `data` under `filename`, replacing any file with that name.
    async fn store(&self, filename: &str, data: &[u8]) -> Result<StoredFile, StorageError>;
}
