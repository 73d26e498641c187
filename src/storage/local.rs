//! Local directory storage.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{FileStorage, StorageError, StoredFile};

/// Stores uploads as plain files in one directory.
///
/// The directory is created on the first write. Only the final component of
/// a submitted filename is used, so uploads cannot escape the directory.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    dir: PathBuf,
}

impl LocalFileStorage {
    /// Create storage rooted at `dir`. Nothing is touched until the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory files are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn store(&self, filename: &str, data: &[u8]) -> Result<StoredFile, StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StorageError::CreateDir {
                path: self.dir.clone(),
                source,
            })?;

        let filename = storage_name(filename);
        let path = self.dir.join(&filename);

        tokio::fs::write(&path, data)
            .await
            .map_err(|source| StorageError::Write {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(path = %path.display(), size = data.len(), "Stored upload");

        Ok(StoredFile {
            filename,
            path,
            size: data.len(),
        })
    }
}

/// Reduce a submitted filename to a single path component.
fn storage_name(submitted: &str) -> String {
    // Browsers on Windows may send a full `C:\...` path.
    let last = submitted.rsplit(['/', '\\']).next().unwrap_or_default();
    match Path::new(last).file_name().and_then(|n| n.to_str()) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("file_{}", uuid::Uuid::new_v4()),
    }
}
