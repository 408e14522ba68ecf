//! Persistence for downloaded export files
//! Uses Apache Arrow object_store crate

use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{ObjectStore, path::Path as StoragePath};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::export::DownloadedFile;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to prepare output directory {path}: {source}")]
    OutputDir {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid filename: {0:?}")]
    InvalidFilename(String),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Metadata returned after saving
#[derive(Debug, Clone)]
pub struct SavedFile {
    pub key: String,
    pub etag: Option<String>,
    pub size: usize,
}

/// Store for exported spreadsheets
#[derive(Clone)]
pub struct ExportStore {
    store: Arc<dyn ObjectStore>,
}

impl ExportStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Store files under a local directory, creating it if needed
    pub fn local(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|source| StorageError::OutputDir {
            path: dir.display().to_string(),
            source,
        })?;

        let store = LocalFileSystem::new_with_prefix(dir)?;
        Ok(Self::new(Arc::new(store)))
    }

    /// Create in-memory storage for testing
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()))
    }

    /// Save a downloaded file under its sanitized filename
    pub async fn save(&self, file: &DownloadedFile) -> Result<SavedFile> {
        let key = sanitize_filename(&file.filename)
            .ok_or_else(|| StorageError::InvalidFilename(file.filename.clone()))?;
        let path = StoragePath::from(key.as_str());
        let size = file.bytes.len();

        let put_result = self.store.put(&path, file.bytes.clone().into()).await?;

        tracing::info!(key = %key, size, record_count = ?file.record_count, "Saved export file");

        Ok(SavedFile {
            key,
            etag: put_result.e_tag,
            size,
        })
    }

    /// Read a saved file back
    pub async fn load(&self, key: &str) -> Result<bytes::Bytes> {
        let path = StoragePath::from(key);
        let result = self.store.get(&path).await?;
        Ok(result.bytes().await?)
    }
}

/// Reduce a server-provided filename to a single safe path segment
///
/// Returns `None` when nothing usable is left.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let last = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = last
        .chars()
        .map(|c| if c.is_control() || matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|') { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').trim();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
