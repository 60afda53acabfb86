//! Persistence for the single vector index.
//!
//! The file store writes a JSON document carrying a format version, the index header, a SHA-256
//! checksum of the entries, and the entries themselves. Writes land in a sibling temporary file
//! that is renamed over the target, so a reader sees either the previous index or the new one.

use super::{IndexEntry, IndexHeader, VectorIndex};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

const FORMAT_VERSION: u32 = 1;

/// Errors returned by index stores.
#[derive(Debug, Error)]
pub enum IndexStoreError {
    /// Nothing has been persisted yet.
    #[error("no index present at {location}")]
    NotFound {
        /// Store location that was probed.
        location: String,
    },
    /// The persisted index exists but cannot be trusted.
    #[error("index at {location} is unreadable: {reason}")]
    Corrupt {
        /// Store location that was read.
        location: String,
        /// What failed to validate.
        reason: String,
    },
    /// Underlying I/O failed.
    #[error("index I/O failed at {location}: {source}")]
    Io {
        /// Store location being accessed.
        location: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The index could not be encoded.
    #[error("failed to encode index: {0}")]
    Serialization(String),
}

/// Storage for the one persisted index. `save` fully replaces whatever was stored before.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Persist `index`, replacing any previous index.
    async fn save(&self, index: &VectorIndex) -> Result<(), IndexStoreError>;

    /// Load the current index.
    async fn load(&self) -> Result<VectorIndex, IndexStoreError>;

    /// Human-readable location used in logs and errors.
    fn location(&self) -> String;
}

#[derive(Serialize)]
struct PersistedIndexRef<'a> {
    format_version: u32,
    header: &'a IndexHeader,
    checksum: String,
    entries: &'a [IndexEntry],
}

#[derive(Deserialize)]
struct PersistedIndex {
    format_version: u32,
    header: IndexHeader,
    checksum: String,
    entries: Vec<IndexEntry>,
}

fn entries_checksum(entries: &[IndexEntry]) -> Result<String, serde_json::Error> {
    let encoded = serde_json::to_vec(entries)?;
    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    Ok(hex::encode(hasher.finalize()))
}

/// Index store backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct FileIndexStore {
    path: PathBuf,
}

impl FileIndexStore {
    /// Create a store persisting to `path`. Parent directories are created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the persisted index file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn io_error(&self, source: std::io::Error) -> IndexStoreError {
        IndexStoreError::Io {
            location: self.location(),
            source,
        }
    }

    fn corrupt(&self, reason: impl Into<String>) -> IndexStoreError {
        IndexStoreError::Corrupt {
            location: self.location(),
            reason: reason.into(),
        }
    }

    fn encode(index: &VectorIndex) -> Result<Vec<u8>, IndexStoreError> {
        let checksum = entries_checksum(index.entries())
            .map_err(|error| IndexStoreError::Serialization(error.to_string()))?;
        serde_json::to_vec(&PersistedIndexRef {
            format_version: FORMAT_VERSION,
            header: index.header(),
            checksum,
            entries: index.entries(),
        })
        .map_err(|error| IndexStoreError::Serialization(error.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<VectorIndex, IndexStoreError> {
        let persisted: PersistedIndex = serde_json::from_slice(bytes)
            .map_err(|error| self.corrupt(format!("invalid JSON: {error}")))?;

        if persisted.format_version != FORMAT_VERSION {
            return Err(self.corrupt(format!(
                "unsupported format version {} (expected {FORMAT_VERSION})",
                persisted.format_version
            )));
        }

        let checksum = entries_checksum(&persisted.entries)
            .map_err(|error| self.corrupt(error.to_string()))?;
        if checksum != persisted.checksum {
            return Err(self.corrupt("checksum mismatch"));
        }

        VectorIndex::from_parts(persisted.header, persisted.entries)
            .map_err(|error| self.corrupt(error.to_string()))
    }
}

#[async_trait]
impl IndexStore for FileIndexStore {
    async fn save(&self, index: &VectorIndex) -> Result<(), IndexStoreError> {
        let bytes = Self::encode(index)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|error| self.io_error(error))?;
        }

        let temp_path = self.temp_path();
        let mut file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|error| self.io_error(error))?;
        file.write_all(&bytes)
            .await
            .map_err(|error| self.io_error(error))?;
        file.sync_all().await.map_err(|error| self.io_error(error))?;
        drop(file);

        if let Err(error) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(self.io_error(error));
        }

        tracing::debug!(
            path = %self.path.display(),
            bytes = bytes.len(),
            chunks = index.len(),
            "Index persisted"
        );
        Ok(())
    }

    async fn load(&self) -> Result<VectorIndex, IndexStoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(IndexStoreError::NotFound {
                    location: self.location(),
                });
            }
            Err(error) => return Err(self.io_error(error)),
        };
        self.decode(&bytes)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Index store holding the index in process memory.
#[derive(Debug, Default)]
pub struct InMemoryIndexStore {
    index: RwLock<Option<VectorIndex>>,
}

impl InMemoryIndexStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IndexStore for InMemoryIndexStore {
    async fn save(&self, index: &VectorIndex) -> Result<(), IndexStoreError> {
        *self.index.write().await = Some(index.clone());
        Ok(())
    }

    async fn load(&self) -> Result<VectorIndex, IndexStoreError> {
        self.index
            .read()
            .await
            .clone()
            .ok_or_else(|| IndexStoreError::NotFound {
                location: self.location(),
            })
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(chunks: &[&str]) -> VectorIndex {
        let entries = chunks
            .iter()
            .enumerate()
            .map(|(position, chunk)| IndexEntry {
                chunk: chunk.to_string(),
                vector: vec![position as f32, 0.25, -1.5],
            })
            .collect();
        VectorIndex::build("test-model", entries).expect("index")
    }

    #[tokio::test]
    async fn file_store_round_trips_and_creates_parent_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileIndexStore::new(dir.path().join("nested/index.json"));
        let original = index(&["alpha", "beta"]);

        store.save(&original).await.expect("save");
        let loaded = store.load().await.expect("load");

        assert_eq!(loaded, original);
        assert!(!dir.path().join("nested/index.json.tmp").exists());
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileIndexStore::new(dir.path().join("index.json"));
        let error = store.load().await.unwrap_err();
        assert!(matches!(error, IndexStoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn garbage_file_is_corrupt_not_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("index.json");
        tokio::fs::write(&path, b"not json").await.expect("write");

        let error = FileIndexStore::new(&path).load().await.unwrap_err();
        assert!(matches!(error, IndexStoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn tampered_entries_fail_checksum() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("index.json");
        let store = FileIndexStore::new(&path);
        store.save(&index(&["alpha", "beta"])).await.expect("save");

        let contents = tokio::fs::read_to_string(&path).await.expect("read");
        tokio::fs::write(&path, contents.replace("alpha", "omega"))
            .await
            .expect("write");

        let error = store.load().await.unwrap_err();
        assert!(
            matches!(error, IndexStoreError::Corrupt { ref reason, .. } if reason.contains("checksum"))
        );
    }

    #[tokio::test]
    async fn save_replaces_previous_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileIndexStore::new(dir.path().join("index.json"));
        store.save(&index(&["first upload"])).await.expect("save");
        store
            .save(&index(&["second upload", "more"]))
            .await
            .expect("save");

        let loaded = store.load().await.expect("load");
        let chunks: Vec<_> = loaded.entries().iter().map(|e| e.chunk.as_str()).collect();
        assert_eq!(chunks, vec!["second upload", "more"]);
    }

    #[tokio::test]
    async fn memory_store_reports_not_found_until_saved() {
        let store = InMemoryIndexStore::new();
        assert!(matches!(
            store.load().await.unwrap_err(),
            IndexStoreError::NotFound { .. }
        ));

        let original = index(&["alpha"]);
        store.save(&original).await.expect("save");
        assert_eq!(store.load().await.expect("load"), original);
    }
}
