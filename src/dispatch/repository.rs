use std::path::PathBuf;
use std::sync::Mutex;

use tracing::info;

use crate::error::{DispatchError, Result};
use crate::processing::PreviewArtifact;

/// A persisted preview, as recorded by a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedRecord {
    pub path: PathBuf,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub size: u64,
    pub checksum: String,
}

/// Durable storage for generated previews
pub trait ProcessedFileRepository: Send + Sync {
    /// Store the artifact's file and register its metadata
    fn add(&self, artifact: &PreviewArtifact) -> Result<ProcessedRecord>;
}

/// Stores previews as files in one directory and keeps an in-memory index
pub struct DirectoryRepository {
    root: PathBuf,
    records: Mutex<Vec<ProcessedRecord>>,
}

impl DirectoryRepository {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            records: Mutex::new(Vec::new()),
        }
    }

    /// Everything added so far, oldest first
    pub fn records(&self) -> Vec<ProcessedRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl ProcessedFileRepository for DirectoryRepository {
    fn add(&self, artifact: &PreviewArtifact) -> Result<ProcessedRecord> {
        let destination = self.root.join(&artifact.target_name);
        let path = artifact.persist_to(&destination).map_err(|e| DispatchError::PersistFailed {
            name: artifact.target_name.clone(),
            reason: e.to_string(),
        })?;

        let record = ProcessedRecord {
            path,
            name: artifact.target_name.clone(),
            width: artifact.width,
            height: artifact.height,
            size: artifact.size,
            checksum: artifact.checksum.clone(),
        };

        info!("Stored {} ({}x{})", record.path.display(), record.width, record.height);

        let mut records = self.records.lock().map_err(|_| DispatchError::PersistFailed {
            name: record.name.clone(),
            reason: "record index poisoned".to_string(),
        })?;
        records.retain(|existing| existing.name != record.name);
        records.push(record.clone());
        Ok(record)
    }
}
