use crate::config::StorageConfig;
use crate::model::AvailabilityDocument;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Holds the most recent successfully parsed document.
pub trait SnapshotStore: Send + Sync {
    fn load(&self) -> Result<Option<AvailabilityDocument>>;
    fn save(&self, document: &AvailabilityDocument) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<AvailabilityDocument>> {
        load_snapshot(&self.path)
    }

    fn save(&self, document: &AvailabilityDocument) -> Result<()> {
        save_snapshot(&self.path, document)
    }
}

#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    document: Mutex<Option<AvailabilityDocument>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: AvailabilityDocument) -> Self {
        Self {
            document: Mutex::new(Some(document)),
        }
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<AvailabilityDocument>> {
        Ok(self
            .document
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, document: &AvailabilityDocument) -> Result<()> {
        *self.document.lock().unwrap_or_else(PoisonError::into_inner) = Some(document.clone());
        Ok(())
    }
}

pub fn store_from_config(storage: &StorageConfig) -> Box<dyn SnapshotStore> {
    match &storage.snapshot_path {
        Some(path) => Box::new(FileSnapshotStore::new(path)),
        None => Box::new(MemorySnapshotStore::new()),
    }
}

pub fn load_snapshot(path: &Path) -> Result<Option<AvailabilityDocument>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot file {}", path.display()))?;
    let document = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse snapshot file {}", path.display()))?;
    Ok(Some(document))
}

pub fn save_snapshot(path: &Path, document: &AvailabilityDocument) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create snapshot directory {}", parent.display()))?;
    }

    let serialized = serde_json::to_string_pretty(document)?;
    std::fs::write(path, serialized)
        .with_context(|| format!("failed to write snapshot file {}", path.display()))?;
    Ok(())
}
