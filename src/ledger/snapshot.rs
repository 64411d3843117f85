//! Snapshot codec and stores.
//!
//! A snapshot is the compact JSON array of every block. The pending queue is
//! never part of it. Stores are the extension point for durability; the
//! chain itself lives only in memory.

use crate::core::{Error, Result};
use crate::ledger::block::AuditBlock;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Serialize a block list.
pub fn encode(blocks: &[AuditBlock]) -> Result<String> {
    serde_json::to_string(blocks).map_err(|e| Error::SerializationError(e.to_string()))
}

/// Parse a block list. Performs no verification.
pub fn decode(snapshot: &str) -> Result<Vec<AuditBlock>> {
    serde_json::from_str(snapshot).map_err(|e| Error::Snapshot(e.to_string()))
}

/// Somewhere a snapshot can be saved and loaded.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist a snapshot, replacing any previous one.
    async fn save(&self, snapshot: &str) -> Result<()>;

    /// Load the latest snapshot, if one has been saved.
    async fn load(&self) -> Result<Option<String>>;
}

/// Snapshot store held in memory.
#[derive(Default)]
pub struct MemorySnapshotStore {
    latest: RwLock<Option<String>>,
    saves: RwLock<u64>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful saves.
    pub async fn save_count(&self) -> u64 {
        *self.saves.read().await
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn save(&self, snapshot: &str) -> Result<()> {
        *self.latest.write().await = Some(snapshot.to_string());
        *self.saves.write().await += 1;
        Ok(())
    }

    async fn load(&self) -> Result<Option<String>> {
        Ok(self.latest.read().await.clone())
    }
}

/// Snapshot store backed by a single file.
///
/// Writes go to a sibling temp file that is then renamed over the target, so
/// a crash mid-write leaves the previous snapshot intact.
#[derive(Clone, Debug)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn save(&self, snapshot: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp = self.temp_path();
        tokio::fs::write(&temp, snapshot).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }

    async fn load(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}
