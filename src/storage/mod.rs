// file: src/storage/mod.rs
// description: collaborator contracts for cache persistence, file access and backups
// reference: https://docs.rs/async-trait

pub mod fs;
pub mod memory;

pub use fs::{FsBackupService, JsonCatalogStore, NativeFileAccess};
pub use memory::{MemoryBackupService, MemoryCatalogStore, MemoryFileAccess};

use crate::error::Result;
use crate::models::{RecordSet, SyncConfig};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Metadata about a file. A missing file is `exists == false`, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    pub exists: bool,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

impl FileStat {
    pub fn missing() -> Self {
        Self {
            exists: false,
            size: 0,
            modified: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupInfo {
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub size: u64,
    pub checksum: String,
}

/// Where the cached record set and the sync settings live.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn load_records(&self) -> Result<RecordSet>;

    async fn save_records(&self, records: &RecordSet) -> Result<()>;

    /// Snapshot the currently stored record set before it is replaced.
    async fn backup_records(&self) -> Result<()>;

    /// Most recent snapshot taken by `backup_records`, if any.
    async fn latest_backup(&self) -> Result<Option<RecordSet>>;

    async fn load_sync_config(&self) -> Result<Option<SyncConfig>>;

    async fn save_sync_config(&self, config: &SyncConfig) -> Result<()>;
}

/// Access to the external file. Errors come back classified.
#[async_trait]
pub trait FileAccess: Send + Sync {
    async fn read_file(&self, path: &Path) -> Result<String>;

    async fn write_file(&self, path: &Path, content: &str) -> Result<()>;

    async fn stat_file(&self, path: &Path) -> Result<FileStat>;
}

#[async_trait]
pub trait BackupService: Send + Sync {
    async fn create_backup(&self, path: &Path, dest_dir: &Path, max_count: usize)
    -> Result<BackupInfo>;
}
