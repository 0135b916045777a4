// file: src/storage/fs.rs
// description: filesystem-backed cache store, file access and backup rotation
// reference: https://docs.rs/tokio/latest/tokio/fs

use super::{BackupInfo, BackupService, CatalogStore, FileAccess, FileStat};
use crate::error::{Result, SyncError};
use crate::models::{RecordSet, SyncConfig};
use crate::utils::checksum::sha256_hex;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const RECORDS_FILE: &str = "books.json";
const SYNC_CONFIG_FILE: &str = "sync.json";
const SNAPSHOT_DIR: &str = "backups";
const BACKUP_MARKER: &str = ".backup.";

fn snapshot_prefix() -> String {
    format!("books{}", BACKUP_MARKER)
}

fn timestamp_slug(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}

/// Files in `dir` (not recursive) whose name starts with `prefix`, oldest first.
fn list_marked_files(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let mut entries: Vec<(std::time::SystemTime, PathBuf)> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix))
        .filter_map(|entry| {
            let modified = entry.metadata().ok()?.modified().ok()?;
            Some((modified, entry.into_path()))
        })
        .collect();

    // names embed a timestamp, so they break mtime ties
    entries.sort();
    entries.into_iter().map(|(_, path)| path).collect()
}

/// Delete the oldest files named `prefix*` until at most `keep` remain.
fn rotate(dir: &Path, prefix: &str, keep: usize) -> usize {
    let files = list_marked_files(dir, prefix);
    let excess = files.len().saturating_sub(keep);
    let mut removed = 0;
    for path in files.into_iter().take(excess) {
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed old backup {}", path.display());
                removed += 1;
            }
            Err(e) => warn!("Failed to remove old backup {}: {}", path.display(), e),
        }
    }
    removed
}

/// JSON files under a data directory.
pub struct JsonCatalogStore {
    data_dir: PathBuf,
    snapshot_limit: usize,
}

impl JsonCatalogStore {
    pub fn new(data_dir: impl Into<PathBuf>, snapshot_limit: usize) -> Self {
        Self {
            data_dir: data_dir.into(),
            snapshot_limit,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn records_path(&self) -> PathBuf {
        self.data_dir.join(RECORDS_FILE)
    }

    fn sync_config_path(&self) -> PathBuf {
        self.data_dir.join(SYNC_CONFIG_FILE)
    }

    fn snapshot_dir(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_DIR)
    }

    async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        let contents = match fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No stored file at {}", path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(SyncError::Storage(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Write through a temporary file and rename, so readers never see half a file.
    async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        fs::create_dir_all(&self.data_dir).await.map_err(|e| {
            SyncError::Storage(format!(
                "Failed to create data directory {}: {}",
                self.data_dir.display(),
                e
            ))
        })?;

        let contents = serde_json::to_string_pretty(value)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents)
            .await
            .map_err(|e| SyncError::Storage(format!("Failed to write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, path).await.map_err(|e| {
            SyncError::Storage(format!("Failed to replace {}: {}", path.display(), e))
        })?;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for JsonCatalogStore {
    async fn load_records(&self) -> Result<RecordSet> {
        Ok(Self::read_json(&self.records_path()).await?.unwrap_or_default())
    }

    async fn save_records(&self, records: &RecordSet) -> Result<()> {
        let mut records = records.clone();
        records.saved_at = Some(Utc::now());
        self.write_json(&self.records_path(), &records).await?;
        debug!("Saved {} books to {}", records.books.len(), self.records_path().display());
        Ok(())
    }

    async fn backup_records(&self) -> Result<()> {
        let source = self.records_path();
        if fs::metadata(&source).await.is_err() {
            debug!("Nothing to snapshot yet");
            return Ok(());
        }

        let dir = self.snapshot_dir();
        fs::create_dir_all(&dir).await.map_err(|e| {
            SyncError::Storage(format!("Failed to create {}: {}", dir.display(), e))
        })?;

        let target = dir.join(format!("{}{}.json", snapshot_prefix(), timestamp_slug(Utc::now())));
        fs::copy(&source, &target).await.map_err(|e| {
            SyncError::Storage(format!("Failed to snapshot cache to {}: {}", target.display(), e))
        })?;

        let limit = self.snapshot_limit.max(1);
        let removed = tokio::task::spawn_blocking(move || rotate(&dir, &snapshot_prefix(), limit))
            .await
            .map_err(|e| SyncError::Storage(format!("Snapshot rotation failed: {}", e)))?;
        debug!("Cache snapshot {} written, {} rotated out", target.display(), removed);
        Ok(())
    }

    async fn latest_backup(&self) -> Result<Option<RecordSet>> {
        let dir = self.snapshot_dir();
        let latest = tokio::task::spawn_blocking(move || list_marked_files(&dir, &snapshot_prefix()).pop())
            .await
            .map_err(|e| SyncError::Storage(format!("Snapshot listing failed: {}", e)))?;

        match latest {
            Some(path) => Self::read_json(&path).await,
            None => Ok(None),
        }
    }

    async fn load_sync_config(&self) -> Result<Option<SyncConfig>> {
        Self::read_json(&self.sync_config_path()).await
    }

    async fn save_sync_config(&self, config: &SyncConfig) -> Result<()> {
        self.write_json(&self.sync_config_path(), config).await
    }
}

/// `tokio::fs` access to the external file.
#[derive(Debug, Default, Clone)]
pub struct NativeFileAccess;

impl NativeFileAccess {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileAccess for NativeFileAccess {
    async fn read_file(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path)
            .await
            .map_err(|e| SyncError::from_io(path, e))
    }

    async fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        fs::write(path, content)
            .await
            .map_err(|e| SyncError::from_io(path, e))
    }

    async fn stat_file(&self, path: &Path) -> Result<FileStat> {
        match fs::metadata(path).await {
            Ok(metadata) => Ok(FileStat {
                exists: metadata.is_file(),
                size: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(FileStat::missing()),
            Err(e) => Err(SyncError::from_io(path, e)),
        }
    }
}

/// Copies the external file into a backup folder as `{stem}.backup.{timestamp}{ext}`.
#[derive(Debug, Default, Clone)]
pub struct FsBackupService;

impl FsBackupService {
    pub fn new() -> Self {
        Self
    }

    /// `{stem}.backup.`, shared by every backup of `path` and no other file's.
    pub fn backup_prefix(path: &Path) -> String {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "catalog".to_string());
        format!("{}{}", stem, BACKUP_MARKER)
    }

    pub fn backup_name(path: &Path, at: DateTime<Utc>) -> String {
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        format!("{}{}{}", Self::backup_prefix(path), timestamp_slug(at), ext)
    }
}

#[async_trait]
impl BackupService for FsBackupService {
    async fn create_backup(
        &self,
        path: &Path,
        dest_dir: &Path,
        max_count: usize,
    ) -> Result<BackupInfo> {
        match fs::metadata(dest_dir).await {
            Ok(metadata) if metadata.is_dir() => {}
            _ => {
                return Err(SyncError::Backup(format!(
                    "backup folder {} does not exist",
                    dest_dir.display()
                )));
            }
        }

        let created_at = Utc::now();
        let backup_path = dest_dir.join(Self::backup_name(path, created_at));
        fs::copy(path, &backup_path).await.map_err(|e| {
            SyncError::Backup(format!(
                "failed to copy {} to {}: {}",
                path.display(),
                backup_path.display(),
                e
            ))
        })?;

        let bytes = fs::read(&backup_path).await.map_err(|e| {
            SyncError::Backup(format!("failed to read back {}: {}", backup_path.display(), e))
        })?;
        let checksum = sha256_hex(&bytes);

        if max_count > 0 {
            let dir = dest_dir.to_path_buf();
            let prefix = Self::backup_prefix(path);
            match tokio::task::spawn_blocking(move || rotate(&dir, &prefix, max_count)).await {
                Ok(removed) if removed > 0 => debug!("Rotated out {} old backups", removed),
                Ok(_) => {}
                Err(e) => warn!("Backup rotation failed: {}", e),
            }
        }

        info!("Backed up {} to {}", path.display(), backup_path.display());
        Ok(BackupInfo {
            original_path: path.to_path_buf(),
            backup_path,
            created_at,
            size: bytes.len() as u64,
            checksum,
        })
    }
}
