// file: src/storage/memory.rs
// description: in-memory collaborators with failure injection, for tests and file-less environments
// reference: internal test doubles

use super::{BackupInfo, BackupService, CatalogStore, FileAccess, FileStat};
use crate::error::{Result, SyncError};
use crate::models::{RecordSet, SyncConfig};
use crate::utils::checksum::sha256_hex;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
pub struct MemoryCatalogStore {
    records: Mutex<RecordSet>,
    snapshots: Mutex<Vec<RecordSet>>,
    sync_config: Mutex<Option<SyncConfig>>,
    simulate_write_error: AtomicBool,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: RecordSet) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    /// Make every save fail, for exercising error paths.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.store(simulate, Ordering::SeqCst);
    }

    pub fn snapshot_count(&self) -> usize {
        lock(&self.snapshots).len()
    }

    fn check_writable(&self) -> Result<()> {
        if self.simulate_write_error.load(Ordering::SeqCst) {
            return Err(SyncError::Storage("Simulated write error".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn load_records(&self) -> Result<RecordSet> {
        Ok(lock(&self.records).clone())
    }

    async fn save_records(&self, records: &RecordSet) -> Result<()> {
        self.check_writable()?;
        let mut records = records.clone();
        records.saved_at = Some(Utc::now());
        *lock(&self.records) = records;
        Ok(())
    }

    async fn backup_records(&self) -> Result<()> {
        self.check_writable()?;
        let current = lock(&self.records).clone();
        lock(&self.snapshots).push(current);
        Ok(())
    }

    async fn latest_backup(&self) -> Result<Option<RecordSet>> {
        Ok(lock(&self.snapshots).last().cloned())
    }

    async fn load_sync_config(&self) -> Result<Option<SyncConfig>> {
        Ok(lock(&self.sync_config).clone())
    }

    async fn save_sync_config(&self, config: &SyncConfig) -> Result<()> {
        self.check_writable()?;
        *lock(&self.sync_config) = Some(config.clone());
        Ok(())
    }
}

/// Failure a `MemoryFileAccess` can be told to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    PermissionDenied,
    DiskFull,
    TooManyOpenFiles,
    Other,
}

impl InjectedFailure {
    fn into_error(self, path: &Path) -> SyncError {
        let path = path.to_path_buf();
        match self {
            InjectedFailure::PermissionDenied => SyncError::PermissionDenied { path },
            InjectedFailure::DiskFull => SyncError::DiskFull { path },
            InjectedFailure::TooManyOpenFiles => SyncError::TooManyOpenFiles { path },
            InjectedFailure::Other => SyncError::Io {
                path,
                source: std::io::Error::other("injected failure"),
            },
        }
    }
}

#[derive(Debug, Clone)]
struct MemoryFile {
    content: String,
    modified: DateTime<Utc>,
}

/// Files held in a map. With `unavailable()` it behaves like an environment
/// without file access: reads and writes fail and nothing exists.
#[derive(Default)]
pub struct MemoryFileAccess {
    files: Mutex<HashMap<PathBuf, MemoryFile>>,
    read_failure: Mutex<Option<InjectedFailure>>,
    write_failure: Mutex<Option<InjectedFailure>>,
    read_delay: Mutex<Option<Duration>>,
    unavailable: bool,
    writes: AtomicUsize,
}

impl MemoryFileAccess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn insert(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        lock(&self.files).insert(
            path.into(),
            MemoryFile {
                content: content.into(),
                modified: Utc::now(),
            },
        );
    }

    pub fn contents(&self, path: &Path) -> Option<String> {
        lock(&self.files).get(path).map(|file| file.content.clone())
    }

    pub fn fail_reads(&self, failure: Option<InjectedFailure>) {
        *lock(&self.read_failure) = failure;
    }

    pub fn fail_writes(&self, failure: Option<InjectedFailure>) {
        *lock(&self.write_failure) = failure;
    }

    /// Delay every read, e.g. to trip read timeouts under paused time.
    pub fn delay_reads(&self, delay: Option<Duration>) {
        *lock(&self.read_delay) = delay;
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn unavailable_error(&self) -> SyncError {
        SyncError::ApiUnavailable("no file system access in this environment".to_string())
    }
}

#[async_trait]
impl FileAccess for MemoryFileAccess {
    async fn read_file(&self, path: &Path) -> Result<String> {
        if self.unavailable {
            return Err(self.unavailable_error());
        }

        let delay = *lock(&self.read_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(failure) = *lock(&self.read_failure) {
            return Err(failure.into_error(path));
        }

        self.contents(path).ok_or_else(|| SyncError::FileNotFound {
            path: path.to_path_buf(),
        })
    }

    async fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        if self.unavailable {
            return Err(self.unavailable_error());
        }
        if let Some(failure) = *lock(&self.write_failure) {
            return Err(failure.into_error(path));
        }

        self.insert(path, content);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stat_file(&self, path: &Path) -> Result<FileStat> {
        if self.unavailable {
            return Ok(FileStat::missing());
        }

        Ok(match lock(&self.files).get(path) {
            Some(file) => FileStat {
                exists: true,
                size: file.content.len() as u64,
                modified: Some(file.modified),
            },
            None => FileStat::missing(),
        })
    }
}

/// Records backups of files held by a `MemoryFileAccess`.
pub struct MemoryBackupService {
    files: Arc<MemoryFileAccess>,
    backups: Mutex<Vec<BackupInfo>>,
    fail: AtomicBool,
}

impl MemoryBackupService {
    pub fn new(files: Arc<MemoryFileAccess>) -> Self {
        Self {
            files,
            backups: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn backups(&self) -> Vec<BackupInfo> {
        lock(&self.backups).clone()
    }
}

#[async_trait]
impl BackupService for MemoryBackupService {
    async fn create_backup(
        &self,
        path: &Path,
        dest_dir: &Path,
        max_count: usize,
    ) -> Result<BackupInfo> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SyncError::Backup("simulated backup failure".to_string()));
        }

        let content = self.files.contents(path).ok_or_else(|| {
            SyncError::Backup(format!("{} does not exist", path.display()))
        })?;

        let created_at = Utc::now();
        let info = BackupInfo {
            original_path: path.to_path_buf(),
            backup_path: dest_dir.join(super::fs::FsBackupService::backup_name(path, created_at)),
            created_at,
            size: content.len() as u64,
            checksum: sha256_hex(content.as_bytes()),
        };

        let mut backups = lock(&self.backups);
        backups.push(info.clone());
        if max_count > 0 && backups.len() > max_count {
            let excess = backups.len() - max_count;
            backups.drain(..excess);
        }
        Ok(info)
    }
}
