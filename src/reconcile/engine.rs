// file: src/reconcile/engine.rs
// description: compare, resolve and persist between the cache and the external file
// reference: internal reconciliation rules

use crate::config::AppConfig;
use crate::error::{Result, SyncError};
use crate::exporter::markup::render_catalog;
use crate::models::{
    Book, ConflictType, CurrentFile, RecordSet, SyncConfig, VersionCompareResult, assign_sort_order,
};
use crate::parser::{CatalogParser, generate_id, has_book_signals};
use crate::reconcile::diff::{compare_all_content, compare_structure, validation_warnings};
use crate::reconcile::fingerprint::fingerprint;
use crate::storage::{BackupService, CatalogStore, FileAccess};
use crate::utils::telemetry::OperationTimer;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

const SLOW_OPERATION: Duration = Duration::from_secs(2);

/// Per-attempt state. `Failed` goes back to `Idle` on the next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Idle,
    Checking,
    Synced,
    Conflict,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResolution {
    /// Overwrite the external file with the cache.
    UseCache { create_backup: bool },
    /// Replace the cache with the external file.
    UseExternal,
    Abort,
}

/// Whether automatic checks should run at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckEligibility {
    NotConfigured,
    AutoDisabled,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryOption {
    RestoreFromBackup,
    PullFromExternal,
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataLossReport {
    pub has_data_loss: bool,
    pub recovery_options: Vec<RecoveryOption>,
    pub backup_books: usize,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub read_timeout: Duration,
    pub backup_enabled: bool,
    pub backup_dir: Option<PathBuf>,
    pub max_backups: usize,
}

impl SyncOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            read_timeout: config.sync.read_timeout(),
            backup_enabled: config.backup.enabled,
            backup_dir: config.backup.folder_path.clone(),
            max_backups: config.backup.max_backups,
        }
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default_config())
    }
}

pub struct ReconciliationEngine {
    store: Arc<dyn CatalogStore>,
    files: Arc<dyn FileAccess>,
    backup: Arc<dyn BackupService>,
    options: SyncOptions,
    parser: CatalogParser,
    state: Mutex<EngineState>,
}

impl ReconciliationEngine {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        files: Arc<dyn FileAccess>,
        backup: Arc<dyn BackupService>,
        options: SyncOptions,
    ) -> Self {
        Self {
            store,
            files,
            backup,
            options,
            parser: CatalogParser::new(),
            state: Mutex::new(EngineState::Idle),
        }
    }

    pub fn state(&self) -> EngineState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: EngineState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    // ---- sync configuration ----

    pub async fn sync_config(&self) -> Result<Option<SyncConfig>> {
        self.store.load_sync_config().await
    }

    pub async fn save_sync_config(&self, config: &SyncConfig) -> Result<()> {
        self.store.save_sync_config(config).await
    }

    /// Configured external path, if any.
    pub async fn external_path(&self) -> Result<Option<PathBuf>> {
        Ok(self
            .store
            .load_sync_config()
            .await?
            .filter(SyncConfig::is_configured)
            .map(|config| config.external_file_path))
    }

    /// Forget the external file. Cached records are kept.
    pub async fn clear_sync_config(&self) -> Result<()> {
        self.store.save_sync_config(&SyncConfig::new("")).await
    }

    pub async fn reset(&self) -> Result<()> {
        self.clear_sync_config().await?;
        self.set_state(EngineState::Idle);
        info!("Sync state reset");
        Ok(())
    }

    pub async fn is_first_time_user(&self) -> Result<bool> {
        Ok(self.external_path().await?.is_none())
    }

    /// Point the engine at an existing external file.
    pub async fn set_external_path(&self, path: &Path) -> Result<SyncConfig> {
        let stat = self.files.stat_file(path).await?;
        if !stat.exists {
            return Err(SyncError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let config = SyncConfig {
            external_file_path: path.to_path_buf(),
            last_sync_time: Some(Utc::now()),
            cache_version: self.current_fingerprint().await?,
            auto_version_check: true,
        };
        self.store.save_sync_config(&config).await?;
        info!("External catalog set to {}", path.display());
        Ok(config)
    }

    pub async fn set_auto_version_check(&self, enabled: bool) -> Result<()> {
        let mut config = self
            .store
            .load_sync_config()
            .await?
            .unwrap_or_else(|| SyncConfig::new(""));
        config.auto_version_check = enabled;
        self.store.save_sync_config(&config).await
    }

    pub async fn check_eligibility(&self) -> Result<CheckEligibility> {
        Ok(match self.store.load_sync_config().await? {
            Some(config) if !config.is_configured() => CheckEligibility::NotConfigured,
            None => CheckEligibility::NotConfigured,
            Some(config) if !config.auto_version_check => CheckEligibility::AutoDisabled,
            Some(_) => CheckEligibility::Ready,
        })
    }

    pub async fn current_fingerprint(&self) -> Result<String> {
        let records = self.store.load_records().await?;
        Ok(fingerprint(
            &records.ordered_books(),
            records.original_file_structure.as_ref(),
        ))
    }

    // ---- comparison ----

    async fn read_external(&self, path: &Path) -> Result<String> {
        let after = self.options.read_timeout;
        tokio::time::timeout(after, self.files.read_file(path))
            .await
            .map_err(|_| SyncError::Timeout {
                operation: "read catalog file",
                after,
            })?
    }

    /// Compare the cache with the external file.
    ///
    /// `Ok(None)` means there is nothing to compare: no path configured, the
    /// file is missing, or it is empty.
    pub async fn compare_versions(&self) -> Result<Option<VersionCompareResult>> {
        self.set_state(EngineState::Checking);
        let result = self.compare_inner().await;
        self.set_state(match &result {
            Ok(Some(r)) if r.has_conflict => EngineState::Conflict,
            Ok(Some(_)) => EngineState::Synced,
            Ok(None) => EngineState::Idle,
            Err(_) => EngineState::Failed,
        });
        result
    }

    async fn compare_inner(&self) -> Result<Option<VersionCompareResult>> {
        let timer = OperationTimer::new("compare versions");

        let Some(path) = self.external_path().await? else {
            debug!("No external file configured, nothing to compare");
            return Ok(None);
        };

        let stat = self.files.stat_file(&path).await?;
        if !stat.exists {
            warn!("External file {} does not exist", path.display());
            return Ok(None);
        }

        let records = self.store.load_records().await?;
        let cache_books = records.ordered_books();
        let cache_structure = records.original_file_structure.as_ref();

        let content = self.read_external(&path).await?;
        if content.trim().is_empty() {
            warn!("External file {} is empty", path.display());
            return Ok(None);
        }
        timer.checkpoint("read external file");

        let parsed = self.parser.parse(&content, &cache_books);
        for problem in parsed.validate(&content) {
            warn!("Parse result: {}", problem);
        }

        let cache_fingerprint = fingerprint(&cache_books, cache_structure);
        let external_fingerprint = fingerprint(&parsed.books, Some(&parsed.structure));
        debug!(
            "Fingerprints: cache {} / external {}",
            cache_fingerprint, external_fingerprint
        );

        let differences = if cache_fingerprint == external_fingerprint {
            let mut differences = validation_warnings(&cache_books, &parsed.books);
            differences.extend(compare_structure(cache_structure, Some(&parsed.structure)));
            differences
        } else {
            compare_all_content(
                &cache_books,
                &parsed.books,
                cache_structure,
                Some(&parsed.structure),
            )
        };

        let has_conflict = differences.iter().any(|d| d.is_conflicting());
        if has_conflict {
            info!(
                "Cache and {} diverge: {} differences",
                path.display(),
                differences.iter().filter(|d| d.is_conflicting()).count()
            );
        }

        timer.warn_if_slow(SLOW_OPERATION);
        timer.finish();

        Ok(Some(VersionCompareResult {
            has_conflict,
            cache_books_count: cache_books.len(),
            external_books_count: parsed.books.len(),
            cache_modified_at: records.saved_at.unwrap_or_else(Utc::now),
            external_modified_at: stat.modified,
            cache_fingerprint,
            external_fingerprint,
            differences,
            conflict_type: if has_conflict {
                ConflictType::Content
            } else {
                ConflictType::None
            },
        }))
    }

    // ---- resolution ----

    async fn record_sync(&self, cache_version: String) -> Result<()> {
        let mut config = self
            .store
            .load_sync_config()
            .await?
            .ok_or(SyncError::NotConfigured)?;
        config.cache_version = cache_version;
        config.last_sync_time = Some(Utc::now());
        self.store.save_sync_config(&config).await
    }

    /// Replace the cache with the records parsed from the external file.
    pub async fn sync_from_external(&self) -> Result<Vec<Book>> {
        let timer = OperationTimer::new("sync from external file");
        let path = self.external_path().await?.ok_or(SyncError::NotConfigured)?;

        if !self.files.stat_file(&path).await?.exists {
            return Err(SyncError::FileNotFound { path });
        }

        let content = self.read_external(&path).await?;
        if content.trim().is_empty() {
            return Err(SyncError::EmptyFile { path });
        }

        let current = self.store.load_records().await?;
        let parsed = self.parser.parse(&content, &current.books);
        if parsed.books.is_empty() {
            if has_book_signals(&content) {
                return Err(SyncError::ParseFailed { path });
            }
            info!("External file holds no books, cache left untouched");
            return Ok(Vec::new());
        }

        let mut books = parsed.books;
        assign_sort_order(&mut books);

        if let Err(e) = self.store.backup_records().await {
            warn!("Could not snapshot the cache before replacing it: {}", e);
        }

        let records = RecordSet {
            original_file_order: books.iter().map(|b| b.id.clone()).collect(),
            books: books.clone(),
            original_file_structure: Some(parsed.structure),
            current_file: Some(CurrentFile::from_path(&path)),
            saved_at: None,
        };
        self.store.save_records(&records).await?;

        let version = fingerprint(&records.books, records.original_file_structure.as_ref());
        self.record_sync(version).await?;

        timer.finish_with_count(books.len());
        Ok(books)
    }

    async fn backup_external(&self, path: &Path) {
        if !self.options.backup_enabled {
            return;
        }
        let Some(dir) = self.options.backup_dir.as_deref() else {
            warn!("No backup folder configured, writing without a backup");
            return;
        };
        match self
            .backup
            .create_backup(path, dir, self.options.max_backups)
            .await
        {
            Ok(info) => info!("Backup written to {}", info.backup_path.display()),
            Err(e) => warn!("Backup failed, continuing: {}", e),
        }
    }

    /// Overwrite the external file with the cache.
    ///
    /// Returns `Ok(false)` when there is nothing to write. Write failures are
    /// classified errors; a verification mismatch is only a warning.
    pub async fn sync_to_external(&self, create_backup: bool) -> Result<bool> {
        let timer = OperationTimer::new("sync to external file");
        let Some(path) = self.external_path().await? else {
            warn!("No external file configured");
            return Ok(false);
        };

        if create_backup {
            self.backup_external(&path).await;
        }

        let records = self.store.load_records().await?;
        if records.is_empty() {
            warn!("Cache holds no books, refusing to write an empty catalog");
            return Ok(false);
        }

        let structure = records.original_file_structure.as_ref();
        if let Some(structure) = structure {
            for problem in structure.validate() {
                warn!("Stored file structure: {}", problem);
            }
        }

        let books = records.ordered_books();
        let rendered = render_catalog(&books, structure);
        if rendered.trim().is_empty() {
            error!("Rendered catalog is empty");
            return Ok(false);
        }

        self.files.write_file(&path, &rendered).await?;
        info!("Wrote {} books to {}", books.len(), path.display());

        match self.read_external(&path).await {
            Ok(written) if written == rendered => debug!("Write verified"),
            Ok(written) => warn!(
                "Written file differs from what was rendered ({} vs {} bytes)",
                written.len(),
                rendered.len()
            ),
            Err(e) => warn!("Could not verify the written file: {}", e),
        }

        self.record_sync(fingerprint(&books, structure)).await?;
        timer.finish_with_count(books.len());
        Ok(true)
    }

    /// Apply a user decision. Failures are logged and reported as `false`.
    pub async fn resolve_conflict(&self, resolution: ConflictResolution) -> bool {
        let outcome = match resolution {
            ConflictResolution::UseExternal => {
                self.sync_from_external().await.map(|books| !books.is_empty())
            }
            ConflictResolution::UseCache { create_backup } => {
                self.sync_to_external(create_backup).await
            }
            ConflictResolution::Abort => {
                info!("Conflict resolution aborted, nothing changed");
                return false;
            }
        };

        match outcome {
            Ok(done) => {
                if done {
                    self.set_state(EngineState::Synced);
                }
                done
            }
            Err(e) => {
                error!("Conflict resolution failed: {}", e.user_message());
                self.set_state(EngineState::Failed);
                false
            }
        }
    }

    /// Compare and, on conflict, push the cache out.
    pub async fn manual_sync(&self) -> Result<bool> {
        let Some(result) = self.compare_versions().await? else {
            return Ok(false);
        };
        if !result.has_conflict {
            return Ok(true);
        }
        let written = self.sync_to_external(true).await?;
        if written {
            self.set_state(EngineState::Synced);
        }
        Ok(written)
    }

    // ---- recovery and import ----

    pub async fn detect_data_loss(&self) -> Result<DataLossReport> {
        let records = self.store.load_records().await?;
        let configured = self.external_path().await?.is_some();
        if !records.is_empty() || !configured {
            return Ok(DataLossReport {
                has_data_loss: false,
                recovery_options: Vec::new(),
                backup_books: 0,
            });
        }

        let backup_books = self
            .store
            .latest_backup()
            .await?
            .map(|backup| backup.books.len())
            .unwrap_or(0);

        let mut recovery_options = Vec::new();
        if backup_books > 0 {
            recovery_options.push(RecoveryOption::RestoreFromBackup);
        }
        recovery_options.push(RecoveryOption::PullFromExternal);
        recovery_options.push(RecoveryOption::Ignore);

        warn!("Cache is empty while an external file is configured");
        Ok(DataLossReport {
            has_data_loss: true,
            recovery_options,
            backup_books,
        })
    }

    pub async fn recover_data(&self, option: RecoveryOption) -> Result<bool> {
        match option {
            RecoveryOption::Ignore => Ok(true),
            RecoveryOption::PullFromExternal => {
                Ok(!self.sync_from_external().await?.is_empty())
            }
            RecoveryOption::RestoreFromBackup => {
                let Some(backup) = self.store.latest_backup().await? else {
                    warn!("No cache snapshot to restore");
                    return Ok(false);
                };
                if backup.is_empty() {
                    return Ok(false);
                }
                self.store.save_records(&backup).await?;
                info!("Restored {} books from the latest snapshot", backup.books.len());
                Ok(true)
            }
        }
    }

    /// Replace the cached books with an imported list, keeping the stored structure.
    pub async fn import_books(&self, mut books: Vec<Book>) -> Result<usize> {
        for book in books.iter_mut().filter(|b| b.id.trim().is_empty()) {
            book.id = generate_id(&book.title, &book.author);
        }
        assign_sort_order(&mut books);

        if let Err(e) = self.store.backup_records().await {
            warn!("Could not snapshot the cache before import: {}", e);
        }

        let mut records = self.store.load_records().await?;
        records.books = books;
        self.store.save_records(&records).await?;
        info!("Imported {} books", records.books.len());
        Ok(records.books.len())
    }

    /// Cached books in display order.
    pub async fn cached_books(&self) -> Result<RecordSet> {
        self.store.load_records().await
    }
}
