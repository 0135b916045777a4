// file: src/reconcile/status.rs
// description: user-facing sync status with conflict locking and check gating
// reference: https://docs.rs/tokio/latest/tokio/time

use crate::config::AppConfig;
use crate::error::{Result, SyncError};
use crate::models::VersionCompareResult;
use crate::reconcile::engine::{CheckEligibility, ReconciliationEngine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Unknown,
    Checking,
    Synced,
    Conflict,
}

impl SyncStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SyncStatus::Unknown => "unknown",
            SyncStatus::Checking => "checking",
            SyncStatus::Synced => "synced",
            SyncStatus::Conflict => "conflict",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotConfigured,
    AutoDisabled,
    Locked,
    RecentEdit,
    ManualInFlight,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AutoCheckOutcome {
    Skipped(SkipReason),
    NothingToCompare,
    Synced,
    Conflict(VersionCompareResult),
    /// The check failed; status fell back to unknown.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ManualCheckOutcome {
    NothingToCompare,
    Synced(VersionCompareResult),
    Conflict(VersionCompareResult),
}

#[derive(Debug, Clone)]
pub struct StatusOptions {
    pub edit_grace: Duration,
    pub conflict_lock: Duration,
    pub manual_check_timeout: Duration,
}

impl StatusOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            edit_grace: config.sync.edit_grace(),
            conflict_lock: config.sync.conflict_lock(),
            manual_check_timeout: config.sync.manual_check_timeout(),
        }
    }
}

impl Default for StatusOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default_config())
    }
}

pub type StatusListener = Arc<dyn Fn(SyncStatus) + Send + Sync>;

struct ControllerState {
    status: SyncStatus,
    locked: bool,
    lock_generation: u64,
    lock_timer: Option<JoinHandle<()>>,
    last_local_edit: Option<Instant>,
    last_result: Option<VersionCompareResult>,
}

impl ControllerState {
    fn cancel_lock(&mut self) {
        if let Some(timer) = self.lock_timer.take() {
            timer.abort();
        }
        self.locked = false;
        self.lock_generation += 1;
    }
}

/// Clears the in-flight flag when a manual check ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct StatusController {
    options: StatusOptions,
    state: Arc<Mutex<ControllerState>>,
    manual_in_flight: AtomicBool,
    listener: Option<StatusListener>,
}

fn lock(state: &Mutex<ControllerState>) -> MutexGuard<'_, ControllerState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

impl StatusController {
    pub fn new(options: StatusOptions) -> Self {
        Self {
            options,
            state: Arc::new(Mutex::new(ControllerState {
                status: SyncStatus::Unknown,
                locked: false,
                lock_generation: 0,
                lock_timer: None,
                last_local_edit: None,
                last_result: None,
            })),
            manual_in_flight: AtomicBool::new(false),
            listener: None,
        }
    }

    pub fn with_listener(mut self, listener: StatusListener) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn status(&self) -> SyncStatus {
        lock(&self.state).status
    }

    pub fn is_locked(&self) -> bool {
        lock(&self.state).locked
    }

    pub fn last_result(&self) -> Option<VersionCompareResult> {
        lock(&self.state).last_result.clone()
    }

    fn notify(&self, previous: SyncStatus, current: SyncStatus) {
        if previous != current {
            debug!("Sync status {} -> {}", previous, current);
            if let Some(listener) = &self.listener {
                listener(current);
            }
        }
    }

    /// Arm the lock timer, replacing any pending one. Caller holds the state lock.
    fn arm_lock(&self, state: &mut ControllerState, duration: Duration) {
        state.cancel_lock();
        state.locked = true;
        let generation = state.lock_generation;
        let shared = Arc::clone(&self.state);
        state.lock_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let mut state = lock(&shared);
            if state.lock_generation == generation {
                state.locked = false;
                state.lock_timer = None;
                debug!("Status lock expired");
            }
        }));
    }

    /// Soft status change. Ignored while a lock is held.
    pub fn set_status(&self, status: SyncStatus, lock_for: Option<Duration>) -> bool {
        let previous = {
            let mut state = lock(&self.state);
            if state.locked {
                debug!("Status locked, ignoring change to {}", status);
                return false;
            }
            let previous = state.status;
            state.status = status;
            if let Some(duration) = lock_for {
                self.arm_lock(&mut state, duration);
            }
            previous
        };
        self.notify(previous, status);
        true
    }

    /// Apply regardless of any lock, cancelling it.
    pub fn force_set_status(&self, status: SyncStatus) {
        let previous = {
            let mut state = lock(&self.state);
            state.cancel_lock();
            std::mem::replace(&mut state.status, status)
        };
        self.notify(previous, status);
    }

    fn force_and_lock(&self, status: SyncStatus, duration: Duration) {
        let previous = {
            let mut state = lock(&self.state);
            self.arm_lock(&mut state, duration);
            std::mem::replace(&mut state.status, status)
        };
        self.notify(previous, status);
    }

    pub fn note_local_edit(&self) {
        lock(&self.state).last_local_edit = Some(Instant::now());
    }

    fn skip_reason(&self) -> Option<SkipReason> {
        if self.manual_in_flight.load(Ordering::Acquire) {
            return Some(SkipReason::ManualInFlight);
        }
        let state = lock(&self.state);
        if state.locked {
            return Some(SkipReason::Locked);
        }
        if state
            .last_local_edit
            .is_some_and(|at| at.elapsed() < self.options.edit_grace)
        {
            return Some(SkipReason::RecentEdit);
        }
        None
    }

    /// Background check. Never fails; problems end in `unknown`.
    pub async fn auto_check(&self, engine: &ReconciliationEngine) -> AutoCheckOutcome {
        if let Some(reason) = self.skip_reason() {
            debug!("Auto check skipped: {:?}", reason);
            return AutoCheckOutcome::Skipped(reason);
        }

        match engine.check_eligibility().await {
            Ok(CheckEligibility::Ready) => {}
            Ok(CheckEligibility::NotConfigured) => {
                return AutoCheckOutcome::Skipped(SkipReason::NotConfigured);
            }
            Ok(CheckEligibility::AutoDisabled) => {
                return AutoCheckOutcome::Skipped(SkipReason::AutoDisabled);
            }
            Err(e) => {
                warn!("Could not read sync settings: {}", e);
                self.set_status(SyncStatus::Unknown, None);
                return AutoCheckOutcome::Failed(e.user_message());
            }
        }

        self.set_status(SyncStatus::Checking, None);
        match engine.compare_versions().await {
            Ok(Some(result)) if result.has_conflict => {
                self.set_status(SyncStatus::Conflict, Some(self.options.conflict_lock));
                lock(&self.state).last_result = Some(result.clone());
                AutoCheckOutcome::Conflict(result)
            }
            Ok(Some(result)) => {
                self.set_status(SyncStatus::Synced, None);
                lock(&self.state).last_result = Some(result);
                AutoCheckOutcome::Synced
            }
            Ok(None) => {
                self.set_status(SyncStatus::Unknown, None);
                AutoCheckOutcome::NothingToCompare
            }
            Err(e) => {
                warn!("Auto check failed: {}", e.user_message());
                self.set_status(SyncStatus::Unknown, None);
                AutoCheckOutcome::Failed(e.user_message())
            }
        }
    }

    /// User-initiated check, bounded by the manual timeout.
    pub async fn manual_check(&self, engine: &ReconciliationEngine) -> Result<ManualCheckOutcome> {
        let _guard =
            InFlightGuard::acquire(&self.manual_in_flight).ok_or(SyncError::CheckInProgress)?;

        self.force_set_status(SyncStatus::Checking);
        let after = self.options.manual_check_timeout;
        let outcome = match tokio::time::timeout(after, engine.compare_versions()).await {
            Err(_) => {
                warn!("Manual check timed out after {:.1}s", after.as_secs_f64());
                self.force_set_status(SyncStatus::Unknown);
                return Err(SyncError::Timeout {
                    operation: "manual version check",
                    after,
                });
            }
            Ok(Err(e)) => {
                self.force_set_status(SyncStatus::Unknown);
                return Err(e);
            }
            Ok(Ok(None)) => {
                self.force_set_status(SyncStatus::Unknown);
                ManualCheckOutcome::NothingToCompare
            }
            Ok(Ok(Some(result))) if result.has_conflict => {
                self.force_and_lock(SyncStatus::Conflict, self.options.conflict_lock);
                ManualCheckOutcome::Conflict(result)
            }
            Ok(Ok(Some(result))) => {
                self.force_set_status(SyncStatus::Synced);
                ManualCheckOutcome::Synced(result)
            }
        };

        if let ManualCheckOutcome::Synced(result) | ManualCheckOutcome::Conflict(result) = &outcome
        {
            lock(&self.state).last_result = Some(result.clone());
        }
        info!("Manual check finished: {}", self.status());
        Ok(outcome)
    }

    pub fn conflict_resolved(&self, success: bool) {
        self.force_set_status(if success {
            SyncStatus::Synced
        } else {
            SyncStatus::Conflict
        });
        lock(&self.state).last_result = None;
    }

    /// The cache changed locally; with a path configured the two sides now differ.
    pub fn notify_data_changed(&self, configured: bool) -> bool {
        configured && self.set_status(SyncStatus::Conflict, None)
    }

    pub fn display(&self, configured: bool) -> String {
        if configured {
            self.status().label().to_string()
        } else {
            "not configured".to_string()
        }
    }
}

impl Drop for StatusController {
    fn drop(&mut self) {
        if let Some(timer) = lock(&self.state).lock_timer.take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exporter::markup::render_catalog;
    use crate::models::{Book, BookField, RecordSet};
    use crate::reconcile::engine::SyncOptions;
    use crate::storage::{MemoryBackupService, MemoryCatalogStore, MemoryFileAccess};
    use std::path::{Path, PathBuf};

    const PAGE: &str = "/blog/source/books/index.md";

    fn controller() -> StatusController {
        StatusController::new(StatusOptions {
            edit_grace: Duration::from_secs(3),
            conflict_lock: Duration::from_secs(30),
            manual_check_timeout: Duration::from_secs(15),
        })
    }

    async fn engine(cache: &str, file: &str) -> (ReconciliationEngine, Arc<MemoryFileAccess>) {
        let book = |d: &str| Book::new("我与地坛", "史铁生").with_field(BookField::Description, d);
        let store = Arc::new(MemoryCatalogStore::with_records(RecordSet::new(vec![book(cache)])));
        let files = Arc::new(MemoryFileAccess::new());
        files.insert(PAGE, render_catalog(&[book(file)], None));
        let backup = Arc::new(MemoryBackupService::new(files.clone()));
        let options = SyncOptions {
            read_timeout: Duration::from_secs(120),
            backup_enabled: false,
            backup_dir: None::<PathBuf>,
            max_backups: 3,
        };
        let engine = ReconciliationEngine::new(store, files.clone(), backup, options);
        engine.set_external_path(Path::new(PAGE)).await.unwrap();
        (engine, files)
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_blocks_soft_sets_until_expiry() {
        let controller = controller();
        assert!(controller.set_status(SyncStatus::Conflict, Some(Duration::from_secs(30))));
        assert!(!controller.set_status(SyncStatus::Synced, None));
        assert_eq!(controller.status(), SyncStatus::Conflict);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(!controller.is_locked());
        assert!(controller.set_status(SyncStatus::Synced, None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearming_replaces_pending_timer() {
        let controller = controller();
        controller.set_status(SyncStatus::Conflict, Some(Duration::from_secs(10)));
        controller.force_set_status(SyncStatus::Conflict);
        controller.set_status(SyncStatus::Conflict, Some(Duration::from_secs(60)));

        // the first timer would have fired here
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(controller.is_locked());

        tokio::time::sleep(Duration::from_secs(41)).await;
        assert!(!controller.is_locked());
    }

    #[tokio::test]
    async fn test_force_clears_lock() {
        let controller = controller();
        controller.set_status(SyncStatus::Conflict, Some(Duration::from_secs(30)));
        controller.force_set_status(SyncStatus::Synced);
        assert!(!controller.is_locked());
        assert_eq!(controller.status(), SyncStatus::Synced);
    }

    #[tokio::test]
    async fn test_listener_sees_changes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let controller = controller().with_listener(Arc::new(move |status| {
            sink.lock().unwrap().push(status);
        }));

        controller.set_status(SyncStatus::Checking, None);
        controller.set_status(SyncStatus::Checking, None);
        controller.force_set_status(SyncStatus::Synced);
        assert_eq!(*seen.lock().unwrap(), vec![SyncStatus::Checking, SyncStatus::Synced]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_check_respects_edit_grace() {
        let controller = controller();
        let (engine, _) = engine("A", "A").await;

        controller.note_local_edit();
        assert_eq!(
            controller.auto_check(&engine).await,
            AutoCheckOutcome::Skipped(SkipReason::RecentEdit)
        );

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(controller.auto_check(&engine).await, AutoCheckOutcome::Synced);
        assert_eq!(controller.status(), SyncStatus::Synced);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_check_conflict_locks() {
        let controller = controller();
        let (engine, _) = engine("B", "A").await;

        let outcome = controller.auto_check(&engine).await;
        assert!(matches!(outcome, AutoCheckOutcome::Conflict(_)));
        assert!(controller.is_locked());
        assert!(controller.last_result().is_some());
        assert_eq!(
            controller.auto_check(&engine).await,
            AutoCheckOutcome::Skipped(SkipReason::Locked)
        );
    }

    #[tokio::test]
    async fn test_auto_check_skips_when_disabled() {
        let controller = controller();
        let (engine, _) = engine("A", "A").await;
        engine.set_auto_version_check(false).await.unwrap();
        assert_eq!(
            controller.auto_check(&engine).await,
            AutoCheckOutcome::Skipped(SkipReason::AutoDisabled)
        );
        engine.clear_sync_config().await.unwrap();
        assert_eq!(
            controller.auto_check(&engine).await,
            AutoCheckOutcome::Skipped(SkipReason::NotConfigured)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_check_times_out_and_resets() {
        let controller = controller();
        let (engine, files) = engine("A", "A").await;
        files.delay_reads(Some(Duration::from_secs(60)));

        let err = controller.manual_check(&engine).await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(controller.status(), SyncStatus::Unknown);

        // the flag was released
        files.delay_reads(None);
        assert!(matches!(
            controller.manual_check(&engine).await,
            Ok(ManualCheckOutcome::Synced(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_check_rejects_reentry() {
        let controller = controller();
        let (engine, files) = engine("A", "A").await;
        files.delay_reads(Some(Duration::from_secs(5)));

        let (first, second) =
            tokio::join!(controller.manual_check(&engine), controller.manual_check(&engine));
        assert!(first.is_ok());
        assert!(matches!(second, Err(SyncError::CheckInProgress)));
    }

    #[tokio::test]
    async fn test_resolution_and_display() {
        let controller = controller();
        assert_eq!(controller.display(false), "not configured");
        assert_eq!(controller.display(true), "unknown");

        assert!(controller.notify_data_changed(true));
        assert_eq!(controller.status(), SyncStatus::Conflict);
        assert!(!controller.notify_data_changed(false));

        controller.conflict_resolved(true);
        assert_eq!(controller.display(true), "synced");
        assert!(controller.last_result().is_none());
    }
}
