// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod config;
pub mod error;
pub mod exporter;
pub mod models;
pub mod parser;
pub mod reconcile;
pub mod storage;
pub mod utils;

pub use config::{AppConfig, BackupConfig, StorageConfig, SyncSettings};
pub use error::{Result, SyncError};
pub use exporter::{ExportEnvelope, JsonExporter, render_book, render_catalog};
pub use models::{
    Book, BookField, ConflictType, ContentDifference, DifferenceKind, FileStructure, RecordSet,
    SyncConfig, VersionCompareResult,
};
pub use parser::{CatalogParser, ParsedCatalog, StrategyKind};
pub use reconcile::{
    AutoCheckOutcome, ConflictResolution, DataLossReport, EngineState, ManualCheckOutcome,
    ReconciliationEngine, RecoveryOption, StatusController, StatusOptions, SyncOptions,
    SyncStatus, fingerprint,
};
pub use storage::{
    BackupService, CatalogStore, FileAccess, FsBackupService, JsonCatalogStore,
    MemoryBackupService, MemoryCatalogStore, MemoryFileAccess, NativeFileAccess,
};
pub use utils::{OperationTimer, Validator};
