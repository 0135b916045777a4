// file: src/reconcile/mod.rs
// description: version comparison, conflict resolution and status tracking
// reference: internal module structure

pub mod diff;
pub mod engine;
pub mod fingerprint;
pub mod status;

pub use diff::{compare_all_content, compare_books, compare_structure, validation_warnings};
pub use engine::{
    CheckEligibility, ConflictResolution, DataLossReport, EngineState, ReconciliationEngine,
    RecoveryOption, SyncOptions,
};
pub use fingerprint::fingerprint;
pub use status::{
    AutoCheckOutcome, ManualCheckOutcome, SkipReason, StatusController, StatusListener,
    StatusOptions, SyncStatus,
};
