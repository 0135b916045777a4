// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod book;
pub mod difference;
pub mod structure;
pub mod sync_config;

pub use book::{Book, BookField, assign_sort_order, normalize_field};
pub use difference::{ConflictType, ContentDifference, DifferenceKind, VersionCompareResult};
pub use structure::{CONTAINER_CLOSE, CONTAINER_OPEN, FileStructure};
pub use sync_config::{CurrentFile, RecordSet, SyncConfig};
