// file: src/utils/mod.rs
// description: utility functions module exports
// reference: internal module structure

pub mod checksum;
pub mod logging;
pub mod telemetry;
pub mod validation;

pub use checksum::{rolling_hash, sha256_hex, to_base36};
pub use telemetry::OperationTimer;
pub use validation::{ValidationReport, Validator};
