// file: src/error.rs
// description: Custom error types and result type aliases
// reference: https://docs.rs/thiserror

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

const ENOSPC: i32 = 28;
const EMFILE: i32 = 24;
const ENFILE: i32 = 23;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("No external catalog file is configured")]
    NotConfigured,

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("No space left on device while writing {path}")]
    DiskFull { path: PathBuf },

    #[error("Too many open file handles while accessing {path}")]
    TooManyOpenFiles { path: PathBuf },

    #[error("File access unavailable: {0}")]
    ApiUnavailable(String),

    #[error("File operation failed for {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("External catalog file is empty: {path}")]
    EmptyFile { path: PathBuf },

    #[error("External catalog file {path} contains book data but no records could be parsed")]
    ParseFailed { path: PathBuf },

    #[error("{operation} timed out after {}s", .after.as_secs_f64())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("A version check is already in progress")]
    CheckInProgress,

    #[error("Backup failed: {0}")]
    Backup(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Map an I/O failure on `path` onto the classified variants.
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        let path = path.to_path_buf();
        match (err.kind(), err.raw_os_error()) {
            (ErrorKind::NotFound, _) => SyncError::FileNotFound { path },
            (ErrorKind::PermissionDenied, _) => SyncError::PermissionDenied { path },
            (_, Some(ENOSPC)) => SyncError::DiskFull { path },
            (_, Some(EMFILE | ENFILE)) => SyncError::TooManyOpenFiles { path },
            _ => SyncError::Io { path, source: err },
        }
    }

    /// Short label shown ahead of the detailed message.
    pub fn classification(&self) -> &'static str {
        match self {
            SyncError::NotConfigured => "not configured",
            SyncError::FileNotFound { .. } => "file not found",
            SyncError::PermissionDenied { .. } => "permission denied",
            SyncError::DiskFull { .. } => "disk full",
            SyncError::TooManyOpenFiles { .. } => "too many open files",
            SyncError::ApiUnavailable(_) => "file access unavailable",
            SyncError::Io { .. } => "i/o error",
            SyncError::EmptyFile { .. } => "empty file",
            SyncError::ParseFailed { .. } => "parse failed",
            SyncError::Timeout { .. } => "timeout",
            SyncError::CheckInProgress => "busy",
            SyncError::Backup(_) => "backup failed",
            SyncError::Storage(_) => "storage error",
            SyncError::Serialization(_) => "serialization error",
            SyncError::Config(_) => "configuration error",
        }
    }

    pub fn remediation(&self) -> &'static str {
        match self {
            SyncError::NotConfigured => "Configure the catalog page path first",
            SyncError::FileNotFound { .. } => {
                "Check that the catalog page path is correct and the file exists"
            }
            SyncError::PermissionDenied { .. } => {
                "Check the file permissions and make sure the file is writable"
            }
            SyncError::DiskFull { .. } => "Free up disk space and try again",
            SyncError::TooManyOpenFiles { .. } => "Too many files are open, try again shortly",
            SyncError::ApiUnavailable(_) => {
                "File access is not available in this environment, run the desktop build"
            }
            SyncError::Io { .. } => "Inspect the error details and retry",
            SyncError::EmptyFile { .. } => "The catalog page has no content to import",
            SyncError::ParseFailed { .. } => {
                "The catalog page looks hand-edited beyond recognition, check its markup"
            }
            SyncError::Timeout { .. } => {
                "The file may be locked by another program, try again later"
            }
            SyncError::CheckInProgress => "Wait for the running check to finish",
            SyncError::Backup(_) => "Check the backup folder setting or disable backups",
            SyncError::Storage(_) => "Check the data directory and retry",
            SyncError::Serialization(_) => "The cached data is corrupt, restore it from a backup",
            SyncError::Config(_) => "Fix the configuration file and retry",
        }
    }

    /// Classification plus the underlying message, for presentation.
    pub fn user_message(&self) -> String {
        format!("{}: {}", self.classification(), self)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, SyncError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_classification() {
        let path = Path::new("/tmp/index.md");

        let err = SyncError::from_io(path, io::Error::from(ErrorKind::NotFound));
        assert!(matches!(err, SyncError::FileNotFound { .. }));

        let err = SyncError::from_io(path, io::Error::from(ErrorKind::PermissionDenied));
        assert!(matches!(err, SyncError::PermissionDenied { .. }));

        let err = SyncError::from_io(path, io::Error::from_raw_os_error(ENOSPC));
        assert!(matches!(err, SyncError::DiskFull { .. }));

        let err = SyncError::from_io(path, io::Error::from_raw_os_error(EMFILE));
        assert!(matches!(err, SyncError::TooManyOpenFiles { .. }));

        let err = SyncError::from_io(path, io::Error::other("boom"));
        assert!(matches!(err, SyncError::Io { .. }));
    }

    #[test]
    fn test_user_message_carries_both_parts() {
        let err = SyncError::PermissionDenied {
            path: PathBuf::from("/srv/blog/index.md"),
        };
        let message = err.user_message();
        assert!(message.starts_with("permission denied: "));
        assert!(message.contains("/srv/blog/index.md"));
    }

    #[test]
    fn test_timeout_message() {
        let err = SyncError::Timeout {
            operation: "read catalog file",
            after: Duration::from_secs(5),
        };
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "read catalog file timed out after 5s");
    }
}
