// file: src/models/sync_config.rs
// description: persisted sync settings and the cached record set
// reference: internal data structures

use super::{Book, FileStructure};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Link between the cache and one external file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub external_file_path: PathBuf,
    #[serde(default)]
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Fingerprint of the cache at the last successful sync.
    #[serde(default)]
    pub cache_version: String,
    #[serde(default = "default_auto_check")]
    pub auto_version_check: bool,
}

fn default_auto_check() -> bool {
    true
}

impl SyncConfig {
    pub fn new(external_file_path: impl Into<PathBuf>) -> Self {
        Self {
            external_file_path: external_file_path.into(),
            last_sync_time: None,
            cache_version: String::new(),
            auto_version_check: true,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.external_file_path.as_os_str().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentFile {
    pub file_name: String,
    pub file_path: PathBuf,
}

impl CurrentFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let file_path = path.into();
        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            file_name,
            file_path,
        }
    }
}

/// The cached catalog as persisted by a store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    #[serde(default)]
    pub books: Vec<Book>,
    /// Ids in the order they appeared in the external file at the last pull.
    #[serde(default)]
    pub original_file_order: Vec<String>,
    #[serde(default)]
    pub original_file_structure: Option<FileStructure>,
    #[serde(default)]
    pub current_file: Option<CurrentFile>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl RecordSet {
    pub fn new(books: Vec<Book>) -> Self {
        Self {
            books,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Books ordered by `sort_order`; records without one keep their relative position at the end.
    pub fn ordered_books(&self) -> Vec<Book> {
        let mut books = self.books.clone();
        books.sort_by_key(|book| book.sort_order.unwrap_or(i64::MAX));
        books
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_config_defaults_on_deserialize() {
        let config: SyncConfig =
            serde_json::from_str(r#"{"external_file_path":"/blog/source/books/index.md"}"#).unwrap();
        assert!(config.auto_version_check);
        assert!(config.is_configured());
        assert!(config.last_sync_time.is_none());
    }

    #[test]
    fn test_current_file_name() {
        let file = CurrentFile::from_path("/blog/source/books/index.md");
        assert_eq!(file.file_name, "index.md");
    }

    #[test]
    fn test_ordered_books_is_stable() {
        let mut a = Book::new("a", "x");
        a.sort_order = Some(1);
        let mut b = Book::new("b", "y");
        b.sort_order = Some(0);
        let c = Book::new("c", "z");
        let d = Book::new("d", "w");

        let set = RecordSet::new(vec![c, a, d, b]);
        let titles: Vec<_> = set.ordered_books().into_iter().map(|b| b.title).collect();
        assert_eq!(titles, vec!["b", "a", "c", "d"]);
    }
}
