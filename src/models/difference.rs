// file: src/models/difference.rs
// description: difference report entries and version comparison results
// reference: internal data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceKind {
    Added,
    Removed,
    Modified,
    Reordered,
    StructureChanged,
    ValidationWarning,
}

impl DifferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifferenceKind::Added => "added",
            DifferenceKind::Removed => "removed",
            DifferenceKind::Modified => "modified",
            DifferenceKind::Reordered => "reordered",
            DifferenceKind::StructureChanged => "structure_changed",
            DifferenceKind::ValidationWarning => "validation_warning",
        }
    }
}

/// One human-readable divergence between the cache and the external file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDifference {
    #[serde(rename = "type")]
    pub kind: DifferenceKind,
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_title: Option<String>,
    pub description: String,
}

impl ContentDifference {
    pub fn new(kind: DifferenceKind, field: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            field: field.into(),
            old_value: None,
            new_value: None,
            book_id: None,
            book_title: None,
            description: description.into(),
        }
    }

    pub fn with_values(mut self, old_value: Option<Value>, new_value: Option<Value>) -> Self {
        self.old_value = old_value;
        self.new_value = new_value;
        self
    }

    pub fn with_book(mut self, id: &str, title: &str) -> Self {
        self.book_id = Some(id.to_string());
        self.book_title = Some(title.to_string());
        self
    }

    /// Validation warnings are informational and never make a conflict.
    pub fn is_conflicting(&self) -> bool {
        self.kind != DifferenceKind::ValidationWarning
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    Content,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionCompareResult {
    pub has_conflict: bool,
    pub cache_books_count: usize,
    pub external_books_count: usize,
    pub cache_modified_at: DateTime<Utc>,
    pub external_modified_at: Option<DateTime<Utc>>,
    pub cache_fingerprint: String,
    pub external_fingerprint: String,
    pub differences: Vec<ContentDifference>,
    pub conflict_type: ConflictType,
}

impl VersionCompareResult {
    pub fn conflicting_differences(&self) -> impl Iterator<Item = &ContentDifference> {
        self.differences.iter().filter(|d| d.is_conflicting())
    }

    pub fn count_of(&self, kind: DifferenceKind) -> usize {
        self.differences.iter().filter(|d| d.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_difference_serializes_kind_as_type() {
        let diff = ContentDifference::new(DifferenceKind::Modified, "description", "changed")
            .with_values(Some(json!("A")), Some(json!("B")))
            .with_book("1", "我与地坛");
        let value = serde_json::to_value(&diff).unwrap();
        assert_eq!(value["type"], "modified");
        assert_eq!(value["old_value"], "A");
        assert_eq!(value["book_title"], "我与地坛");
    }

    #[test]
    fn test_validation_warning_is_not_conflicting() {
        let warning = ContentDifference::new(DifferenceKind::ValidationWarning, "cache_data", "x");
        assert!(!warning.is_conflicting());
        let reordered = ContentDifference::new(DifferenceKind::Reordered, "order", "x");
        assert!(reordered.is_conflicting());
    }
}
