// file: src/models/structure.rs
// description: non-record boilerplate of the external catalog page
// reference: internal data structures

use serde::{Deserialize, Serialize};

pub const CONTAINER_OPEN: &str = r#"<ul class="content">"#;
pub const CONTAINER_CLOSE: &str = "</ul>";

const DEFAULT_HEADER: &str = r#"---
title: 书单
date: 2024-11-27 10:33:03
comment: true
---
<p class="note note-info">
  这里有一些书，附上豆瓣链接和网盘下载地址。<br>
  读书愉快，朋友~</p>

<div id="book">
    <div class="page">
        <ul class="content">"#;

const DEFAULT_FOOTER: &str = r#"</ul>
    </div>
</div>"#;

/// Header and footer surrounding the record container.
///
/// The header runs from the start of the file through the container's opening
/// tag; the footer runs from the container's closing tag to the end of the
/// file. Both are kept byte-for-byte so write-backs preserve hand edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStructure {
    pub header: String,
    pub footer: String,
    #[serde(default)]
    pub has_custom_content: bool,
}

impl FileStructure {
    pub fn new(header: impl Into<String>, footer: impl Into<String>) -> Self {
        let footer = footer.into();
        let has_custom_content = Self::detect_custom_content(&footer);
        Self {
            header: header.into(),
            footer,
            has_custom_content,
        }
    }

    pub fn detect_custom_content(footer: &str) -> bool {
        ["<script", "<style", "</script>", "</style>"]
            .iter()
            .any(|marker| footer.contains(marker))
    }

    /// Integrity problems worth warning about before a write-back.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.header.trim().is_empty() {
            problems.push("header is empty".to_string());
        } else if !self.header.contains(CONTAINER_OPEN) {
            problems.push(format!("header does not contain {}", CONTAINER_OPEN));
        }

        if self.footer.trim().is_empty() {
            problems.push("footer is empty".to_string());
        } else if !self.footer.contains(CONTAINER_CLOSE) {
            problems.push(format!("footer does not contain {}", CONTAINER_CLOSE));
        }
        problems
    }
}

impl Default for FileStructure {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER, DEFAULT_FOOTER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_structure_is_valid() {
        let structure = FileStructure::default();
        assert!(structure.validate().is_empty());
        assert!(!structure.has_custom_content);
        assert!(structure.header.ends_with(CONTAINER_OPEN));
        assert!(structure.footer.starts_with(CONTAINER_CLOSE));
    }

    #[test]
    fn test_custom_content_detection() {
        let structure = FileStructure::new("<ul class=\"content\">", "</ul>\n<script>x()</script>");
        assert!(structure.has_custom_content);
        assert!(structure.validate().is_empty());
    }

    #[test]
    fn test_validate_reports_missing_container() {
        let structure = FileStructure::new("<div>", "");
        let problems = structure.validate();
        assert_eq!(problems.len(), 2);
    }
}
