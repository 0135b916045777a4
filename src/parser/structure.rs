// file: src/parser/structure.rs
// description: header/footer extraction and book-content detection
// reference: internal parsing rules

use crate::models::FileStructure;
use crate::parser::patterns::{BOOK_INDICATORS, BOOK_SIGNALS, LIST_OPEN};

/// Split `content` around the first list-like opening tag and the last closing tag.
///
/// Used when no record container can be located. Either side falls back to the
/// default boilerplate when it comes out empty.
pub fn extract_file_structure(content: &str) -> FileStructure {
    let defaults = FileStructure::default();

    let (Some(open), Some(list_end)) = (LIST_OPEN.find(content), content.rfind("</")) else {
        return defaults;
    };

    let header = &content[..open.start()];
    let footer = &content[list_end..];

    FileStructure::new(
        if header.is_empty() {
            defaults.header.as_str()
        } else {
            header
        },
        if footer.is_empty() {
            defaults.footer.as_str()
        } else {
            footer
        },
    )
}

/// Whether an element looks like it describes a book.
pub fn contains_book_info(html: &str) -> bool {
    BOOK_INDICATORS.iter().any(|indicator| indicator.is_match(html))
}

/// Whether a whole file carries any book markers at all.
pub fn has_book_signals(content: &str) -> bool {
    BOOK_SIGNALS.is_match(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structure_split() {
        let content = "---\ntitle: x\n---\n<div id=\"book\"><p>a</p></div>\n<script>s()</script>";
        let structure = extract_file_structure(content);
        assert_eq!(structure.header, "---\ntitle: x\n---\n");
        assert_eq!(structure.footer, "</script>");
        assert!(structure.has_custom_content);
    }

    #[test]
    fn test_structure_defaults_without_markup() {
        let structure = extract_file_structure("plain text only");
        assert_eq!(structure, FileStructure::default());
    }

    #[test]
    fn test_book_info_indicators() {
        assert!(contains_book_info("<li>提取码：ab12</li>"));
        assert!(contains_book_info(r#"<div title="一本好书">"#));
        assert!(!contains_book_info("<li>groceries</li>"));
    }

    #[test]
    fn test_book_signals() {
        assert!(has_book_signals("<p>作者：余华</p>"));
        assert!(!has_book_signals("<p>nothing here</p>"));
    }
}
