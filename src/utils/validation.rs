// file: src/utils/validation.rs
// description: book record validation and small text helpers
// reference: input validation patterns

use crate::models::{Book, BookField};
use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

lazy_static! {
    static ref EXTRACT_CODE: Regex =
        Regex::new(r"^[A-Za-z0-9]{1,8}$").expect("extract code regex is valid");
}

/// Outcome of validating a list of records. Problems are reported, never fatal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub valid_count: usize,
    pub issues: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

pub struct Validator;

impl Validator {
    /// Issues for a single record; labels use the one-based `position`.
    pub fn validate_book(book: &Book, position: usize) -> Vec<String> {
        let mut issues = Vec::new();
        let label = if book.title.trim().is_empty() {
            format!("Book {}", position)
        } else {
            format!("Book {} \"{}\"", position, book.title.trim())
        };

        if book.normalized_field(BookField::Title).is_empty() {
            issues.push(format!("{}: title is empty", label));
        }
        if book.normalized_field(BookField::Author).is_empty() {
            issues.push(format!("{}: author is empty", label));
        }

        for field in [
            BookField::DownloadLink,
            BookField::ExternalUrl,
            BookField::Cover,
        ] {
            let value = book.normalized_field(field);
            if !value.is_empty() && !Self::is_http_url(&value) {
                issues.push(format!("{}: {} is not a valid URL", label, field.as_str()));
            }
        }

        let code = book.normalized_field(BookField::ExtractCode);
        if !code.is_empty() && !EXTRACT_CODE.is_match(&code) {
            issues.push(format!(
                "{}: extract code should be 1-8 letters or digits",
                label
            ));
        }

        issues
    }

    pub fn validate_books(books: &[Book]) -> ValidationReport {
        let mut report = ValidationReport::default();
        for (index, book) in books.iter().enumerate() {
            let issues = Self::validate_book(book, index + 1);
            if issues.is_empty() {
                report.valid_count += 1;
            }
            report.issues.extend(issues);
        }
        report
    }

    pub fn is_http_url(value: &str) -> bool {
        Url::parse(value)
            .map(|url| matches!(url.scheme(), "http" | "https"))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_book() -> Book {
        Book::new("我与地坛", "史铁生")
            .with_field(BookField::ExternalUrl, "https://book.douban.com/subject/1/")
            .with_field(BookField::DownloadLink, "https://pan.example.com/s/abc")
            .with_field(BookField::ExtractCode, "ab12")
    }

    #[test]
    fn test_valid_book_has_no_issues() {
        assert!(Validator::validate_book(&valid_book(), 1).is_empty());
    }

    #[test]
    fn test_missing_title_and_author() {
        let issues = Validator::validate_book(&Book::new(" ", ""), 2);
        assert_eq!(issues.len(), 2);
        assert!(issues[0].starts_with("Book 2"));
    }

    #[test]
    fn test_bad_url_and_code() {
        let book = valid_book()
            .with_field(BookField::Cover, "ftp://img.example.com/a.jpg")
            .with_field(BookField::ExtractCode, "too-long-code");
        let issues = Validator::validate_book(&book, 1);
        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("cover"));
        assert!(issues[1].contains("extract code"));
    }

    #[test]
    fn test_validate_books_counts_valid() {
        let report = Validator::validate_books(&[valid_book(), Book::new("", "")]);
        assert_eq!(report.valid_count, 1);
        assert!(!report.is_clean());
    }
}
