// file: src/parser/mod.rs
// description: tolerant catalog markup parser
// reference: internal module structure

pub mod fields;
pub mod identity;
pub mod patterns;
pub mod strategies;
pub mod structure;

pub use fields::{CodeMarker, ExtractedFields, extract_fields};
pub use identity::{find_counterpart, find_existing, find_or_generate_id, fuzzy_title, generate_id};
pub use strategies::{ParseAttempt, STRATEGIES, StrategyKind};
pub use structure::{contains_book_info, extract_file_structure, has_book_signals};

use crate::models::{Book, FileStructure};
use crate::utils::validation::Validator;
use tracing::{debug, warn};

/// Records and boilerplate recovered from one external file.
#[derive(Debug, Clone)]
pub struct ParsedCatalog {
    pub books: Vec<Book>,
    pub structure: FileStructure,
    pub strategy: StrategyKind,
}

impl ParsedCatalog {
    /// Sanity problems with a parse result. Reported, never fatal.
    pub fn validate(&self, content: &str) -> Vec<String> {
        let mut problems = Vec::new();
        if self.books.is_empty() {
            if has_book_signals(content) {
                problems.push(
                    "file contains book markers but no records could be parsed".to_string(),
                );
            }
            return problems;
        }

        let report = Validator::validate_books(&self.books);
        problems.extend(report.issues);
        problems
    }
}

#[derive(Debug, Default)]
pub struct CatalogParser;

impl CatalogParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse the external file, seeding identity resolution with `existing`.
    ///
    /// Never fails: when no strategy finds records the result is empty and the
    /// structure comes from the first located container, or else from a plain
    /// header/footer split.
    pub fn parse(&self, content: &str, existing: &[Book]) -> ParsedCatalog {
        let mut container_structure = None;
        for (kind, strategy) in STRATEGIES {
            let attempt = strategy(content, existing);
            if attempt.books.is_empty() {
                if attempt.container_found && container_structure.is_none() {
                    container_structure = Some(attempt.structure);
                }
                continue;
            }
            debug!("Parsed {} books with the {} strategy", attempt.books.len(), kind);
            return ParsedCatalog {
                books: attempt.books,
                structure: attempt.structure,
                strategy: kind,
            };
        }

        if has_book_signals(content) {
            warn!("No parse strategy produced records");
        }
        ParsedCatalog {
            books: Vec::new(),
            structure: container_structure.unwrap_or_else(|| extract_file_structure(content)),
            strategy: StrategyKind::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_falls_back() {
        let parsed = CatalogParser::new().parse("", &[]);
        assert!(parsed.books.is_empty());
        assert_eq!(parsed.strategy, StrategyKind::Fallback);
        assert_eq!(parsed.structure, FileStructure::default());
        assert!(parsed.validate("").is_empty());
    }

    #[test]
    fn test_unparseable_signals_are_reported() {
        let content = "作者：someone wrote 下载 somewhere";
        let parsed = CatalogParser::new().parse(content, &[]);
        assert!(parsed.books.is_empty());
        assert_eq!(parsed.validate(content).len(), 1);
    }

    #[test]
    fn test_empty_container_keeps_its_structure() {
        let structure = FileStructure::new(
            "<p>intro</p>\n<ul class=\"content\">",
            "</ul>\n<script>init()</script>",
        );
        let content = crate::exporter::markup::render_catalog(&[], Some(&structure));
        let parsed = CatalogParser::new().parse(&content, &[]);
        assert!(parsed.books.is_empty());
        assert_eq!(parsed.strategy, StrategyKind::Fallback);
        assert_eq!(parsed.structure, structure);
    }
}
