// file: src/parser/strategies.rs
// description: ordered parse strategies from exact template to loose markup
// reference: internal parsing rules

use crate::models::{Book, CONTAINER_CLOSE, CONTAINER_OPEN, FileStructure};
use crate::parser::fields::extract_fields;
use crate::parser::identity::find_or_generate_id;
use crate::parser::patterns::{GENERIC_ELEMENTS, RELAXED_BLOCKS, RELAXED_CONTAINER, STRICT_BLOCK};
use crate::parser::structure::{contains_book_info, extract_file_structure};
use chrono::Utc;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Strict,
    Relaxed,
    Generic,
    /// No strategy produced records.
    Fallback,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::Strict => "strict",
            StrategyKind::Relaxed => "relaxed",
            StrategyKind::Generic => "generic",
            StrategyKind::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct ParseAttempt {
    pub books: Vec<Book>,
    pub structure: FileStructure,
    /// The structure was split at a located record container.
    pub container_found: bool,
}

impl ParseAttempt {
    fn unstructured(content: &str) -> Self {
        Self {
            books: Vec::new(),
            structure: extract_file_structure(content),
            container_found: false,
        }
    }
}

pub type StrategyFn = fn(&str, &[Book]) -> ParseAttempt;

/// Tried in order; the first attempt with records wins.
pub const STRATEGIES: [(StrategyKind, StrategyFn); 3] = [
    (StrategyKind::Strict, parse_strict),
    (StrategyKind::Relaxed, parse_relaxed),
    (StrategyKind::Generic, parse_generic),
];

/// Build a record from one block, resolving identity against `existing`.
///
/// Blocks naming no title are skipped; an empty template title is kept. A record that resolves to a known one
/// keeps the fields the markup does not carry.
pub fn build_book(html: &str, existing: &[Book]) -> Option<Book> {
    let fields = extract_fields(html);
    let Some(title) = fields.title else {
        debug!("Skipping block without a title");
        return None;
    };

    let now = Utc::now();
    let mut book = Book {
        id: String::new(),
        title,
        author: fields.author,
        isbn: String::new(),
        cover: fields.cover,
        external_url: fields.external_url,
        description: fields.description,
        download_link: fields.download_link,
        extract_code: fields.extract_code.value().to_string(),
        publish_date: fields.publish_date,
        created_at: Some(now),
        updated_at: Some(now),
        sort_order: None,
    };

    let (id, known) = find_or_generate_id(&book.title, &book.author, &book.external_url, existing);
    book.id = id;
    if let Some(known) = known {
        book.isbn = known.isbn.clone();
        book.created_at = known.created_at.or(book.created_at);
        if book.same_content(known) {
            book.updated_at = known.updated_at.or(book.updated_at);
        }
    }

    Some(book)
}

pub fn parse_strict(content: &str, existing: &[Book]) -> ParseAttempt {
    let Some(start) = content.find(CONTAINER_OPEN) else {
        return ParseAttempt::unstructured(content);
    };
    let Some(end) = content[start..].find(CONTAINER_CLOSE).map(|i| start + i) else {
        return ParseAttempt::unstructured(content);
    };

    let header_end = start + CONTAINER_OPEN.len();
    let list = &content[header_end..end];

    let books = STRICT_BLOCK
        .captures_iter(list)
        .filter_map(|caps| caps.get(1))
        .filter_map(|block| build_book(block.as_str(), existing))
        .collect();

    ParseAttempt {
        books,
        structure: FileStructure::new(&content[..header_end], &content[end..]),
        container_found: true,
    }
}

pub fn parse_relaxed(content: &str, existing: &[Book]) -> ParseAttempt {
    let Some(container) = RELAXED_CONTAINER.find(content) else {
        return ParseAttempt::unstructured(content);
    };

    let list = container.as_str();
    let open_len = list.find('>').map(|i| i + 1).unwrap_or(0);
    let header = &content[..container.start() + open_len];
    let footer = &content[container.end() - CONTAINER_CLOSE.len()..];

    let mut books = Vec::new();
    for pattern in RELAXED_BLOCKS.iter() {
        books = pattern
            .captures_iter(list)
            .filter_map(|caps| caps.get(1))
            .filter_map(|block| build_book(block.as_str(), existing))
            .collect();
        if !books.is_empty() {
            debug!("Relaxed parse matched with pattern {}", pattern.as_str());
            break;
        }
    }

    ParseAttempt {
        books,
        structure: FileStructure::new(header, footer),
        container_found: true,
    }
}

pub fn parse_generic(content: &str, existing: &[Book]) -> ParseAttempt {
    let mut books: Vec<Book> = Vec::new();

    for pattern in GENERIC_ELEMENTS.iter() {
        for element in pattern.find_iter(content) {
            let html = element.as_str();
            if !contains_book_info(html) {
                continue;
            }
            if let Some(book) = build_book(html, existing)
                && !books
                    .iter()
                    .any(|b| b.title == book.title && b.author == book.author)
            {
                books.push(book);
            }
        }
        if !books.is_empty() {
            debug!("Generic parse matched with pattern {}", pattern.as_str());
            break;
        }
    }

    ParseAttempt {
        books,
        structure: extract_file_structure(content),
        container_found: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookField;

    const LOOSE_LIST: &str = r#"<h1>Reading</h1>
<ul class="content books">
  <li class="entry"><h3>《活着》</h3><p>作者：余华</p></li>
  <li class="entry"><h3>《兄弟》</h3><p>作者：余华</p></li>
</ul>
<p>end</p>"#;

    #[test]
    fn test_strict_requires_exact_container() {
        let attempt = parse_strict(LOOSE_LIST, &[]);
        assert!(attempt.books.is_empty());
    }

    #[test]
    fn test_relaxed_parses_variant_container() {
        let attempt = parse_relaxed(LOOSE_LIST, &[]);
        let titles: Vec<_> = attempt.books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["活着", "兄弟"]);
        assert!(attempt.structure.header.ends_with(r#"<ul class="content books">"#));
        assert!(attempt.structure.footer.starts_with("</ul>"));
    }

    #[test]
    fn test_generic_dedupes_by_title_and_author() {
        let content = r#"<section>
<div><h3>《活着》</h3><p>作者：余华</p></div>
<div><h3>《活着》</h3><p>作者：余华</p></div>
</section>"#;
        let attempt = parse_generic(content, &[]);
        assert_eq!(attempt.books.len(), 1);
        assert_eq!(attempt.books[0].author, "余华");
    }

    #[test]
    fn test_build_book_carries_over_known_fields() {
        let mut known = Book::new("活着", "余华").with_field(BookField::Isbn, "9787506365437");
        known.id = "k1".to_string();
        let created = known.created_at;

        let book = build_book("<h3>《活着》</h3><p>作者：余华</p>", &[known]).unwrap();
        assert_eq!(book.id, "k1");
        assert_eq!(book.isbn, "9787506365437");
        assert_eq!(book.created_at, created);
    }

    #[test]
    fn test_build_book_skips_untitled() {
        assert!(build_book("<p>作者：佚名</p>", &[]).is_none());
    }
}
