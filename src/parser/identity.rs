// file: src/parser/identity.rs
// description: stable record identity across parses
// reference: internal parsing rules

use crate::models::Book;
use crate::parser::patterns::TITLE_BRACKETS;
use crate::utils::checksum::rolling_hash;

/// Title with book-title brackets removed, for loose matching.
pub fn fuzzy_title(title: &str) -> String {
    TITLE_BRACKETS.replace_all(title, "").trim().to_string()
}

/// Deterministic id for a record with no existing counterpart.
pub fn generate_id(title: &str, author: &str) -> String {
    let hash = rolling_hash(&format!("{}-{}", title, author));
    hash.unsigned_abs().to_string()
}

/// Resolve the id of a parsed record, along with the known record it matched.
///
/// Tried in order: exact title and author, exact non-empty external URL,
/// bracket-stripped title with exact author. Falls back to `generate_id`.
pub fn find_or_generate_id<'a>(
    title: &str,
    author: &str,
    external_url: &str,
    existing: &'a [Book],
) -> (String, Option<&'a Book>) {
    match find_existing(title, author, external_url, existing) {
        Some(known) => (known.id.clone(), Some(known)),
        None => (generate_id(title, author), None),
    }
}

/// Known record a parsed one resolves to, if any.
pub fn find_existing<'a>(
    title: &str,
    author: &str,
    external_url: &str,
    existing: &'a [Book],
) -> Option<&'a Book> {
    if let Some(book) = existing
        .iter()
        .find(|book| book.title == title && book.author == author)
    {
        return Some(book);
    }

    let external_url = external_url.trim();
    if !external_url.is_empty()
        && let Some(book) = existing
            .iter()
            .find(|book| book.external_url == external_url)
    {
        return Some(book);
    }

    let wanted = fuzzy_title(title);
    existing
        .iter()
        .find(|book| fuzzy_title(&book.title) == wanted && book.author == author)
}

/// Counterpart of `book` in `candidates` by title and author, then fuzzy title.
pub fn find_counterpart<'a>(book: &Book, candidates: &'a [Book]) -> Option<&'a Book> {
    let title = book.title.trim();
    let author = book.author.trim();
    candidates
        .iter()
        .find(|other| other.title.trim() == title && other.author.trim() == author)
        .or_else(|| {
            let wanted = fuzzy_title(title);
            candidates
                .iter()
                .find(|other| fuzzy_title(&other.title) == wanted && other.author.trim() == author)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookField;

    fn existing() -> Vec<Book> {
        let mut a = Book::new("我与地坛", "史铁生")
            .with_field(BookField::ExternalUrl, "https://book.douban.com/subject/1/");
        a.id = "keep-1".to_string();
        let mut b = Book::new("《活着》", "余华");
        b.id = "keep-2".to_string();
        vec![a, b]
    }

    #[test]
    fn test_exact_match_wins() {
        let books = existing();
        let (id, known) = find_or_generate_id("我与地坛", "史铁生", "", &books);
        assert_eq!(id, "keep-1");
        assert!(known.is_some());
    }

    #[test]
    fn test_external_url_match() {
        let (id, _) = find_or_generate_id(
            "我与地坛（修订版）",
            "史铁生",
            "https://book.douban.com/subject/1/",
            &existing(),
        );
        assert_eq!(id, "keep-1");
    }

    #[test]
    fn test_fuzzy_title_match() {
        let (id, _) = find_or_generate_id("活着", "余华", "", &existing());
        assert_eq!(id, "keep-2");
    }

    #[test]
    fn test_generated_id_is_stable() {
        let books = existing();
        let (first, known) = find_or_generate_id("许三观卖血记", "余华", "", &books);
        assert!(known.is_none());
        assert_eq!(first, generate_id("许三观卖血记", "余华"));
        assert!(first.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_find_counterpart_trims() {
        let candidates = existing();
        let padded = Book::new(" 我与地坛 ", "史铁生");
        assert_eq!(find_counterpart(&padded, &candidates).map(|b| b.id.as_str()), Some("keep-1"));
    }
}
