// file: src/reconcile/fingerprint.rs
// description: deterministic content fingerprint of a record set
// reference: internal reconciliation rules

use crate::models::{Book, BookField, FileStructure};
use crate::utils::checksum::{rolling_hash, to_base36};
use serde::Serialize;
use tracing::warn;

/// Struct field order is the key order of the serialized summary.
#[derive(Serialize)]
struct RecordSummary {
    title: String,
    author: String,
    description: String,
    download_link: String,
    extract_code: String,
    cover: String,
    external_url: String,
    publish_date: String,
    isbn: String,
    position: usize,
}

#[derive(Serialize)]
struct ContentSummary {
    books: Vec<RecordSummary>,
    book_count: usize,
    has_custom_content: bool,
}

fn summarize(books: &[Book], structure: Option<&FileStructure>) -> ContentSummary {
    let records = books
        .iter()
        .enumerate()
        .map(|(position, book)| RecordSummary {
            title: book.normalized_field(BookField::Title),
            author: book.normalized_field(BookField::Author),
            description: book.normalized_field(BookField::Description),
            download_link: book.normalized_field(BookField::DownloadLink),
            extract_code: book.normalized_field(BookField::ExtractCode),
            cover: book.normalized_field(BookField::Cover),
            external_url: book.normalized_field(BookField::ExternalUrl),
            publish_date: book.normalized_field(BookField::PublishDate),
            isbn: book.normalized_field(BookField::Isbn),
            position,
        })
        .collect();

    ContentSummary {
        books: records,
        book_count: books.len(),
        has_custom_content: structure.is_some_and(|s| s.has_custom_content),
    }
}

/// `"<base36(|hash|)>-<count>"` over the normalized, ordered content.
///
/// Equal fingerprints let a comparison skip record-level diffing. Differing
/// ones prove nothing on their own; the diff decides.
pub fn fingerprint(books: &[Book], structure: Option<&FileStructure>) -> String {
    let summary = summarize(books, structure);
    let serialized = match serde_json::to_string(&summary) {
        Ok(json) => json,
        Err(e) => {
            // summary holds only strings, integers and bools
            warn!("Failed to serialize fingerprint summary: {}", e);
            String::new()
        }
    };

    let hash = rolling_hash(&serialized);
    format!("{}-{}", to_base36(hash.unsigned_abs()), books.len())
}
