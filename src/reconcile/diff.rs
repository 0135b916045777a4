// file: src/reconcile/diff.rs
// description: record, structure and validation level differencing
// reference: internal reconciliation rules

use crate::models::{Book, BookField, ContentDifference, DifferenceKind, FileStructure};
use crate::parser::{find_counterpart, fuzzy_title};
use crate::utils::validation::Validator;
use serde_json::{Value, json};

fn book_value(book: &Book) -> Option<Value> {
    serde_json::to_value(book).ok()
}

fn order_value(books: &[Book]) -> Value {
    Value::Array(
        books
            .iter()
            .map(|b| json!({ "id": b.id, "title": b.title }))
            .collect(),
    )
}

/// Record-level differences. `old_value` is the file side, `new_value` the cache side.
pub fn compare_books(cache: &[Book], file: &[Book]) -> Vec<ContentDifference> {
    let cache: Vec<Book> = cache.iter().map(Book::normalized).collect();
    let file: Vec<Book> = file.iter().map(Book::normalized).collect();
    let mut differences = Vec::new();

    for book in &cache {
        if find_counterpart(book, &file).is_none() {
            differences.push(
                ContentDifference::new(
                    DifferenceKind::Added,
                    "book",
                    format!("Added book 《{}》", book.title),
                )
                .with_values(None, book_value(book))
                .with_book(&book.id, &book.title),
            );
        }
    }

    for book in &file {
        if find_counterpart(book, &cache).is_none() {
            differences.push(
                ContentDifference::new(
                    DifferenceKind::Removed,
                    "book",
                    format!("Removed book 《{}》", book.title),
                )
                .with_values(book_value(book), None)
                .with_book(&book.id, &book.title),
            );
        }
    }

    for cached in &cache {
        let Some(external) = find_counterpart(cached, &file) else {
            continue;
        };
        for field in BookField::COMPARED {
            let cache_value = cached.field(field);
            let file_value = external.field(field);
            if cache_value != file_value {
                differences.push(
                    ContentDifference::new(
                        DifferenceKind::Modified,
                        field.as_str(),
                        format!("《{}》 {} changed", cached.title, field.as_str()),
                    )
                    .with_values(Some(json!(file_value)), Some(json!(cache_value)))
                    .with_book(&cached.id, &cached.title),
                );
            }
        }
    }

    // reordering is only judged when both sides hold the same number of records
    if !cache.is_empty() && cache.len() == file.len() {
        let moved = cache
            .iter()
            .zip(&file)
            .any(|(a, b)| fuzzy_title(&a.title) != fuzzy_title(&b.title) || a.author != b.author);
        if moved {
            differences.push(
                ContentDifference::new(DifferenceKind::Reordered, "book_order", "Book order changed")
                    .with_values(Some(order_value(&file)), Some(order_value(&cache))),
            );
        }
    }

    differences
}

/// Header, footer and custom-content differences; skipped unless both sides are known.
pub fn compare_structure(
    cache: Option<&FileStructure>,
    file: Option<&FileStructure>,
) -> Vec<ContentDifference> {
    let (Some(cache), Some(file)) = (cache, file) else {
        return Vec::new();
    };
    let mut differences = Vec::new();

    if cache.header != file.header {
        differences.push(
            ContentDifference::new(
                DifferenceKind::StructureChanged,
                "header",
                "File header changed (front matter or intro text)",
            )
            .with_values(Some(json!(file.header)), Some(json!(cache.header))),
        );
    }

    if cache.footer != file.footer {
        differences.push(
            ContentDifference::new(
                DifferenceKind::StructureChanged,
                "footer",
                "File footer changed (scripts or styles)",
            )
            .with_values(Some(json!(file.footer)), Some(json!(cache.footer))),
        );
    }

    if cache.has_custom_content != file.has_custom_content {
        let description = if cache.has_custom_content {
            "Custom script/style content added"
        } else {
            "Custom script/style content removed"
        };
        differences.push(
            ContentDifference::new(DifferenceKind::StructureChanged, "custom_content", description)
                .with_values(
                    Some(json!(file.has_custom_content)),
                    Some(json!(cache.has_custom_content)),
                ),
        );
    }

    differences
}

fn side_warning(field: &str, label: &str, books: &[Book]) -> Option<ContentDifference> {
    let report = Validator::validate_books(books);
    if report.is_clean() {
        return None;
    }
    let joined = report.issues.join("; ");
    Some(
        ContentDifference::new(
            DifferenceKind::ValidationWarning,
            field,
            format!("{} validation warnings: {}", label, joined),
        )
        .with_values(Some(json!("")), Some(json!(joined))),
    )
}

/// At most one warning per side. Never part of the conflict verdict.
pub fn validation_warnings(cache: &[Book], file: &[Book]) -> Vec<ContentDifference> {
    [
        side_warning("cache_data", "Cached data", cache),
        side_warning("external_data", "External file", file),
    ]
    .into_iter()
    .flatten()
    .collect()
}

pub fn compare_all_content(
    cache: &[Book],
    file: &[Book],
    cache_structure: Option<&FileStructure>,
    file_structure: Option<&FileStructure>,
) -> Vec<ContentDifference> {
    let mut differences = validation_warnings(cache, file);
    differences.extend(compare_books(cache, file));
    differences.extend(compare_structure(cache_structure, file_structure));
    differences
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ditan(description: &str) -> Book {
        let mut book = Book::new("我与地坛", "史铁生").with_field(BookField::Description, description);
        book.id = "ditan".to_string();
        book
    }

    fn huozhe() -> Book {
        let mut book = Book::new("活着", "余华");
        book.id = "huozhe".to_string();
        book
    }

    #[test]
    fn test_single_field_modification() {
        let differences = compare_books(&[ditan("B")], &[ditan("A")]);
        assert_eq!(differences.len(), 1);
        let diff = &differences[0];
        assert_eq!(diff.kind, DifferenceKind::Modified);
        assert_eq!(diff.field, "description");
        assert_eq!(diff.old_value, Some(json!("A")));
        assert_eq!(diff.new_value, Some(json!("B")));
        assert_eq!(diff.book_title.as_deref(), Some("我与地坛"));
    }

    #[test]
    fn test_whitespace_only_changes_are_equal() {
        let cache = ditan("A").with_field(BookField::ExtractCode, "ab 12");
        let file = ditan(" A ").with_field(BookField::ExtractCode, "ab12");
        assert!(compare_books(&[cache], &[file]).is_empty());
    }

    #[test]
    fn test_one_sided_records() {
        let only_cache = compare_books(&[ditan("A"), huozhe()], &[ditan("A")]);
        assert_eq!(only_cache.len(), 1);
        assert_eq!(only_cache[0].kind, DifferenceKind::Added);
        assert_eq!(only_cache[0].book_id.as_deref(), Some("huozhe"));

        let only_file = compare_books(&[ditan("A")], &[ditan("A"), huozhe()]);
        assert_eq!(only_file.len(), 1);
        assert_eq!(only_file[0].kind, DifferenceKind::Removed);
    }

    #[test]
    fn test_fuzzy_title_counts_as_match() {
        let mut bracketed = huozhe();
        bracketed.title = "《活着》".to_string();
        assert!(compare_books(&[huozhe()], &[bracketed]).is_empty());
    }

    #[test]
    fn test_swap_is_single_reorder() {
        let differences = compare_books(&[ditan("A"), huozhe()], &[huozhe(), ditan("A")]);
        assert_eq!(differences.len(), 1);
        assert_eq!(differences[0].kind, DifferenceKind::Reordered);
        assert_eq!(
            differences[0].new_value,
            Some(json!([{"id": "ditan", "title": "我与地坛"}, {"id": "huozhe", "title": "活着"}]))
        );
    }

    #[test]
    fn test_structure_needs_both_sides() {
        let structure = FileStructure::default();
        assert!(compare_structure(Some(&structure), None).is_empty());

        let changed = FileStructure::new(structure.header.clone(), "</ul>\n<script></script>");
        let differences = compare_structure(Some(&structure), Some(&changed));
        let fields: Vec<_> = differences.iter().map(|d| d.field.as_str()).collect();
        assert_eq!(fields, vec!["footer", "custom_content"]);
    }

    #[test]
    fn test_validation_warning_per_side() {
        let broken = Book::new("", "");
        let warnings = validation_warnings(&[broken.clone(), broken], &[huozhe()]);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "cache_data");
        assert!(!warnings[0].is_conflicting());
    }
}
