// file: src/models/book.rs
// description: canonical book record and field normalization rules
// reference: internal data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Book {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub author: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub isbn: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub cover: String,
    #[serde(default, alias = "douban_url", deserialize_with = "lenient_string")]
    pub external_url: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub download_link: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub extract_code: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub publish_date: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
}

/// Content fields that take part in comparison and fingerprinting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookField {
    Title,
    Author,
    Isbn,
    Cover,
    ExternalUrl,
    Description,
    DownloadLink,
    ExtractCode,
    PublishDate,
}

impl BookField {
    /// Fields compared between two matched records.
    pub const COMPARED: [BookField; 6] = [
        BookField::Description,
        BookField::DownloadLink,
        BookField::ExtractCode,
        BookField::Cover,
        BookField::ExternalUrl,
        BookField::PublishDate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookField::Title => "title",
            BookField::Author => "author",
            BookField::Isbn => "isbn",
            BookField::Cover => "cover",
            BookField::ExternalUrl => "external_url",
            BookField::Description => "description",
            BookField::DownloadLink => "download_link",
            BookField::ExtractCode => "extract_code",
            BookField::PublishDate => "publish_date",
        }
    }
}

/// Normalize a raw field value the same way everywhere it is compared.
pub fn normalize_field(value: &str, field: BookField) -> String {
    let trimmed = value.trim();
    if trimmed == "undefined" || trimmed == "null" {
        return String::new();
    }

    match field {
        BookField::ExtractCode => trimmed.chars().filter(|c| !c.is_whitespace()).collect(),
        _ => trimmed.to_string(),
    }
}

impl Book {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            title: title.into(),
            author: author.into(),
            created_at: Some(now),
            updated_at: Some(now),
            ..Self::default()
        }
    }

    pub fn field(&self, field: BookField) -> &str {
        match field {
            BookField::Title => &self.title,
            BookField::Author => &self.author,
            BookField::Isbn => &self.isbn,
            BookField::Cover => &self.cover,
            BookField::ExternalUrl => &self.external_url,
            BookField::Description => &self.description,
            BookField::DownloadLink => &self.download_link,
            BookField::ExtractCode => &self.extract_code,
            BookField::PublishDate => &self.publish_date,
        }
    }

    pub fn normalized_field(&self, field: BookField) -> String {
        normalize_field(self.field(field), field)
    }

    /// Copy with every content field normalized; identity and bookkeeping are kept.
    pub fn normalized(&self) -> Book {
        Book {
            id: self.id.clone(),
            title: self.normalized_field(BookField::Title),
            author: self.normalized_field(BookField::Author),
            isbn: self.normalized_field(BookField::Isbn),
            cover: self.normalized_field(BookField::Cover),
            external_url: self.normalized_field(BookField::ExternalUrl),
            description: self.normalized_field(BookField::Description),
            download_link: self.normalized_field(BookField::DownloadLink),
            extract_code: self.normalized_field(BookField::ExtractCode),
            publish_date: self.normalized_field(BookField::PublishDate),
            created_at: self.created_at,
            updated_at: self.updated_at,
            sort_order: self.sort_order,
        }
    }

    /// True when every content field matches after normalization.
    pub fn same_content(&self, other: &Book) -> bool {
        const ALL: [BookField; 9] = [
            BookField::Title,
            BookField::Author,
            BookField::Isbn,
            BookField::Cover,
            BookField::ExternalUrl,
            BookField::Description,
            BookField::DownloadLink,
            BookField::ExtractCode,
            BookField::PublishDate,
        ];
        ALL.iter()
            .all(|&field| self.normalized_field(field) == other.normalized_field(field))
    }

    pub fn with_field(mut self, field: BookField, value: impl Into<String>) -> Self {
        let value = value.into();
        match field {
            BookField::Title => self.title = value,
            BookField::Author => self.author = value,
            BookField::Isbn => self.isbn = value,
            BookField::Cover => self.cover = value,
            BookField::ExternalUrl => self.external_url = value,
            BookField::Description => self.description = value,
            BookField::DownloadLink => self.download_link = value,
            BookField::ExtractCode => self.extract_code = value,
            BookField::PublishDate => self.publish_date = value,
        }
        self
    }
}

/// Assign `sort_order` 0..n following slice order.
pub fn assign_sort_order(books: &mut [Book]) {
    for (index, book) in books.iter_mut().enumerate() {
        book.sort_order = Some(index as i64);
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}
