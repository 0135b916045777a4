// file: src/exporter/json.rs
// description: json export and import of the record list
// reference: https://docs.rs/serde_json

use crate::error::{Result, SyncError};
use crate::models::{Book, FileStructure};
use crate::reconcile::fingerprint::fingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportEnvelope {
    pub exported_at: DateTime<Utc>,
    pub total_books: usize,
    pub fingerprint: String,
    pub books: Vec<Book>,
}

/// Accepted import shapes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImportPayload {
    Envelope { books: Vec<Book> },
    Bare(Vec<Book>),
}

#[derive(Debug, Clone)]
pub struct JsonExporter {
    pretty: bool,
}

impl JsonExporter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    pub fn envelope(&self, books: &[Book], structure: Option<&FileStructure>) -> ExportEnvelope {
        ExportEnvelope {
            exported_at: Utc::now(),
            total_books: books.len(),
            fingerprint: fingerprint(books, structure),
            books: books.to_vec(),
        }
    }

    pub fn render(&self, books: &[Book], structure: Option<&FileStructure>) -> Result<String> {
        let envelope = self.envelope(books, structure);
        let json = if self.pretty {
            serde_json::to_string_pretty(&envelope)?
        } else {
            serde_json::to_string(&envelope)?
        };
        Ok(json)
    }

    pub async fn export_to(
        &self,
        path: &Path,
        books: &[Book],
        structure: Option<&FileStructure>,
    ) -> Result<ExportEnvelope> {
        info!("Exporting {} books to {}", books.len(), path.display());
        let json = self.render(books, structure)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| SyncError::from_io(path, e))?;
        Ok(self.envelope(books, structure))
    }

    /// Parse an export envelope or a bare array of records.
    pub fn parse_import(content: &str) -> Result<Vec<Book>> {
        let payload: ImportPayload = serde_json::from_str(content)?;
        Ok(match payload {
            ImportPayload::Envelope { books } | ImportPayload::Bare(books) => books,
        })
    }

    pub async fn import_from(path: &Path) -> Result<Vec<Book>> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SyncError::from_io(path, e))?;
        let books = Self::parse_import(&content)?;
        info!("Read {} books from {}", books.len(), path.display());
        Ok(books)
    }
}

impl Default for JsonExporter {
    fn default() -> Self {
        Self::new(true)
    }
}
