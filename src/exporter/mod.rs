// file: src/exporter/mod.rs
// description: output formats for the record list
// reference: internal module structure

pub mod json;
pub mod markup;

pub use json::{ExportEnvelope, JsonExporter};
pub use markup::{render_book, render_catalog};
