//! Document types for indexing.
//!
//! A [`PageDocument`] is one PDF page ready for indexing. The page text is
//! written twice, once per analyzer.

use std::path::Path;

use tantivy::TantivyDocument;

use crate::{pdf::PdfPage, schema::IndexSchema};

/// A PDF page ready for indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDocument {
    /// Absolute path of the source PDF.
    pub path: String,
    /// File name of the source PDF.
    pub filename: String,
    /// 1-based page number.
    pub page_num: u64,
    /// Extracted page text.
    pub content: String,
}

impl PageDocument {
    /// Creates a `PageDocument` from an extracted page of the PDF at `path`.
    pub fn from_page(path: &Path, page: &PdfPage) -> Self {
        Self {
            path: path.to_string_lossy().to_string(),
            filename: path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default(),
            page_num: u64::from(page.number),
            content: page.text.clone(),
        }
    }

    /// Converts the page into a Tantivy document.
    pub fn to_tantivy(&self, schema: &IndexSchema) -> TantivyDocument {
        let mut doc = TantivyDocument::new();
        doc.add_text(schema.path, &self.path);
        doc.add_text(schema.filename, &self.filename);
        doc.add_u64(schema.page_num, self.page_num);
        doc.add_text(schema.content, &self.content);
        doc.add_text(schema.content_case, &self.content);
        doc
    }
}
