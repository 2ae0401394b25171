//! Index schema definition for the folio search index.
//!
//! One tantivy document per PDF page:
//! - `path`: absolute path of the PDF (string, stored)
//! - `filename`: file name, the grouping and deletion key (string, stored, fast)
//! - `page_num`: 1-based page number (u64, stored, indexed, fast)
//! - `content`: page text, case-folded (text, stored, positions)
//! - `content_case`: page text, case preserved (text, stored, positions)

use folio_query::Field as QueryField;
use tantivy::schema::{
    FAST, Field, INDEXED, IndexRecordOption, STORED, STRING, Schema, TextFieldIndexing,
    TextOptions,
};

use crate::analyzer::{CASE_TOKENIZER, TEXT_TOKENIZER};

/// Handles to all fields in the index schema.
#[derive(Debug, Clone)]
pub struct IndexSchema {
    /// The underlying Tantivy schema.
    schema: Schema,
    /// Absolute path of the source PDF.
    pub path: Field,
    /// File name of the source PDF.
    pub filename: Field,
    /// 1-based page number.
    pub page_num: Field,
    /// Case-folded page text.
    pub content: Field,
    /// Case-preserving page text.
    pub content_case: Field,
}

impl IndexSchema {
    /// Creates a new index schema with all fields configured.
    pub fn new() -> Self {
        let mut builder = Schema::builder();

        let path = builder.add_text_field("path", STRING | STORED);
        let filename = builder.add_text_field("filename", STRING | STORED | FAST);
        let page_num = builder.add_u64_field("page_num", STORED | INDEXED | FAST);
        let content = builder.add_text_field("content", text_options(TEXT_TOKENIZER));
        let content_case = builder.add_text_field("content_case", text_options(CASE_TOKENIZER));

        Self {
            schema: builder.build(),
            path,
            filename,
            page_num,
            content,
            content_case,
        }
    }

    /// Returns the underlying Tantivy schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Maps a query-language field to its index field.
    pub fn text_field(&self, field: QueryField) -> Field {
        match field {
            QueryField::Content => self.content,
            QueryField::ContentCase => self.content_case,
        }
    }
}

impl Default for IndexSchema {
    fn default() -> Self {
        Self::new()
    }
}

/// Stored, positional text options with the given tokenizer.
fn text_options(tokenizer: &str) -> TextOptions {
    TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(tokenizer)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        )
        .set_stored()
}

#[cfg(test)]
mod test {
    use tantivy::schema::FieldType;

    use super::*;

    #[test]
    fn schema_has_all_fields() {
        let schema = IndexSchema::new();
        let names: Vec<_> = schema
            .schema()
            .fields()
            .map(|(_, entry)| entry.name().to_string())
            .collect();
        assert_eq!(
            names,
            ["path", "filename", "page_num", "content", "content_case"]
        );
    }

    #[test]
    fn text_fields_use_their_tokenizers() {
        let schema = IndexSchema::new();
        for (field, tokenizer) in [
            (QueryField::Content, TEXT_TOKENIZER),
            (QueryField::ContentCase, CASE_TOKENIZER),
        ] {
            let entry = schema.schema().get_field_entry(schema.text_field(field));
            let FieldType::Str(options) = entry.field_type() else {
                panic!("{field} is not a text field");
            };
            let indexing = options.get_indexing_options().unwrap();
            assert_eq!(indexing.tokenizer(), tokenizer);
            assert!(options.is_stored());
        }
    }

    #[test]
    fn filename_is_raw_and_fast() {
        let schema = IndexSchema::new();
        let entry = schema.schema().get_field_entry(schema.filename);
        assert!(entry.is_fast());
        assert!(entry.is_indexed());
        assert!(entry.is_stored());
    }
}
