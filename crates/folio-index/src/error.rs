//! Error types for the folio-index crate.

use std::{io, path::PathBuf};

use folio_query::{QueryError, RewriteError};
use thiserror::Error;

use crate::pdf::PdfError;

/// Errors that can occur when working with the search index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Failed to open or create the index.
    #[error("failed to open index at {path}: {message}")]
    OpenIndex {
        /// Path to the index directory.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Failed to write to the index.
    #[error("failed to write to index: {0}")]
    Write(String),

    /// Failed to commit changes to the index.
    #[error("failed to commit index: {0}")]
    Commit(String),

    /// Failed to execute a search or read a stored document.
    #[error("search failed: {0}")]
    Search(String),

    /// A stored document is missing a required field.
    #[error("stored document is missing field {0}")]
    MissingField(&'static str),

    /// Text extraction from a PDF failed.
    #[error(transparent)]
    Pdf(#[from] PdfError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl IndexError {
    /// Creates an `OpenIndex` error from a path and Tantivy error.
    pub(crate) fn open_index(path: PathBuf, source: &tantivy::TantivyError) -> Self {
        Self::OpenIndex {
            path,
            message: source.to_string(),
        }
    }

    /// Creates a `Write` error from a Tantivy error.
    pub(crate) fn write(source: &tantivy::TantivyError) -> Self {
        Self::Write(source.to_string())
    }

    /// Creates a `Commit` error from a Tantivy error.
    pub(crate) fn commit(source: &tantivy::TantivyError) -> Self {
        Self::Commit(source.to_string())
    }

    /// Creates a `Search` error from any displayable source.
    pub(crate) fn search(source: &impl ToString) -> Self {
        Self::Search(source.to_string())
    }
}

/// Errors that end a search request before any results are produced.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The rewritten query failed to parse or compile.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// A placeholder could not be substituted.
    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    /// The index could not be read.
    #[error(transparent)]
    Index(#[from] IndexError),
}
