//! Progress events and their line-delimited JSON transport.
//!
//! Indexing and search report progress as an ordered sequence of
//! [`ProgressEvent`]s pushed into an [`EventSink`]. The wire shape of every
//! event is a single JSON object:
//!
//! ```text
//! {"status":"cleanup","message":"Removed 1 deleted book from index"}
//! {"status":"indexing","current":1,"total":3,"filename":"GA_004.pdf"}
//! {"status":"searching","message":"Starting search...","total_books":2,"total_pages":0}
//! {"status":"complete","total_books":2,"total_pages":5,"batch_count":1}
//! {"status":"complete","total_books":0,"total_pages":0,"batch_count":0,"error":"search failed: ..."}
//! {"status":"batch","batch_number":1,"results":[...]}
//! {"error":"Data directory not found"}
//! ```

use std::{
    fmt,
    io::{self, Write},
};

use serde::{Serialize, Serializer, ser::SerializeMap};
use thiserror::Error;

use crate::aggregate::BookAggregate;

/// The consumer of an event stream has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event stream closed")]
pub struct StreamClosed;

/// Final summary of an indexing run or a search.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Indexing finished.
    Indexing {
        /// Human-readable outcome.
        message: String,
    },
    /// All aggregates are ready; batches follow.
    Search {
        /// Number of books with matches.
        total_books: usize,
        /// Number of matching pages.
        total_pages: usize,
        /// Number of batch events that follow.
        batch_count: usize,
        /// Why an accepted search produced no results.
        error: Option<String>,
    },
}

/// One progress report.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Stale books were removed from the index.
    Cleanup {
        /// Human-readable outcome.
        message: String,
    },
    /// A book is about to be indexed.
    Indexing {
        /// 1-based position among new books.
        current: usize,
        /// Number of new books.
        total: usize,
        /// File name of the book.
        filename: String,
    },
    /// Search progress.
    Searching {
        /// Human-readable progress.
        message: String,
        /// Books with matches.
        total_books: usize,
        /// Pages processed so far.
        total_pages: usize,
        /// 1-based position of the book being processed.
        current_book: Option<usize>,
    },
    /// A slice of the sorted aggregates.
    Batch {
        /// 1-based batch number.
        batch_number: usize,
        /// Aggregates in this batch.
        results: Vec<BookAggregate>,
    },
    /// The operation finished.
    Complete(Completion),
    /// A failure. Fatal for the request unless more events follow.
    Error {
        /// Error message.
        error: String,
    },
}

impl ProgressEvent {
    /// Creates an error event.
    pub fn error(error: impl fmt::Display) -> Self {
        Self::Error {
            error: error.to_string(),
        }
    }

    /// Creates the empty completion of a search that failed after its query
    /// was accepted.
    pub fn search_failed(error: impl fmt::Display) -> Self {
        Self::Complete(Completion::Search {
            total_books: 0,
            total_pages: 0,
            batch_count: 0,
            error: Some(error.to_string()),
        })
    }
}

impl Serialize for ProgressEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            Self::Cleanup { message } => {
                map.serialize_entry("status", "cleanup")?;
                map.serialize_entry("message", message)?;
            }
            Self::Indexing {
                current,
                total,
                filename,
            } => {
                map.serialize_entry("status", "indexing")?;
                map.serialize_entry("current", current)?;
                map.serialize_entry("total", total)?;
                map.serialize_entry("filename", filename)?;
            }
            Self::Searching {
                message,
                total_books,
                total_pages,
                current_book,
            } => {
                map.serialize_entry("status", "searching")?;
                map.serialize_entry("message", message)?;
                if let Some(current) = current_book {
                    map.serialize_entry("current_book", current)?;
                }
                map.serialize_entry("total_books", total_books)?;
                map.serialize_entry("total_pages", total_pages)?;
            }
            Self::Batch {
                batch_number,
                results,
            } => {
                map.serialize_entry("status", "batch")?;
                map.serialize_entry("batch_number", batch_number)?;
                map.serialize_entry("results", results)?;
            }
            Self::Complete(Completion::Indexing { message }) => {
                map.serialize_entry("status", "complete")?;
                map.serialize_entry("message", message)?;
            }
            Self::Complete(Completion::Search {
                total_books,
                total_pages,
                batch_count,
                error,
            }) => {
                map.serialize_entry("status", "complete")?;
                map.serialize_entry("total_books", total_books)?;
                map.serialize_entry("total_pages", total_pages)?;
                map.serialize_entry("batch_count", batch_count)?;
                if let Some(error) = error {
                    map.serialize_entry("error", error)?;
                }
            }
            Self::Error { error } => {
                map.serialize_entry("error", error)?;
            }
        }
        map.end()
    }
}

/// Receives progress events in production order.
pub trait EventSink {
    /// Delivers one event. Fails once the consumer is gone, after which the
    /// producer stops.
    fn emit(&mut self, event: ProgressEvent) -> Result<(), StreamClosed>;
}

impl EventSink for Vec<ProgressEvent> {
    fn emit(&mut self, event: ProgressEvent) -> Result<(), StreamClosed> {
        self.push(event);
        Ok(())
    }
}

/// Writes each event as one line of JSON.
pub struct JsonLines<W: Write> {
    /// Destination.
    writer: W,
    /// Number of failures written.
    errors: usize,
}

impl<W: Write> JsonLines<W> {
    /// Wraps a writer.
    pub fn new(writer: W) -> Self {
        Self { writer, errors: 0 }
    }

    /// Number of error events and failed completions written so far.
    pub fn errors(&self) -> usize {
        self.errors
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Serializes and flushes one line.
    fn write_line(&mut self, event: &ProgressEvent) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

impl<W: Write> EventSink for JsonLines<W> {
    fn emit(&mut self, event: ProgressEvent) -> Result<(), StreamClosed> {
        if matches!(
            event,
            ProgressEvent::Error { .. }
                | ProgressEvent::Complete(Completion::Search { error: Some(_), .. })
        ) {
            self.errors += 1;
        }
        self.write_line(&event).map_err(|_| StreamClosed)
    }
}

/// Number of batches needed for `total` aggregates.
pub fn batch_count(total: usize, batch_size: usize) -> usize {
    total.div_ceil(batch_size.max(1))
}

/// Emits the search summary followed by the aggregates in numbered batches.
pub fn stream_results(
    books: Vec<BookAggregate>,
    total_pages: usize,
    batch_size: usize,
    sink: &mut impl EventSink,
) -> Result<(), StreamClosed> {
    let batch_size = batch_size.max(1);
    let total_books = books.len();

    sink.emit(ProgressEvent::Complete(Completion::Search {
        total_books,
        total_pages,
        batch_count: batch_count(total_books, batch_size),
        error: None,
    }))?;

    let mut books = books.into_iter().peekable();
    let mut batch_number = 0;
    while books.peek().is_some() {
        batch_number += 1;
        let results: Vec<BookAggregate> = books.by_ref().take(batch_size).collect();
        sink.emit(ProgressEvent::Batch {
            batch_number,
            results,
        })?;
    }
    Ok(())
}
