//! Tantivy-based search over a library of PDFs.
//!
//! This crate indexes one document per PDF page and turns a raw user query
//! into a stream of per-book results:
//! - PDF text and title extraction behind [`PdfSource`]
//! - Index creation, writing and incremental updates ([`Indexer`])
//! - Query compilation onto a case-folded and a case-preserving field
//! - Folding page hits into [`BookAggregate`]s with snippets
//! - Line-delimited JSON progress events ([`ProgressEvent`], [`EventSink`])
//!
//! # Example
//!
//! ```no_run
//! use folio_config::Config;
//! use folio_index::{JsonLines, SearchService};
//!
//! let config = Config::load(".".as_ref()).unwrap();
//! let service = SearchService::open(&config).unwrap();
//!
//! let mut sink = JsonLines::new(std::io::stdout());
//! service.update_index(&mut sink).unwrap();
//! service.search("+Fest* OR \"the eternal now\"", &mut sink).unwrap();
//! ```

#![warn(missing_docs)]

mod aggregate;
mod analyzer;
mod compile;
mod document;
mod error;
mod highlight;
mod indexer;
mod pdf;
mod schema;
mod search;
mod service;
mod stream;
#[cfg(test)]
mod test_support;
mod titles;
mod writer;

pub use aggregate::{Aggregation, AggregationContext, BookAggregate, ResultAggregator, count_matches};
pub use compile::QueryCompiler;
pub use document::PageDocument;
pub use error::{IndexError, SearchError};
pub use highlight::{HighlightStrategy, SnippetHighlighter, choose_strategy};
pub use indexer::{DiscoveredPdf, IndexStats, Indexer, discover_pdfs};
pub use pdf::{LopdfSource, PdfError, PdfPage, PdfSource};
pub use schema::IndexSchema;
pub use search::{Hit, HitSource, SearchHits, Searcher};
pub use service::{Explanation, SearchService, SearchTitle};
pub use stream::{
    Completion, EventSink, JsonLines, ProgressEvent, StreamClosed, batch_count, stream_results,
};
pub use titles::{TitleCache, search_title, with_pdf_extension};
pub use writer::{IndexHandle, KeyField, PageWriter};
