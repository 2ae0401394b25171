//! folio: full-text search over a library of PDF books.
//!
//! Each PDF in the data directory is indexed page by page. Queries combine
//! case-insensitive terms, case-sensitive `+Terms`, wildcards and quoted
//! phrases; results are folded into one entry per book and streamed as
//! line-delimited JSON, either to stdout (`folio search`) or over HTTP
//! (`folio serve`).

#![warn(missing_docs)]

pub mod cli;
pub mod server;
