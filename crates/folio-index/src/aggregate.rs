//! Folding page hits into per-book results.
//!
//! The aggregator makes two passes over a [`HitSource`]. The first pass only
//! counts distinct books so progress can be reported as "book i of n". The
//! second pass builds one [`BookAggregate`] per book in first-hit order,
//! emitting a progress event whenever a new book starts.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use folio_query::SearchType;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    highlight::SnippetHighlighter,
    search::HitSource,
    stream::{EventSink, ProgressEvent, StreamClosed},
    titles::TitleCache,
};

/// All matches within one book.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookAggregate {
    /// File name of the book.
    pub filename: String,
    /// Display title.
    pub title: String,
    /// Matching page numbers.
    pub pages: BTreeSet<u64>,
    /// Snippet per matching page.
    pub snippets: BTreeMap<u64, String>,
    /// Number of matching pages.
    pub score: usize,
    /// Case-insensitive occurrences of the highlight terms over all pages.
    pub match_count: usize,
    /// Phrase or terms search.
    pub search_type: SearchType,
    /// Strings highlighted in the snippets.
    pub highlight_terms: Vec<String>,
}

/// Per-request inputs to aggregation.
#[derive(Debug, Clone, Copy)]
pub struct AggregationContext<'a> {
    /// Strings to count and highlight.
    pub highlight_terms: &'a [String],
    /// Phrase or terms search.
    pub search_type: SearchType,
    /// When set, only hits from this file are aggregated.
    pub filter: Option<&'a str>,
}

impl AggregationContext<'_> {
    /// True when hits from `filename` pass the filter.
    fn accepts(&self, filename: &str) -> bool {
        self.filter.is_none_or(|only| only == filename)
    }
}

/// Aggregates in descending score order plus the number of pages they cover.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// Books sorted by score, ties in first-hit order.
    pub books: Vec<BookAggregate>,
    /// Number of pages added across all books.
    pub total_pages: usize,
}

/// Counts case-insensitive, non-overlapping occurrences of every term in `content`.
pub fn count_matches(content: &str, terms: &[String]) -> usize {
    let content = content.to_lowercase();
    terms
        .iter()
        .filter(|term| !term.is_empty())
        .map(|term| content.matches(&term.to_lowercase()).count())
        .sum()
}

/// Folds page hits into book aggregates.
pub struct ResultAggregator<'a> {
    /// Request inputs.
    context: AggregationContext<'a>,
    /// Title lookup.
    titles: &'a TitleCache,
    /// Snippet producer.
    highlighter: &'a SnippetHighlighter,
}

impl<'a> ResultAggregator<'a> {
    /// Creates an aggregator.
    pub fn new(
        context: AggregationContext<'a>,
        titles: &'a TitleCache,
        highlighter: &'a SnippetHighlighter,
    ) -> Self {
        Self {
            context,
            titles,
            highlighter,
        }
    }

    /// Counts distinct books among the readable, accepted hits.
    fn count_books(&self, source: &impl HitSource) -> usize {
        source
            .hits()
            .filter_map(Result::ok)
            .filter(|hit| self.context.accepts(&hit.filename))
            .map(|hit| hit.filename)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Aggregates every hit, emitting search progress into `sink`.
    ///
    /// Hits that fail to load are logged and skipped. A hit for a page that
    /// is already part of its book is ignored.
    pub fn aggregate(
        &self,
        source: &impl HitSource,
        sink: &mut impl EventSink,
    ) -> Result<Aggregation, StreamClosed> {
        let total_books = self.count_books(source);
        sink.emit(ProgressEvent::Searching {
            message: "Starting search...".into(),
            total_books,
            total_pages: 0,
            current_book: None,
        })?;

        let mut books: Vec<BookAggregate> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut total_pages = 0;

        for (rank, hit) in source.hits().enumerate() {
            let hit = match hit {
                Ok(hit) => hit,
                Err(e) => {
                    warn!(rank, error = %e, "skipping unreadable hit");
                    continue;
                }
            };
            if !self.context.accepts(&hit.filename) {
                continue;
            }

            let position = match positions.get(&hit.filename) {
                Some(&position) => position,
                None => {
                    let current_book = books.len() + 1;
                    sink.emit(ProgressEvent::Searching {
                        message: format!("Processing book {current_book} of {total_books}..."),
                        total_books,
                        total_pages,
                        current_book: Some(current_book),
                    })?;
                    books.push(self.new_book(&hit.filename));
                    positions.insert(hit.filename.clone(), books.len() - 1);
                    books.len() - 1
                }
            };

            let book = &mut books[position];
            if !book.pages.insert(hit.page_num) {
                debug!(filename = %hit.filename, page = hit.page_num, "duplicate page hit");
                continue;
            }
            total_pages += 1;
            book.match_count += count_matches(&hit.content, self.context.highlight_terms);
            book.snippets
                .insert(hit.page_num, self.highlighter.snippet(&hit.content));
            book.score = book.pages.len();
        }

        books.sort_by(|a, b| b.score.cmp(&a.score));

        Ok(Aggregation { books, total_pages })
    }

    /// Starts an empty aggregate for `filename`.
    fn new_book(&self, filename: &str) -> BookAggregate {
        BookAggregate {
            filename: filename.to_string(),
            title: self.titles.title(filename),
            pages: BTreeSet::new(),
            snippets: BTreeMap::new(),
            score: 0,
            match_count: 0,
            search_type: self.context.search_type,
            highlight_terms: self.context.highlight_terms.to_vec(),
        }
    }
}
