//! The search service: one object owning the index, the title cache and the
//! settings, shared by the CLI and the HTTP server.

use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
};

use folio_config::{Config, SearchSettings};
use folio_query::{PreparedQuery, QueryExpr, preprocess, rewrite};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    aggregate::{AggregationContext, ResultAggregator},
    error::{IndexError, SearchError},
    highlight::{HighlightStrategy, SnippetHighlighter, choose_strategy},
    indexer::{IndexStats, Indexer},
    pdf::{LopdfSource, PdfSource},
    search::{HitSource, SearchHits, Searcher},
    stream::{EventSink, ProgressEvent, StreamClosed, stream_results},
    titles::{TitleCache, search_title},
    writer::IndexHandle,
};

/// How a raw query was interpreted.
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    /// Preprocessing output.
    pub prepared: PreparedQuery,
    /// The parsed tree before placeholder substitution.
    pub parsed: Option<String>,
    /// The tree that is executed, in query syntax.
    pub rewritten: Option<String>,
    /// Number of matching pages.
    pub hit_count: usize,
    /// Highlighter the search would use.
    pub highlighter: String,
}

/// A title lookup for search purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchTitle {
    /// Title with any volume prefix removed.
    pub title: String,
    /// File name the title belongs to.
    pub filename: String,
}

/// The query after preprocessing, parsing and rewriting.
struct Plan {
    /// Preprocessing output.
    prepared: PreparedQuery,
    /// Parsed tree with placeholders.
    parsed: Option<QueryExpr>,
    /// Tree with placeholders substituted.
    rewritten: Option<QueryExpr>,
}

/// Full-text search and indexing over one PDF library.
pub struct SearchService {
    /// The index.
    handle: IndexHandle,
    /// Page and metadata extractor.
    source: Arc<dyn PdfSource>,
    /// Book titles.
    titles: TitleCache,
    /// Directory holding the PDFs.
    data_dir: PathBuf,
    /// Search tuning.
    settings: SearchSettings,
}

impl SearchService {
    /// Opens the service for `config`, reading PDFs with `lopdf`.
    pub fn open(config: &Config) -> Result<Self, IndexError> {
        Self::with_source(config, Arc::new(LopdfSource))
    }

    /// Opens the service for `config` with a custom PDF reader.
    pub fn with_source(config: &Config, source: Arc<dyn PdfSource>) -> Result<Self, IndexError> {
        let handle = IndexHandle::open_or_create(&config.library.index_dir)?;
        let capacity = NonZeroUsize::new(config.titles.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        let titles = TitleCache::new(&config.library.data_dir, source.clone(), capacity);

        Ok(Self {
            handle,
            source,
            titles,
            data_dir: config.library.data_dir.clone(),
            settings: config.search.clone(),
        })
    }

    /// The directory holding the PDFs.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The title cache.
    pub fn titles(&self) -> &TitleCache {
        &self.titles
    }

    /// Runs a search, streaming progress and results into `sink`.
    ///
    /// A query that fails to parse or compile produces a single error event.
    /// An index failure after that produces an empty completion carrying the
    /// error.
    pub fn search(&self, raw: &str, sink: &mut impl EventSink) -> Result<(), StreamClosed> {
        let searcher = match self.handle.searcher() {
            Ok(searcher) => searcher,
            Err(e) => {
                warn!(query = raw, error = %e, "search failed");
                return sink.emit(ProgressEvent::search_failed(e));
            }
        };

        let (plan, hits, highlighter) = match self.prepare(&searcher, raw) {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!(query = raw, error = %e, "search failed");
                return sink.emit(failure_event(e));
            }
        };

        info!(
            query = raw,
            modified = plan.prepared.modified_query(),
            hits = hits.len(),
            highlighter = %highlighter.strategy(),
            "searching"
        );

        let context = AggregationContext {
            highlight_terms: plan.prepared.highlight_terms(),
            search_type: plan.prepared.search_type(),
            filter: self.settings.debug_filename.as_deref(),
        };
        let aggregation =
            ResultAggregator::new(context, &self.titles, &highlighter).aggregate(&hits, sink)?;

        info!(
            books = aggregation.books.len(),
            pages = aggregation.total_pages,
            "search complete"
        );

        stream_results(
            aggregation.books,
            aggregation.total_pages,
            self.settings.batch_size,
            sink,
        )
    }

    /// Interprets and executes `raw` without aggregating the results.
    pub fn explain(&self, raw: &str) -> Result<Explanation, SearchError> {
        let searcher = self.handle.searcher()?;
        let (plan, hits, highlighter) = self.prepare(&searcher, raw)?;
        Ok(Explanation {
            hit_count: hits.len(),
            highlighter: highlighter.strategy().to_string(),
            parsed: plan.parsed.as_ref().map(ToString::to_string),
            rewritten: plan.rewritten.as_ref().map(QueryExpr::to_query_string),
            prepared: plan.prepared,
        })
    }

    /// Preprocesses, parses, rewrites and executes a query, then picks the
    /// highlighter.
    fn prepare<'s>(
        &self,
        searcher: &'s Searcher,
        raw: &str,
    ) -> Result<(Plan, SearchHits<'s>, SnippetHighlighter), SearchError> {
        let plan = plan(searcher, raw)?;
        let hits = match &plan.rewritten {
            Some(expr) => searcher.search(expr)?,
            None => searcher.no_hits(),
        };
        let strategy: HighlightStrategy = choose_strategy(
            hits.len(),
            self.settings.fast_highlight_threshold,
            &plan.prepared,
        );
        let mut terms = plan.prepared.highlight_terms().to_vec();
        if let (HighlightStrategy::Library, Some(expr)) = (strategy, &plan.rewritten) {
            // The engine highlighter sees no terms inside regex queries.
            terms.extend(searcher.expand_patterns(expr)?);
        }
        let highlighter = SnippetHighlighter::new(strategy, searcher, hits.query(), &terms)?;
        Ok((plan, hits, highlighter))
    }

    /// Removes stale books and indexes new ones.
    pub fn update_index(&self, sink: &mut impl EventSink) -> Result<IndexStats, StreamClosed> {
        Indexer::new(&self.handle, self.source.as_ref(), &self.data_dir).update(sink)
    }

    /// Clears the index and indexes every PDF again.
    pub fn rebuild_index(&self, sink: &mut impl EventSink) -> Result<IndexStats, StreamClosed> {
        Indexer::new(&self.handle, self.source.as_ref(), &self.data_dir).rebuild(sink)
    }

    /// Display title for `filename`.
    pub fn title(&self, filename: &str) -> String {
        self.titles.title(filename)
    }

    /// Title for `filename` with its volume prefix stripped, or `None` when
    /// the file is not in the library.
    pub fn search_title(&self, filename: &str) -> Option<SearchTitle> {
        self.titles.library_file(filename)?;
        Some(SearchTitle {
            title: search_title(&self.titles.title(filename)),
            filename: filename.to_string(),
        })
    }
}

/// The event reporting a search that did not produce results.
///
/// Rejected queries end the stream with a bare error. Index failures end it
/// with an empty completion.
fn failure_event(error: SearchError) -> ProgressEvent {
    match error {
        SearchError::Index(e) => ProgressEvent::search_failed(e),
        rejected => ProgressEvent::error(rejected),
    }
}

/// Preprocesses, parses and rewrites a raw query.
fn plan(searcher: &Searcher, raw: &str) -> Result<Plan, SearchError> {
    let prepared = preprocess(raw);
    let parsed = searcher.parse(prepared.modified_query())?;
    let rewritten = parsed
        .as_ref()
        .map(|expr| rewrite(expr, prepared.wildcard_descriptors()))
        .transpose()?;
    Ok(Plan {
        prepared,
        parsed,
        rewritten,
    })
}

#[cfg(test)]
mod test {
    use std::fs;

    use folio_query::SearchType;
    use tempfile::TempDir;

    use super::*;
    use crate::{aggregate::BookAggregate, stream::Completion, test_support::TextPdfSource};

    struct Fixture {
        _temp: TempDir,
        service: SearchService,
    }

    fn config(root: &Path) -> Config {
        let mut config = Config::default();
        config.library.data_dir = root.join("data");
        config.library.index_dir = root.join("index");
        config
    }

    fn fixture(books: &[(&str, &[&str])]) -> Fixture {
        fixture_with(books, |_| {})
    }

    fn fixture_with(books: &[(&str, &[&str])], tweak: impl FnOnce(&mut Config)) -> Fixture {
        let temp = TempDir::new().unwrap();
        let mut config = config(temp.path());
        tweak(&mut config);
        fs::create_dir_all(&config.library.data_dir).unwrap();
        for (name, pages) in books {
            fs::write(config.library.data_dir.join(name), pages.join("\x0C")).unwrap();
        }
        let service = SearchService::with_source(&config, Arc::new(TextPdfSource)).unwrap();
        service.update_index(&mut Vec::new()).unwrap();
        Fixture {
            _temp: temp,
            service,
        }
    }

    fn search(service: &SearchService, query: &str) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        service.search(query, &mut events).unwrap();
        events
    }

    fn results(events: &[ProgressEvent]) -> Vec<BookAggregate> {
        events
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::Batch { results, .. } => Some(results.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn pages(book: &BookAggregate) -> Vec<u64> {
        book.pages.iter().copied().collect()
    }

    #[test]
    fn case_sensitive_prefix_wildcard() {
        let fixture = fixture(&[(
            "a.pdf",
            &["Das Fest beginnt", "ein fest", "Festival", "Feast"],
        )]);
        let events = search(&fixture.service, "+Fest*");
        let books = results(&events);

        assert_eq!(books.len(), 1);
        assert_eq!(pages(&books[0]), [1, 3]);
        assert!(books[0].snippets.values().all(|s| s.contains(r#"<b class="match">"#)));
        assert_eq!(books[0].highlight_terms, ["Fest"]);
    }

    #[test]
    fn case_sensitive_question_wildcard() {
        let fixture = fixture(&[("a.pdf", &["Fest", "Fast", "fest", "Feast"])]);
        let books = results(&search(&fixture.service, "+F?st"));
        assert_eq!(pages(&books[0]), [1, 2]);
    }

    #[test]
    fn exact_case_marker() {
        let fixture = fixture(&[("a.pdf", &["Fest", "fest", "FEST"])]);
        let books = results(&search(&fixture.service, "+Fest"));
        assert_eq!(pages(&books[0]), [1]);
    }

    #[test]
    fn bare_wildcard_includes_base_term() {
        let fixture = fixture(&[("a.pdf", &["fest", "Festival", "Feast"])]);
        let books = results(&search(&fixture.service, "fest*"));
        assert_eq!(pages(&books[0]), [1, 2]);
        assert_eq!(books[0].search_type, SearchType::Terms);
    }

    #[test]
    fn prefix_only_page_is_highlighted() {
        let fixture = fixture(&[(
            "a.pdf",
            &["Das Festival beginnt heute abend", "ein fest"],
        )]);
        let explanation = fixture.service.explain("fest*").unwrap();
        assert_eq!(explanation.highlighter, "library");

        let books = results(&search(&fixture.service, "fest*"));
        assert_eq!(pages(&books[0]), [1, 2]);
        assert!(books[0].snippets[&1].contains("<b>Festival</b>"));
        assert!(books[0].snippets[&2].contains("<b>fest</b>"));
    }

    #[test]
    fn phrase_or_term() {
        let fixture = fixture(&[
            ("a.pdf", &["the eternal now", "eternal and now"]),
            ("b.pdf", &["nothing here", "boo"]),
        ]);
        let events = search(&fixture.service, "(\"eternal now\" OR boo)");
        let books = results(&events);

        assert_eq!(books.len(), 2);
        let a = books.iter().find(|b| b.filename == "a.pdf").unwrap();
        let b = books.iter().find(|b| b.filename == "b.pdf").unwrap();
        assert_eq!(pages(a), [1]);
        assert_eq!(pages(b), [2]);
        assert_eq!(a.search_type, SearchType::Phrase);
        assert_eq!(a.highlight_terms, ["eternal now", "boo"]);
        assert!(a.snippets[&1].contains(r#"<b class="match">eternal now</b>"#));
    }

    #[test]
    fn books_are_sorted_by_page_count() {
        let fixture = fixture(&[
            ("a.pdf", &["fest"]),
            ("b.pdf", &["fest", "fest", "fest"]),
        ]);
        let books = results(&search(&fixture.service, "fest"));
        assert_eq!(books[0].filename, "b.pdf");
        assert_eq!(books[0].score, 3);
        assert_eq!(books[0].match_count, 3);
        assert_eq!(books[1].score, 1);
    }

    #[test]
    fn event_order() {
        let fixture = fixture(&[("a.pdf", &["fest"]), ("b.pdf", &["fest"])]);
        let events = search(&fixture.service, "fest");

        assert!(matches!(
            &events[0],
            ProgressEvent::Searching { current_book: None, total_books: 2, .. }
        ));
        assert!(matches!(
            &events[1],
            ProgressEvent::Searching { current_book: Some(1), .. }
        ));
        assert!(matches!(
            &events[2],
            ProgressEvent::Searching { current_book: Some(2), .. }
        ));
        assert_eq!(
            events[3],
            ProgressEvent::Complete(Completion::Search {
                total_books: 2,
                total_pages: 2,
                batch_count: 1,
                error: None,
            })
        );
        assert!(matches!(&events[4], ProgressEvent::Batch { batch_number: 1, .. }));
        assert_eq!(events.len(), 5);
    }

    #[test]
    fn results_are_batched() {
        let names: Vec<String> = (0..25).map(|n| format!("book{n:02}.pdf")).collect();
        let books: Vec<(&str, &[&str])> = names
            .iter()
            .map(|name| (name.as_str(), &["fest"][..]))
            .collect();
        let fixture = fixture_with(&books, |config| config.search.batch_size = 10);
        let events = search(&fixture.service, "fest");

        let sizes: Vec<usize> = events
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::Batch { results, .. } => Some(results.len()),
                _ => None,
            })
            .collect();
        assert_eq!(sizes, [10, 10, 5]);
    }

    #[test]
    fn syntax_error_is_a_single_error_event() {
        let fixture = fixture(&[("a.pdf", &["fest"])]);
        let events = search(&fixture.service, "(fest");
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ProgressEvent::Error { .. }));
    }

    #[test]
    fn invalid_regex_is_a_single_error_event() {
        let fixture = fixture(&[("a.pdf", &["fest"])]);
        let events = search(&fixture.service, "content_case:/[unclosed/");
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ProgressEvent::Error { .. }));
    }

    #[test]
    fn index_failure_completes_with_error() {
        let event = failure_event(SearchError::Index(IndexError::Search("disk gone".into())));
        assert_eq!(
            event,
            ProgressEvent::Complete(Completion::Search {
                total_books: 0,
                total_pages: 0,
                batch_count: 0,
                error: Some("search failed: disk gone".into()),
            })
        );

        let fixture = fixture(&[("a.pdf", &["fest"])]);
        let rejected = fixture.service.explain("(fest").unwrap_err();
        assert!(matches!(failure_event(rejected), ProgressEvent::Error { .. }));
    }

    #[test]
    fn debug_filter_limits_results() {
        let fixture = fixture_with(
            &[("a.pdf", &["fest"]), ("GA_004.pdf", &["fest"])],
            |config| config.search.debug_filename = Some("GA_004.pdf".into()),
        );
        let books = results(&search(&fixture.service, "fest"));
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].filename, "GA_004.pdf");
    }

    #[test]
    fn titles_come_from_metadata() {
        let fixture = fixture(&[("a.pdf", &["Title: GA 4 - Die Philosophie\nfest"])]);
        let books = results(&search(&fixture.service, "fest"));
        assert_eq!(books[0].title, "GA 4 - Die Philosophie");
        assert_eq!(
            fixture.service.search_title("a.pdf"),
            Some(SearchTitle {
                title: "Die Philosophie".into(),
                filename: "a.pdf".into()
            })
        );
        assert_eq!(fixture.service.search_title("missing.pdf"), None);
    }

    #[test]
    fn explain_shows_rewritten_query() {
        let fixture = fixture(&[("a.pdf", &["Fest", "Festival"])]);
        let explanation = fixture.service.explain("+Fest*").unwrap();
        assert_eq!(explanation.prepared.modified_query(), "cswild0marker");
        let rewritten = explanation.rewritten.unwrap();
        assert!(rewritten.contains("content_case:Fest"));
        assert!(!rewritten.contains("cswild"));
        assert_eq!(explanation.hit_count, 2);
        assert_eq!(explanation.highlighter, "fast");
    }

    #[test]
    fn empty_index_yields_empty_completion() {
        let fixture = fixture(&[]);
        let events = search(&fixture.service, "fest");
        assert_eq!(
            events.last(),
            Some(&ProgressEvent::Complete(Completion::Search {
                total_books: 0,
                total_pages: 0,
                batch_count: 0,
                error: None,
            }))
        );
    }
}
