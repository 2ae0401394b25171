//! Point-in-time searcher and lazily loaded hit lists.

use std::{collections::BTreeSet, str::from_utf8};

use folio_query::{Field as QueryField, Grouping, QueryError, QueryExpr, parse};
use regex::Regex;
use tantivy::{
    DocAddress, TantivyDocument, Term,
    collector::{Count, TopDocs},
    query::{Query, TermQuery},
    schema::{IndexRecordOption, Value},
};
use tracing::debug;

use crate::{
    compile::{QueryCompiler, wildcard_to_regex},
    error::{IndexError, SearchError},
    schema::IndexSchema,
};

/// Upper bound on index terms a wildcard or regex search expands to.
const MAX_EXPANDED_TERMS: usize = 256;

/// One matching page.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    /// File name of the PDF.
    pub filename: String,
    /// 1-based page number.
    pub page_num: u64,
    /// Stored page text.
    pub content: String,
    /// Engine relevance score.
    pub score: f32,
}

/// A re-iterable sequence of hits.
///
/// Every call to [`hits`](HitSource::hits) starts a fresh pass over the same
/// results.
pub trait HitSource {
    /// Number of hits.
    fn len(&self) -> usize;

    /// True when there are no hits.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over the hits in score order.
    fn hits(&self) -> impl Iterator<Item = Result<Hit, IndexError>> + '_;
}

impl HitSource for Vec<Hit> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn hits(&self) -> impl Iterator<Item = Result<Hit, IndexError>> + '_ {
        self.iter().cloned().map(Ok)
    }
}

/// A snapshot of the committed index.
///
/// Dropping the searcher releases the snapshot.
pub struct Searcher {
    /// The Tantivy searcher.
    searcher: tantivy::Searcher,
    /// Schema with field handles.
    schema: IndexSchema,
}

impl Searcher {
    /// Wraps a Tantivy searcher.
    pub(crate) fn new(searcher: tantivy::Searcher, schema: IndexSchema) -> Self {
        Self { searcher, schema }
    }

    /// Number of live page documents.
    pub fn num_docs(&self) -> u64 {
        self.searcher.num_docs()
    }

    /// Returns the schema.
    pub fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    /// Returns the underlying Tantivy searcher.
    pub(crate) fn inner(&self) -> &tantivy::Searcher {
        &self.searcher
    }

    /// Parses a query string with adjacency meaning OR and `content` as the
    /// default field.
    pub fn parse(&self, input: &str) -> Result<Option<QueryExpr>, QueryError> {
        parse(input, QueryField::Content, Grouping::Or)
    }

    /// Compiles a query tree for this index.
    pub fn compile(&self, expr: &QueryExpr) -> Result<Option<Box<dyn Query>>, QueryError> {
        QueryCompiler::new(self.schema.clone()).compile(expr)
    }

    /// Executes `expr` and returns every matching page, best score first.
    ///
    /// Stored documents are not read until the hits are iterated.
    pub fn search(&self, expr: &QueryExpr) -> Result<SearchHits<'_>, SearchError> {
        let Some(query) = self.compile(expr)? else {
            return Ok(self.no_hits());
        };

        let limit = usize::try_from(self.num_docs()).unwrap_or(usize::MAX).max(1);
        let addresses = self
            .searcher
            .search(&*query, &TopDocs::with_limit(limit))
            .map_err(|e| IndexError::search(&e))?;

        debug!(query = %expr, hits = addresses.len(), "executed query");

        Ok(SearchHits {
            searcher: self,
            query: Some(query),
            addresses,
        })
    }

    /// An empty result set, for queries with nothing to search.
    pub fn no_hits(&self) -> SearchHits<'_> {
        SearchHits {
            searcher: self,
            query: None,
            addresses: Vec::new(),
        }
    }

    /// File names with at least one live page in the index.
    pub fn indexed_filenames(&self) -> Result<BTreeSet<String>, IndexError> {
        let mut candidates = BTreeSet::new();
        for segment in self.searcher.segment_readers() {
            let inverted = segment
                .inverted_index(self.schema.filename)
                .map_err(|e| IndexError::search(&e))?;
            let mut stream = inverted
                .terms()
                .stream()
                .map_err(|e| IndexError::search(&e))?;
            while stream.advance() {
                if let Ok(name) = from_utf8(stream.key()) {
                    candidates.insert(name.to_string());
                }
            }
        }

        // The term dictionary still lists names whose pages were all deleted.
        let mut live = BTreeSet::new();
        for name in candidates {
            if self.count_filename(&name)? > 0 {
                live.insert(name);
            }
        }
        Ok(live)
    }

    /// Lowercased index terms matched by the wildcard and regex leaves of
    /// `expr`, for highlighting.
    ///
    /// Negated leaves are skipped. At most [`MAX_EXPANDED_TERMS`] terms are
    /// returned.
    pub fn expand_patterns(&self, expr: &QueryExpr) -> Result<Vec<String>, IndexError> {
        let mut leaves = Vec::new();
        pattern_leaves(expr, &mut leaves);

        let mut expanded = BTreeSet::new();
        for (field, pattern) in leaves {
            // Index regexes match whole terms.
            let Ok(regex) = Regex::new(&format!("^(?:{pattern})$")) else {
                continue;
            };
            for segment in self.searcher.segment_readers() {
                let inverted = segment
                    .inverted_index(self.schema.text_field(field))
                    .map_err(|e| IndexError::search(&e))?;
                let mut stream = inverted
                    .terms()
                    .stream()
                    .map_err(|e| IndexError::search(&e))?;
                while stream.advance() {
                    if expanded.len() >= MAX_EXPANDED_TERMS {
                        return Ok(expanded.into_iter().collect());
                    }
                    match from_utf8(stream.key()) {
                        Ok(term) if regex.is_match(term) => {
                            expanded.insert(term.to_lowercase());
                        }
                        _ => {}
                    }
                }
            }
        }
        Ok(expanded.into_iter().collect())
    }

    /// Counts live pages stored under `filename`.
    fn count_filename(&self, filename: &str) -> Result<usize, IndexError> {
        let query = TermQuery::new(
            Term::from_field_text(self.schema.filename, filename),
            IndexRecordOption::Basic,
        );
        self.searcher
            .search(&query, &Count)
            .map_err(|e| IndexError::search(&e))
    }

    /// Loads the stored fields of one page.
    fn load_hit(&self, score: f32, address: DocAddress) -> Result<Hit, IndexError> {
        let doc: TantivyDocument = self
            .searcher
            .doc(address)
            .map_err(|e| IndexError::search(&e))?;

        let text = |field, name| {
            doc.get_first(field)
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or(IndexError::MissingField(name))
        };

        Ok(Hit {
            filename: text(self.schema.filename, "filename")?,
            content: text(self.schema.content, "content")?,
            page_num: doc
                .get_first(self.schema.page_num)
                .and_then(|v| v.as_u64())
                .ok_or(IndexError::MissingField("page_num"))?,
            score,
        })
    }
}

/// Collects the field and whole-term regex of every wildcard and regex leaf
/// outside a negation.
fn pattern_leaves(expr: &QueryExpr, out: &mut Vec<(QueryField, String)>) {
    match expr {
        QueryExpr::Wildcard { field, pattern } => {
            out.push((*field, wildcard_to_regex(*field, pattern)));
        }
        QueryExpr::Regex { field, pattern } => out.push((*field, pattern.clone())),
        QueryExpr::And(exprs) | QueryExpr::Or(exprs) => {
            for expr in exprs {
                pattern_leaves(expr, out);
            }
        }
        QueryExpr::Term { .. } | QueryExpr::Phrase { .. } | QueryExpr::Not(_) => {}
    }
}

/// The results of one executed query.
pub struct SearchHits<'a> {
    /// Searcher the addresses belong to.
    searcher: &'a Searcher,
    /// The executed query, absent when it compiled to nothing.
    query: Option<Box<dyn Query>>,
    /// Scored document addresses, best first.
    addresses: Vec<(f32, DocAddress)>,
}

impl SearchHits<'_> {
    /// The executed Tantivy query.
    pub fn query(&self) -> Option<&dyn Query> {
        self.query.as_deref()
    }
}

impl HitSource for SearchHits<'_> {
    fn len(&self) -> usize {
        self.addresses.len()
    }

    fn hits(&self) -> impl Iterator<Item = Result<Hit, IndexError>> + '_ {
        self.addresses
            .iter()
            .map(|&(score, address)| self.searcher.load_hit(score, address))
    }
}

#[cfg(test)]
mod test {
    use tempfile::TempDir;

    use super::*;
    use crate::{
        document::PageDocument,
        writer::{IndexHandle, KeyField},
    };

    fn index_with(pages: &[(&str, u64, &str)]) -> (TempDir, IndexHandle) {
        let temp = TempDir::new().unwrap();
        let handle = IndexHandle::open_or_create(temp.path()).unwrap();
        {
            let mut writer = handle.writer().unwrap();
            for (filename, page_num, content) in pages {
                writer
                    .add_page(&PageDocument {
                        path: format!("/library/{filename}"),
                        filename: (*filename).into(),
                        page_num: *page_num,
                        content: (*content).into(),
                    })
                    .unwrap();
            }
            writer.commit().unwrap();
        }
        (temp, handle)
    }

    fn run(handle: &IndexHandle, query: &str) -> Vec<Hit> {
        let searcher = handle.searcher().unwrap();
        let expr = searcher.parse(query).unwrap().unwrap();
        let hits = searcher.search(&expr).unwrap();
        hits.hits().collect::<Result<_, _>>().unwrap()
    }

    #[test]
    fn finds_pages_case_insensitively() {
        let (_temp, handle) = index_with(&[("a.pdf", 1, "Das Fest"), ("a.pdf", 2, "nichts")]);
        let hits = run(&handle, "fest");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].filename, "a.pdf");
        assert_eq!(hits[0].page_num, 1);
        assert_eq!(hits[0].content, "Das Fest");
    }

    #[test]
    fn case_field_distinguishes_case() {
        let (_temp, handle) = index_with(&[("a.pdf", 1, "Das Fest"), ("b.pdf", 1, "das fest")]);
        let hits = run(&handle, "content_case:Fest");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].filename, "a.pdf");
    }

    #[test]
    fn adjacency_is_or() {
        let (_temp, handle) = index_with(&[("a.pdf", 1, "alpha"), ("b.pdf", 1, "beta")]);
        assert_eq!(run(&handle, "alpha beta").len(), 2);
        assert_eq!(run(&handle, "alpha AND beta").len(), 0);
    }

    #[test]
    fn wildcard_matches_prefix() {
        let (_temp, handle) = index_with(&[("a.pdf", 1, "Festival"), ("b.pdf", 1, "Feast")]);
        let hits = run(&handle, "fest*");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].filename, "a.pdf");
    }

    #[test]
    fn wildcard_expands_to_index_terms() {
        let (_temp, handle) = index_with(&[
            ("a.pdf", 1, "Das Festival beginnt"),
            ("a.pdf", 2, "ein fest ohne Feast"),
        ]);
        let searcher = handle.searcher().unwrap();
        let expr = searcher.parse("fest* NOT fea*").unwrap().unwrap();
        assert_eq!(searcher.expand_patterns(&expr).unwrap(), ["fest", "festival"]);
    }

    #[test]
    fn case_regex_expands_lowercased() {
        let (_temp, handle) = index_with(&[("a.pdf", 1, "Festival festlich")]);
        let searcher = handle.searcher().unwrap();
        let expr = searcher.parse(r"content_case:/Fest\w+/").unwrap().unwrap();
        assert_eq!(searcher.expand_patterns(&expr).unwrap(), ["festival"]);
    }

    #[test]
    fn negation_excludes_pages() {
        let (_temp, handle) = index_with(&[("a.pdf", 1, "alpha beta"), ("b.pdf", 1, "alpha")]);
        let hits = run(&handle, "alpha NOT beta");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].filename, "b.pdf");
    }

    #[test]
    fn hits_can_be_iterated_twice() {
        let (_temp, handle) = index_with(&[("a.pdf", 1, "fest"), ("b.pdf", 1, "fest")]);
        let searcher = handle.searcher().unwrap();
        let expr = searcher.parse("fest").unwrap().unwrap();
        let hits = searcher.search(&expr).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits.hits().count(), hits.hits().count());
    }

    #[test]
    fn empty_compiled_query_has_no_hits() {
        let (_temp, handle) = index_with(&[("a.pdf", 1, "fest")]);
        let searcher = handle.searcher().unwrap();
        let hits = searcher
            .search(&QueryExpr::term(QueryField::Content, "--"))
            .unwrap();
        assert!(hits.is_empty());
        assert!(hits.query().is_none());
    }

    #[test]
    fn indexed_filenames_skip_deleted_books() {
        let (_temp, handle) = index_with(&[
            ("a.pdf", 1, "one"),
            ("a.pdf", 2, "two"),
            ("b.pdf", 1, "three"),
        ]);
        {
            let mut writer = handle.writer().unwrap();
            writer.delete_by_field(KeyField::Filename, "a.pdf");
            writer.commit().unwrap();
        }
        let names = handle.searcher().unwrap().indexed_filenames().unwrap();
        assert_eq!(names.into_iter().collect::<Vec<_>>(), ["b.pdf"]);
    }
}
