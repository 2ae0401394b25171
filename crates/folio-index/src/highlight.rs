//! Snippet highlighting.
//!
//! Two strategies produce the per-page snippet:
//!
//! - [`HighlightStrategy::Fast`] finds the first occurrence of a highlight term,
//!   cuts a window around it and bolds every term occurrence inside.
//! - [`HighlightStrategy::Library`] asks Tantivy's `SnippetGenerator` for the
//!   best fragment of the `content` field.
//!
//! The strategy is picked once per search by [`choose_strategy`].

use std::{cmp::Reverse, fmt};

use folio_query::{PreparedQuery, SearchType};
use regex::{Regex, RegexBuilder};
use tantivy::{
    Term,
    query::{BooleanQuery, Occur, Query, TermQuery},
    schema::IndexRecordOption,
    snippet::SnippetGenerator,
};

use crate::{
    analyzer::{build_text_analyzer, tokenize},
    error::IndexError,
    search::Searcher,
};

/// Characters shown either side of the first match by the fast highlighter.
const WINDOW_RADIUS: usize = 100;

/// Characters shown when no highlight term occurs in the page.
const NO_MATCH_PREFIX: usize = 200;

/// Characters shown when the highlighter produced nothing.
const FALLBACK_PREFIX: usize = 300;

/// Maximum fragment size for the library highlighter.
const LIBRARY_MAX_CHARS: usize = 200;

/// How snippets are produced for one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightStrategy {
    /// Manual window and bolding.
    Fast,
    /// Tantivy's snippet generator.
    Library,
}

impl fmt::Display for HighlightStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fast => write!(f, "fast"),
            Self::Library => write!(f, "library"),
        }
    }
}

/// Picks the highlighter for a search.
///
/// Large result sets, phrase searches and case-sensitive searches use the
/// fast highlighter. The engine highlighter knows nothing about the
/// case-preserving field.
pub fn choose_strategy(
    hit_count: usize,
    threshold: usize,
    prepared: &PreparedQuery,
) -> HighlightStrategy {
    if hit_count > threshold
        || prepared.search_type() == SearchType::Phrase
        || prepared.has_case_sensitive_terms()
    {
        HighlightStrategy::Fast
    } else {
        HighlightStrategy::Library
    }
}

/// Produces snippets for the pages of one search.
pub struct SnippetHighlighter {
    /// Selected strategy.
    strategy: HighlightStrategy,
    /// Per-term case-insensitive finders, in highlight order.
    finders: Vec<Regex>,
    /// Alternation of all terms, longest first.
    marker: Option<Regex>,
    /// Engine snippet generator, library strategy only.
    generator: Option<SnippetGenerator>,
}

impl SnippetHighlighter {
    /// Creates a fast highlighter for `terms`.
    pub fn fast(terms: &[String]) -> Self {
        let terms: Vec<&str> = terms
            .iter()
            .map(String::as_str)
            .filter(|t| !t.is_empty())
            .collect();

        let finders = terms
            .iter()
            .filter_map(|t| case_insensitive(&regex::escape(t)))
            .collect();

        let mut by_length = terms.clone();
        by_length.sort_by_key(|t| Reverse(t.chars().count()));
        let alternation = by_length
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");
        let marker = if alternation.is_empty() {
            None
        } else {
            case_insensitive(&alternation)
        };

        Self {
            strategy: HighlightStrategy::Fast,
            finders,
            marker,
            generator: None,
        }
    }

    /// Creates a library highlighter from the executed query plus term
    /// queries for every highlight term.
    pub fn library(
        searcher: &Searcher,
        query: Option<&dyn Query>,
        terms: &[String],
    ) -> Result<Self, IndexError> {
        let field = searcher.schema().content;
        let mut analyzer = build_text_analyzer();

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        if let Some(query) = query {
            clauses.push((Occur::Should, query.box_clone()));
        }
        for term in terms {
            for token in tokenize(&mut analyzer, term) {
                clauses.push((
                    Occur::Should,
                    Box::new(TermQuery::new(
                        Term::from_field_text(field, &token),
                        IndexRecordOption::WithFreqsAndPositions,
                    )),
                ));
            }
        }

        let highlight_query = BooleanQuery::new(clauses);
        let mut generator = SnippetGenerator::create(searcher.inner(), &highlight_query, field)
            .map_err(|e| IndexError::search(&e))?;
        generator.set_max_num_chars(LIBRARY_MAX_CHARS);

        Ok(Self {
            strategy: HighlightStrategy::Library,
            finders: Vec::new(),
            marker: None,
            generator: Some(generator),
        })
    }

    /// Creates a highlighter using `strategy`.
    pub fn new(
        strategy: HighlightStrategy,
        searcher: &Searcher,
        query: Option<&dyn Query>,
        terms: &[String],
    ) -> Result<Self, IndexError> {
        match strategy {
            HighlightStrategy::Fast => Ok(Self::fast(terms)),
            HighlightStrategy::Library => Self::library(searcher, query, terms),
        }
    }

    /// The strategy in use.
    pub fn strategy(&self) -> HighlightStrategy {
        self.strategy
    }

    /// Returns the snippet for one page. Never empty unless the page is.
    pub fn snippet(&self, content: &str) -> String {
        let snippet = match &self.generator {
            Some(generator) => generator.snippet(content).to_html(),
            None => self.fast_snippet(content),
        };

        if snippet.is_empty() {
            format!("{}...", char_prefix(content, FALLBACK_PREFIX))
        } else {
            snippet
        }
    }

    /// Windowed, bolded snippet around the first term occurrence.
    fn fast_snippet(&self, content: &str) -> String {
        let Some(position) = self
            .finders
            .iter()
            .find_map(|finder| finder.find(content).map(|m| m.start()))
        else {
            return char_prefix(content, NO_MATCH_PREFIX).to_string();
        };

        let center = content[..position].chars().count();
        let window = char_slice(
            content,
            center.saturating_sub(WINDOW_RADIUS),
            center + WINDOW_RADIUS,
        );

        let highlighted = match &self.marker {
            Some(marker) => marker
                .replace_all(window, r#"<b class="match">$0</b>"#)
                .into_owned(),
            None => window.to_string(),
        };

        format!("...{highlighted}...")
    }
}

/// Compiles a case-insensitive pattern. Escaped literals always compile.
fn case_insensitive(pattern: &str) -> Option<Regex> {
    RegexBuilder::new(pattern).case_insensitive(true).build().ok()
}

/// The first `count` characters of `text`.
fn char_prefix(text: &str, count: usize) -> &str {
    char_slice(text, 0, count)
}

/// Characters `start..end` of `text`, clamped to its length.
fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let byte_at = |n: usize| {
        text.char_indices()
            .nth(n)
            .map_or(text.len(), |(index, _)| index)
    };
    let from = byte_at(start);
    let to = byte_at(end).max(from);
    &text[from..to]
}

#[cfg(test)]
mod test {
    use folio_query::preprocess;
    use tempfile::TempDir;

    use super::*;
    use crate::{document::PageDocument, writer::IndexHandle};

    fn terms(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| (*t).to_string()).collect()
    }

    #[test]
    fn strategy_depends_on_count_phrase_and_case() {
        let plain = preprocess("fest");
        assert_eq!(choose_strategy(200, 200, &plain), HighlightStrategy::Library);
        assert_eq!(choose_strategy(201, 200, &plain), HighlightStrategy::Fast);

        let phrase = preprocess("\"das fest\"");
        assert_eq!(choose_strategy(1, 200, &phrase), HighlightStrategy::Fast);

        let case = preprocess("+Fest");
        assert_eq!(choose_strategy(1, 200, &case), HighlightStrategy::Fast);
    }

    #[test]
    fn fast_snippet_bolds_all_terms() {
        let highlighter = SnippetHighlighter::fast(&terms(&["fest"]));
        assert_eq!(
            highlighter.snippet("Das Fest und das fest"),
            r#"...Das <b class="match">Fest</b> und das <b class="match">fest</b>..."#
        );
    }

    #[test]
    fn fast_snippet_windows_around_first_match() {
        let content = format!("{}Fest{}", "a".repeat(150), "b".repeat(150));
        let snippet = SnippetHighlighter::fast(&terms(&["fest"])).snippet(&content);
        let expected = format!(
            r#"...{}<b class="match">Fest</b>{}..."#,
            "a".repeat(100),
            "b".repeat(96)
        );
        assert_eq!(snippet, expected);
    }

    #[test]
    fn first_term_in_list_order_picks_window() {
        let content = format!("zwei {} eins", "x".repeat(300));
        let snippet = SnippetHighlighter::fast(&terms(&["eins", "zwei"])).snippet(&content);
        assert!(snippet.contains(r#"<b class="match">eins</b>"#));
        assert!(!snippet.contains("zwei"));
    }

    #[test]
    fn longest_term_wins_overlap() {
        let snippet =
            SnippetHighlighter::fast(&terms(&["fest", "festival"])).snippet("the festival");
        assert_eq!(snippet, r#"...the <b class="match">festival</b>..."#);
    }

    #[test]
    fn markup_is_not_highlighted_again() {
        let snippet = SnippetHighlighter::fast(&terms(&["b", "match"])).snippet("a match b");
        assert_eq!(
            snippet,
            r#"...a <b class="match">match</b> <b class="match">b</b>..."#
        );
    }

    #[test]
    fn no_match_returns_prefix() {
        let content = "y".repeat(250);
        let snippet = SnippetHighlighter::fast(&terms(&["fest"])).snippet(&content);
        assert_eq!(snippet, "y".repeat(200));
    }

    #[test]
    fn empty_snippet_falls_back() {
        let snippet = SnippetHighlighter::fast(&terms(&["fest"])).snippet("");
        assert_eq!(snippet, "...");
    }

    #[test]
    fn window_is_char_based() {
        let content = format!("{}Fest", "ü".repeat(120));
        let snippet = SnippetHighlighter::fast(&terms(&["fest"])).snippet(&content);
        assert!(snippet.starts_with(&format!("...{}<b", "ü".repeat(100))));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let snippet = SnippetHighlighter::fast(&terms(&["a.b"])).snippet("axb a.b");
        assert_eq!(snippet, r#"...axb <b class="match">a.b</b>..."#);
    }

    #[test]
    fn library_snippet_uses_engine_markup() {
        let temp = TempDir::new().unwrap();
        let handle = IndexHandle::open_or_create(temp.path()).unwrap();
        {
            let mut writer = handle.writer().unwrap();
            writer
                .add_page(&PageDocument {
                    path: "/l/a.pdf".into(),
                    filename: "a.pdf".into(),
                    page_num: 1,
                    content: "Das Fest beginnt".into(),
                })
                .unwrap();
            writer.commit().unwrap();
        }
        let searcher = handle.searcher().unwrap();
        let expr = searcher.parse("fest").unwrap().unwrap();
        let hits = searcher.search(&expr).unwrap();
        let highlighter = SnippetHighlighter::new(
            HighlightStrategy::Library,
            &searcher,
            hits.query(),
            &terms(&["fest"]),
        )
        .unwrap();

        assert_eq!(highlighter.strategy(), HighlightStrategy::Library);
        assert!(highlighter.snippet("Das Fest beginnt").contains("<b>Fest</b>"));
    }
}
