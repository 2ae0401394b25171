//! Lexical rewriting of raw user queries.
//!
//! The preprocessor runs before parsing. It turns case-sensitive markers into
//! field-qualified queries (or placeholder terms for the parser to carry),
//! widens bare wildcards so they also match their base word, and extracts the
//! literal strings the snippet highlighter should bold.

use std::{collections::HashMap, sync::LazyLock};

use regex::{Captures, Regex};
use serde::Serialize;
use tracing::debug;

use crate::ast::Field;

/// Case-sensitive marker: `+` followed by word characters, `*` and `?`.
static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+([\w*?]+)").expect("marker pattern is valid"));

/// Bare wildcard term: a word followed by `*`.
static BARE_WILDCARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+\*").expect("wildcard pattern is valid"));

/// A double-quoted section, capturing its content.
static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)""#).expect("quote pattern is valid"));

/// Placeholder text before the descriptor index.
const PLACEHOLDER_PREFIX: &str = "cswild";

/// Placeholder text after the descriptor index.
const PLACEHOLDER_SUFFIX: &str = "marker";

/// Classification of a case-sensitive marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WildcardKind {
    /// `+Fest`: exact-case term.
    Exact,
    /// `+Fest*`: exact-case prefix, carried through parsing as a placeholder.
    PrefixWildcard,
    /// `+F?st`: exact-case term with single-character holes.
    QuestionWildcard,
}

/// One case-sensitive marker found in a raw query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WildcardDescriptor {
    /// The marker as typed, including the leading `+`.
    pub original_marker: String,
    /// Marker text without `+` and without trailing `*`.
    pub base_term: String,
    /// What kind of marker this is.
    pub kind: WildcardKind,
}

/// Whether the query contains quoted phrases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    /// Plain terms only.
    #[default]
    Terms,
    /// At least one non-empty quoted phrase.
    Phrase,
}

/// The result of preprocessing one raw query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparedQuery {
    /// The query as typed.
    raw: String,
    /// The rewritten query handed to the parser.
    modified: String,
    /// Case-sensitive markers in first-seen order.
    descriptors: Vec<WildcardDescriptor>,
    /// Phrases first, then individual terms.
    highlight_terms: Vec<String>,
    /// Phrase or terms search.
    search_type: SearchType,
}

impl PreparedQuery {
    /// The query as typed by the user.
    pub fn raw_query(&self) -> &str {
        &self.raw
    }

    /// The rewritten query string to parse.
    pub fn modified_query(&self) -> &str {
        &self.modified
    }

    /// Descriptors for every distinct case-sensitive marker, indexed by placeholder number.
    pub fn wildcard_descriptors(&self) -> &[WildcardDescriptor] {
        &self.descriptors
    }

    /// Strings to bold in snippets.
    pub fn highlight_terms(&self) -> &[String] {
        &self.highlight_terms
    }

    /// Whether any quoted phrase was present.
    pub fn search_type(&self) -> SearchType {
        self.search_type
    }

    /// True when the query used at least one `+` marker.
    pub fn has_case_sensitive_terms(&self) -> bool {
        !self.descriptors.is_empty()
    }
}

/// Returns the placeholder term standing in for descriptor `index`.
pub fn placeholder_token(index: usize) -> String {
    format!("{PLACEHOLDER_PREFIX}{index}{PLACEHOLDER_SUFFIX}")
}

/// Parses a placeholder term back into its descriptor index.
pub fn parse_placeholder(text: &str) -> Option<usize> {
    let digits = text
        .strip_prefix(PLACEHOLDER_PREFIX)?
        .strip_suffix(PLACEHOLDER_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Preprocesses a raw query.
///
/// Steps run in a fixed order so later steps never see their own output:
/// case-sensitive markers are rewritten, then bare wildcards are widened,
/// then highlight terms are extracted from the untouched raw query.
pub fn preprocess(raw: &str) -> PreparedQuery {
    let (with_markers, descriptors) = rewrite_markers(raw);
    let modified = expand_bare_wildcards(&with_markers);
    let (highlight_terms, search_type) = extract_highlight_terms(raw);

    debug!(
        raw,
        modified = %modified,
        markers = descriptors.len(),
        ?search_type,
        "preprocessed query"
    );

    PreparedQuery {
        raw: raw.to_string(),
        modified,
        descriptors,
        highlight_terms,
        search_type,
    }
}

/// Replaces every `+token` marker in one left-to-right pass.
fn rewrite_markers(raw: &str) -> (String, Vec<WildcardDescriptor>) {
    let mut descriptors: Vec<WildcardDescriptor> = Vec::new();
    let mut replacements: HashMap<String, String> = HashMap::new();

    let rewritten = MARKER.replace_all(raw, |caps: &Captures<'_>| {
        let token = &caps[1];
        if let Some(existing) = replacements.get(token) {
            return existing.clone();
        }

        let (kind, replacement) = if token.contains('*') {
            (WildcardKind::PrefixWildcard, placeholder_token(descriptors.len()))
        } else if token.contains('?') {
            let pattern = token.replace('?', r"\w");
            (
                WildcardKind::QuestionWildcard,
                format!("{}:/{pattern}/", Field::ContentCase),
            )
        } else {
            (WildcardKind::Exact, format!("{}:{token}", Field::ContentCase))
        };

        descriptors.push(WildcardDescriptor {
            original_marker: caps[0].to_string(),
            base_term: token.trim_end_matches('*').to_string(),
            kind,
        });
        replacements.insert(token.to_string(), replacement.clone());
        replacement
    });

    (rewritten.into_owned(), descriptors)
}

/// Rewrites `word*` to `(word OR word*)` unless the word is field-qualified.
fn expand_bare_wildcards(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    let mut last = 0;

    for found in BARE_WILDCARD.find_iter(query) {
        // Leftmost matching starts at a word boundary, so only a colon can
        // precede it and disqualify it.
        if query[..found.start()].ends_with(':') {
            continue;
        }
        let word = found.as_str().trim_end_matches('*');
        out.push_str(&query[last..found.start()]);
        out.push_str(&format!("({word} OR {word}*)"));
        last = found.end();
    }

    out.push_str(&query[last..]);
    out
}

/// Collects phrases and then individual terms from the raw query.
fn extract_highlight_terms(raw: &str) -> (Vec<String>, SearchType) {
    let mut terms = Vec::new();
    let mut search_type = SearchType::Terms;

    for caps in QUOTED.captures_iter(raw) {
        let phrase = caps[1].trim();
        if !phrase.is_empty() {
            search_type = SearchType::Phrase;
            terms.push(phrase.to_string());
        }
    }

    let without_quotes = QUOTED.replace_all(raw, "");
    for word in without_quotes.split_whitespace() {
        let word = word.trim_matches(|c| c == '(' || c == ')');
        if ["AND", "OR", "NOT"]
            .iter()
            .any(|keyword| word.eq_ignore_ascii_case(keyword))
        {
            continue;
        }
        let word = word.trim_start_matches('+').trim_end_matches('*');
        if !word.is_empty() {
            terms.push(word.to_string());
        }
    }

    (terms, search_type)
}
