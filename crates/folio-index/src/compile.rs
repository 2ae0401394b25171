//! Query compiler.
//!
//! Compiles a [`QueryExpr`] tree into Tantivy queries. Terms and phrases are
//! run through the analyzer of the field they target, so `content` terms are
//! case-folded and `content_case` terms keep their case.

use folio_query::{Field as QueryField, QueryError, QueryExpr};
use tantivy::{
    Term,
    query::{AllQuery, BooleanQuery, Occur, PhraseQuery, Query, RegexQuery, TermQuery},
    schema::{Field, IndexRecordOption},
    tokenizer::TextAnalyzer,
};

use crate::{
    analyzer::{build_case_analyzer, build_text_analyzer, tokenize},
    schema::IndexSchema,
};

/// Compiles query AST nodes into Tantivy queries.
pub struct QueryCompiler {
    /// Index schema for field references.
    schema: IndexSchema,
    /// Analyzer for the case-folded field.
    text_analyzer: TextAnalyzer,
    /// Analyzer for the case-preserving field.
    case_analyzer: TextAnalyzer,
}

impl QueryCompiler {
    /// Creates a new query compiler.
    pub fn new(schema: IndexSchema) -> Self {
        Self {
            schema,
            text_analyzer: build_text_analyzer(),
            case_analyzer: build_case_analyzer(),
        }
    }

    /// Compiles a query expression into a Tantivy query.
    ///
    /// Returns `None` when nothing searchable is left after analysis, for
    /// example a term made only of punctuation.
    pub fn compile(&mut self, expr: &QueryExpr) -> Result<Option<Box<dyn Query>>, QueryError> {
        match expr {
            QueryExpr::Term { field, text } => Ok(self.compile_term(*field, text)),
            QueryExpr::Phrase { field, words } => Ok(self.compile_phrase(*field, words)),
            QueryExpr::Wildcard { field, pattern } => {
                self.compile_regex(*field, &wildcard_to_regex(*field, pattern))
            }
            QueryExpr::Regex { field, pattern } => self.compile_regex(*field, pattern),
            QueryExpr::Not(inner) => self.compile_not(inner),
            QueryExpr::And(exprs) => self.compile_and(exprs),
            QueryExpr::Or(exprs) => self.compile_or(exprs),
        }
    }

    /// Runs `text` through the analyzer for `field`.
    fn tokenize(&mut self, field: QueryField, text: &str) -> Vec<String> {
        let analyzer = match field {
            QueryField::Content => &mut self.text_analyzer,
            QueryField::ContentCase => &mut self.case_analyzer,
        };
        tokenize(analyzer, text)
    }

    /// Compiles a term. Text that tokenizes into several words becomes a phrase.
    fn compile_term(&mut self, field: QueryField, text: &str) -> Option<Box<dyn Query>> {
        let tokens = self.tokenize(field, text);
        self.compile_tokens(self.schema.text_field(field), &tokens)
    }

    /// Compiles a phrase from its words.
    fn compile_phrase(&mut self, field: QueryField, words: &[String]) -> Option<Box<dyn Query>> {
        let tokens: Vec<String> = words
            .iter()
            .flat_map(|w| self.tokenize(field, w))
            .collect();
        self.compile_tokens(self.schema.text_field(field), &tokens)
    }

    /// Builds a term query for one token or a phrase query for several.
    fn compile_tokens(&self, field: Field, tokens: &[String]) -> Option<Box<dyn Query>> {
        match tokens {
            [] => None,
            [token] => Some(Box::new(TermQuery::new(
                Term::from_field_text(field, token),
                IndexRecordOption::WithFreqsAndPositions,
            ))),
            _ => {
                let terms: Vec<Term> = tokens
                    .iter()
                    .map(|t| Term::from_field_text(field, t))
                    .collect();
                Some(Box::new(PhraseQuery::new(terms)))
            }
        }
    }

    /// Compiles a regular expression matched against whole index terms.
    fn compile_regex(
        &self,
        field: QueryField,
        pattern: &str,
    ) -> Result<Option<Box<dyn Query>>, QueryError> {
        let query = RegexQuery::from_pattern(pattern, self.schema.text_field(field))
            .map_err(|e| QueryError::compile(format!("invalid regex {pattern}: {e}")))?;
        Ok(Some(Box::new(query)))
    }

    /// Compiles a standalone NOT as "everything except".
    fn compile_not(&mut self, inner: &QueryExpr) -> Result<Option<Box<dyn Query>>, QueryError> {
        match self.compile(inner)? {
            Some(q) => {
                let clauses = vec![
                    (Occur::Must, Box::new(AllQuery) as Box<dyn Query>),
                    (Occur::MustNot, q),
                ];
                Ok(Some(Box::new(BooleanQuery::new(clauses))))
            }
            None => Ok(None),
        }
    }

    /// Compiles an AND expression.
    ///
    /// `Not` children become MUST_NOT clauses. If every clause is negative,
    /// `AllQuery` is the base to exclude from.
    fn compile_and(&mut self, exprs: &[QueryExpr]) -> Result<Option<Box<dyn Query>>, QueryError> {
        let mut positive: Vec<Box<dyn Query>> = Vec::new();
        let mut negative: Vec<Box<dyn Query>> = Vec::new();

        for expr in exprs {
            match expr {
                QueryExpr::Not(inner) => {
                    if let Some(q) = self.compile(inner)? {
                        negative.push(q);
                    }
                }
                other => {
                    if let Some(q) = self.compile(other)? {
                        positive.push(q);
                    }
                }
            }
        }

        if positive.is_empty() && negative.is_empty() {
            return Ok(None);
        }

        if positive.is_empty() {
            positive.push(Box::new(AllQuery));
        }

        if positive.len() == 1 && negative.is_empty() {
            return Ok(positive.pop());
        }

        let clauses: Vec<(Occur, Box<dyn Query>)> = positive
            .into_iter()
            .map(|q| (Occur::Must, q))
            .chain(negative.into_iter().map(|q| (Occur::MustNot, q)))
            .collect();

        Ok(Some(Box::new(BooleanQuery::new(clauses))))
    }

    /// Compiles an OR expression.
    fn compile_or(&mut self, exprs: &[QueryExpr]) -> Result<Option<Box<dyn Query>>, QueryError> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for expr in exprs {
            if let Some(q) = self.compile(expr)? {
                clauses.push((Occur::Should, q));
            }
        }

        match clauses.len() {
            0 => Ok(None),
            1 => Ok(clauses.pop().map(|(_, q)| q)),
            _ => Ok(Some(Box::new(BooleanQuery::new(clauses)))),
        }
    }
}

/// Translates a `*`/`?` pattern into a whole-term regex.
///
/// Patterns on the case-folded field are lowercased to match indexed terms.
pub(crate) fn wildcard_to_regex(field: QueryField, pattern: &str) -> String {
    let pattern = match field {
        QueryField::Content => pattern.to_lowercase(),
        QueryField::ContentCase => pattern.to_string(),
    };

    let mut regex = String::with_capacity(pattern.len() * 2);
    let mut buf = [0u8; 4];
    for ch in pattern.chars() {
        match ch {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            other => regex.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    regex
}
