//! Query abstract syntax tree.
//!
//! Represents parsed query expressions before compilation to search engine queries.
//! Every leaf carries the index field it targets; field prefixes in the query string
//! are resolved while parsing.

use std::fmt;

/// A searchable index field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Page text, case-folded at index and query time.
    Content,
    /// Page text with case preserved, used for `+`-marked terms.
    ContentCase,
}

impl Field {
    /// All searchable fields.
    pub const ALL: [Self; 2] = [Self::Content, Self::ContentCase];

    /// Returns the field name as used in query strings and the index schema.
    pub fn name(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::ContentCase => "content_case",
        }
    }

    /// Looks up a field by its query-string name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed query expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryExpr {
    /// A single search term.
    Term {
        /// Field the term is matched against.
        field: Field,
        /// Raw term text, analyzed at compile time.
        text: String,
    },

    /// An exact phrase (sequence of words).
    Phrase {
        /// Field the phrase is matched against.
        field: Field,
        /// Words of the phrase in order.
        words: Vec<String>,
    },

    /// A term pattern using `*` (any run) and `?` (one character).
    Wildcard {
        /// Field the pattern is matched against.
        field: Field,
        /// The pattern as typed.
        pattern: String,
    },

    /// A regular expression matched against whole index terms.
    Regex {
        /// Field the pattern is matched against.
        field: Field,
        /// Regular expression without delimiters.
        pattern: String,
    },

    /// Negation: results must NOT match this expression.
    Not(Box<Self>),

    /// Conjunction: all sub-expressions must match.
    And(Vec<Self>),

    /// Disjunction: at least one sub-expression must match.
    Or(Vec<Self>),
}

impl QueryExpr {
    /// Creates a term expression.
    pub fn term(field: Field, text: impl Into<String>) -> Self {
        Self::Term {
            field,
            text: text.into(),
        }
    }

    /// Creates a regex expression.
    pub fn regex(field: Field, pattern: impl Into<String>) -> Self {
        Self::Regex {
            field,
            pattern: pattern.into(),
        }
    }

    /// Creates an And expression, flattening nested Ands.
    pub fn and(exprs: Vec<Self>) -> Self {
        let mut flattened: Vec<Self> = exprs
            .into_iter()
            .flat_map(|e| match e {
                Self::And(inner) => inner,
                other => vec![other],
            })
            .collect();

        if flattened.len() == 1 {
            flattened.remove(0)
        } else {
            Self::And(flattened)
        }
    }

    /// Creates an Or expression, flattening nested Ors.
    pub fn or(exprs: Vec<Self>) -> Self {
        let mut flattened: Vec<Self> = exprs
            .into_iter()
            .flat_map(|e| match e {
                Self::Or(inner) => inner,
                other => vec![other],
            })
            .collect();

        if flattened.len() == 1 {
            flattened.remove(0)
        } else {
            Self::Or(flattened)
        }
    }

    /// Returns true if any leaf of the tree targets the given field.
    pub fn uses_field(&self, target: Field) -> bool {
        match self {
            Self::Term { field, .. }
            | Self::Phrase { field, .. }
            | Self::Wildcard { field, .. }
            | Self::Regex { field, .. } => *field == target,
            Self::Not(inner) => inner.uses_field(target),
            Self::And(exprs) | Self::Or(exprs) => exprs.iter().any(|e| e.uses_field(target)),
        }
    }

    /// Formats the expression as a tree structure with the given indentation level.
    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let prefix = "  ".repeat(indent);
        match self {
            Self::Term { field, text } => writeln!(f, "{prefix}Term({field}, {text:?})"),
            Self::Phrase { field, words } => writeln!(f, "{prefix}Phrase({field}, {words:?})"),
            Self::Wildcard { field, pattern } => {
                writeln!(f, "{prefix}Wildcard({field}, {pattern:?})")
            }
            Self::Regex { field, pattern } => writeln!(f, "{prefix}Regex({field}, {pattern:?})"),
            Self::Not(inner) => {
                writeln!(f, "{prefix}Not")?;
                inner.fmt_tree(f, indent + 1)
            }
            Self::And(exprs) => {
                writeln!(f, "{prefix}And")?;
                for expr in exprs {
                    expr.fmt_tree(f, indent + 1)?;
                }
                Ok(())
            }
            Self::Or(exprs) => {
                writeln!(f, "{prefix}Or")?;
                for expr in exprs {
                    expr.fmt_tree(f, indent + 1)?;
                }
                Ok(())
            }
        }
    }

    /// Formats the expression as a query string (human-readable form).
    ///
    /// Leaves on the `content` field are written bare; other fields get a prefix.
    /// This produces output like: `(fest OR content_case:/Fest\w+/)`
    pub fn to_query_string(&self) -> String {
        match self {
            Self::Term { field, text } => with_field(*field, text),
            Self::Phrase { field, words } => with_field(*field, &format!("\"{}\"", words.join(" "))),
            Self::Wildcard { field, pattern } => with_field(*field, pattern),
            Self::Regex { field, pattern } => with_field(*field, &format!("/{pattern}/")),
            Self::Not(inner) => format!("NOT {}", inner.to_query_string()),
            Self::And(exprs) => join_group(exprs, " AND "),
            Self::Or(exprs) => join_group(exprs, " OR "),
        }
    }
}

/// Prefixes a leaf with its field name unless it is the default field.
fn with_field(field: Field, body: &str) -> String {
    match field {
        Field::Content => body.to_string(),
        other => format!("{other}:{body}"),
    }
}

/// Joins group members with an operator, parenthesizing multi-member groups.
fn join_group(exprs: &[QueryExpr], separator: &str) -> String {
    let parts: Vec<String> = exprs.iter().map(QueryExpr::to_query_string).collect();
    match parts.len() {
        0 => String::new(),
        1 => parts.join(""),
        _ => format!("({})", parts.join(separator)),
    }
}

impl fmt::Display for QueryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(s: &str) -> QueryExpr {
        QueryExpr::term(Field::Content, s)
    }

    #[test]
    fn and_flattens_nested() {
        let nested = QueryExpr::and(vec![
            term("a"),
            QueryExpr::And(vec![term("b"), term("c")]),
        ]);

        assert_eq!(nested, QueryExpr::And(vec![term("a"), term("b"), term("c")]));
    }

    #[test]
    fn and_single_element_unwraps() {
        assert_eq!(QueryExpr::and(vec![term("a")]), term("a"));
    }

    #[test]
    fn or_flattens_nested() {
        let nested = QueryExpr::or(vec![term("a"), QueryExpr::Or(vec![term("b"), term("c")])]);

        assert_eq!(nested, QueryExpr::Or(vec![term("a"), term("b"), term("c")]));
    }

    #[test]
    fn field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_name(field.name()), Some(field));
        }
        assert_eq!(Field::from_name("title"), None);
    }

    #[test]
    fn uses_field_looks_through_operators() {
        let expr = QueryExpr::or(vec![
            term("fest"),
            QueryExpr::Not(Box::new(QueryExpr::regex(Field::ContentCase, "F\\w+"))),
        ]);
        assert!(expr.uses_field(Field::ContentCase));
        assert!(!term("fest").uses_field(Field::ContentCase));
    }

    #[test]
    fn query_string_prefixes_non_default_fields() {
        let expr = QueryExpr::or(vec![
            QueryExpr::term(Field::ContentCase, "Fest"),
            QueryExpr::regex(Field::ContentCase, "Fest\\w+"),
        ]);
        assert_eq!(
            expr.to_query_string(),
            "(content_case:Fest OR content_case:/Fest\\w+/)"
        );
    }

    #[test]
    fn tree_display_shows_fields() {
        let expr = QueryExpr::and(vec![
            term("now"),
            QueryExpr::Phrase {
                field: Field::Content,
                words: vec!["eternal".into(), "now".into()],
            },
        ]);
        let rendered = expr.to_string();
        assert!(rendered.starts_with("And\n"));
        assert!(rendered.contains("  Term(content, \"now\")"));
        assert!(rendered.contains("  Phrase(content, [\"eternal\", \"now\"])"));
    }
}
