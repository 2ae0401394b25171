//! Errors for the lexing, parsing, compiling and rewriting stages.

use std::{error::Error, fmt};

use thiserror::Error as ThisError;

/// Lexer error with position information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    /// Error message.
    pub message: String,
    /// Byte position in input where error occurred.
    pub position: usize,
    /// The original input string.
    pub input: String,
}

impl LexError {
    /// Creates a new lexer error.
    pub fn new(message: impl Into<String>, position: usize, input: &str) -> Self {
        Self {
            message: message.into(),
            position,
            input: input.to_string(),
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}", self.message, self.position)
    }
}

impl Error for LexError {}

/// Parse error with position information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Error message.
    pub message: String,
    /// Token index where error occurred (if applicable).
    pub token_index: Option<usize>,
}

impl ParseError {
    /// Creates a new parse error.
    pub fn new(message: impl Into<String>, token_index: Option<usize>) -> Self {
        Self {
            message: message.into(),
            token_index,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.token_index {
            Some(index) => write!(f, "{} (token {index})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl Error for ParseError {}

/// Why a query was rejected, with the query text for context.
///
/// Displayed as a one-line summary, the query with a caret under the
/// offending byte when known, and a hint for common mistakes.
#[derive(Debug, Clone)]
pub struct QueryError {
    /// What went wrong.
    pub kind: QueryErrorKind,
    /// The query text, when the stage that failed had it.
    pub query: Option<String>,
}

/// The stage that rejected a query.
#[derive(Debug, Clone)]
pub enum QueryErrorKind {
    /// The lexer hit an unterminated quote or regex, or an empty field.
    Lex {
        /// Error message.
        message: String,
        /// Byte offset into the query.
        position: usize,
    },
    /// The token stream does not form an expression.
    Parse {
        /// Error message.
        message: String,
        /// Byte offset into the query, when known.
        position: Option<usize>,
    },
    /// The tree parsed but cannot run against the index (e.g. a bad regex).
    Compile {
        /// Error message.
        message: String,
    },
}

impl QueryErrorKind {
    /// The message without context.
    fn message(&self) -> &str {
        match self {
            Self::Lex { message, .. } | Self::Parse { message, .. } | Self::Compile { message } => {
                message
            }
        }
    }

    /// Byte offset to point at, if any.
    fn position(&self) -> Option<usize> {
        match self {
            Self::Lex { position, .. } => Some(*position),
            Self::Parse { position, .. } => *position,
            Self::Compile { .. } => None,
        }
    }

    /// Leading words of the summary line.
    fn label(&self) -> &'static str {
        match self {
            Self::Lex { .. } | Self::Parse { .. } => "query syntax error",
            Self::Compile { .. } => "query error",
        }
    }
}

/// Message fragments and the hint shown for them, first match wins.
const HINTS: &[(&str, &str)] = &[
    ("unclosed quote", "Add a closing quote (\") to complete the phrase"),
    ("unclosed regex", "Close the regular expression with a trailing /"),
    ("invalid regex", "Regular expressions are matched against whole words, e.g., /Fest\\w+/"),
    ("closing parenthesis", "Add a closing parenthesis ) to match the opening one"),
    ("OR", "AND/OR require expressions on both sides, e.g., 'fest OR feast'"),
    ("AND", "AND/OR require expressions on both sides, e.g., 'fest OR feast'"),
];

impl QueryError {
    /// A lexer failure at byte `position` of `query`.
    pub fn lex(message: impl Into<String>, position: usize, query: impl Into<String>) -> Self {
        let kind = QueryErrorKind::Lex {
            message: message.into(),
            position,
        };
        Self {
            kind,
            query: Some(query.into()),
        }
    }

    /// A parser failure.
    pub fn parse(
        message: impl Into<String>,
        position: Option<usize>,
        query: Option<String>,
    ) -> Self {
        let kind = QueryErrorKind::Parse {
            message: message.into(),
            position,
        };
        Self { kind, query }
    }

    /// A failure turning a parsed tree into an index query.
    pub fn compile(message: impl Into<String>) -> Self {
        let kind = QueryErrorKind::Compile {
            message: message.into(),
        };
        Self { kind, query: None }
    }

    /// Attaches the query text.
    pub fn with_query(self, query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..self
        }
    }

    /// The message without context or hint.
    pub fn message(&self) -> &str {
        self.kind.message()
    }

    /// A hint for a common mistake, if the message matches one.
    pub fn suggestion(&self) -> Option<&'static str> {
        let message = self.message();
        HINTS
            .iter()
            .find(|(needle, _)| message.contains(needle))
            .map(|&(_, hint)| hint)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.message())?;

        if let Some(query) = &self.query {
            write!(f, "\n  {query}")?;
            if let Some(position) = self.kind.position() {
                write!(f, "\n  {}^", " ".repeat(position.min(query.len())))?;
            }
        }

        match self.suggestion() {
            Some(hint) => write!(f, "\nhint: {hint}"),
            None => Ok(()),
        }
    }
}

impl Error for QueryError {}

impl From<LexError> for QueryError {
    fn from(err: LexError) -> Self {
        Self::lex(err.message, err.position, err.input)
    }
}

impl From<ParseError> for QueryError {
    fn from(err: ParseError) -> Self {
        // Token indices are not byte offsets, so no caret is drawn.
        Self::parse(err.message, None, None)
    }
}

/// Errors raised while substituting placeholder terms in a parsed tree.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum RewriteError {
    /// A placeholder-shaped term has no matching wildcard descriptor.
    #[error("placeholder {token} has no wildcard descriptor")]
    UnknownPlaceholder {
        /// The placeholder text found in the tree.
        token: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_error_display() {
        let err = QueryError::lex("unclosed quote", 0, "\"hello world");
        let display = err.to_string();
        assert!(display.contains("unclosed quote"));
        assert!(display.contains("\"hello world"));
        assert!(display.contains("^"));
        assert!(display.contains("hint:"));
    }

    #[test]
    fn parse_error_display() {
        let err = QueryError::parse(
            "expected closing parenthesis",
            Some(5),
            Some("(fest".to_string()),
        );
        let display = err.to_string();
        assert!(display.contains("expected closing parenthesis"));
        assert!(display.contains("(fest"));
        assert!(display.contains("hint:"));
    }

    #[test]
    fn error_with_query() {
        let err = QueryError::parse("test error", None, None).with_query("fest OR");
        assert_eq!(err.query.as_deref(), Some("fest OR"));
    }

    #[test]
    fn message_extraction() {
        let err = QueryError::lex("test message", 0, "query");
        assert_eq!(err.message(), "test message");
    }

    #[test]
    fn or_error_suggestion() {
        let err = QueryError::parse("unexpected OR", None, None);
        assert!(err.suggestion().unwrap().contains("AND/OR require"));
    }

    #[test]
    fn compile_error_display() {
        let err = QueryError::compile("invalid regex F(: unclosed group");
        let display = err.to_string();
        assert!(display.starts_with("query error: invalid regex"));
        assert!(display.contains("hint:"));
    }

    #[test]
    fn rewrite_error_names_token() {
        let err = RewriteError::UnknownPlaceholder {
            token: "cswild3marker".into(),
        };
        assert_eq!(err.to_string(), "placeholder cswild3marker has no wildcard descriptor");
    }
}
