//! Query parser.
//!
//! Parses a token stream into a query AST using recursive descent.
//!
//! # Grammar
//!
//! ```text
//! query      → or_expr
//! or_expr    → and_expr ("OR" and_expr)*
//! and_expr   → unary (("AND")? unary)*
//! unary      → "NOT" unary | primary
//! primary    → TERM | PHRASE | REGEX | field_expr | "(" or_expr ")"
//! field_expr → FIELD_PREFIX (TERM | PHRASE | REGEX | "(" or_expr ")")
//! ```
//!
//! # Precedence (highest to lowest)
//!
//! 1. Grouping: `(...)`
//! 2. Field prefix: `field:`
//! 3. Negation: `NOT`
//! 4. AND (explicit keyword, or adjacency under [`Grouping::And`])
//! 5. OR (explicit keyword, or adjacency under [`Grouping::Or`])
//!
//! A `NOT` clause directly after another clause always conjoins with it, so
//! `a NOT b` reads as `a AND NOT b` in both grouping modes.

use std::mem;

use crate::{
    ast::{Field, QueryExpr},
    error::{ParseError, QueryError},
    lexer::{Token, tokenize},
};

/// How adjacent clauses without an explicit operator are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Grouping {
    /// Adjacent clauses are OR-ed (the search service's mode).
    #[default]
    Or,
    /// Adjacent clauses are AND-ed.
    And,
}

/// Recursive descent parser for query expressions.
struct Parser {
    /// Token stream to parse.
    tokens: Vec<Token>,
    /// Current position in token stream.
    position: usize,
    /// Combination rule for operator-less adjacency.
    grouping: Grouping,
}

impl Parser {
    /// Creates a new parser from a token stream.
    fn new(tokens: Vec<Token>, grouping: Grouping) -> Self {
        Self {
            tokens,
            position: 0,
            grouping,
        }
    }

    /// Parses the token stream into a query expression.
    fn parse(mut self, default_field: Field) -> Result<Option<QueryExpr>, ParseError> {
        if self.tokens.is_empty() {
            return Ok(None);
        }

        let expr = self.parse_or_expr(default_field)?;

        if self.position < self.tokens.len() {
            return Err(ParseError::new(
                format!("unexpected token: {:?}", self.tokens[self.position]),
                Some(self.position),
            ));
        }

        Ok(Some(expr))
    }

    /// Parses: or_expr → and_expr ("OR" and_expr)*
    fn parse_or_expr(&mut self, field: Field) -> Result<QueryExpr, ParseError> {
        let mut clauses = vec![self.parse_and_expr(field)?];

        loop {
            if self.check(&Token::Or) {
                self.advance(); // consume OR
                clauses.push(self.parse_and_expr(field)?);
            } else if self.grouping == Grouping::Or && self.can_start_unary() {
                clauses.push(self.parse_and_expr(field)?);
            } else {
                break;
            }
        }

        Ok(QueryExpr::or(clauses))
    }

    /// Parses: and_expr → unary (("AND")? unary)*
    fn parse_and_expr(&mut self, field: Field) -> Result<QueryExpr, ParseError> {
        let mut exprs = vec![self.parse_unary(field)?];

        loop {
            if self.check(&Token::And) {
                self.advance(); // consume AND
                exprs.push(self.parse_unary(field)?);
            } else if self.check(&Token::Not)
                || (self.grouping == Grouping::And && self.can_start_unary())
            {
                exprs.push(self.parse_unary(field)?);
            } else {
                break;
            }
        }

        Ok(QueryExpr::and(exprs))
    }

    /// Checks if the current token can start a unary expression.
    fn can_start_unary(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Term(_))
                | Some(Token::Phrase(_))
                | Some(Token::Regex(_))
                | Some(Token::Not)
                | Some(Token::LParen)
                | Some(Token::FieldPrefix(_))
        )
    }

    /// Parses: unary → "NOT" unary | primary
    fn parse_unary(&mut self, field: Field) -> Result<QueryExpr, ParseError> {
        if self.check(&Token::Not) {
            self.advance(); // consume NOT
            let expr = self.parse_unary(field)?;
            return Ok(QueryExpr::Not(Box::new(expr)));
        }

        self.parse_primary(field)
    }

    /// Parses: primary → TERM | PHRASE | REGEX | field_expr | "(" or_expr ")"
    fn parse_primary(&mut self, field: Field) -> Result<QueryExpr, ParseError> {
        match self.peek().cloned() {
            Some(Token::Term(_)) | Some(Token::Phrase(_)) | Some(Token::Regex(_)) => {
                Ok(self.parse_leaf(field))
            }

            Some(Token::FieldPrefix(prefixed)) => {
                self.advance();
                self.parse_field_expr(prefixed)
            }

            Some(Token::LParen) => self.parse_group(field, "expected closing parenthesis"),

            Some(Token::RParen) => Err(ParseError::new(
                "unexpected closing parenthesis",
                Some(self.position),
            )),

            Some(Token::Or) => Err(ParseError::new(
                "unexpected OR (needs expression before it)",
                Some(self.position),
            )),

            Some(Token::And) => Err(ParseError::new(
                "unexpected AND (needs expression before it)",
                Some(self.position),
            )),

            Some(Token::Not) => Err(ParseError::new("unexpected negation", Some(self.position))),

            None => Err(ParseError::new("unexpected end of query", None)),
        }
    }

    /// Parses the expression after a field prefix.
    fn parse_field_expr(&mut self, field: Field) -> Result<QueryExpr, ParseError> {
        match self.peek() {
            Some(Token::Term(_)) | Some(Token::Phrase(_)) | Some(Token::Regex(_)) => {
                Ok(self.parse_leaf(field))
            }
            Some(Token::LParen) => {
                self.parse_group(field, "expected closing parenthesis after field expression")
            }
            _ => Err(ParseError::new(
                format!("expected term, phrase, regex, or group after '{}:'", field),
                Some(self.position),
            )),
        }
    }

    /// Parses a TERM, PHRASE or REGEX token into a leaf, consuming the token.
    fn parse_leaf(&mut self, field: Field) -> QueryExpr {
        let token = self.peek().cloned();
        self.advance();
        match token {
            Some(Token::Term(text)) if text.contains(['*', '?']) => QueryExpr::Wildcard {
                field,
                pattern: text,
            },
            Some(Token::Term(text)) => QueryExpr::Term { field, text },
            Some(Token::Phrase(text)) => {
                let words: Vec<String> = text.split_whitespace().map(String::from).collect();
                if words.is_empty() {
                    QueryExpr::term(field, "")
                } else {
                    QueryExpr::Phrase { field, words }
                }
            }
            Some(Token::Regex(pattern)) => QueryExpr::Regex { field, pattern },
            _ => unreachable!("parse_leaf called on non-leaf token"),
        }
    }

    /// Parses a parenthesized group, consuming the surrounding parentheses.
    fn parse_group(&mut self, field: Field, missing_rparen_msg: &str) -> Result<QueryExpr, ParseError> {
        self.advance(); // consume (
        let inner = self.parse_or_expr(field)?;

        if !self.check(&Token::RParen) {
            return Err(ParseError::new(missing_rparen_msg, Some(self.position)));
        }
        self.advance(); // consume )

        Ok(inner)
    }

    /// Returns the current token without consuming it.
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    /// Checks if the current token matches the given token.
    fn check(&self, token: &Token) -> bool {
        self.peek()
            .map(|t| mem::discriminant(t) == mem::discriminant(token))
            .unwrap_or(false)
    }

    /// Advances to the next token.
    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }
}

/// Parses a query string into an AST.
///
/// Leaves without a field prefix target `default_field`; `grouping` decides
/// how operator-less neighbours combine. Returns `Ok(None)` for empty
/// queries, `Ok(Some(expr))` for valid queries, or `Err(QueryError)` for
/// invalid syntax.
pub fn parse(
    input: &str,
    default_field: Field,
    grouping: Grouping,
) -> Result<Option<QueryExpr>, QueryError> {
    let tokens = tokenize(input).map_err(QueryError::from)?;
    Parser::new(tokens, grouping)
        .parse(default_field)
        .map_err(|e| QueryError::from(e).with_query(input))
}
