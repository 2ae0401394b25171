//! Query lexer (tokenizer).
//!
//! Converts a query string into a stream of tokens for the parser.

use std::{iter::Peekable, str::Chars};

use crate::{ast::Field, error::LexError};

/// A token in the query language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A bare word (search term, possibly containing `*` or `?`).
    Term(String),

    /// A quoted phrase (the quotes are stripped, content preserved).
    Phrase(String),

    /// A `/regex/` literal (delimiters stripped, `\/` unescaped).
    Regex(String),

    /// The AND keyword.
    And,

    /// The OR keyword.
    Or,

    /// The NOT keyword.
    Not,

    /// Left parenthesis.
    LParen,

    /// Right parenthesis.
    RParen,

    /// Known field prefix (e.g., "content_case:").
    FieldPrefix(Field),
}

/// Tokenizes a query string.
struct Lexer<'a> {
    /// The original input string.
    input: &'a str,
    /// Character iterator with one-character lookahead.
    chars: Peekable<Chars<'a>>,
    /// Current byte position in input.
    position: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().peekable(),
            position: 0,
        }
    }

    /// Creates an error at a specific position.
    fn error_at(&self, message: impl Into<String>, position: usize) -> LexError {
        LexError::new(message, position, self.input)
    }

    /// Tokenizes the entire input, returning all tokens or an error.
    fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }

        Ok(tokens)
    }

    /// Returns the next token, or None if at end of input.
    fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_whitespace();

        let Some(&ch) = self.chars.peek() else {
            return Ok(None);
        };

        match ch {
            '"' => self.read_phrase(),
            '/' => self.read_regex(),
            '(' => {
                self.advance();
                Ok(Some(Token::LParen))
            }
            ')' => {
                self.advance();
                Ok(Some(Token::RParen))
            }
            _ => self.read_term_or_keyword(),
        }
    }

    /// Reads a quoted phrase.
    fn read_phrase(&mut self) -> Result<Option<Token>, LexError> {
        let start_pos = self.position;
        self.advance(); // consume opening quote

        let mut content = String::new();

        loop {
            match self.chars.peek() {
                Some(&'"') => {
                    self.advance(); // consume closing quote
                    return Ok(Some(Token::Phrase(content)));
                }
                Some(&ch) => {
                    content.push(ch);
                    self.advance();
                }
                None => {
                    return Err(self.error_at("unclosed quote", start_pos));
                }
            }
        }
    }

    /// Reads a `/regex/` literal. Only `\/` is unescaped; other escapes pass through.
    fn read_regex(&mut self) -> Result<Option<Token>, LexError> {
        let start_pos = self.position;
        self.advance(); // consume opening slash

        let mut pattern = String::new();

        loop {
            match self.chars.peek() {
                Some(&'/') => {
                    self.advance();
                    return Ok(Some(Token::Regex(pattern)));
                }
                Some(&'\\') => {
                    self.advance();
                    match self.chars.peek() {
                        Some(&'/') => {
                            pattern.push('/');
                            self.advance();
                        }
                        Some(&next) => {
                            pattern.push('\\');
                            pattern.push(next);
                            self.advance();
                        }
                        None => pattern.push('\\'),
                    }
                }
                Some(&ch) => {
                    pattern.push(ch);
                    self.advance();
                }
                None => {
                    return Err(self.error_at("unclosed regex", start_pos));
                }
            }
        }
    }

    /// Reads a term, keyword (AND/OR/NOT), or known field prefix.
    fn read_term_or_keyword(&mut self) -> Result<Option<Token>, LexError> {
        let mut word = String::new();

        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                break;
            }

            self.advance();

            if ch == ':' {
                if let Some(field) = Field::from_name(&word) {
                    return Ok(Some(Token::FieldPrefix(field)));
                }
            }

            word.push(ch);
        }

        if word.is_empty() {
            return Ok(None);
        }

        // Keywords are upper case only; "and" or "Or" are ordinary terms.
        let token = match word.as_str() {
            "AND" => Token::And,
            "OR" => Token::Or,
            "NOT" => Token::Not,
            _ => Token::Term(word),
        };

        Ok(Some(token))
    }

    /// Skips whitespace characters.
    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Advances to the next character.
    fn advance(&mut self) {
        if let Some(ch) = self.chars.next() {
            self.position += ch.len_utf8();
        }
    }
}

/// Convenience function to tokenize a query string.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(s: &str) -> Token {
        Token::Term(s.into())
    }

    #[test]
    fn empty_input() {
        assert_eq!(tokenize("").unwrap(), vec![]);
        assert_eq!(tokenize("   ").unwrap(), vec![]);
    }

    #[test]
    fn multiple_terms() {
        assert_eq!(
            tokenize("  eternal   now ").unwrap(),
            vec![term("eternal"), term("now")]
        );
    }

    #[test]
    fn quoted_phrase() {
        assert_eq!(
            tokenize("\"the eternal now\"").unwrap(),
            vec![Token::Phrase("the eternal now".into())]
        );
    }

    #[test]
    fn unclosed_quote_error() {
        let err = tokenize("fest \"hello world").unwrap_err();
        assert_eq!(err.position, 5);
        assert!(err.message.contains("unclosed"));
    }

    #[test]
    fn keywords_are_upper_case_only() {
        assert_eq!(
            tokenize("a AND b OR NOT c").unwrap(),
            vec![
                term("a"),
                Token::And,
                term("b"),
                Token::Or,
                Token::Not,
                term("c")
            ]
        );
        assert_eq!(
            tokenize("rust or not").unwrap(),
            vec![term("rust"), term("or"), term("not")]
        );
    }

    #[test]
    fn dash_and_caret_are_term_characters() {
        assert_eq!(
            tokenize("-deprecated x^2").unwrap(),
            vec![term("-deprecated"), term("x^2")]
        );
    }

    #[test]
    fn parentheses() {
        assert_eq!(
            tokenize("(fest OR fest*)").unwrap(),
            vec![
                Token::LParen,
                term("fest"),
                Token::Or,
                term("fest*"),
                Token::RParen
            ]
        );
    }

    #[test]
    fn known_field_prefix() {
        assert_eq!(
            tokenize("content_case:Fest").unwrap(),
            vec![Token::FieldPrefix(Field::ContentCase), term("Fest")]
        );
    }

    #[test]
    fn unknown_field_prefix_stays_in_term() {
        assert_eq!(tokenize("title:guide").unwrap(), vec![term("title:guide")]);
        assert_eq!(tokenize("12:30").unwrap(), vec![term("12:30")]);
    }

    #[test]
    fn field_with_regex() {
        assert_eq!(
            tokenize("content_case:/F\\wst/").unwrap(),
            vec![
                Token::FieldPrefix(Field::ContentCase),
                Token::Regex("F\\wst".into())
            ]
        );
    }

    #[test]
    fn regex_unescapes_slash_only() {
        assert_eq!(
            tokenize("/a\\/b\\d/").unwrap(),
            vec![Token::Regex("a/b\\d".into())]
        );
    }

    #[test]
    fn unclosed_regex_error() {
        let err = tokenize("/Fest").unwrap_err();
        assert_eq!(err.position, 0);
        assert!(err.message.contains("unclosed regex"));
    }

    #[test]
    fn slash_inside_term_is_literal() {
        assert_eq!(tokenize("and/or").unwrap(), vec![term("and/or")]);
    }

    #[test]
    fn wildcard_terms_stay_whole() {
        assert_eq!(
            tokenize("fest* f?st").unwrap(),
            vec![term("fest*"), term("f?st")]
        );
    }

    #[test]
    fn placeholder_is_a_plain_term() {
        assert_eq!(
            tokenize("cswild0marker OR now").unwrap(),
            vec![term("cswild0marker"), Token::Or, term("now")]
        );
    }
}
