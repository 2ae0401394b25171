//! Query parsing, preprocessing and AST rewriting for folio search.
//!
//! A raw user query goes through three stages before it reaches the index:
//!
//! 1. [`preprocess`] lexically rewrites the raw string: case-sensitive markers
//!    (`+Fest`, `+Fest*`, `+F?st`) become field-qualified queries or placeholder
//!    terms, bare wildcards (`fest*`) are widened to `(fest OR fest*)`, and the
//!    literal terms and phrases to highlight are extracted.
//! 2. [`parse`] turns the rewritten string into a [`QueryExpr`] tree.
//! 3. [`rewrite`] substitutes placeholder terms with sub-queries the text syntax
//!    cannot express (exact term OR regex on the case-preserving field).
//!
//! The query language:
//!
//! - **Terms**: `rust` - a word
//! - **Phrases**: `"the eternal now"` - exact sequences
//! - **Boolean operators**: `AND`, `OR`, `NOT` (upper case)
//! - **Grouping**: `(a b) OR (c d)` - precedence control
//! - **Wildcards**: `fest*`, `f?st`
//! - **Fields**: `content_case:Fest`, `content_case:/F\wst/`
//!
//! # Example
//!
//! ```
//! use folio_query::{Field, Grouping, parse, preprocess, rewrite};
//!
//! let prepared = preprocess("+Fest* OR \"the eternal now\"");
//! let expr = parse(prepared.modified_query(), Field::Content, Grouping::Or)
//!     .unwrap()
//!     .unwrap();
//! let expr = rewrite(&expr, prepared.wildcard_descriptors()).unwrap();
//! assert!(!expr.to_query_string().contains("cswild"));
//! ```

#![warn(missing_docs)]

mod ast;
mod error;
mod lexer;
mod parser;
mod preprocess;
mod rewrite;

pub use ast::{Field, QueryExpr};
pub use error::{LexError, ParseError, QueryError, QueryErrorKind, RewriteError};
pub use lexer::{Token, tokenize};
pub use parser::{Grouping, parse};
pub use preprocess::{
    PreparedQuery, SearchType, WildcardDescriptor, WildcardKind, parse_placeholder,
    placeholder_token, preprocess,
};
pub use rewrite::{rewrite, wildcard_subtree};
