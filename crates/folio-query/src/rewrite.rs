//! Placeholder substitution on parsed query trees.
//!
//! Case-sensitive prefix wildcards cannot be written in the text syntax (the
//! index's wildcard matching would fold case), so the preprocessor leaves a
//! placeholder term behind and this pass swaps in the real sub-query.

use tracing::debug;

use crate::{
    ast::{Field, QueryExpr},
    error::RewriteError,
    preprocess::{WildcardDescriptor, WildcardKind, parse_placeholder},
};

/// Builds the sub-query for a case-sensitive prefix: the exact base word, or
/// the base followed by one or more word characters.
pub fn wildcard_subtree(base_term: &str) -> QueryExpr {
    QueryExpr::Or(vec![
        QueryExpr::term(Field::ContentCase, base_term),
        QueryExpr::regex(
            Field::ContentCase,
            format!(r"{}\w+", regex::escape(base_term)),
        ),
    ])
}

/// Returns a new tree with every placeholder term replaced by its sub-query.
///
/// A term shaped like a placeholder whose index does not name a prefix
/// wildcard descriptor is an error.
pub fn rewrite(
    expr: &QueryExpr,
    descriptors: &[WildcardDescriptor],
) -> Result<QueryExpr, RewriteError> {
    match expr {
        QueryExpr::Term { text, .. } => match parse_placeholder(text) {
            Some(index) => match descriptors.get(index) {
                Some(descriptor) if descriptor.kind == WildcardKind::PrefixWildcard => {
                    debug!(placeholder = %text, base = %descriptor.base_term, "substituted placeholder");
                    Ok(wildcard_subtree(&descriptor.base_term))
                }
                _ => Err(RewriteError::UnknownPlaceholder {
                    token: text.clone(),
                }),
            },
            None => Ok(expr.clone()),
        },
        QueryExpr::And(children) => Ok(QueryExpr::And(rewrite_all(children, descriptors)?)),
        QueryExpr::Or(children) => Ok(QueryExpr::Or(rewrite_all(children, descriptors)?)),
        QueryExpr::Not(child) => Ok(QueryExpr::Not(Box::new(rewrite(child, descriptors)?))),
        QueryExpr::Phrase { .. } | QueryExpr::Wildcard { .. } | QueryExpr::Regex { .. } => {
            Ok(expr.clone())
        }
    }
}

/// Rewrites each child in order.
fn rewrite_all(
    children: &[QueryExpr],
    descriptors: &[WildcardDescriptor],
) -> Result<Vec<QueryExpr>, RewriteError> {
    children
        .iter()
        .map(|child| rewrite(child, descriptors))
        .collect()
}
