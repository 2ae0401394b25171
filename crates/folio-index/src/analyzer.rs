//! Text analysis pipelines for the folio search index.
//!
//! Two analyzers share a tokenizer and differ only in case folding:
//! 1. `SimpleTokenizer` - splits on whitespace and punctuation
//! 2. `LowerCaser` - converts tokens to lowercase (`folio_text` only)
//! 3. `RemoveLongFilter` - removes tokens longer than 40 bytes
//!
//! No stemming is applied, so a prefix match on `Fest` never sees a stemmed
//! form of the word.

use tantivy::{
    Index,
    tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, TextAnalyzer, TokenStream},
};

/// Tokenizer for the case-folded `content` field.
pub const TEXT_TOKENIZER: &str = "folio_text";

/// Tokenizer for the case-preserving `content_case` field.
pub const CASE_TOKENIZER: &str = "folio_case";

/// Maximum token length in bytes before filtering.
const MAX_TOKEN_LENGTH: usize = 40;

/// Builds the case-folding analyzer.
pub fn build_text_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .filter(RemoveLongFilter::limit(MAX_TOKEN_LENGTH))
        .build()
}

/// Builds the case-preserving analyzer.
pub fn build_case_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(MAX_TOKEN_LENGTH))
        .build()
}

/// Registers both analyzers on an index. Must run every time an index is opened.
pub fn register_tokenizers(index: &Index) {
    index
        .tokenizers()
        .register(TEXT_TOKENIZER, build_text_analyzer());
    index
        .tokenizers()
        .register(CASE_TOKENIZER, build_case_analyzer());
}

/// Runs `text` through `analyzer` and collects the token texts.
pub fn tokenize(analyzer: &mut TextAnalyzer, text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut stream = analyzer.token_stream(text);
    while let Some(token) = stream.next() {
        tokens.push(token.text.clone());
    }
    tokens
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn text_analyzer_lowercases() {
        let mut analyzer = build_text_analyzer();
        assert_eq!(tokenize(&mut analyzer, "HELLO World"), ["hello", "world"]);
    }

    #[test]
    fn case_analyzer_preserves_case() {
        let mut analyzer = build_case_analyzer();
        assert_eq!(tokenize(&mut analyzer, "Fest fest FEST"), ["Fest", "fest", "FEST"]);
    }

    #[test]
    fn no_stemming() {
        let mut analyzer = build_text_analyzer();
        assert_eq!(
            tokenize(&mut analyzer, "festivals running"),
            ["festivals", "running"]
        );
    }

    #[test]
    fn removes_long_tokens() {
        let mut analyzer = build_case_analyzer();
        let long_token = "a".repeat(50);
        let text = format!("short {long_token} word");
        assert_eq!(tokenize(&mut analyzer, &text), ["short", "word"]);
    }

    #[test]
    fn splits_punctuation_and_keeps_unicode_words() {
        let mut analyzer = build_text_analyzer();
        assert_eq!(
            tokenize(&mut analyzer, "Straße, größer! foo-bar"),
            ["straße", "größer", "foo", "bar"]
        );
    }
}
