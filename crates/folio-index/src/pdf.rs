//! PDF text and metadata extraction.
//!
//! Extraction sits behind the [`PdfSource`] trait so the indexer and title
//! cache can be driven by something other than real PDF files in tests.

use std::path::{Path, PathBuf};

use lopdf::{Document, Object};
use thiserror::Error;

/// Errors raised while reading a PDF.
#[derive(Debug, Error)]
pub enum PdfError {
    /// The file could not be loaded as a PDF.
    #[error("failed to load {path}: {message}")]
    Load {
        /// Path of the PDF.
        path: PathBuf,
        /// Underlying error message.
        message: String,
    },

    /// Text extraction failed for a page.
    #[error("failed to extract page {page} of {path}: {message}")]
    Extract {
        /// Path of the PDF.
        path: PathBuf,
        /// 1-based page number.
        page: u32,
        /// Underlying error message.
        message: String,
    },
}

/// Text of one PDF page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfPage {
    /// 1-based page number.
    pub number: u32,
    /// Extracted text.
    pub text: String,
}

/// Reads page text and document metadata from PDF files.
pub trait PdfSource: Send + Sync {
    /// Returns the text of every page, in page order.
    fn pages(&self, path: &Path) -> Result<Vec<PdfPage>, PdfError>;

    /// Returns the document's `/Title` metadata entry, if present.
    fn title(&self, path: &Path) -> Result<Option<String>, PdfError>;
}

/// [`PdfSource`] backed by `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfSource;

impl LopdfSource {
    /// Loads the document at `path`.
    fn load(path: &Path) -> Result<Document, PdfError> {
        Document::load(path).map_err(|e| PdfError::Load {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

impl PdfSource for LopdfSource {
    fn pages(&self, path: &Path) -> Result<Vec<PdfPage>, PdfError> {
        let doc = Self::load(path)?;
        doc.get_pages()
            .keys()
            .map(|&number| {
                let text = doc.extract_text(&[number]).map_err(|e| PdfError::Extract {
                    path: path.to_path_buf(),
                    page: number,
                    message: e.to_string(),
                })?;
                Ok(PdfPage { number, text })
            })
            .collect()
    }

    fn title(&self, path: &Path) -> Result<Option<String>, PdfError> {
        let doc = Self::load(path)?;

        let info = match doc.trailer.get(b"Info") {
            Ok(Object::Reference(id)) => doc.get_dictionary(*id).ok(),
            Ok(Object::Dictionary(dict)) => Some(dict),
            _ => None,
        };

        let title = info
            .and_then(|dict| dict.get(b"Title").ok())
            .and_then(|value| match value {
                Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
                _ => None,
            });

        Ok(title)
    }
}

/// Decodes a PDF text string: UTF-16BE when it carries a byte-order mark,
/// otherwise treated as (lossy) UTF-8.
fn decode_pdf_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decodes_plain_strings() {
        assert_eq!(decode_pdf_string(b"Die Philosophie"), "Die Philosophie");
    }

    #[test]
    fn decodes_utf16_with_bom() {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in "Straße".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode_pdf_string(&bytes), "Straße");
    }

    #[test]
    fn missing_file_is_load_error() {
        let err = LopdfSource
            .pages(Path::new("/definitely/not/here.pdf"))
            .unwrap_err();
        assert!(matches!(err, PdfError::Load { .. }));
    }
}
