//! Test helpers shared across modules.

use std::{fs, path::Path};

use crate::pdf::{PdfError, PdfPage, PdfSource};

/// Reads "PDFs" that are plain text files with pages separated by form feeds.
///
/// A first line of the form `Title: ...` is taken as the metadata title and is
/// not part of any page.
pub struct TextPdfSource;

impl TextPdfSource {
    /// Reads the file, mapping failures to load errors.
    fn read(path: &Path) -> Result<String, PdfError> {
        fs::read_to_string(path).map_err(|e| PdfError::Load {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

impl PdfSource for TextPdfSource {
    fn pages(&self, path: &Path) -> Result<Vec<PdfPage>, PdfError> {
        let text = Self::read(path)?;
        let body = match text.strip_prefix("Title: ") {
            Some(rest) => rest.split_once('\n').map_or("", |(_, body)| body),
            None => text.as_str(),
        };
        Ok(body
            .split('\x0C')
            .zip(1..)
            .map(|(text, number)| PdfPage {
                number,
                text: text.to_string(),
            })
            .collect())
    }

    fn title(&self, path: &Path) -> Result<Option<String>, PdfError> {
        let text = Self::read(path)?;
        Ok(text
            .strip_prefix("Title: ")
            .and_then(|rest| rest.lines().next())
            .map(str::to_string))
    }
}
