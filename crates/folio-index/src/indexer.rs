//! Indexing pipeline.
//!
//! The [`Indexer`] keeps the index in step with the data directory:
//! 1. Remove books whose PDF has disappeared
//! 2. Find PDFs not yet in the index
//! 3. Extract their pages and write them, committing once per book
//!
//! Every step is reported through an [`EventSink`].

use std::{
    collections::BTreeSet,
    ffi::OsStr,
    path::{Path, PathBuf},
};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::{
    document::PageDocument,
    error::IndexError,
    pdf::PdfSource,
    stream::{Completion, EventSink, ProgressEvent, StreamClosed},
    writer::{IndexHandle, KeyField, PageWriter},
};

/// Statistics from an indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Books removed because their PDF is gone.
    pub removed: usize,
    /// Books that were new and attempted.
    pub attempted: usize,
    /// Pages written.
    pub pages: usize,
    /// Books that failed to index, with the error message.
    pub failed: Vec<(String, String)>,
}

/// Why a run stopped early.
enum Interrupt {
    /// The consumer went away.
    Closed,
    /// The index itself failed.
    Index(IndexError),
}

impl From<StreamClosed> for Interrupt {
    fn from(_: StreamClosed) -> Self {
        Self::Closed
    }
}

impl From<IndexError> for Interrupt {
    fn from(e: IndexError) -> Self {
        Self::Index(e)
    }
}

/// A PDF found in the data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPdf {
    /// Full path to the file.
    pub path: PathBuf,
    /// File name, the index key.
    pub filename: String,
}

/// Lists the `*.pdf` files directly inside `data_dir`, sorted by name.
pub fn discover_pdfs(data_dir: &Path) -> Result<Vec<DiscoveredPdf>, IndexError> {
    let mut pdfs = Vec::new();
    for entry in WalkDir::new(data_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| IndexError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension() != Some(OsStr::new("pdf")) {
            continue;
        }
        pdfs.push(DiscoveredPdf {
            path: path.to_path_buf(),
            filename: entry.file_name().to_string_lossy().into_owned(),
        });
    }
    Ok(pdfs)
}

/// Pluralizes "book".
fn books(count: usize) -> &'static str {
    if count == 1 { "book" } else { "books" }
}

/// Keeps the index in step with a directory of PDFs.
pub struct Indexer<'a> {
    /// Target index.
    handle: &'a IndexHandle,
    /// Page text extractor.
    source: &'a dyn PdfSource,
    /// Directory holding the PDFs.
    data_dir: &'a Path,
}

impl<'a> Indexer<'a> {
    /// Creates an indexer.
    pub fn new(handle: &'a IndexHandle, source: &'a dyn PdfSource, data_dir: &'a Path) -> Self {
        Self {
            handle,
            source,
            data_dir,
        }
    }

    /// Removes stale books and indexes new ones.
    pub fn update(&self, sink: &mut impl EventSink) -> Result<IndexStats, StreamClosed> {
        self.run(sink, false)
    }

    /// Clears the index and indexes every PDF from scratch.
    pub fn rebuild(&self, sink: &mut impl EventSink) -> Result<IndexStats, StreamClosed> {
        self.run(sink, true)
    }

    /// Runs an update or rebuild, turning index failures into an error event.
    fn run(&self, sink: &mut impl EventSink, rebuild: bool) -> Result<IndexStats, StreamClosed> {
        if !self.data_dir.is_dir() {
            sink.emit(ProgressEvent::error("Data directory not found"))?;
            return Ok(IndexStats::default());
        }

        let mut stats = IndexStats::default();
        match self.try_run(sink, rebuild, &mut stats) {
            Ok(()) => {
                info!(
                    removed = stats.removed,
                    indexed = stats.attempted - stats.failed.len(),
                    failed = stats.failed.len(),
                    pages = stats.pages,
                    "indexing finished"
                );
                Ok(stats)
            }
            Err(Interrupt::Closed) => Err(StreamClosed),
            Err(Interrupt::Index(e)) => {
                warn!(error = %e, "indexing aborted");
                sink.emit(ProgressEvent::error(e))?;
                Ok(stats)
            }
        }
    }

    /// The body of [`run`](Self::run).
    fn try_run(
        &self,
        sink: &mut impl EventSink,
        rebuild: bool,
        stats: &mut IndexStats,
    ) -> Result<(), Interrupt> {
        let pdfs = discover_pdfs(self.data_dir)?;
        let on_disk: BTreeSet<&str> = pdfs.iter().map(|p| p.filename.as_str()).collect();
        let indexed = if rebuild {
            BTreeSet::new()
        } else {
            self.handle.searcher()?.indexed_filenames()?
        };

        let mut writer = self.handle.writer()?;

        if rebuild {
            writer.delete_all()?;
            writer.commit()?;
        } else {
            let stale: Vec<&String> = indexed
                .iter()
                .filter(|name| !on_disk.contains(name.as_str()))
                .collect();
            if !stale.is_empty() {
                for name in &stale {
                    writer.delete_by_field(KeyField::Filename, name);
                }
                writer.commit()?;
                stats.removed = stale.len();
                sink.emit(ProgressEvent::Cleanup {
                    message: format!(
                        "Removed {} deleted {} from index",
                        stale.len(),
                        books(stale.len())
                    ),
                })?;
            }
        }

        let new: Vec<&DiscoveredPdf> = pdfs
            .iter()
            .filter(|pdf| !indexed.contains(&pdf.filename))
            .collect();
        if new.is_empty() {
            sink.emit(ProgressEvent::Complete(Completion::Indexing {
                message: "No new books to index".into(),
            }))?;
            return Ok(());
        }

        let total = new.len();
        for (i, pdf) in new.iter().enumerate() {
            sink.emit(ProgressEvent::Indexing {
                current: i + 1,
                total,
                filename: pdf.filename.clone(),
            })?;
            stats.attempted += 1;

            match self.index_pdf(&mut writer, &pdf.path) {
                Ok(pages) => stats.pages += pages,
                Err(e) => {
                    warn!(filename = %pdf.filename, error = %e, "failed to index book");
                    writer.rollback()?;
                    sink.emit(ProgressEvent::error(format!(
                        "Error indexing {}: {e}",
                        pdf.filename
                    )))?;
                    stats.failed.push((pdf.filename.clone(), e.to_string()));
                }
            }
        }

        sink.emit(ProgressEvent::Complete(Completion::Indexing {
            message: format!("Indexed {total} new {}", books(total)),
        }))?;
        Ok(())
    }

    /// Writes the non-empty pages of one PDF and commits. Returns the page count.
    fn index_pdf(&self, writer: &mut PageWriter<'_>, path: &Path) -> Result<usize, IndexError> {
        let pages = self.source.pages(path)?;
        let mut written = 0;
        for page in pages.iter().filter(|p| !p.text.trim().is_empty()) {
            writer.add_page(&PageDocument::from_page(path, page))?;
            written += 1;
        }
        writer.commit()?;
        Ok(written)
    }
}
