//! Display titles for books.
//!
//! Titles come from the PDF `/Title` metadata entry and fall back to the file
//! name. Resolved titles are kept in a bounded LRU cache shared by every
//! request; entries are never invalidated.

use std::{
    ffi::OsStr,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError},
};

use lru::LruCache;
use regex::Regex;
use tracing::warn;

use crate::pdf::PdfSource;

/// Leading volume prefix such as `GA 261 - ` or `GA_082a - `.
static VOLUME_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*GA[_\s-]*\d+[A-Za-z]*\s*-\s*").expect("static regex is valid")
});

/// Removes a leading volume prefix from `title` for use as a search string.
///
/// Returns the title unchanged when nothing would be left.
pub fn search_title(title: &str) -> String {
    let cleaned = VOLUME_PREFIX.replace(title, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        title.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Appends `.pdf` to `filename` unless it already ends with it (any case).
pub fn with_pdf_extension(filename: &str) -> String {
    if filename.to_lowercase().ends_with(".pdf") {
        filename.to_string()
    } else {
        format!("{filename}.pdf")
    }
}

/// Process-wide cache of book titles keyed by file name.
pub struct TitleCache {
    /// Directory holding the PDFs.
    data_dir: PathBuf,
    /// Metadata reader.
    source: Arc<dyn PdfSource>,
    /// Resolved titles.
    cache: Mutex<LruCache<String, String>>,
}

impl TitleCache {
    /// Creates a cache holding at most `capacity` titles.
    pub fn new(data_dir: &Path, source: Arc<dyn PdfSource>, capacity: NonZeroUsize) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            source,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Directory the titles are read from.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns the display title for `filename`.
    pub fn title(&self, filename: &str) -> String {
        if let Some(title) = self.lock().get(filename) {
            return title.clone();
        }

        // Resolved outside the lock; a concurrent miss on the same name just
        // resolves it twice.
        let title = self.resolve(filename);
        self.lock().put(filename.to_string(), title.clone());
        title
    }

    /// Number of cached titles.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Locks the cache, ignoring poisoning.
    fn lock(&self) -> MutexGuard<'_, LruCache<String, String>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Path of `filename` inside the data directory, if it names an existing
    /// file there. Names with directory components are rejected.
    pub fn library_file(&self, filename: &str) -> Option<PathBuf> {
        if Path::new(filename).file_name() != Some(OsStr::new(filename)) {
            return None;
        }
        let path = self.data_dir.join(filename);
        path.is_file().then_some(path)
    }

    /// Reads the title from the PDF without consulting the cache.
    fn resolve(&self, filename: &str) -> String {
        let Some(path) = self.library_file(filename) else {
            return filename.to_string();
        };

        match self.source.title(&path) {
            Ok(Some(title)) if !title.trim().is_empty() => title,
            Ok(_) => filename.replace(".pdf", ""),
            Err(e) => {
                warn!(filename, error = %e, "failed to read title");
                filename.to_string()
            }
        }
    }
}
