//! Index handle and page writer.
//!
//! [`IndexHandle`] owns an opened tantivy index. Writes go through a
//! [`PageWriter`], which holds the handle's writer gate for its whole lifetime
//! on top of tantivy's own directory lock, so one process never races itself
//! for the index lock.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tantivy::{
    Index, IndexReader, IndexWriter as TantivyIndexWriter, ReloadPolicy, Term,
    directory::MmapDirectory,
};
use tracing::debug;

use crate::{
    analyzer::register_tokenizers, document::PageDocument, error::IndexError,
    schema::IndexSchema, search::Searcher,
};

/// Default heap size for the index writer (50 MB).
const DEFAULT_HEAP_SIZE: usize = 50_000_000;

/// Raw string fields usable as deletion keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyField {
    /// Absolute path of the PDF.
    Path,
    /// File name of the PDF.
    Filename,
}

/// An opened index, shareable across threads.
#[derive(Clone)]
pub struct IndexHandle {
    /// The Tantivy index.
    index: Index,
    /// Schema with field handles.
    schema: IndexSchema,
    /// Directory the index lives in.
    path: PathBuf,
    /// Serializes writers within this process.
    writer_gate: Arc<Mutex<()>>,
}

impl IndexHandle {
    /// Opens the index at `path`, creating the directory and index if needed.
    pub fn open_or_create(path: &Path) -> Result<Self, IndexError> {
        let schema = IndexSchema::new();

        fs::create_dir_all(path)?;

        let dir = MmapDirectory::open(path).map_err(|e| {
            let err: tantivy::TantivyError = e.into();
            IndexError::open_index(path.to_path_buf(), &err)
        })?;

        let index = Index::open_or_create(dir, schema.schema().clone())
            .map_err(|e| IndexError::open_index(path.to_path_buf(), &e))?;

        register_tokenizers(&index);
        debug!(path = %path.display(), "opened index");

        Ok(Self {
            index,
            schema,
            path: path.to_path_buf(),
            writer_gate: Arc::new(Mutex::new(())),
        })
    }

    /// Returns the schema.
    pub fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    /// Returns the index directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens a writer. Blocks while another writer from this handle is alive.
    pub fn writer(&self) -> Result<PageWriter<'_>, IndexError> {
        let gate = self
            .writer_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let writer = self
            .index
            .writer(DEFAULT_HEAP_SIZE)
            .map_err(|e| IndexError::open_index(self.path.clone(), &e))?;

        Ok(PageWriter {
            _gate: gate,
            writer,
            schema: &self.schema,
        })
    }

    /// Opens a point-in-time searcher over the committed index.
    pub fn searcher(&self) -> Result<Searcher, IndexError> {
        let reader: IndexReader = self
            .index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| IndexError::open_index(self.path.clone(), &e))?;

        Ok(Searcher::new(reader.searcher(), self.schema.clone()))
    }
}

/// Writes pages to the index while holding the writer gate.
pub struct PageWriter<'a> {
    /// Held for the writer's lifetime.
    _gate: MutexGuard<'a, ()>,
    /// The underlying Tantivy writer.
    writer: TantivyIndexWriter,
    /// Schema with field handles.
    schema: &'a IndexSchema,
}

impl PageWriter<'_> {
    /// Stages a page for writing. Not visible until [`commit`](Self::commit).
    pub fn add_page(&mut self, page: &PageDocument) -> Result<(), IndexError> {
        self.writer
            .add_document(page.to_tantivy(self.schema))
            .map_err(|e| IndexError::write(&e))?;
        Ok(())
    }

    /// Deletes every page whose key field equals `value`.
    pub fn delete_by_field(&mut self, field: KeyField, value: &str) {
        let field = match field {
            KeyField::Path => self.schema.path,
            KeyField::Filename => self.schema.filename,
        };
        self.writer.delete_term(Term::from_field_text(field, value));
    }

    /// Deletes all documents from the index.
    pub fn delete_all(&mut self) -> Result<(), IndexError> {
        self.writer
            .delete_all_documents()
            .map_err(|e| IndexError::write(&e))?;
        Ok(())
    }

    /// Commits all pending changes to the index.
    pub fn commit(&mut self) -> Result<(), IndexError> {
        self.writer.commit().map_err(|e| IndexError::commit(&e))?;
        Ok(())
    }

    /// Rolls back any uncommitted changes.
    pub fn rollback(&mut self) -> Result<(), IndexError> {
        self.writer.rollback().map_err(|e| IndexError::commit(&e))?;
        Ok(())
    }
}
