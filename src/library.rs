use std::{
    path::{Path, PathBuf},
    sync::Mutex,
    time::Instant,
};

use rayon::prelude::*;

use crate::{
    book::Book,
    book_db::{BookDb, BookQuery},
    error::{Error, Result},
    filename::FilenameInferencer,
    incremental,
    walker::{self, DiscoveredFile},
};

/// Source of metadata embedded in the book file itself (container metadata,
/// cover images). Format decoders plug in here.
pub trait MetadataReader: Send + Sync {
    /// Fill `book` with whatever the file declares. `covers` is the
    /// thumbnail directory when cover indexing is enabled.
    fn read(
        &self,
        file: &DiscoveredFile,
        book: &mut Book,
        covers: Option<&Path>,
    ) -> Result<()>;
}

/// Reader for builds without format decoders: every book goes through
/// filename inference.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEmbeddedMetadata;

impl MetadataReader for NoEmbeddedMetadata {
    fn read(
        &self,
        _file: &DiscoveredFile,
        _book: &mut Book,
        _covers: Option<&Path>,
    ) -> Result<()> {
        Ok(())
    }
}

/// Counts from one refresh.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexReport {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub failed: usize,
    /// Books on disk after the refresh.
    pub total: usize,
}

/// Keeps the book database in step with the book directory.
pub struct Library {
    book_dir: PathBuf,
    db: BookDb,
    inferencer: FilenameInferencer,
    reader: Box<dyn MetadataReader>,
    covers_dir: Option<PathBuf>,
    // Startup and SIGUSR1 refreshes may overlap.
    refresh_lock: Mutex<()>,
}

impl Library {
    pub fn new(
        book_dir: PathBuf,
        db: BookDb,
        inferencer: FilenameInferencer,
    ) -> Self {
        Self {
            book_dir,
            db,
            inferencer,
            reader: Box::new(NoEmbeddedMetadata),
            covers_dir: None,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn with_reader(mut self, reader: Box<dyn MetadataReader>) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_covers(mut self, covers_dir: PathBuf) -> Self {
        self.covers_dir = Some(covers_dir);
        self
    }

    pub fn book_dir(&self) -> &Path {
        &self.book_dir
    }

    pub fn db(&self) -> &BookDb {
        &self.db
    }

    /// Rescan the whole book directory and bring the index up to date.
    ///
    /// Only new and modified files are re-read. A file that cannot be read
    /// is logged and skipped; directory and database errors are returned.
    pub fn refresh_full(&self) -> Result<IndexReport> {
        let _guard = self
            .refresh_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let started = Instant::now();

        let files = walker::discover_files(&self.book_dir)?;
        let diff = incremental::diff_books(&self.db, &files)?;

        // (is_new, file)
        let pending: Vec<(bool, &DiscoveredFile)> = diff
            .new_files
            .iter()
            .map(|file| (true, file))
            .chain(diff.changed_files.iter().map(|file| (false, file)))
            .collect();
        let loaded: Vec<(bool, Book)> = pending
            .par_iter()
            .filter_map(|&(is_new, file)| match self.load(file) {
                Ok(book) => Some((is_new, book)),
                Err(e) => {
                    tracing::warn!(
                        path = %file.relative_path.display(),
                        "could not index book: {e}"
                    );
                    None
                }
            })
            .collect();

        let added = loaded.iter().filter(|(is_new, _)| *is_new).count();
        let books: Vec<Book> = loaded.into_iter().map(|(_, book)| book).collect();

        self.db.upsert_batch(&books)?;
        self.db.remove_batch(&diff.deleted_ids)?;

        let report = IndexReport {
            added,
            updated: books.len() - added,
            removed: diff.deleted_ids.len(),
            failed: pending.len() - books.len(),
            total: files.len(),
        };
        tracing::info!(
            added = report.added,
            updated = report.updated,
            removed = report.removed,
            failed = report.failed,
            total = report.total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "book index refreshed"
        );
        Ok(report)
    }

    /// Total number of indexed books; an empty index is fatal.
    pub fn verify_not_empty(&self) -> Result<usize> {
        match self.db.count(&BookQuery::new())? {
            0 => Err(Error::NoBooks),
            total => Ok(total),
        }
    }

    fn load(&self, file: &DiscoveredFile) -> Result<Book> {
        let mut book = Book::new(&file.relative_str(), file.size, file.mtime);
        self.reader.read(file, &mut book, self.covers_dir.as_deref())?;
        // Inference reads the name under which the book is listed, never a
        // symlink target.
        if book.title.is_empty() {
            let listed = self.book_dir.join(&file.relative_path);
            self.inferencer.apply(&listed, &mut book);
        }
        tracing::debug!(id = %book.id, title = %book.title, "indexed");
        Ok(book)
    }
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("book_dir", &self.book_dir)
            .field("inferencer", &self.inferencer)
            .field("covers_dir", &self.covers_dir)
            .finish_non_exhaustive()
    }
}
