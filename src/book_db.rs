use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::{
    book::{Book, BookId},
    error::Result,
};

const BOOKS: TableDefinition<u64, &[u8]> = TableDefinition::new("books");

/// Selects books for [`BookDb::count`]. `BookQuery::new()` selects every
/// stored book.
#[derive(Debug, Clone, Copy, Default)]
pub struct BookQuery;

impl BookQuery {
    pub fn new() -> Self {
        Self
    }

    pub fn matches(&self, _book: &Book) -> bool {
        true
    }
}

/// The persistent book index, one JSON record per book keyed by [`BookId`].
pub struct BookDb {
    db: Database,
}

impl BookDb {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;

        let txn = db.begin_write()?;
        txn.open_table(BOOKS)?;
        txn.commit()?;

        Ok(Self { db })
    }

    pub fn get(&self, id: BookId) -> Result<Option<Book>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(BOOKS)?;
        match table.get(id.0)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(bytes.value())?)),
            None => Ok(None),
        }
    }

    /// Insert or replace several books in a single transaction.
    pub fn upsert_batch(&self, books: &[Book]) -> Result<()> {
        if books.is_empty() {
            return Ok(());
        }
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(BOOKS)?;
            for book in books {
                let bytes = serde_json::to_vec(book)?;
                table.insert(book.id.0, bytes.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Remove several books in a single transaction.
    pub fn remove_batch(&self, ids: &[BookId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(BOOKS)?;
            for id in ids {
                table.remove(id.0)?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Every stored book, in id order.
    pub fn list_all(&self) -> Result<Vec<Book>> {
        self.find(&BookQuery::new())
    }

    pub fn find(&self, query: &BookQuery) -> Result<Vec<Book>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(BOOKS)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (_id, bytes) = entry?;
            let book: Book = serde_json::from_slice(bytes.value())?;
            if query.matches(&book) {
                result.push(book);
            }
        }
        Ok(result)
    }

    pub fn count(&self, query: &BookQuery) -> Result<usize> {
        Ok(self.find(query)?.len())
    }
}

impl std::fmt::Debug for BookDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookDb").finish_non_exhaustive()
    }
}
