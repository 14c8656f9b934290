use std::collections::{HashMap, HashSet};

use crate::{book::BookId, book_db::BookDb, error::Result, walker::DiscoveredFile};

/// Result of comparing discovered files against the stored index.
#[derive(Debug, Default)]
pub struct DiffResult {
    /// Files with no stored record.
    pub new_files: Vec<DiscoveredFile>,
    /// Files whose size or mtime differs from the stored record.
    pub changed_files: Vec<DiscoveredFile>,
    /// Stored books whose file is gone.
    pub deleted_ids: Vec<BookId>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.new_files.is_empty()
            && self.changed_files.is_empty()
            && self.deleted_ids.is_empty()
    }
}

/// Compare discovered files against what the book database already holds.
pub fn diff_books(
    db: &BookDb,
    discovered: &[DiscoveredFile],
) -> Result<DiffResult> {
    // relative path -> (id, size, mtime)
    let known: HashMap<String, (BookId, u64, u64)> = db
        .list_all()?
        .into_iter()
        .map(|b| (b.relative_path, (b.id, b.file_size, b.mtime)))
        .collect();

    let mut result = DiffResult::default();
    let mut seen = HashSet::with_capacity(discovered.len());

    for file in discovered {
        let rel_path = file.relative_str();
        match known.get(&rel_path) {
            None => result.new_files.push(file.clone()),
            Some(&(_, size, mtime))
                if size != file.size || mtime != file.mtime =>
            {
                result.changed_files.push(file.clone());
            }
            Some(_) => {}
        }
        seen.insert(rel_path);
    }

    result.deleted_ids = known
        .iter()
        .filter(|(path, _)| !seen.contains(*path))
        .map(|(_, (id, _, _))| *id)
        .collect();

    Ok(result)
}
