use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};

/// A stable book identifier derived from the path relative to the book
/// directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(pub u64);

impl BookId {
    pub fn new(relative_path: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        relative_path.hash(&mut hasher);
        Self(hasher.finish())
    }

    /// The short hex form used in log lines (e.g. "a1b2c3").
    pub fn short(&self) -> String {
        format!("{:016x}", self.0)[..6].to_string()
    }
}

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.short())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Metadata for a single book file, as stored in the book database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    /// Path relative to the book directory.
    pub relative_path: String,
    /// Lowercase file extension, e.g. "epub".
    pub file_type: String,
    pub file_size: u64,
    /// Last modification time as seconds since the Unix epoch.
    pub mtime: u64,
    /// Empty when unknown.
    pub title: String,
    pub author: Option<Author>,
    pub has_cover: bool,
}

impl Book {
    /// A record with only file-level facts filled in.
    pub fn new(relative_path: &str, file_size: u64, mtime: u64) -> Self {
        let file_type = std::path::Path::new(relative_path)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        Self {
            id: BookId::new(relative_path),
            relative_path: relative_path.to_string(),
            file_type,
            file_size,
            mtime,
            title: String::new(),
            author: None,
            has_cover: false,
        }
    }

    /// True when there is no author or the author has an empty name.
    pub fn author_is_unset(&self) -> bool {
        self.author.as_ref().is_none_or(|a| a.name.is_empty())
    }

    pub fn author_name(&self) -> Option<&str> {
        self.author.as_ref().map(|a| a.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_deterministic() {
        assert_eq!(BookId::new("a/b.epub"), BookId::new("a/b.epub"));
        assert_ne!(BookId::new("a/b.epub"), BookId::new("a/c.epub"));
    }

    #[test]
    fn display_has_hash_prefix() {
        let s = BookId::new("book.pdf").to_string();
        assert!(s.starts_with('#'));
        assert_eq!(s.len(), 7);
    }

    #[test]
    fn new_book_has_lowercase_file_type() {
        let book = Book::new("Shelf/Some Book.EPUB", 10, 20);
        assert_eq!(book.file_type, "epub");
        assert_eq!(book.file_size, 10);
        assert_eq!(book.mtime, 20);
        assert!(book.title.is_empty());
        assert!(book.author_is_unset());
    }

    #[test]
    fn empty_author_name_counts_as_unset() {
        let mut book = Book::new("x.pdf", 0, 0);
        book.author = Some(Author::new(""));
        assert!(book.author_is_unset());
        book.author = Some(Author::new("Someone"));
        assert!(!book.author_is_unset());
    }

    #[test]
    fn serializes_as_json() {
        let mut book = Book::new("x.pdf", 1, 2);
        book.title = "X".to_string();
        let bytes = serde_json::to_vec(&book).unwrap();
        let restored: Book = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(book, restored);
    }
}
