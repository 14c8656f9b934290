//! Best-effort author and title inference from a book's file name.
//!
//! Used for books whose embedded metadata is missing or unreadable. Rules run
//! in pipeline order on the same record, and each rule decides for itself
//! whether to overwrite what an earlier rule produced.

use std::{collections::HashSet, path::Path};

use crate::book::{Author, Book};

/// Separator between the author and title parts of a file name.
const DASH_SEPARATOR: &str = " - ";

/// A single inference rule.
pub trait FilenameRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, path: &Path, book: &mut Book);
}

/// Names accepted by `--filename-rules`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RuleName {
    /// Author from the parent folder, title from the file name
    #[value(name = "authorfolders")]
    AuthorFolders,
    /// "Author - Title" file names
    #[value(name = "dashes")]
    Dashes,
    /// File name as title when nothing else matched
    #[value(name = "titleonly")]
    TitleOnly,
}

impl RuleName {
    pub fn defaults() -> Vec<Self> {
        vec![Self::Dashes, Self::TitleOnly]
    }

    pub fn build(self) -> Box<dyn FilenameRule> {
        match self {
            Self::AuthorFolders => Box::new(AuthorFolders),
            Self::Dashes => Box::new(Dashes),
            Self::TitleOnly => Box::new(TitleOnly),
        }
    }
}

/// Extracts the author name from the parent folder and the title from the
/// file name. Meant for collections laid out as `.../Author Name/Title.pdf`.
///
/// Always overwrites.
#[derive(Debug, Clone, Copy)]
pub struct AuthorFolders;

impl FilenameRule for AuthorFolders {
    fn name(&self) -> &'static str {
        "authorfolders"
    }

    fn apply(&self, path: &Path, book: &mut Book) {
        // A bare file name sits in ".", and the root names itself.
        let parent = match path.parent() {
            None => ".".to_string(),
            Some(p) if p.as_os_str().is_empty() => ".".to_string(),
            Some(p) => p
                .file_name()
                .unwrap_or(p.as_os_str())
                .to_string_lossy()
                .into_owned(),
        };

        book.author = Some(Author::new(parent));
        book.title = strip_extension(path);
    }
}

/// Splits `Author Name - Book Title.pdf` on `" - "`. The first segment is the
/// author and the remaining segments, rejoined, are the title. Repeated
/// segments are dropped after their first occurrence.
///
/// Overwrites whenever it fires.
#[derive(Debug, Clone, Copy)]
pub struct Dashes;

impl FilenameRule for Dashes {
    fn name(&self) -> &'static str {
        "dashes"
    }

    fn apply(&self, path: &Path, book: &mut Book) {
        let stem = strip_extension(path);
        let pieces: Vec<&str> = stem.split(DASH_SEPARATOR).collect();
        if pieces.len() < 2 {
            return;
        }

        let pieces = unique_in_order(pieces);
        if let [author, rest @ ..] = pieces.as_slice()
            && !rest.is_empty()
        {
            book.author = Some(Author::new(*author));
            book.title = rest.join(DASH_SEPARATOR);
        }
    }
}

/// Last resort: the file name without its extension becomes the title, but
/// only when neither an author nor a title is known yet. Must come after the
/// other rules in a pipeline.
#[derive(Debug, Clone, Copy)]
pub struct TitleOnly;

impl FilenameRule for TitleOnly {
    fn name(&self) -> &'static str {
        "titleonly"
    }

    fn apply(&self, path: &Path, book: &mut Book) {
        if book.author_is_unset() && book.title.is_empty() {
            book.title = strip_extension(path);
        }
    }
}

/// An ordered rule pipeline, built once at startup.
pub struct FilenameInferencer {
    rules: Vec<Box<dyn FilenameRule>>,
}

impl FilenameInferencer {
    pub fn new(rules: Vec<Box<dyn FilenameRule>>) -> Self {
        Self { rules }
    }

    pub fn from_names(names: &[RuleName]) -> Self {
        Self::new(names.iter().map(|n| n.build()).collect())
    }

    /// Runs every rule in order. There is no early exit.
    pub fn apply(&self, path: &Path, book: &mut Book) {
        for rule in &self.rules {
            rule.apply(path, book);
        }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }
}

impl Default for FilenameInferencer {
    fn default() -> Self {
        Self::from_names(&RuleName::defaults())
    }
}

impl std::fmt::Debug for FilenameInferencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilenameInferencer")
            .field("rules", &self.rule_names())
            .finish()
    }
}

/// The base file name with its final extension removed.
fn strip_extension(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.rfind('.') {
        Some(idx) => name[..idx].to_string(),
        None => name,
    }
}

fn unique_in_order(pieces: Vec<&str>) -> Vec<&str> {
    let mut seen = HashSet::with_capacity(pieces.len());
    pieces.into_iter().filter(|p| seen.insert(*p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_book(path: &str) -> Book {
        Book::new(path, 0, 0)
    }

    fn run(rule: &dyn FilenameRule, path: &str) -> Book {
        let mut book = empty_book(path);
        rule.apply(Path::new(path), &mut book);
        book
    }

    #[test]
    fn dashes_splits_author_and_title() {
        let book = run(&Dashes, "Author Name - Book Title.pdf");
        assert_eq!(book.author_name(), Some("Author Name"));
        assert_eq!(book.title, "Book Title");
    }

    #[test]
    fn dashes_drops_repeated_segments() {
        let book = run(&Dashes, "A - A - B.pdf");
        assert_eq!(book.author_name(), Some("A"));
        assert_eq!(book.title, "B");
    }

    #[test]
    fn dashes_rejoins_remaining_segments() {
        let book = run(&Dashes, "/books/Author - Series - Title.epub");
        assert_eq!(book.author_name(), Some("Author"));
        assert_eq!(book.title, "Series - Title");
    }

    #[test]
    fn dashes_ignores_single_segment() {
        let book = run(&Dashes, "singlepart.pdf");
        assert_eq!(book, empty_book("singlepart.pdf"));
    }

    #[test]
    fn dashes_ignores_segments_that_collapse_to_one() {
        let book = run(&Dashes, "Same - Same.pdf");
        assert_eq!(book, empty_book("Same - Same.pdf"));
    }

    #[test]
    fn dashes_requires_spaces_around_dash() {
        let book = run(&Dashes, "Jean-Luc-Title.pdf");
        assert!(book.author.is_none());
        assert!(book.title.is_empty());
    }

    #[test]
    fn dashes_overwrites_existing_fields() {
        let mut book = empty_book("A - B.pdf");
        book.title = "Old".to_string();
        book.author = Some(Author::new("Old Author"));
        Dashes.apply(Path::new("A - B.pdf"), &mut book);
        assert_eq!(book.author_name(), Some("A"));
        assert_eq!(book.title, "B");
    }

    #[test]
    fn authorfolders_uses_parent_directory() {
        let book = run(&AuthorFolders, "/foo/bar/Author Name/Book Title.pdf");
        assert_eq!(book.author_name(), Some("Author Name"));
        assert_eq!(book.title, "Book Title");
    }

    #[test]
    fn authorfolders_always_overwrites() {
        let mut book = empty_book("x.pdf");
        book.title = "Embedded".to_string();
        AuthorFolders.apply(Path::new("/shelf/Writer/x.pdf"), &mut book);
        assert_eq!(book.author_name(), Some("Writer"));
        assert_eq!(book.title, "x");
    }

    #[test]
    fn authorfolders_without_parent_uses_current_dir() {
        let book = run(&AuthorFolders, "Book Title.pdf");
        assert_eq!(book.author_name(), Some("."));
        assert_eq!(book.title, "Book Title");

        let book = run(&AuthorFolders, "/Book Title.pdf");
        assert_eq!(book.author_name(), Some("/"));
    }

    #[test]
    fn titleonly_fills_empty_record() {
        let book = run(&TitleOnly, "plainname.pdf");
        assert_eq!(book.title, "plainname");
        assert!(book.author.is_none());
    }

    #[test]
    fn titleonly_skips_when_author_known() {
        let mut book = empty_book("plainname.pdf");
        book.author = Some(Author::new("Someone"));
        TitleOnly.apply(Path::new("plainname.pdf"), &mut book);
        assert!(book.title.is_empty());
    }

    #[test]
    fn titleonly_treats_empty_author_as_unset() {
        let mut book = empty_book("plainname.pdf");
        book.author = Some(Author::new(""));
        TitleOnly.apply(Path::new("plainname.pdf"), &mut book);
        assert_eq!(book.title, "plainname");
    }

    #[test]
    fn strip_extension_removes_only_last_suffix() {
        assert_eq!(strip_extension(Path::new("a/b.tar.gz")), "b.tar");
        assert_eq!(strip_extension(Path::new("noext")), "noext");
    }

    #[test]
    fn default_pipeline_order() {
        let inferencer = FilenameInferencer::default();
        assert_eq!(inferencer.rule_names(), vec!["dashes", "titleonly"]);
    }

    #[test]
    fn pipeline_falls_back_to_title_only() {
        let inferencer = FilenameInferencer::default();
        let mut book = empty_book("plainname.pdf");
        inferencer.apply(Path::new("plainname.pdf"), &mut book);
        assert_eq!(book.title, "plainname");
        assert!(book.author.is_none());
    }

    #[test]
    fn pipeline_title_only_does_not_overwrite_dashes() {
        let inferencer = FilenameInferencer::default();
        let mut book = empty_book("A - B.pdf");
        inferencer.apply(Path::new("A - B.pdf"), &mut book);
        assert_eq!(book.author_name(), Some("A"));
        assert_eq!(book.title, "B");
    }

    #[test]
    fn pipeline_is_idempotent() {
        let inferencer = FilenameInferencer::default();
        for name in ["A - B - A.pdf", "plainname.epub", "x - y.mobi"] {
            let mut first = empty_book(name);
            inferencer.apply(Path::new(name), &mut first);
            let mut second = empty_book(name);
            inferencer.apply(Path::new(name), &mut second);
            assert_eq!(first, second);

            let mut again = first.clone();
            inferencer.apply(Path::new(name), &mut again);
            assert_eq!(again, first);
        }
    }

    #[test]
    fn custom_pipeline_runs_every_rule() {
        let inferencer = FilenameInferencer::from_names(&[
            RuleName::AuthorFolders,
            RuleName::Dashes,
        ]);
        let mut book = empty_book("x");
        inferencer.apply(Path::new("/lib/Folder/Writer - Novel.epub"), &mut book);
        assert_eq!(book.author_name(), Some("Writer"));
        assert_eq!(book.title, "Novel");
    }
}
