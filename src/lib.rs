//! bookbrowser - index a directory of ebooks and serve it.
//!
//! The crate covers the service lifecycle: resolving configuration,
//! provisioning working storage, indexing the book directory with
//! filename-based metadata inference, reporting liveness to a supervising
//! process manager, and shutting down in order on a termination signal.
//!
//! # Filename inference
//!
//! ```
//! use std::path::Path;
//!
//! use bookbrowser::{Book, FilenameInferencer};
//!
//! let inferencer = FilenameInferencer::default();
//! let mut book = Book::new("Ann Leckie - Provenance.epub", 0, 0);
//! inferencer.apply(Path::new("Ann Leckie - Provenance.epub"), &mut book);
//!
//! assert_eq!(book.author_name(), Some("Ann Leckie"));
//! assert_eq!(book.title, "Provenance");
//! ```

pub mod book;
pub mod book_db;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod data_dir;
pub mod error;
pub mod filename;
pub mod incremental;
pub mod library;
pub mod liveness;
pub mod server;
pub mod signals;
pub mod supervisor;
pub mod update;
pub mod walker;

pub use book::{Author, Book, BookId};
pub use book_db::{BookDb, BookQuery};
pub use config::Config;
pub use data_dir::DataDir;
pub use error::{Error, Result};
pub use filename::{FilenameInferencer, RuleName};
pub use library::Library;

/// Version tag baked in at build time through `BOOKBROWSER_VERSION`.
/// Untagged builds report `dev`.
pub const VERSION: &str = match option_env!("BOOKBROWSER_VERSION") {
    Some(version) => version,
    None => update::DEV_VERSION,
};
