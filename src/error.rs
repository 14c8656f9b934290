use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Redb(#[from] redb::Error),

    #[error("database open error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("database storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("database transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("database table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("database commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("book record is corrupt: {0}")]
    Record(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("book directory {0} does not exist")]
    BookDir(PathBuf),

    #[error("data directory does not exist and could not be created: {0}")]
    DataDir(PathBuf),

    #[error("no books found")]
    NoBooks,

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("error starting server: {0}")]
    Server(std::io::Error),
}
