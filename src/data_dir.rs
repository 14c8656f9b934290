use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Prefix for auto-allocated scratch directories.
const TEMP_PREFIX: &str = "bookbrowser";

/// Working storage for the book database and cover thumbnails.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
    auto_created: bool,
}

impl DataDir {
    /// Resolve the data directory.
    ///
    /// With an explicit path the directory is created if missing and is
    /// never cleaned up. Without one, a fresh temporary directory is
    /// allocated (falling back to `_temp` under the working directory) and
    /// marked for removal on shutdown.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let (root, auto_created) = match explicit {
            Some(path) => (path.to_path_buf(), false),
            None => (Self::allocate_temp()?, true),
        };

        if !root.exists() {
            std::fs::create_dir_all(&root)
                .map_err(|_| Error::DataDir(root.clone()))?;
        }

        let root = root.canonicalize().map_err(|e| {
            Error::Config(format!(
                "could not resolve data directory {}: {e}",
                root.display()
            ))
        })?;

        Ok(Self { root, auto_created })
    }

    fn allocate_temp() -> Result<PathBuf> {
        match tempfile::Builder::new().prefix(TEMP_PREFIX).tempdir() {
            Ok(dir) => Ok(dir.keep()),
            Err(e) => {
                let fallback = std::env::current_dir()?.join("_temp");
                tracing::debug!(
                    "could not allocate temporary directory ({e}), using {}",
                    fallback.display()
                );
                Ok(fallback)
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True only when this process allocated the directory itself.
    pub fn should_cleanup(&self) -> bool {
        self.auto_created
    }

    /// Remove the directory tree if it was auto-created.
    ///
    /// Failures are logged and otherwise ignored.
    pub fn cleanup(&self) {
        if !self.should_cleanup() {
            return;
        }
        tracing::info!("Removing temporary data directory");
        if let Err(e) = std::fs::remove_dir_all(&self.root) {
            tracing::warn!(
                "could not remove data directory {}: {e}",
                self.root.display()
            );
        }
    }

    pub fn books_db(&self) -> PathBuf {
        self.root.join("books.redb")
    }

    pub fn covers_dir(&self) -> Result<PathBuf> {
        let path = self.root.join("covers");
        std::fs::create_dir_all(&path)
            .map_err(|_| Error::DataDir(path.clone()))?;
        Ok(path)
    }
}
