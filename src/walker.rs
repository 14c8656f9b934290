use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use crate::error::Result;

/// A discovered book file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Path relative to the book directory.
    pub relative_path: PathBuf,
    /// Fully resolved absolute path.
    pub absolute_path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time as seconds since the Unix epoch.
    pub mtime: u64,
}

impl DiscoveredFile {
    pub fn relative_str(&self) -> String {
        self.relative_path.to_string_lossy().to_string()
    }
}

/// Book formats picked up during discovery, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["epub", "mobi", "pdf"];

/// Recursively walk a directory and discover book files.
///
/// Skips hidden files/directories (names starting with `.`) and only
/// returns files with supported extensions.
pub fn discover_files(root: &Path) -> Result<Vec<DiscoveredFile>> {
    let root = root.canonicalize()?;
    let mut found = Vec::new();
    let mut pending = vec![root.clone()];

    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }

            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(path);
                continue;
            }

            // Symlinked directories are never followed, so a link back into
            // the tree cannot loop.
            let target = if file_type.is_symlink() {
                match path.canonicalize() {
                    Ok(target) if target.is_file() => target,
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::debug!(path = %path.display(), "skipping broken symlink: {e}");
                        continue;
                    }
                }
            } else if file_type.is_file() {
                path.canonicalize()?
            } else {
                continue;
            };

            if is_supported(&path) {
                found.push(describe(&root, &path, target)?);
            }
        }
    }

    found.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(found)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

fn describe(
    root: &Path,
    path: &Path,
    absolute_path: PathBuf,
) -> Result<DiscoveredFile> {
    let relative_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();
    let metadata = std::fs::metadata(&absolute_path)?;
    let mtime = metadata
        .modified()
        .unwrap_or(SystemTime::UNIX_EPOCH)
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    Ok(DiscoveredFile {
        relative_path,
        absolute_path,
        size: metadata.len(),
        mtime,
    })
}
