//! Directory-scanning boundary used for content extraction.
//!
//! The loader stages objects into a scratch tree and hands the whole tree to a
//! [`DocumentScanner`]; the coordinator points the same trait at a local asset
//! root when no bucket is configured. [`FsScanner`] is the default filesystem
//! implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Errors raised while scanning a document tree.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk {root}: {message}")]
    Walk { root: PathBuf, message: String },
}

/// One extracted document: the file it came from and its normalized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedDocument {
    pub path: PathBuf,
    pub content: String,
}

/// Boundary trait over recursive content extraction.
///
/// Implementations must return documents in a deterministic order; the corpus
/// fingerprint depends on it.
#[async_trait]
pub trait DocumentScanner: Send + Sync {
    async fn scan(&self, root: &Path) -> Result<Vec<ScannedDocument>, ScanError>;
}

/// Filesystem scanner that walks `root` and reads every regular file.
///
/// File bodies are decoded lossily; a stray non-UTF-8 byte degrades to the
/// replacement character rather than aborting the load.
#[derive(Debug, Clone)]
pub struct FsScanner {
    recursive: bool,
}

impl Default for FsScanner {
    fn default() -> Self {
        Self { recursive: true }
    }
}

impl FsScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the scan to the top level of the root directory.
    #[must_use]
    pub fn top_level_only(mut self) -> Self {
        self.recursive = false;
        self
    }
}

#[async_trait]
impl DocumentScanner for FsScanner {
    async fn scan(&self, root: &Path) -> Result<Vec<ScannedDocument>, ScanError> {
        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut paths = Vec::new();
        for entry in WalkDir::new(root).max_depth(max_depth).sort_by_file_name() {
            let entry = entry.map_err(|err| ScanError::Walk {
                root: root.to_path_buf(),
                message: err.to_string(),
            })?;
            if entry.file_type().is_file() {
                paths.push(entry.into_path());
            }
        }

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = tokio::fs::read(&path).await.map_err(|source| ScanError::Read {
                path: path.clone(),
                source,
            })?;
            let content = String::from_utf8_lossy(&bytes).into_owned();
            debug!(path = %path.display(), bytes = content.len(), "scanned document");
            documents.push(ScannedDocument { path, content });
        }
        Ok(documents)
    }
}
