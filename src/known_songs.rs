//! In-memory index of files already containing known tracks
//!
//! Built once at startup by scanning the output tree for files whose
//! embedded identity tag can be read, then appended to incrementally as
//! pipelines complete. The index is purely advisory: wrong or missing
//! entries only affect duplicate-handling convenience, never the
//! correctness of a fresh download.

use crate::tag::TagStore;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Mapping from track identity to paths believed to already contain it
#[derive(Debug, Default)]
pub struct KnownSongs {
    songs: HashMap<String, Vec<PathBuf>>,
}

impl KnownSongs {
    /// Create an empty index
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index by scanning an output tree
    ///
    /// Walks `dir` recursively, considers files with the target `format`
    /// extension, and asks the tag store for each file's embedded identity.
    /// Unreadable files and files without an identity tag are skipped
    /// silently. This walks the filesystem synchronously; callers on an
    /// async runtime should run it via `spawn_blocking`.
    #[must_use]
    pub fn scan(dir: &Path, format: &str, tags: &Arc<dyn TagStore>) -> Self {
        let mut songs: HashMap<String, Vec<PathBuf>> = HashMap::new();

        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(format) {
                continue;
            }

            if let Some(url) = tags.read_identity(path) {
                songs.entry(url).or_default().push(path.to_path_buf());
            }
        }

        tracing::debug!(count = songs.len(), dir = %dir.display(), "Scanned known songs");
        Self { songs }
    }

    /// Paths believed to already contain the given track
    ///
    /// Returns an owned copy; callers filter out entries that no longer
    /// exist or that match their own output path.
    #[must_use]
    pub fn paths_for(&self, url: &str) -> Vec<PathBuf> {
        self.songs.get(url).cloned().unwrap_or_default()
    }

    /// Register a freshly produced file under a track identity
    pub fn insert(&mut self, url: impl Into<String>, path: PathBuf) {
        self.songs.entry(url.into()).or_default().push(path);
    }

    /// Number of distinct identities in the index
    #[must_use]
    pub fn len(&self) -> usize {
        self.songs.len()
    }

    /// Whether the index is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }
}
