//! Persistent ledger of already-downloaded track identities
//!
//! The archive is a flat, line-delimited set of catalog URLs. It is loaded
//! fully into memory at startup, used to pre-filter a batch before any track
//! is scheduled, extended with the identities that succeeded, and flushed
//! back to disk exactly once per batch. A crash mid-batch therefore loses
//! the whole batch's additions, never a partial set.

use crate::error::Result;
use std::collections::HashSet;
use std::path::Path;

/// In-memory set of track identities completed in previous runs
#[derive(Clone, Debug, Default)]
pub struct Archive {
    urls: HashSet<String>,
}

impl Archive {
    /// Create an empty archive
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate the archive from a line-delimited file
    ///
    /// A missing file is not an error; it leaves the archive empty so that
    /// first runs work without any setup.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No archive file yet, starting empty");
            return Ok(());
        }

        let contents = std::fs::read_to_string(path)?;
        for line in contents.lines() {
            let url = line.trim();
            if !url.is_empty() {
                self.urls.insert(url.to_string());
            }
        }

        Ok(())
    }

    /// Whether the given identity completed in a previous run
    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Record an identity as completed
    ///
    /// Returns `true` if the identity was not present before.
    pub fn add(&mut self, url: impl Into<String>) -> bool {
        self.urls.insert(url.into())
    }

    /// Write the archive back to disk
    ///
    /// Writes to a sibling temp file first and renames it into place, so a
    /// crash during the write never leaves a truncated ledger behind.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or renamed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut lines: Vec<&str> = self.urls.iter().map(String::as_str).collect();
        lines.sort_unstable();

        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, lines.join("\n") + "\n")?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Number of identities in the archive
    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Whether the archive holds no identities
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
