//! Tag embedding collaborator interface
//!
//! tune-dl does not implement any tag-format encoding itself. Consumers
//! plug in a [`TagStore`] implementation (typically backed by an ID3/Vorbis
//! tagging library) and the pipeline calls it at two points: embedding the
//! full tag set after transcoding, and reading back the identity tag while
//! building the duplicate index.

use crate::error::Result;
use crate::types::Track;
use async_trait::async_trait;
use std::path::Path;

/// Reads and writes embedded metadata tags for finished audio files
#[async_trait]
pub trait TagStore: Send + Sync {
    /// Write identity, descriptive tags, and lyrics into the file
    ///
    /// The track's catalog URL must be embedded so that later runs can
    /// recognize the file as a duplicate of the same track.
    ///
    /// # Arguments
    ///
    /// * `path` - The finished audio file
    /// * `track` - Source of the tag values
    /// * `separator` - Separator for multi-valued frames (configured
    ///   `id3_separator`)
    ///
    /// # Errors
    ///
    /// Returns an error if the tags cannot be written; the pipeline wraps
    /// it into a metadata-embedding error distinct from download and
    /// transcode failures.
    async fn embed(&self, path: &Path, track: &Track, separator: &str) -> Result<()>;

    /// Read the embedded catalog URL out of an existing file
    ///
    /// Returns `None` for files without a recognizable identity tag. Used
    /// by the output-tree scan that builds the duplicate index; this is a
    /// synchronous call because the scan runs on the blocking pool.
    fn read_identity(&self, path: &Path) -> Option<String>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
