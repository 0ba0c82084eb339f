//! Segment-removal collaborator interface
//!
//! When `skip_sponsor_segments` is enabled, the pipeline asks a
//! [`SegmentTrimmer`] for labeled non-music segments (intros, credits,
//! interstitials) in the downloaded media and then has it physically cut
//! them out of the finished file. The detection and cutting algorithms are
//! consumer-supplied; the pipeline only owns the cleanup of whatever
//! intermediate files the cut produces.

use crate::error::Result;
use crate::types::{FetchedAudio, Segment};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Detects and removes labeled segments from downloaded media
#[async_trait]
pub trait SegmentTrimmer: Send + Sync {
    /// Determine which labeled segments the media contains
    ///
    /// Receives the full fetch metadata so implementations can use the
    /// provider-assigned id or the segments the provider already reported.
    /// An empty list means there is nothing to cut.
    ///
    /// # Errors
    ///
    /// Returns an error if segment lookup fails; terminal for the affected
    /// track only.
    async fn segments(&self, audio: &FetchedAudio) -> Result<Vec<Segment>>;

    /// Physically cut the given segments out of `output_file`
    ///
    /// # Returns
    ///
    /// Paths of intermediate files created during the cut; the pipeline
    /// deletes them afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the cut fails; terminal for the affected track
    /// only.
    async fn remove(&self, output_file: &Path, segments: &[Segment]) -> Result<Vec<PathBuf>>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
