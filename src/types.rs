//! Core types for tune-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A single track to download
///
/// The `url` field is the track's identity: a stable source-catalog URL that
/// uniquely identifies the song across runs. It is the key used by the dedup
/// ledger and the duplicate index. Everything else is descriptive metadata
/// that gets enriched as the track moves through the pipeline (`lyrics` and
/// `download_url` are filled in along the way).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Stable catalog URL uniquely identifying this track (primary key)
    pub url: String,

    /// Track title (empty for placeholder tracks awaiting hydration)
    #[serde(default)]
    pub name: String,

    /// Artist names, primary artist first
    #[serde(default)]
    pub artists: Vec<String>,

    /// Album identifier in the source catalog, if known
    #[serde(default)]
    pub album_id: Option<String>,

    /// Album display name, if known
    #[serde(default)]
    pub album_name: Option<String>,

    /// Position of the track within its album
    #[serde(default)]
    pub track_number: Option<u32>,

    /// Track duration in seconds (used for playlist EXTINF entries)
    #[serde(default)]
    pub duration: Option<u32>,

    /// Pre-resolved source stream URL, skipping provider search when set
    #[serde(default)]
    pub download_url: Option<String>,

    /// Lyrics text, filled in by the lyrics resolver when available
    #[serde(default)]
    pub lyrics: Option<String>,
}

impl Track {
    /// Create a placeholder track carrying only its identity
    ///
    /// Placeholder tracks are hydrated through the [`crate::providers::MetadataSource`]
    /// collaborator before entering the rest of the pipeline.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: String::new(),
            artists: Vec::new(),
            album_id: None,
            album_name: None,
            track_number: None,
            duration: None,
            download_url: None,
            lyrics: None,
        }
    }

    /// Whether this track still needs metadata hydration
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.name.is_empty() && !self.url.is_empty()
    }

    /// Human-readable "artist - title" name for logging and error records
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.artists.first() {
            Some(artist) => format!("{} - {}", artist, self.name),
            None => self.name.clone(),
        }
    }
}

/// Result of processing one track: the (possibly enriched) track plus the
/// path of the file it produced
///
/// `None` means the track was skipped or failed; the batch still yields one
/// outcome per input track, in input order.
pub type DownloadOutcome = (Track, Option<PathBuf>);

/// Per-track lifecycle events, broadcast to all subscribers
///
/// Events are sent over a `tokio::sync::broadcast` channel; if no subscriber
/// is listening they are silently dropped and processing continues.
#[derive(Clone, Debug)]
pub enum Event {
    /// A batch was admitted for processing with the given number of songs
    BatchStarted {
        /// Number of songs scheduled in this batch (after ledger filtering)
        songs: usize,
    },
    /// A track was skipped because its output already exists
    SongSkipped {
        /// Identity of the skipped track
        url: String,
    },
    /// The raw stream for a track finished downloading
    DownloadComplete {
        /// Identity of the track
        url: String,
    },
    /// A track finished transcoding to the target format
    ConversionComplete {
        /// Identity of the track
        url: String,
    },
    /// A track failed with a terminal error
    SongError {
        /// Identity of the failed track
        url: String,
        /// Terminal error message
        message: String,
    },
    /// A track completed its whole pipeline
    SongComplete {
        /// Identity of the completed track
        url: String,
        /// Path of the finished, tagged file
        path: PathBuf,
    },
}

/// Raw audio fetched to a temporary location by an [`crate::providers::AudioFetcher`]
///
/// The fetcher validates its upstream metadata before constructing this
/// value, so `path` is always derived from a known provider id and never
/// from absent metadata.
#[derive(Clone, Debug)]
pub struct FetchedAudio {
    /// Provider-assigned identifier, also the temp file's stem
    pub id: String,
    /// Container extension of the temp file as reported by the provider
    pub ext: String,
    /// Average bitrate of the source stream in kbit/s, when reported
    pub avg_bitrate_kbps: Option<f64>,
    /// Temporary file holding the raw stream
    pub path: PathBuf,
    /// Labeled segments reported by the provider (interstitials, credits)
    ///
    /// Passed through to the segment trimmer untouched; empty when the
    /// provider reports none.
    pub segments: Vec<Segment>,
}

/// A labeled time range within a media file
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    /// Segment start in seconds from the beginning of the file
    pub start: f64,
    /// Segment end in seconds from the beginning of the file
    pub end: f64,
    /// Category label (e.g., "intro", "non-music")
    pub category: String,
}
