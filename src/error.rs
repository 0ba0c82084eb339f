//! Error types for tune-dl
//!
//! This module provides error handling for the library, including:
//! - A batch-fatal configuration error raised before any track is scheduled
//! - Per-track terminal errors (resolution, download, transcode, metadata)
//! - Stable short error kinds used when composing batch error records

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tune-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tune-dl
///
/// Configuration errors abort a whole batch before any track is scheduled.
/// Every other variant is a per-track terminal error: it is caught at the
/// pipeline boundary, converted into an error record, and never propagates
/// to sibling tracks or the batch orchestrator.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "audio_providers")
        key: Option<String>,
    },

    /// No audio provider yielded a source URL for the track
    #[error("no results found for song: {song}")]
    Resolution {
        /// Display name of the track that could not be resolved
        song: String,
    },

    /// Upstream fetch failed or returned no usable metadata
    #[error("download error: {0}")]
    Download(String),

    /// Conversion tool failed; a diagnostic report was persisted
    #[error("failed to convert {song}, you can find the error report here: {}", report.display())]
    Transcode {
        /// Display name of the track that failed to convert
        song: String,
        /// Path of the persisted diagnostic report
        report: PathBuf,
    },

    /// Tag embedding failed
    #[error("failed to embed metadata: {0}")]
    Metadata(String),

    /// Text or path not representable by the runtime environment
    ///
    /// The message carries actionable guidance (typically: enable the
    /// `restrict` option to force ASCII-safe file names).
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Metadata hydration failed (placeholder track could not be resolved)
    #[error("failed to fetch metadata: {0}")]
    Hydration(String),

    /// External tool execution failed (ffmpeg, segment trimmer)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Convenience constructor for configuration errors
    pub fn config(message: impl Into<String>, key: Option<&str>) -> Self {
        Self::Config {
            message: message.into(),
            key: key.map(str::to_string),
        }
    }

    /// Stable short name for this error's kind
    ///
    /// Used when composing batch error records of the form
    /// `"<url> - <kind>: <message>"` so that records stay greppable even
    /// when the underlying message changes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config { .. } => "ConfigError",
            Self::Resolution { .. } => "LookupError",
            Self::Download(_) => "DownloadError",
            Self::Transcode { .. } => "FfmpegError",
            Self::Metadata(_) => "MetadataError",
            Self::Encoding(_) => "EncodingError",
            Self::Hydration(_) => "HydrationError",
            Self::ExternalTool(_) => "ExternalToolError",
            Self::Io(_) => "IoError",
            Self::Serialization(_) => "SerializationError",
            Self::Other(_) => "DownloaderError",
        }
    }
}
