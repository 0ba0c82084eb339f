//! Configuration types for tune-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output formats the transcoder is expected to understand
pub const SUPPORTED_FORMATS: &[&str] = &["mp3", "flac", "ogg", "opus", "m4a", "wav"];

/// Behavior when an output file or known duplicate already exists
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    /// Leave the existing file alone; the track yields no path
    Skip,
    /// Delete known duplicates and re-download from scratch
    Force,
    /// Reuse the most recent duplicate, re-embedding tags only
    Metadata,
    /// Re-download; existing files are replaced once the new file is ready
    #[default]
    Overwrite,
}

/// Target bitrate for transcoding
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bitrate {
    /// Derive the numeric bitrate from the source stream's reported average
    #[default]
    Auto,
    /// Pass no explicit bitrate to the transcoder
    Disable,
    /// Fixed bitrate in kbit/s
    #[serde(untagged)]
    Kbps(u32),
}

/// Main configuration for [`crate::Downloader`]
///
/// Every recognized option is enumerated and typed here; the struct is
/// validated once at downloader construction and immutable afterwards.
/// All fields have sensible defaults, so `DownloaderConfig::default()`
/// works out of the box.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloaderConfig {
    /// Output path template (default: "{artists} - {title}.{output-ext}")
    ///
    /// Recognized variables: `{artist}`, `{artists}`, `{title}`, `{album}`,
    /// `{track-number}`, `{output-ext}`. Path separators inside the template
    /// create subdirectories; separators inside expanded values do not.
    #[serde(default = "default_output")]
    pub output: String,

    /// Target container format (default: "mp3")
    #[serde(default = "default_format")]
    pub format: String,

    /// Target bitrate (default: auto)
    #[serde(default)]
    pub bitrate: Bitrate,

    /// Behavior on existing output files and duplicates (default: overwrite)
    #[serde(default)]
    pub overwrite: OverwritePolicy,

    /// Maximum concurrently running song pipelines (default: 4)
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Ordered audio provider names; fallback order for source resolution
    #[serde(default = "default_audio_providers")]
    pub audio_providers: Vec<String>,

    /// Ordered lyrics provider names; fallback order for lyrics resolution
    #[serde(default)]
    pub lyrics_providers: Vec<String>,

    /// Path of the persistent URL ledger (None = no ledger)
    #[serde(default)]
    pub archive: Option<PathBuf>,

    /// Path of the m3u playlist to generate at batch end (None = disabled)
    #[serde(default)]
    pub m3u: Option<PathBuf>,

    /// Path of the JSON results file written at batch end (None = disabled)
    #[serde(default)]
    pub save_file: Option<PathBuf>,

    /// Scan the output tree for already-downloaded songs at startup
    #[serde(default)]
    pub scan_for_songs: bool,

    /// Expand album references: fetch every track of each song's album
    #[serde(default)]
    pub fetch_albums: bool,

    /// Detect and cut out labeled non-music segments after transcoding
    #[serde(default)]
    pub skip_sponsor_segments: bool,

    /// Sanitize file names down to a conservative ASCII-safe subset
    #[serde(default)]
    pub restrict: bool,

    /// Explicit path of the ffmpeg binary (auto-detected from PATH if None)
    #[serde(default)]
    pub ffmpeg: Option<PathBuf>,

    /// Extra arguments passed through to ffmpeg
    #[serde(default)]
    pub ffmpeg_args: Vec<String>,

    /// Directory for temporary per-track stream files (default: "./temp")
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Directory where transcode diagnostic reports are persisted
    /// (default: "./errors")
    #[serde(default = "default_errors_dir")]
    pub errors_dir: PathBuf,

    /// Log every accumulated error record at batch end
    #[serde(default)]
    pub print_errors: bool,

    /// Separator the tag embedder uses for multi-valued ID3 frames
    #[serde(default = "default_id3_separator")]
    pub id3_separator: String,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            format: default_format(),
            bitrate: Bitrate::default(),
            overwrite: OverwritePolicy::default(),
            threads: default_threads(),
            audio_providers: default_audio_providers(),
            lyrics_providers: Vec::new(),
            archive: None,
            m3u: None,
            save_file: None,
            scan_for_songs: false,
            fetch_albums: false,
            skip_sponsor_segments: false,
            restrict: false,
            ffmpeg: None,
            ffmpeg_args: Vec::new(),
            temp_dir: default_temp_dir(),
            errors_dir: default_errors_dir(),
            print_errors: false,
            id3_separator: default_id3_separator(),
        }
    }
}

impl DownloaderConfig {
    /// Validate the configuration
    ///
    /// Called once by [`crate::Downloader::new`] before any track is
    /// scheduled; any error returned here is batch-fatal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when no audio provider is configured, the
    /// concurrency limit is zero, or the target format is unknown.
    pub fn validate(&self) -> Result<()> {
        if self.audio_providers.is_empty() {
            return Err(Error::config(
                "no audio providers specified, please specify at least one",
                Some("audio_providers"),
            ));
        }

        if self.threads == 0 {
            return Err(Error::config(
                "threads must be at least 1",
                Some("threads"),
            ));
        }

        if !SUPPORTED_FORMATS.contains(&self.format.as_str()) {
            return Err(Error::Config {
                message: format!(
                    "unknown output format '{}', expected one of: {}",
                    self.format,
                    SUPPORTED_FORMATS.join(", ")
                ),
                key: Some("format".to_string()),
            });
        }

        Ok(())
    }
}

fn default_output() -> String {
    "{artists} - {title}.{output-ext}".to_string()
}

fn default_format() -> String {
    "mp3".to_string()
}

fn default_threads() -> usize {
    4
}

fn default_audio_providers() -> Vec<String> {
    vec!["youtube-music".to_string()]
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("./temp")
}

fn default_errors_dir() -> PathBuf {
    PathBuf::from("./errors")
}

fn default_id3_separator() -> String {
    "/".to_string()
}
