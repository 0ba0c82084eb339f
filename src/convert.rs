//! Transcoding collaborator interface and the ffmpeg-backed implementation
//!
//! The pipeline talks to the transcoder through the [`Transcoder`] trait so
//! the conversion engine stays pluggable; [`FfmpegTranscoder`] is the
//! default implementation, executing an external `ffmpeg` binary discovered
//! from the configuration or the system PATH.

use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Diagnostic data captured from a failed conversion
#[derive(Clone, Debug)]
pub struct ConvertDiagnostics {
    /// The full command line that was executed
    pub command: String,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

/// Result of a conversion attempt
#[must_use]
#[derive(Clone, Debug)]
pub struct ConvertOutcome {
    /// Whether the conversion produced a usable output file
    pub success: bool,
    /// Diagnostic data, present when the conversion failed
    pub diagnostics: Option<ConvertDiagnostics>,
}

/// Converts a raw downloaded stream into the target container format
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Convert `input` into `output`
    ///
    /// # Arguments
    ///
    /// * `input` - The temporary raw stream file
    /// * `output` - The destination file; its extension matches `format`
    /// * `format` - Target container format (e.g. "mp3")
    /// * `bitrate` - Explicit bitrate such as "192k", or `None` to let the
    ///   tool pick
    /// * `extra_args` - Additional arguments passed through verbatim
    ///
    /// # Errors
    ///
    /// Returns an error only when the tool cannot be executed at all; a
    /// conversion that ran but failed is reported through
    /// [`ConvertOutcome::diagnostics`].
    async fn convert(
        &self,
        input: &Path,
        output: &Path,
        format: &str,
        bitrate: Option<&str>,
        extra_args: &[String],
    ) -> Result<ConvertOutcome>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Transcoder backed by an external ffmpeg binary
pub struct FfmpegTranscoder {
    binary_path: PathBuf,
}

impl FfmpegTranscoder {
    /// Create a transcoder with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find ffmpeg in PATH
    ///
    /// # Returns
    ///
    /// `Some(FfmpegTranscoder)` if the binary is found, `None` otherwise.
    pub fn from_path() -> Option<Self> {
        which::which("ffmpeg").ok().map(Self::new)
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn convert(
        &self,
        input: &Path,
        output: &Path,
        format: &str,
        bitrate: Option<&str>,
        extra_args: &[String],
    ) -> Result<ConvertOutcome> {
        let mut command = Command::new(&self.binary_path);
        command
            .arg("-nostdin")
            .arg("-y")
            .arg("-i")
            .arg(input)
            .arg("-vn")
            .arg("-f")
            .arg(ffmpeg_muxer(format));

        if let Some(bitrate) = bitrate {
            command.arg("-b:a").arg(bitrate);
        }

        for arg in extra_args {
            command.arg(arg);
        }

        command.arg(output);

        let rendered = format!("{:?}", command.as_std());
        let result = command
            .output()
            .await
            .map_err(|e| Error::ExternalTool(format!("failed to execute ffmpeg: {e}")))?;

        if result.status.success() {
            Ok(ConvertOutcome {
                success: true,
                diagnostics: None,
            })
        } else {
            Ok(ConvertOutcome {
                success: false,
                diagnostics: Some(ConvertDiagnostics {
                    command: rendered,
                    stdout: String::from_utf8_lossy(&result.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
                }),
            })
        }
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

/// Map a container format name to the ffmpeg muxer name
fn ffmpeg_muxer(format: &str) -> &str {
    match format {
        "m4a" => "ipod",
        "opus" | "ogg" => "ogg",
        other => other,
    }
}

/// Persist a failed conversion's diagnostics to the errors directory
///
/// Writes a sectioned report (`### command`, `### stdout`, `### stderr`)
/// into `errors_dir` under a timestamped file name and returns its path,
/// which the pipeline embeds into the terminal transcode error. The
/// sub-second part of the timestamp keeps concurrent failures from
/// clobbering each other's reports.
///
/// # Errors
///
/// Returns an error if the directory or the report file cannot be written.
pub fn write_error_report(errors_dir: &Path, diagnostics: &ConvertDiagnostics) -> Result<PathBuf> {
    std::fs::create_dir_all(errors_dir)?;

    let stamp = Local::now().format("%Y-%m-%d-%H-%M-%S%.3f");
    let report = errors_dir.join(format!("ffmpeg_error_{stamp}.txt"));

    let mut body = String::new();
    for (section, value) in [
        ("command", &diagnostics.command),
        ("stdout", &diagnostics.stdout),
        ("stderr", &diagnostics.stderr),
    ] {
        body.push_str(&format!("### {section}:\n{}\n\n", value.trim()));
    }

    std::fs::write(&report, body)?;
    Ok(report)
}
