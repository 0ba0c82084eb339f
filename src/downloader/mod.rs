//! Core downloader implementation split into focused submodules.
//!
//! The `Downloader` struct and its methods are organized by domain:
//! - [`batch`] - Batch orchestration (album expansion, ledger, summary artifacts)
//! - [`pipeline`] - The per-song pipeline state machine
//! - [`search`] - Ordered-fallback source and lyrics resolution

mod batch;
mod pipeline;
mod search;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::archive::Archive;
use crate::config::DownloaderConfig;
use crate::convert::{FfmpegTranscoder, Transcoder};
use crate::error::{Error, Result};
use crate::known_songs::KnownSongs;
use crate::postprocess::SegmentTrimmer;
use crate::providers::{
    AudioFetcher, AudioProvider, LyricsProvider, MetadataSource, ProviderRegistry,
};
use crate::tag::TagStore;
use crate::types::Event;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore, broadcast};

/// External collaborators the downloader drives
///
/// Everything the pipeline cannot do itself comes in through this struct:
/// metadata hydration, the raw stream fetch, tag embedding, and optionally
/// a transcoder and a segment trimmer. When no transcoder is supplied, an
/// ffmpeg binary is discovered from the configuration or the system PATH
/// at construction time.
#[derive(Clone)]
pub struct Services {
    /// Metadata hydration and album expansion
    pub metadata: Arc<dyn MetadataSource>,
    /// Raw stream fetching
    pub fetcher: Arc<dyn AudioFetcher>,
    /// Tag embedding and identity reading
    pub tags: Arc<dyn TagStore>,
    /// Transcoder override (None = discover ffmpeg)
    pub transcoder: Option<Arc<dyn Transcoder>>,
    /// Segment-removal post-processor (None = segment removal unavailable)
    pub trimmer: Option<Arc<dyn SegmentTrimmer>>,
}

impl Services {
    /// Create a service set with the three mandatory collaborators
    pub fn new(
        metadata: Arc<dyn MetadataSource>,
        fetcher: Arc<dyn AudioFetcher>,
        tags: Arc<dyn TagStore>,
    ) -> Self {
        Self {
            metadata,
            fetcher,
            tags,
            transcoder: None,
            trimmer: None,
        }
    }

    /// Use an explicit transcoder instead of discovering ffmpeg
    #[must_use]
    pub fn with_transcoder(mut self, transcoder: Arc<dyn Transcoder>) -> Self {
        self.transcoder = Some(transcoder);
        self
    }

    /// Enable segment removal through the given trimmer
    #[must_use]
    pub fn with_trimmer(mut self, trimmer: Arc<dyn SegmentTrimmer>) -> Self {
        self.trimmer = Some(trimmer);
        self
    }
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
///
/// Owns the dedup ledger, the duplicate index, and the batch error list for
/// the lifetime of one batch invocation; per-song pipelines receive shared
/// read access to the duplicate index and append-only access to the error
/// list through the `Mutex`-wrapped handles.
#[derive(Clone)]
pub struct Downloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<DownloaderConfig>,
    /// Ordered audio providers; fallback order for source resolution
    pub(crate) audio_providers: Vec<Arc<dyn AudioProvider>>,
    /// Ordered lyrics providers; fallback order for lyrics resolution
    pub(crate) lyrics_providers: Vec<Arc<dyn LyricsProvider>>,
    /// External collaborators
    pub(crate) services: Services,
    /// Resolved transcoder (explicit or discovered ffmpeg)
    pub(crate) transcoder: Arc<dyn Transcoder>,
    /// Persistent ledger of completed identities
    pub(crate) archive: Arc<Mutex<Archive>>,
    /// Index of files already containing known tracks
    pub(crate) known_songs: Arc<Mutex<KnownSongs>>,
    /// Accumulated batch error records
    pub(crate) errors: Arc<Mutex<Vec<String>>>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Admission gate bounding concurrently running pipelines
    pub(crate) semaphore: Arc<Semaphore>,
}

impl Downloader {
    /// Create a new Downloader instance
    ///
    /// This validates the configuration, resolves the configured provider
    /// names against the registry, discovers a transcoder, loads the URL
    /// ledger, and (when `scan_for_songs` is set) scans the output tree
    /// for already-downloaded songs. Every configuration error surfaces
    /// here, before any track can be scheduled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty or unknown provider list, an
    /// invalid format, or a missing ffmpeg binary; I/O errors for an
    /// unreadable ledger file.
    pub async fn new(
        config: DownloaderConfig,
        registry: &ProviderRegistry,
        services: Services,
    ) -> Result<Self> {
        config.validate()?;

        let audio_providers = registry.resolve_audio(&config.audio_providers)?;
        let lyrics_providers = registry.resolve_lyrics(&config.lyrics_providers)?;

        let transcoder: Arc<dyn Transcoder> = match &services.transcoder {
            Some(transcoder) => Arc::clone(transcoder),
            None => match &config.ffmpeg {
                Some(path) => Arc::new(FfmpegTranscoder::new(path.clone())),
                None => Arc::new(FfmpegTranscoder::from_path().ok_or_else(|| {
                    Error::config("ffmpeg is not installed", Some("ffmpeg"))
                })?),
            },
        };
        tracing::debug!(transcoder = transcoder.name(), "Transcoder initialized");

        let mut archive = Archive::new();
        if let Some(path) = &config.archive {
            archive.load(path)?;
        }
        tracing::debug!(urls = archive.len(), "Archive loaded");

        let known_songs = if config.scan_for_songs {
            tracing::info!("Scanning for known songs, this might take a while...");
            let root = scan_root(&config.output);
            let format = config.format.clone();
            let tags = Arc::clone(&services.tags);
            tokio::task::spawn_blocking(move || KnownSongs::scan(&root, &format, &tags))
                .await
                .map_err(|e| Error::Other(format!("known-songs scan panicked: {e}")))?
        } else {
            KnownSongs::new()
        };
        tracing::debug!(count = known_songs.len(), "Found known songs");

        let (event_tx, _rx) = broadcast::channel(1000);
        let semaphore = Arc::new(Semaphore::new(config.threads));

        Ok(Self {
            config: Arc::new(config),
            audio_providers,
            lyrics_providers,
            services,
            transcoder,
            archive: Arc::new(Mutex::new(archive)),
            known_songs: Arc::new(Mutex::new(known_songs)),
            errors: Arc::new(Mutex::new(Vec::new())),
            event_tx,
            semaphore,
        })
    }

    /// Subscribe to per-track lifecycle events
    ///
    /// Multiple subscribers are supported; each receives all events
    /// independently. A subscriber that falls behind by more than the
    /// channel buffer receives a `RecvError::Lagged` error.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Snapshot of the error records accumulated so far
    ///
    /// Records have the form `"<url> - <kind>: <message>"`, one per failed
    /// track, in completion order. The list is never cleared between
    /// batches on the same instance.
    pub async fn errors(&self) -> Vec<String> {
        self.errors.lock().await.clone()
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers the event is silently dropped;
    /// processing never depends on someone listening.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}

/// Derive the directory to scan for known songs from the output template
///
/// Takes the literal directory prefix of the template (everything before
/// the first template variable), so `"music/{artist}/{title}"` scans
/// `music/` and a flat template scans the working directory.
fn scan_root(template: &str) -> PathBuf {
    let literal = template.split('{').next().unwrap_or("");
    match literal.rsplit_once('/') {
        Some((dir, _)) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from("."),
    }
}
