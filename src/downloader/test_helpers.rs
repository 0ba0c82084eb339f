//! Shared test helpers: mock collaborators and a harness for building
//! Downloader instances against a temp directory.
//!
//! The mocks follow one convention that ties them together: a file's
//! *content* is its embedded identity tag. The fetcher writes the stream
//! URL into the temp file, the fake transcoder copies it to the output,
//! and `MemoryTags::embed` rewrites it to the track's catalog URL, which
//! `read_identity` reads back. Existing files seeded by tests just need
//! the track URL as their content to be recognized as duplicates.

use crate::config::DownloaderConfig;
use crate::convert::{ConvertDiagnostics, ConvertOutcome, Transcoder};
use crate::downloader::{Downloader, Services};
use crate::error::{Error, Result};
use crate::postprocess::SegmentTrimmer;
use crate::providers::{
    AudioFetcher, AudioProvider, LyricsProvider, MetadataSource, ProviderRegistry,
};
use crate::tag::TagStore;
use crate::types::{FetchedAudio, Segment, Track};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Build a track with full metadata for the given numeric id
pub(crate) fn track(n: u32) -> Track {
    let mut track = Track::from_url(format!("https://music.example.com/track/{n}"));
    track.name = format!("Song {n}");
    track.artists = vec!["Artist".to_string()];
    track.duration = Some(180);
    track
}

/// Audio provider that always resolves to a deterministic stream URL
pub(crate) struct FoundAudio {
    pub(crate) name: &'static str,
    pub(crate) calls: AtomicUsize,
}

impl FoundAudio {
    pub(crate) fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl AudioProvider for FoundAudio {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn search(&self, track: &Track) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(format!("https://streams.example.com/{}", track.url)))
    }
}

/// Audio provider that never finds anything
pub(crate) struct EmptyAudio {
    pub(crate) name: &'static str,
    pub(crate) calls: AtomicUsize,
}

impl EmptyAudio {
    pub(crate) fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl AudioProvider for EmptyAudio {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn search(&self, _track: &Track) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }
}

/// Lyrics provider returning a fixed result
pub(crate) struct StaticLyrics {
    pub(crate) name: &'static str,
    pub(crate) lyrics: Option<String>,
}

#[async_trait]
impl LyricsProvider for StaticLyrics {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn get_lyrics(&self, _name: &str, _artists: &[String]) -> Result<Option<String>> {
        Ok(self.lyrics.clone())
    }
}

/// Metadata source backed by in-memory maps
#[derive(Default)]
pub(crate) struct FakeMetadata {
    pub(crate) tracks: HashMap<String, Track>,
    pub(crate) albums: HashMap<String, Vec<Track>>,
}

#[async_trait]
impl MetadataSource for FakeMetadata {
    async fn track(&self, url: &str) -> Result<Track> {
        self.tracks
            .get(url)
            .cloned()
            .ok_or_else(|| Error::Hydration(format!("unknown track: {url}")))
    }

    async fn album_tracks(&self, album_id: &str) -> Result<Vec<Track>> {
        self.albums
            .get(album_id)
            .cloned()
            .ok_or_else(|| Error::Hydration(format!("unknown album: {album_id}")))
    }
}

/// Fetcher that writes the stream URL into a temp file
///
/// Each fetch gets a unique provider-assigned id from a counter. An
/// optional per-fetch delay plus an active-call gauge let concurrency
/// tests observe how many pipelines run their blocking stage at once.
pub(crate) struct RecordingFetcher {
    pub(crate) calls: AtomicUsize,
    pub(crate) active: AtomicUsize,
    pub(crate) max_active: AtomicUsize,
    pub(crate) delay: Option<Duration>,
    pub(crate) fail: bool,
    next_id: AtomicUsize,
}

impl RecordingFetcher {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            delay: None,
            fail: false,
            next_id: AtomicUsize::new(0),
        })
    }

    pub(crate) fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            delay: Some(delay),
            fail: false,
            next_id: AtomicUsize::new(0),
        })
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            delay: None,
            fail: true,
            next_id: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl AudioFetcher for RecordingFetcher {
    async fn fetch(&self, url: &str, temp_dir: &Path) -> Result<FetchedAudio> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.fail {
            return Err(Error::Download(format!("upstream fetch failed: {url}")));
        }

        let id = format!("stream{:04}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let path = temp_dir.join(format!("{id}.webm"));
        std::fs::write(&path, url)?;

        Ok(FetchedAudio {
            id,
            ext: "webm".to_string(),
            avg_bitrate_kbps: Some(127.8),
            path,
            segments: Vec::new(),
        })
    }
}

/// Transcoder that copies the input to the output
pub(crate) struct FakeTranscoder {
    pub(crate) calls: AtomicUsize,
    pub(crate) bitrates: std::sync::Mutex<Vec<Option<String>>>,
    pub(crate) fail: bool,
}

impl FakeTranscoder {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            bitrates: std::sync::Mutex::new(Vec::new()),
            fail: false,
        })
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            bitrates: std::sync::Mutex::new(Vec::new()),
            fail: true,
        })
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn convert(
        &self,
        input: &Path,
        output: &Path,
        _format: &str,
        bitrate: Option<&str>,
        _extra_args: &[String],
    ) -> Result<ConvertOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bitrates
            .lock()
            .unwrap()
            .push(bitrate.map(str::to_string));

        if self.fail {
            // A real tool can leave a partial output behind
            std::fs::write(output, b"partial")?;
            return Ok(ConvertOutcome {
                success: false,
                diagnostics: Some(ConvertDiagnostics {
                    command: "fake-transcoder".to_string(),
                    stdout: String::new(),
                    stderr: "conversion failed on purpose".to_string(),
                }),
            });
        }

        std::fs::copy(input, output)?;
        Ok(ConvertOutcome {
            success: true,
            diagnostics: None,
        })
    }

    fn name(&self) -> &'static str {
        "fake-transcoder"
    }
}

/// Tag store using file content as the identity tag
pub(crate) struct MemoryTags {
    pub(crate) embeds: std::sync::Mutex<Vec<(PathBuf, String)>>,
    pub(crate) fail: bool,
}

impl MemoryTags {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            embeds: std::sync::Mutex::new(Vec::new()),
            fail: false,
        })
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            embeds: std::sync::Mutex::new(Vec::new()),
            fail: true,
        })
    }
}

#[async_trait]
impl TagStore for MemoryTags {
    async fn embed(&self, path: &Path, track: &Track, _separator: &str) -> Result<()> {
        if self.fail {
            return Err(Error::Other("tag write rejected".to_string()));
        }
        std::fs::write(path, &track.url)?;
        self.embeds
            .lock()
            .unwrap()
            .push((path.to_path_buf(), track.url.clone()));
        Ok(())
    }

    fn read_identity(&self, path: &Path) -> Option<String> {
        let content = std::fs::read_to_string(path).ok()?;
        let content = content.trim();
        content.starts_with("https://").then(|| content.to_string())
    }

    fn name(&self) -> &'static str {
        "memory-tags"
    }
}

/// Segment trimmer returning scripted segments and truncating the file
pub(crate) struct FakeTrimmer {
    pub(crate) segments: Vec<Segment>,
    pub(crate) removals: AtomicUsize,
}

#[async_trait]
impl SegmentTrimmer for FakeTrimmer {
    async fn segments(&self, _audio: &FetchedAudio) -> Result<Vec<Segment>> {
        Ok(self.segments.clone())
    }

    async fn remove(&self, output_file: &Path, _segments: &[Segment]) -> Result<Vec<PathBuf>> {
        self.removals.fetch_add(1, Ordering::SeqCst);
        let intermediate = output_file.with_extension("cut.tmp");
        std::fs::write(&intermediate, b"intermediate")?;
        Ok(vec![intermediate])
    }

    fn name(&self) -> &'static str {
        "fake-trimmer"
    }
}

/// Everything a downloader test needs to observe the pipeline from outside
pub(crate) struct Harness {
    pub(crate) downloader: Downloader,
    pub(crate) fetcher: Arc<RecordingFetcher>,
    pub(crate) transcoder: Arc<FakeTranscoder>,
    pub(crate) tags: Arc<MemoryTags>,
    pub(crate) provider: Arc<FoundAudio>,
    /// Keeps the working directory alive for the test's duration
    pub(crate) temp: TempDir,
}

impl Harness {
    /// Path of the output directory inside the temp dir
    pub(crate) fn out_dir(&self) -> PathBuf {
        self.temp.path().join("music")
    }

    /// Canonical output path for [`track`]`(n)`
    pub(crate) fn out_path(&self, n: u32) -> PathBuf {
        self.out_dir().join(format!("Artist - Song {n}.mp3"))
    }
}

/// Config rooted inside a fresh temp dir
pub(crate) fn test_config(temp: &TempDir) -> DownloaderConfig {
    let root = temp.path().display();
    DownloaderConfig {
        output: format!("{root}/music/{{artists}} - {{title}}.{{output-ext}}"),
        temp_dir: temp.path().join("temp"),
        errors_dir: temp.path().join("errors"),
        ..DownloaderConfig::default()
    }
}

/// Build a downloader around the standard mocks
///
/// `configure` runs on a [`test_config`] before construction, so tests can
/// flip policies and limits per case.
pub(crate) async fn harness(configure: impl FnOnce(&mut DownloaderConfig)) -> Harness {
    harness_with(RecordingFetcher::new(), FakeTranscoder::new(), configure).await
}

/// Build a downloader after seeding files into the temp dir
///
/// `seed` runs before construction, so the startup scan (when enabled via
/// `configure`) sees whatever the test wrote.
pub(crate) async fn harness_seeded(
    seed: impl FnOnce(&Path),
    configure: impl FnOnce(&mut DownloaderConfig),
) -> Harness {
    let temp = tempfile::tempdir().unwrap();
    seed(temp.path());
    build_harness(temp, RecordingFetcher::new(), FakeTranscoder::new(), configure).await
}

/// Build a downloader around specific fetcher/transcoder mocks
pub(crate) async fn harness_with(
    fetcher: Arc<RecordingFetcher>,
    transcoder: Arc<FakeTranscoder>,
    configure: impl FnOnce(&mut DownloaderConfig),
) -> Harness {
    let temp = tempfile::tempdir().unwrap();
    build_harness(temp, fetcher, transcoder, configure).await
}

async fn build_harness(
    temp: TempDir,
    fetcher: Arc<RecordingFetcher>,
    transcoder: Arc<FakeTranscoder>,
    configure: impl FnOnce(&mut DownloaderConfig),
) -> Harness {
    let mut config = test_config(&temp);
    configure(&mut config);

    let provider = FoundAudio::new("youtube-music");
    let mut registry = ProviderRegistry::new();
    registry.register_audio(provider.clone());

    let tags = MemoryTags::new();
    let services = Services::new(
        Arc::new(FakeMetadata::default()),
        fetcher.clone(),
        tags.clone(),
    )
    .with_transcoder(transcoder.clone());

    let downloader = Downloader::new(config, &registry, services).await.unwrap();

    Harness {
        downloader,
        fetcher,
        transcoder,
        tags,
        provider,
        temp,
    }
}
