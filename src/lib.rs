//! # tune-dl
//!
//! Library for turning a list of track descriptors into locally stored,
//! fully tagged audio files.
//!
//! ## Design Philosophy
//!
//! tune-dl is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Collaborator-driven** - Search providers, the stream fetcher, the
//!   transcoder, and the tag embedder are pluggable trait objects
//! - **Failure-containing** - One failing song never aborts its batch;
//!   every input track yields exactly one outcome, in input order
//! - **Event-driven** - Consumers subscribe to per-track lifecycle events,
//!   no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tune_dl::{Downloader, DownloaderConfig, ProviderRegistry, Services, Track};
//! # use tune_dl::{AudioFetcher, AudioProvider, MetadataSource, TagStore};
//! # fn collaborators() -> (Arc<dyn MetadataSource>, Arc<dyn AudioFetcher>, Arc<dyn TagStore>, Arc<dyn AudioProvider>) { unimplemented!() }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (metadata, fetcher, tags, provider) = collaborators();
//!
//!     let mut registry = ProviderRegistry::new();
//!     registry.register_audio(provider);
//!
//!     let config = DownloaderConfig {
//!         audio_providers: vec!["youtube-music".to_string()],
//!         threads: 4,
//!         ..Default::default()
//!     };
//!
//!     let downloader =
//!         Downloader::new(config, &registry, Services::new(metadata, fetcher, tags)).await?;
//!
//!     let outcomes = downloader
//!         .download_songs(vec![Track::from_url("https://music.example.com/track/42")])
//!         .await?;
//!
//!     for (track, path) in outcomes {
//!         match path {
//!             Some(path) => println!("{} -> {}", track.display_name(), path.display()),
//!             None => println!("{} failed or skipped", track.display_name()),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Persistent ledger of completed track identities
pub mod archive;
/// Configuration types
pub mod config;
/// Transcoding collaborator interface and ffmpeg implementation
pub mod convert;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// In-memory duplicate index
pub mod known_songs;
/// m3u playlist generation
pub mod m3u;
/// Segment-removal collaborator interface
pub mod postprocess;
/// Provider collaborator interfaces and the registry
pub mod providers;
/// Tag embedding collaborator interface
pub mod tag;
/// Core types and events
pub mod types;
/// File-name construction
pub mod utils;

// Re-export commonly used types
pub use archive::Archive;
pub use config::{Bitrate, DownloaderConfig, OverwritePolicy, SUPPORTED_FORMATS};
pub use convert::{ConvertDiagnostics, ConvertOutcome, FfmpegTranscoder, Transcoder};
pub use downloader::{Downloader, Services};
pub use error::{Error, Result};
pub use known_songs::KnownSongs;
pub use postprocess::SegmentTrimmer;
pub use providers::{
    AudioFetcher, AudioProvider, LyricsProvider, MetadataSource, ProviderRegistry,
};
pub use tag::TagStore;
pub use types::{DownloadOutcome, Event, FetchedAudio, Segment, Track};
