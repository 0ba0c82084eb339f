//! Pluggable collaborator interfaces and the provider registry
//!
//! tune-dl treats everything that talks to the outside world as an opaque
//! collaborator behind a trait: source-URL search, lyrics search, metadata
//! hydration, and the raw stream fetch. The library only supplies the
//! ordered-fallback logic across them; the provider algorithms themselves
//! live in consumer code.

use crate::error::{Error, Result};
use crate::types::{FetchedAudio, Track};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Searches a source catalog for a playable stream URL
#[async_trait]
pub trait AudioProvider: Send + Sync {
    /// Name this provider is registered and configured under
    fn name(&self) -> &'static str;

    /// Search for a stream URL for the given track
    ///
    /// `Ok(None)` means the provider found nothing; the resolver moves on
    /// to the next configured provider. An `Err` is treated the same way
    /// (logged, then next provider), so a flaky provider never fails a
    /// track that a later provider could resolve.
    async fn search(&self, track: &Track) -> Result<Option<String>>;
}

/// Searches for lyrics text by track name and artists
#[async_trait]
pub trait LyricsProvider: Send + Sync {
    /// Name this provider is registered and configured under
    fn name(&self) -> &'static str;

    /// Look up lyrics for the given name and artist list
    ///
    /// `Ok(None)` means no lyrics were found; absence of lyrics is never an
    /// error for the track.
    async fn get_lyrics(&self, name: &str, artists: &[String]) -> Result<Option<String>>;
}

/// Hydrates placeholder tracks and expands album references
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Fetch the fully populated track for a bare catalog URL
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog has no such track or the lookup
    /// fails; terminal for the affected track only.
    async fn track(&self, url: &str) -> Result<Track>;

    /// Fetch every track of an album
    ///
    /// # Errors
    ///
    /// Returns an error if the album lookup fails; album expansion is a
    /// batch-level operation, so this surfaces before scheduling.
    async fn album_tracks(&self, album_id: &str) -> Result<Vec<Track>>;
}

/// Fetches the raw media stream behind a resolved source URL
///
/// The fetcher owns the temp-file naming: it writes the stream to a file
/// inside `temp_dir` named by its own provider-assigned identifier, and
/// only constructs the returned [`FetchedAudio`] after validating that its
/// upstream metadata is actually present. Concurrent pipelines therefore
/// never collide on a temp path, and the pipeline never touches a path
/// derived from absent metadata.
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    /// Download the stream at `url` into `temp_dir`
    ///
    /// # Errors
    ///
    /// Returns an error when the upstream fetch fails or yields no usable
    /// metadata; terminal for the affected track only.
    async fn fetch(&self, url: &str, temp_dir: &Path) -> Result<FetchedAudio>;
}

/// Maps configured provider names to registered implementations
///
/// Consumers register their provider instances once, then the downloader
/// resolves the configured, ordered name lists against the registry at
/// construction time. An unknown name is a configuration error raised
/// before any track is scheduled.
#[derive(Default)]
pub struct ProviderRegistry {
    audio: HashMap<&'static str, Arc<dyn AudioProvider>>,
    lyrics: HashMap<&'static str, Arc<dyn LyricsProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an audio provider under its own name
    pub fn register_audio(&mut self, provider: Arc<dyn AudioProvider>) -> &mut Self {
        self.audio.insert(provider.name(), provider);
        self
    }

    /// Register a lyrics provider under its own name
    pub fn register_lyrics(&mut self, provider: Arc<dyn LyricsProvider>) -> &mut Self {
        self.lyrics.insert(provider.name(), provider);
        self
    }

    /// Resolve an ordered list of audio provider names
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for any name with no registered provider.
    pub fn resolve_audio(&self, names: &[String]) -> Result<Vec<Arc<dyn AudioProvider>>> {
        names
            .iter()
            .map(|name| {
                self.audio.get(name.as_str()).cloned().ok_or_else(|| {
                    Error::config(
                        format!("invalid audio provider: {name}"),
                        Some("audio_providers"),
                    )
                })
            })
            .collect()
    }

    /// Resolve an ordered list of lyrics provider names
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for any name with no registered provider.
    pub fn resolve_lyrics(&self, names: &[String]) -> Result<Vec<Arc<dyn LyricsProvider>>> {
        names
            .iter()
            .map(|name| {
                self.lyrics.get(name.as_str()).cloned().ok_or_else(|| {
                    Error::config(
                        format!("invalid lyrics provider: {name}"),
                        Some("lyrics_providers"),
                    )
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NamedAudio(&'static str);

    #[async_trait]
    impl AudioProvider for NamedAudio {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn search(&self, _track: &Track) -> Result<Option<String>> {
            Ok(None)
        }
    }

    #[test]
    fn resolve_preserves_configured_order() {
        let mut registry = ProviderRegistry::new();
        registry.register_audio(Arc::new(NamedAudio("youtube")));
        registry.register_audio(Arc::new(NamedAudio("youtube-music")));

        let resolved = registry
            .resolve_audio(&["youtube-music".to_string(), "youtube".to_string()])
            .unwrap();
        assert_eq!(resolved[0].name(), "youtube-music");
        assert_eq!(resolved[1].name(), "youtube");
    }

    #[test]
    fn unknown_name_is_a_config_error() {
        let registry = ProviderRegistry::new();
        let err = registry
            .resolve_audio(&["soundcloud".to_string()])
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err.kind(), "ConfigError");
    }
}
