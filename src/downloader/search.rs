//! Ordered-fallback resolution across configured providers.

use super::Downloader;
use crate::error::{Error, Result};
use crate::types::Track;

impl Downloader {
    /// Search for a source stream URL using all configured audio providers
    ///
    /// Providers are tried strictly in configured order; the first
    /// non-empty result wins. Provider failures count as misses so a flaky
    /// provider never shadows a working one further down the list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolution`] when every provider comes up empty;
    /// terminal for the affected track.
    pub(crate) async fn search(&self, track: &Track) -> Result<String> {
        for provider in &self.audio_providers {
            match provider.search(track).await {
                Ok(Some(url)) => return Ok(url),
                Ok(None) => {
                    tracing::debug!(
                        provider = provider.name(),
                        song = %track.display_name(),
                        "Provider failed to find song"
                    );
                }
                Err(e) => {
                    tracing::debug!(
                        provider = provider.name(),
                        song = %track.display_name(),
                        error = %e,
                        "Provider search errored"
                    );
                }
            }
        }

        Err(Error::Resolution {
            song: track.display_name(),
        })
    }

    /// Search for lyrics using all configured lyrics providers
    ///
    /// Same fallback order as [`Self::search`], but an all-empty result is
    /// not an error: a track without lyrics simply keeps an empty lyrics
    /// attribute.
    pub(crate) async fn search_lyrics(&self, track: &Track) -> Option<String> {
        for provider in &self.lyrics_providers {
            match provider.get_lyrics(&track.name, &track.artists).await {
                Ok(Some(lyrics)) => {
                    tracing::debug!(
                        provider = provider.name(),
                        song = %track.display_name(),
                        "Found lyrics"
                    );
                    return Some(lyrics);
                }
                Ok(None) => {
                    tracing::debug!(
                        provider = provider.name(),
                        song = %track.display_name(),
                        "Provider failed to find lyrics"
                    );
                }
                Err(e) => {
                    tracing::debug!(
                        provider = provider.name(),
                        song = %track.display_name(),
                        error = %e,
                        "Lyrics provider errored"
                    );
                }
            }
        }

        None
    }
}
