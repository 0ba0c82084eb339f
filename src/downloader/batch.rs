//! Batch orchestration -- expansion, ledger filtering, the bounded-concurrency
//! coordinator, and end-of-batch artifacts.

use super::Downloader;
use crate::error::Result;
use crate::m3u::write_m3u;
use crate::types::{DownloadOutcome, Event, Track};

impl Downloader {
    /// Download a single track
    ///
    /// Convenience wrapper over [`Self::download_songs`] with a one-song
    /// batch; every batch-end artifact (ledger, playlist, results file)
    /// behaves the same way. A track already present in the URL ledger is
    /// never scheduled and yields an outcome with no path.
    ///
    /// # Errors
    ///
    /// Only batch-level failures (ledger save, artifact writes) surface as
    /// errors; a failed download yields an outcome with no path.
    pub async fn download_song(&self, song: Track) -> Result<DownloadOutcome> {
        let fallback = song.clone();
        let mut results = self.download_songs(vec![song]).await?;
        if results.is_empty() {
            // The ledger filtered out the only track in the batch
            return Ok((fallback, None));
        }
        Ok(results.remove(0))
    }

    /// Download a batch of tracks
    ///
    /// The returned list has exactly one outcome per scheduled track, in
    /// input order, regardless of completion order or failures. Tracks
    /// already present in the URL ledger are filtered out before
    /// scheduling and do not appear in the result.
    ///
    /// # Errors
    ///
    /// Returns an error for batch-level failures only: album expansion,
    /// ledger save, playlist or results-file writes. Per-track failures
    /// never abort the batch; they are recorded, reported as events, and
    /// yield outcomes with no path.
    pub async fn download_songs(&self, songs: Vec<Track>) -> Result<Vec<DownloadOutcome>> {
        let mut songs = songs;

        if self.config.fetch_albums {
            songs = self.expand_albums(songs).await;
        }

        if self.config.archive.is_some() {
            let archive = self.archive.lock().await;
            let before = songs.len();
            songs.retain(|song| !archive.contains(&song.url));
            tracing::debug!(
                filtered = before - songs.len(),
                remaining = songs.len(),
                "Filtered songs with archive"
            );
        }

        tracing::debug!(songs = songs.len(), "Downloading batch");
        self.emit_event(Event::BatchStarted { songs: songs.len() });

        // Coordinator: spawn one admission-gated task per track, then await
        // the handles in input order so the outcome list matches the input
        // list no matter when each pipeline finishes.
        let mut handles = Vec::with_capacity(songs.len());
        for song in songs {
            let downloader = self.clone();
            let fallback = song.clone();
            let handle = tokio::spawn(async move { downloader.pool_download(song).await });
            handles.push((fallback, handle));
        }

        let (fallbacks, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        let joined = futures::future::join_all(handles).await;

        let mut results: Vec<DownloadOutcome> = Vec::with_capacity(fallbacks.len());
        for (fallback, joined) in fallbacks.into_iter().zip(joined) {
            match joined {
                Ok(outcome) => results.push(outcome),
                Err(e) => {
                    // A panicked pipeline still yields its slot in the
                    // result list and an error record, same as any other
                    // contained failure.
                    tracing::error!(url = %fallback.url, error = %e, "Pipeline task panicked");
                    let record = format!("{} - DownloaderError: pipeline panicked: {e}", fallback.url);
                    self.errors.lock().await.push(record);
                    self.emit_event(Event::SongError {
                        url: fallback.url.clone(),
                        message: format!("pipeline panicked: {e}"),
                    });
                    results.push((fallback, None));
                }
            }
        }

        if self.config.print_errors {
            for error in self.errors.lock().await.iter() {
                tracing::error!("{error}");
            }
        }

        // The ledger is written exactly once per batch, after every
        // pipeline has finished; a crash mid-batch loses the whole batch's
        // additions rather than a partial set.
        if let Some(path) = &self.config.archive {
            let mut archive = self.archive.lock().await;
            for (track, file) in &results {
                if file.is_some() {
                    archive.add(track.url.clone());
                }
            }
            archive.save(path)?;
            tracing::info!(
                urls = archive.len(),
                path = %path.display(),
                "Saved archive"
            );
        }

        if let Some(path) = &self.config.m3u {
            write_m3u(path, &results)?;
            tracing::info!(path = %path.display(), "Wrote playlist");
        }

        if let Some(path) = &self.config.save_file {
            let tracks: Vec<&Track> = results.iter().map(|(track, _)| track).collect();
            let json = serde_json::to_string_pretty(&tracks)?;
            std::fs::write(path, json)?;
            tracing::info!(path = %path.display(), "Saved results");
        }

        Ok(results)
    }

    /// Expand album references: for every song whose album is known, pull
    /// in the album's full track list, then dedupe by identity preserving
    /// first-seen order
    ///
    /// Hydration or album-lookup failures here are logged and skipped;
    /// they affect the expansion only, never the originally requested
    /// songs.
    async fn expand_albums(&self, songs: Vec<Track>) -> Vec<Track> {
        let mut album_ids: Vec<String> = Vec::new();

        for song in &songs {
            let meta = if song.album_id.is_some() {
                song.clone()
            } else {
                match self.services.metadata.track(&song.url).await {
                    Ok(meta) => meta,
                    Err(e) => {
                        tracing::warn!(url = %song.url, error = %e, "Could not hydrate song for album expansion");
                        continue;
                    }
                }
            };

            if let Some(album_id) = &meta.album_id {
                if !album_ids.contains(album_id) {
                    tracing::debug!(song = %meta.display_name(), album = %album_id, "Found album");
                    album_ids.push(album_id.clone());
                }
            }
        }

        tracing::info!(albums = album_ids.len(), "Fetching albums");

        let mut expanded = songs;
        for album_id in album_ids {
            match self.services.metadata.album_tracks(&album_id).await {
                Ok(tracks) => expanded.extend(tracks),
                Err(e) => {
                    tracing::warn!(album = %album_id, error = %e, "Could not fetch album tracks");
                }
            }
        }

        // Dedupe by identity, first occurrence wins
        let mut seen = std::collections::HashSet::new();
        expanded.retain(|song| seen.insert(song.url.clone()));
        expanded
    }
}
