//! Per-song pipeline -- the state machine executed once per track.
//!
//! Stages, each a possible exit point:
//! 1. Hydrate placeholder metadata
//! 2. Resolve the output path from the naming template
//! 3. Duplicate lookup against the known-songs index
//! 4. Overwrite decision (skip / force / metadata / overwrite)
//! 5. Lyrics resolution
//! 6. Source-URL resolution
//! 7. Raw stream fetch to a temp file
//! 8. Transcode to the target format
//! 9. Optional segment removal
//! 10. Tag embedding
//! 11. Finalization (index registration, completion event)
//!
//! Any failure is caught at [`Downloader::pool_download`], converted into
//! an error record plus an error event, and yields an outcome with no path.
//! A failing song never aborts or cancels its siblings.

use super::Downloader;
use crate::config::{Bitrate, OverwritePolicy};
use crate::convert::{ConvertDiagnostics, write_error_report};
use crate::error::{Error, Result};
use crate::types::{DownloadOutcome, Event, FetchedAudio, Track};
use crate::utils::{create_file_name, restrict_filename};
use std::path::{Path, PathBuf};

impl Downloader {
    /// Admission-gated entry point for one track
    ///
    /// Waits on the semaphore before any work starts, so at most
    /// `threads` pipelines execute concurrently. Failures are contained
    /// here: the error is recorded, reported as an event, and the track
    /// yields `(track, None)`.
    pub(crate) async fn pool_download(&self, song: Track) -> DownloadOutcome {
        // Tasks that cannot acquire the semaphore wait here until a slot
        // frees up; the heavy work below runs on the runtime's worker pool
        // and never blocks this admission bookkeeping for other tasks.
        let _permit = self.semaphore.clone().acquire_owned().await;

        match self.process_song(song.clone()).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(
                    song = %song.display_name(),
                    url = %song.url,
                    error = %err,
                    "Song failed"
                );
                let record = format!("{} - {}: {}", song.url, err.kind(), err);
                self.errors.lock().await.push(record);
                self.emit_event(Event::SongError {
                    url: song.url.clone(),
                    message: err.to_string(),
                });
                (song, None)
            }
        }
    }

    /// Run the full pipeline for one track
    async fn process_song(&self, mut song: Track) -> Result<DownloadOutcome> {
        // Stage 1: hydrate placeholder tracks before anything else
        if song.is_placeholder() {
            song = self
                .services
                .metadata
                .track(&song.url)
                .await
                .map_err(|e| Error::Hydration(e.to_string()))?;
        }

        // Stage 2: deterministic output path from the naming template
        let mut output_file = create_file_name(&song, &self.config.output, &self.config.format)?;
        if self.config.restrict {
            output_file = restrict_filename(&output_file);
        }

        // Stage 3: known duplicates, minus the output path itself and
        // anything that no longer exists
        let dup_paths: Vec<PathBuf> = {
            let known = self.known_songs.lock().await;
            known.paths_for(&song.url)
        }
        .into_iter()
        .filter(|p| absolute(p) != absolute(&output_file) && p.exists())
        .collect();

        if !dup_paths.is_empty() {
            tracing::debug!(
                song = %song.display_name(),
                duplicates = dup_paths.len(),
                "Found duplicate files"
            );
        }

        // Stage 4: overwrite decision
        let already_present = output_file.exists() || !dup_paths.is_empty();

        if already_present && self.config.overwrite == OverwritePolicy::Skip {
            tracing::info!(
                song = %song.display_name(),
                duplicate = !dup_paths.is_empty(),
                "Skipping, file already exists"
            );
            self.emit_event(Event::SongSkipped {
                url: song.url.clone(),
            });
            return Ok((song, None));
        }

        if already_present && self.config.overwrite == OverwritePolicy::Force {
            tracing::info!(song = %song.display_name(), "Overwriting existing files");
            for dup in &dup_paths {
                remove_tolerant(dup);
            }
        }

        // Stage 5: lyrics; absence is not an error
        if let Some(lyrics) = self.search_lyrics(&song).await {
            song.lyrics = Some(lyrics);
        } else {
            tracing::debug!(song = %song.display_name(), "No lyrics found");
        }

        if already_present && self.config.overwrite == OverwritePolicy::Metadata {
            return self.refresh_metadata(song, output_file, dup_paths).await;
        }

        if let Some(parent) = output_file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // Stage 6: source URL, pre-resolved or via provider fallback
        let download_url = match &song.download_url {
            Some(url) => url.clone(),
            None => self.search(&song).await?,
        };
        song.download_url = Some(download_url.clone());

        // Stage 7: fetch the raw stream to a uniquely named temp file
        std::fs::create_dir_all(&self.config.temp_dir)?;
        tracing::debug!(song = %song.display_name(), url = %download_url, "Downloading");
        let audio = self
            .services
            .fetcher
            .fetch(&download_url, &self.config.temp_dir)
            .await
            .map_err(|e| match e {
                e @ Error::Download(_) => e,
                other => Error::Download(other.to_string()),
            })?;
        self.emit_event(Event::DownloadComplete {
            url: song.url.clone(),
        });

        // Stage 8: transcode
        self.transcode(&song, &audio, &output_file).await?;
        self.emit_event(Event::ConversionComplete {
            url: song.url.clone(),
        });

        // Stage 9: optional segment removal
        if self.config.skip_sponsor_segments {
            self.trim_segments(&song, &audio, &output_file).await?;
        }

        // Stage 10: tag embedding, a distinct terminal error kind
        self.services
            .tags
            .embed(&output_file, &song, &self.config.id3_separator)
            .await
            .map_err(|e| Error::Metadata(e.to_string()))?;

        // Stage 11: finalize
        {
            let mut known = self.known_songs.lock().await;
            known.insert(song.url.clone(), output_file.clone());
        }
        tracing::info!(
            song = %song.display_name(),
            url = %download_url,
            path = %output_file.display(),
            "Downloaded"
        );
        self.emit_event(Event::SongComplete {
            url: song.url.clone(),
            path: output_file.clone(),
        });

        Ok((song, Some(output_file)))
    }

    /// `metadata` overwrite policy: reuse the freshest duplicate and
    /// re-embed tags without downloading anything
    async fn refresh_metadata(
        &self,
        song: Track,
        output_file: PathBuf,
        dup_paths: Vec<PathBuf>,
    ) -> Result<DownloadOutcome> {
        let mut final_path = output_file.clone();

        if let Some(most_recent) = most_recent_path(&dup_paths) {
            for old in &dup_paths {
                if old != &most_recent {
                    remove_tolerant(old);
                }
            }

            match std::fs::rename(&most_recent, &output_file) {
                Ok(()) => {
                    tracing::info!(
                        song = %song.display_name(),
                        path = %output_file.display(),
                        "Moved duplicate to canonical location"
                    );
                }
                Err(e) => {
                    // Degraded, not terminal: keep the duplicate where it is
                    tracing::warn!(
                        from = %most_recent.display(),
                        to = %output_file.display(),
                        error = %e,
                        "Could not move duplicate file, re-tagging it in place"
                    );
                    final_path = most_recent;
                }
            }
        }

        self.services
            .tags
            .embed(&final_path, &song, &self.config.id3_separator)
            .await
            .map_err(|e| Error::Metadata(e.to_string()))?;

        tracing::info!(song = %song.display_name(), "Updated metadata");
        self.emit_event(Event::SongComplete {
            url: song.url.clone(),
            path: final_path.clone(),
        });

        Ok((song, Some(final_path)))
    }

    /// Stage 8 body: run the transcoder, always remove the temp file, and
    /// persist a diagnostic report on conversion failure
    async fn transcode(&self, song: &Track, audio: &FetchedAudio, output_file: &Path) -> Result<()> {
        let bitrate = match self.config.bitrate {
            Bitrate::Disable => None,
            // Missing reported bitrate under Auto degrades to no explicit bitrate
            Bitrate::Auto => audio
                .avg_bitrate_kbps
                .map(|abr| format!("{}k", abr.round() as u32)),
            Bitrate::Kbps(kbps) => Some(format!("{kbps}k")),
        };

        let outcome = self
            .transcoder
            .convert(
                &audio.path,
                output_file,
                &self.config.format,
                bitrate.as_deref(),
                &self.config.ffmpeg_args,
            )
            .await?;

        // The temp file goes away no matter how the conversion went. A
        // removal failure likely means a held handle (duplicate of this
        // song still in progress), which we escalate.
        if audio.path.exists() {
            std::fs::remove_file(&audio.path).map_err(|e| {
                Error::Other(format!(
                    "could not remove temp file: {}, possible duplicate song in progress ({e})",
                    audio.path.display()
                ))
            })?;
        }

        if !outcome.success {
            let diagnostics = outcome.diagnostics.unwrap_or_else(|| ConvertDiagnostics {
                command: String::new(),
                stdout: String::new(),
                stderr: "transcoder reported failure without diagnostics".to_string(),
            });
            let report = write_error_report(&self.config.errors_dir, &diagnostics)?;

            // Never leave a partial output behind
            if output_file.exists() {
                remove_tolerant(output_file);
            }

            return Err(Error::Transcode {
                song: song.display_name(),
                report,
            });
        }

        Ok(())
    }

    /// Stage 9 body: cut labeled segments out of the finished file
    async fn trim_segments(
        &self,
        song: &Track,
        audio: &FetchedAudio,
        output_file: &Path,
    ) -> Result<()> {
        let Some(trimmer) = &self.services.trimmer else {
            tracing::debug!(
                song = %song.display_name(),
                "Segment removal enabled but no trimmer configured"
            );
            return Ok(());
        };

        let segments = trimmer.segments(audio).await?;
        if segments.is_empty() {
            return Ok(());
        }

        tracing::info!(
            song = %song.display_name(),
            segments = segments.len(),
            "Removing labeled segments"
        );
        let leftovers = trimmer.remove(output_file, &segments).await?;
        for file in leftovers {
            remove_tolerant(&file);
        }

        Ok(())
    }
}

/// Best-effort absolute form of a path, for identity comparison
fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// The most recently modified of the given paths
fn most_recent_path(paths: &[PathBuf]) -> Option<PathBuf> {
    paths
        .iter()
        .filter_map(|p| p.metadata().and_then(|m| m.modified()).ok().map(|t| (t, p)))
        .max_by_key(|(t, _)| *t)
        .map(|(_, p)| p.clone())
}

/// Log-and-continue file removal for stale duplicates and intermediates
fn remove_tolerant(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::debug!(path = %path.display(), error = %e, "Could not remove file");
    } else {
        tracing::debug!(path = %path.display(), "Removed file");
    }
}
