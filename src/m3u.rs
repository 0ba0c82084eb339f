//! m3u playlist generation from batch outcomes

use crate::error::Result;
use crate::types::DownloadOutcome;
use std::path::Path;

/// Write an extended m3u playlist for a batch's outcomes
///
/// Entries appear in batch input order; tracks that were skipped or failed
/// (no path) are left out. Each entry carries an `#EXTINF` line with the
/// track's duration when known, `-1` otherwise.
///
/// # Errors
///
/// Returns an error if the playlist file cannot be written.
pub fn write_m3u(path: &Path, outcomes: &[DownloadOutcome]) -> Result<()> {
    let mut body = String::from("#EXTM3U\n");

    for (track, file) in outcomes {
        let Some(file) = file else { continue };
        let duration = track.duration.map_or(-1, |d| d as i64);
        body.push_str(&format!(
            "#EXTINF:{},{}\n{}\n",
            duration,
            track.display_name(),
            file.display()
        ));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, body)?;

    Ok(())
}
