//! File-name construction from track metadata

use crate::error::{Error, Result};
use crate::types::Track;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Build the output path for a track from a naming template
///
/// Template variables: `{artist}` (primary artist), `{artists}` (all artists
/// joined with ", "), `{title}`, `{album}`, `{track-number}` (zero-padded),
/// `{output-ext}`. Forward slashes in the template create subdirectories;
/// separators inside expanded metadata values are replaced, so a track name
/// can never escape the output tree.
///
/// # Arguments
///
/// * `track` - The track whose metadata fills the template
/// * `template` - The naming template, e.g. `"{artists} - {title}.{output-ext}"`
/// * `format` - Target container extension substituted for `{output-ext}`
///
/// # Returns
///
/// The output path (absolute when the template is). If the template carries
/// no `{output-ext}`, the format extension is appended.
///
/// # Errors
///
/// Returns [`Error::Encoding`] when an expanded path component is empty or
/// cannot form a valid file name.
pub fn create_file_name(track: &Track, template: &str, format: &str) -> Result<PathBuf> {
    let template = if template.contains("{output-ext}") {
        template.to_string()
    } else {
        format!("{template}.{{output-ext}}")
    };

    let mut path = if template.starts_with('/') {
        PathBuf::from("/")
    } else {
        PathBuf::new()
    };
    for part in template.split('/').filter(|p| !p.is_empty()) {
        let expanded = expand_component(part, track, format)?;
        path.push(expanded);
    }

    Ok(path)
}

/// Sanitize a path down to a conservative ASCII-safe character set
///
/// Every component of the path is reduced to `[0-9A-Za-z._-]`; any other
/// character (including spaces) becomes `_`, and runs of underscores are
/// collapsed. Applied when the `restrict` option is set, for filesystems
/// and environments that cannot represent the full metadata text.
#[must_use]
pub fn restrict_filename(path: &Path) -> PathBuf {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    static COLLAPSE: OnceLock<Regex> = OnceLock::new();
    let unsafe_chars = UNSAFE.get_or_init(|| Regex::new(r"[^0-9A-Za-z._-]").expect("static regex"));
    let collapse = COLLAPSE.get_or_init(|| Regex::new(r"_{2,}").expect("static regex"));

    let mut restricted = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::Normal(name) => {
                let name = name.to_string_lossy();
                let safe = unsafe_chars.replace_all(&name, "_");
                let safe = collapse.replace_all(&safe, "_");
                restricted.push(safe.trim_matches('_').to_string());
            }
            // Root, prefix, and dot components pass through untouched
            other => restricted.push(other.as_os_str()),
        }
    }

    restricted
}

/// Expand one template component, replacing variables and stripping
/// characters that would change the path shape
fn expand_component(part: &str, track: &Track, format: &str) -> Result<String> {
    let artist = track.artists.first().cloned().unwrap_or_default();
    let artists = track.artists.join(", ");
    let album = track.album_name.clone().unwrap_or_default();
    let track_number = track
        .track_number
        .map(|n| format!("{n:02}"))
        .unwrap_or_default();

    let expanded = part
        .replace("{artist}", &sanitize_value(&artist))
        .replace("{artists}", &sanitize_value(&artists))
        .replace("{title}", &sanitize_value(&track.name))
        .replace("{album}", &sanitize_value(&album))
        .replace("{track-number}", &track_number)
        .replace("{output-ext}", format);

    let trimmed = expanded.trim();
    let stem = trimmed
        .strip_suffix(&format!(".{format}"))
        .unwrap_or(trimmed);
    if !stem.chars().any(char::is_alphanumeric) {
        return Err(Error::Encoding(format!(
            "cannot build a file name for '{}' from template part '{}'; \
             the track metadata expands to nothing, enable `restrict` or \
             adjust the `output` template",
            track.url, part
        )));
    }
    if trimmed.contains('\0') {
        return Err(Error::Encoding(format!(
            "file name for '{}' contains characters the filesystem cannot \
             represent, enable the `restrict` option",
            track.url
        )));
    }

    Ok(trimmed.to_string())
}

/// Replace characters that would act as path separators inside a metadata value
fn sanitize_value(value: &str) -> String {
    value.replace(['/', '\\'], "-")
}
