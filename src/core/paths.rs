/*!
 * Path helpers shared by every path strategy
 */

use chrono::format::StrftimeItems;
use chrono::{DateTime, Utc};
use std::fmt::Write;
use std::path::{Component, Path, PathBuf};

use crate::error::{PrepError, Result};

/// Segment used for files that sit directly in the input root
pub const ROOT_SEGMENT: &str = "root";

/// Return the path of `file` relative to the containing `dir`.
pub fn relative_path_of(file: &Path, dir: &Path) -> Result<PathBuf> {
    file.strip_prefix(dir)
        .map(Path::to_path_buf)
        .map_err(|_| PrepError::InvalidPath(file.to_path_buf()))
}

/// Returns the top-level directory of `file` relative to `dir`, or
/// [`ROOT_SEGMENT`] when `file` is a direct child of `dir`.
pub fn top_level_of(file: &Path, dir: &Path) -> Result<String> {
    let relative = relative_path_of(file, dir)?;
    let mut components = relative.components().filter_map(|c| match c {
        Component::Normal(part) => Some(part),
        _ => None,
    });

    let first = components
        .next()
        .ok_or_else(|| PrepError::InvalidPath(file.to_path_buf()))?;

    if components.next().is_some() {
        Ok(first.to_string_lossy().into_owned())
    } else {
        Ok(ROOT_SEGMENT.to_string())
    }
}

/// Path of `file` beneath its top-level segment: the relative path minus
/// its first component, or the bare relative path for direct children.
pub fn path_below_top_level(file: &Path, dir: &Path) -> Result<PathBuf> {
    let relative = relative_path_of(file, dir)?;
    let mut components = relative.components();
    components.next();
    let rest = components.as_path();
    if rest.as_os_str().is_empty() {
        Ok(relative)
    } else {
        Ok(rest.to_path_buf())
    }
}

/// Join a top-level segment with a time-derived (or literal) subdirectory.
pub fn daily_directory_for(top_level: &str, subdir: &str) -> PathBuf {
    Path::new(top_level).join(subdir)
}

/// Uniqueness-bearing file name: `<YYYYMMDD-HHMMSS>-<counter>-<flattened relative path>`.
pub fn slug_for(time: DateTime<Utc>, counter: u64, relative: &Path) -> String {
    let flattened = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("-");

    format!("{}-{}-{}", time.format("%Y%m%d-%H%M%S"), counter, flattened)
}

/// Format `time` with a strftime `pattern`, reporting bad patterns as errors
/// instead of panicking.
pub fn format_time(time: DateTime<Utc>, pattern: &str) -> Result<String> {
    let mut out = String::new();
    write!(out, "{}", time.format_with_items(StrftimeItems::new(pattern)))
        .map_err(|_| PrepError::Config(format!("Invalid time pattern: {:?}", pattern)))?;
    Ok(out)
}
