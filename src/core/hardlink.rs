/*!
 * Hardlink creation for zero-copy transfers.
 *
 * An input file and its prepared copy share one inode: no bytes are copied,
 * and re-linking the same pair is a no-op in effect.
 */

use std::path::Path;

use crate::error::{PrepError, Result};

/// Create a hardlink at `link_path` pointing to `original_path`, creating
/// parent directories and replacing whatever is already at `link_path`.
pub fn create_hardlink(original_path: &Path, link_path: &Path) -> Result<()> {
    if let Some(parent) = link_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| PrepError::filesystem(parent, e))?;
    }

    // Relinking a file onto itself would delete the only name we have
    if is_same_file(original_path, link_path) {
        return Ok(());
    }

    // `symlink_metadata` so a dangling link at the destination is replaced too
    if link_path.symlink_metadata().is_ok() {
        std::fs::remove_file(link_path).map_err(|e| PrepError::filesystem(link_path, e))?;
    }

    std::fs::hard_link(original_path, link_path)
        .map_err(|e| PrepError::filesystem(link_path, e))
}

#[cfg(unix)]
fn is_same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (std::fs::metadata(a), std::fs::metadata(b)) {
        (Ok(ma), Ok(mb)) => ma.dev() == mb.dev() && ma.ino() == mb.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(ca), Ok(cb)) => ca == cb,
        _ => false,
    }
}
