/*!
 * Metadata records for prepared files
 *
 * After a file is materialised in an output directory the handler hands its
 * path to a [`MetadataSink`]. The bundled [`SidecarMetadata`] writes a JSON
 * record next to the file (`<file>.meta.json`) describing its size,
 * modification time and SHA-256 digest.
 */

use chrono::{DateTime, SecondsFormat, Utc};
use filetime::FileTime;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::input::filetime_to_utc;
use crate::error::{PrepError, Result};

/// Suffix appended to a prepared file's name for its sidecar record
pub const SIDECAR_SUFFIX: &str = ".meta.json";

/// Collaborator invoked with every successfully prepared output path
pub trait MetadataSink {
    fn process_metadata_for(&mut self, path: &Path) -> Result<()>;
}

/// Sink that does nothing, used when metadata is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadata;

impl MetadataSink for NoMetadata {
    fn process_metadata_for(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

/// Sidecar record describing one prepared file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetadataRecord {
    /// File name of the prepared file
    pub file: String,

    /// Size in bytes
    pub size: u64,

    /// Modification time (RFC 3339, UTC)
    pub modified: String,

    /// Hex-encoded SHA-256 of the file contents
    pub sha256: String,

    /// When this record was generated (RFC 3339, UTC)
    pub generated_at: String,
}

impl MetadataRecord {
    /// Describe the file at `path`
    pub fn for_path(path: &Path) -> Result<Self> {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| PrepError::InvalidPath(path.to_path_buf()))?;

        let metadata = std::fs::metadata(path)
            .map_err(|e| PrepError::Metadata(format!("{}: {}", path.display(), e)))?;
        let modified = filetime_to_utc(FileTime::from_last_modification_time(&metadata))
            .map(rfc3339)
            .unwrap_or_default();

        Ok(Self {
            file,
            size: metadata.len(),
            modified,
            sha256: sha256_of(path)?,
            generated_at: rfc3339(Utc::now()),
        })
    }
}

/// Writes a JSON sidecar next to each prepared file
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarMetadata {
    dry_run: bool,
}

impl SidecarMetadata {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Sidecar path for a prepared file
    pub fn sidecar_path(path: &Path) -> PathBuf {
        let mut sidecar = path.as_os_str().to_owned();
        sidecar.push(SIDECAR_SUFFIX);
        PathBuf::from(sidecar)
    }
}

impl MetadataSink for SidecarMetadata {
    fn process_metadata_for(&mut self, path: &Path) -> Result<()> {
        let sidecar = Self::sidecar_path(path);

        if self.dry_run {
            info!(
                target: "dry_run",
                "[DRY-RUN] Would write metadata: {}",
                sidecar.display()
            );
            return Ok(());
        }

        let record = MetadataRecord::for_path(path)?;
        let json = serde_json::to_vec_pretty(&record)?;
        std::fs::write(&sidecar, json)
            .map_err(|e| PrepError::Metadata(format!("{}: {}", sidecar.display(), e)))?;

        debug!("Wrote metadata {}", sidecar.display());
        Ok(())
    }
}

fn sha256_of(path: &Path) -> Result<String> {
    let file = File::open(path)
        .map_err(|e| PrepError::Metadata(format!("{}: {}", path.display(), e)))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut BufReader::new(file), &mut hasher)
        .map_err(|e| PrepError::Metadata(format!("{}: {}", path.display(), e)))?;
    Ok(hex::encode(hasher.finalize()))
}

fn rfc3339(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}
