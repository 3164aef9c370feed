/*!
 * Input files as seen by a handler
 */

use chrono::{DateTime, Utc};
use filetime::FileTime;
use std::path::{Path, PathBuf};

use crate::error::{PrepError, Result};

/// A file that landed in the input directory, with its modification time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    path: PathBuf,
    modified: DateTime<Utc>,
}

impl InputFile {
    /// Build an input file from a known path and modification time
    pub fn new(path: impl Into<PathBuf>, modified: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            modified,
        }
    }

    /// Stat `path` and capture its modification time
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let metadata =
            std::fs::metadata(&path).map_err(|e| PrepError::filesystem(&path, e))?;
        let mtime = FileTime::from_last_modification_time(&metadata);
        let modified = filetime_to_utc(mtime).ok_or_else(|| PrepError::InvalidPath(path.clone()))?;
        Ok(Self { path, modified })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    /// Final path component as a string
    pub fn file_name(&self) -> Result<&str> {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| PrepError::InvalidPath(self.path.clone()))
    }
}

pub(crate) fn filetime_to_utc(time: FileTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(time.unix_seconds(), time.nanoseconds())
}
