/*!
 * One-shot driver: walk the input directory and feed every file to a handler
 */

use std::path::PathBuf;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::core::handler::Handler;
use crate::error::{PrepError, Result};

/// Counts for one pass over the input directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl SyncSummary {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Presents every regular file under a handler's input root, in file-name order
#[derive(Debug)]
pub struct PrepareSyncer {
    handler: Handler,
}

impl PrepareSyncer {
    pub fn new(handler: Handler) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Regular files under the input root, sorted by path
    pub fn input_files(&self) -> Result<Vec<PathBuf>> {
        let input = &self.handler.config().input;
        if !input.is_dir() {
            return Err(PrepError::InvalidPath(input.clone()));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(input).min_depth(1).sort_by_file_name() {
            match entry {
                Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable entry under {}: {}", input.display(), e),
            }
        }
        Ok(files)
    }

    /// Process every input file once
    pub fn sync(&mut self) -> Result<SyncSummary> {
        let mut summary = SyncSummary::default();

        for file in self.input_files()? {
            summary.processed += 1;
            if self.handler.process(&file) {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
        }

        info!(
            "Prepared {} of {} files from {} ({} failed)",
            summary.succeeded,
            summary.processed,
            self.handler.config().input.display(),
            summary.failed
        );

        Ok(summary)
    }
}
