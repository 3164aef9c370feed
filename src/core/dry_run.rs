/*!
 * Dry-run recording
 *
 * In dry-run mode a handler logs the filesystem operations and external
 * commands it would have performed under the `dry_run` target, and keeps
 * only running counts of them.
 */

use std::path::Path;
use tracing::info;

/// Dry-run operation tracker
#[derive(Debug, Clone, Default)]
pub struct DryRunRecorder {
    enabled: bool,
    summary: DryRunSummary,
}

impl DryRunRecorder {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            summary: DryRunSummary::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record a directory creation
    pub fn record_mkdir(&mut self, path: &Path) {
        if !self.enabled {
            return;
        }

        info!(
            target: "dry_run",
            "[DRY-RUN] Would create directory: {}",
            path.display()
        );
        self.summary.mkdir_count += 1;
    }

    /// Record a hardlink creation
    pub fn record_link(&mut self, source: &Path, dest: &Path) {
        if !self.enabled {
            return;
        }

        info!(
            target: "dry_run",
            "[DRY-RUN] Would link: {} -> {}",
            dest.display(),
            source.display()
        );
        self.summary.link_count += 1;
    }

    /// Record an external command
    pub fn record_command(&mut self, command: &str) {
        if !self.enabled {
            return;
        }

        info!(target: "dry_run", "[DRY-RUN] Would run: {}", command);
        self.summary.command_count += 1;
    }

    /// Counts of everything recorded so far
    pub fn summary(&self) -> DryRunSummary {
        self.summary
    }
}

/// Summary statistics for dry-run operations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DryRunSummary {
    pub mkdir_count: usize,
    pub link_count: usize,
    pub command_count: usize,
}

impl DryRunSummary {
    pub fn total(&self) -> usize {
        self.mkdir_count + self.link_count + self.command_count
    }
}
