/*!
 * Transfer executor
 *
 * Materialises one input file at its computed destination, either as a
 * hardlink or by expanding it through the external decompress pipeline,
 * then hands the result to the metadata sink.
 */

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::compression::{CompressedFormat, Pipeline};
use crate::config::HandlerConfig;
use crate::core::dry_run::DryRunRecorder;
use crate::core::hardlink::create_hardlink;
use crate::error::{PrepError, Result};
use crate::metadata::{MetadataSink, NoMetadata, SidecarMetadata};

/// How a file reached its destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMethod {
    Hardlink,
    Pipeline {
        format: CompressedFormat,
        recompressed: bool,
    },
}

/// Result of a successful transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub source: PathBuf,
    /// Final materialised path (the decompressed, possibly `.gz`, file for pipelines)
    pub destination: PathBuf,
    pub method: TransferMethod,
    pub dry_run: bool,
}

/// Decides between linking and the decompress pipeline and runs it
pub struct TransferExecutor {
    uncompress_input: bool,
    gzip_output: bool,
    metadata_enabled: bool,
    cleanup_partial_output: bool,
    dry_run: DryRunRecorder,
    metadata: Box<dyn MetadataSink>,
}

impl TransferExecutor {
    /// Build an executor for `config`, using a sidecar writer when metadata is enabled
    pub fn new(config: &HandlerConfig) -> Self {
        let metadata: Box<dyn MetadataSink> = if config.metadata {
            Box::new(SidecarMetadata::new(config.dry_run))
        } else {
            Box::new(NoMetadata)
        };

        Self {
            uncompress_input: config.uncompress_input,
            gzip_output: config.gzip_output,
            metadata_enabled: config.metadata,
            cleanup_partial_output: config.cleanup_partial_output,
            dry_run: DryRunRecorder::new(config.dry_run),
            metadata,
        }
    }

    /// Replace the metadata collaborator
    pub fn set_metadata_sink(&mut self, sink: Box<dyn MetadataSink>) {
        self.metadata = sink;
    }

    pub fn dry_run(&self) -> &DryRunRecorder {
        &self.dry_run
    }

    /// The compressed format to expand, if `source` should go through the pipeline
    pub fn uncompress_needed(&self, source: &Path) -> Option<CompressedFormat> {
        if self.uncompress_input {
            CompressedFormat::detect(source)
        } else {
            None
        }
    }

    /// Materialise `source` at `destination`.
    ///
    /// For pipeline transfers only the directory of `destination` is used;
    /// the output file is named after the decompressed input.
    pub fn transfer(&mut self, source: &Path, destination: &Path) -> Result<TransferOutcome> {
        match self.uncompress_needed(source) {
            Some(format) => self.uncompress_and_gzip(format, source, destination),
            None => self.link(source, destination),
        }
    }

    fn link(&mut self, source: &Path, destination: &Path) -> Result<TransferOutcome> {
        if self.dry_run.is_enabled() {
            if let Some(parent) = destination.parent() {
                self.dry_run.record_mkdir(parent);
            }
            self.dry_run.record_link(source, destination);
        } else {
            debug!("Linking {} -> {}", destination.display(), source.display());
            create_hardlink(source, destination)?;
        }

        if self.metadata_enabled {
            self.metadata.process_metadata_for(destination)?;
        }

        Ok(TransferOutcome {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            method: TransferMethod::Hardlink,
            dry_run: self.dry_run.is_enabled(),
        })
    }

    fn uncompress_and_gzip(
        &mut self,
        format: CompressedFormat,
        source: &Path,
        destination: &Path,
    ) -> Result<TransferOutcome> {
        let dest_dir = destination
            .parent()
            .ok_or_else(|| PrepError::InvalidPath(destination.to_path_buf()))?;
        let pipeline = Pipeline::plan(format, source, dest_dir, self.gzip_output)?;
        let outcome = TransferOutcome {
            source: source.to_path_buf(),
            destination: pipeline.final_path().to_path_buf(),
            method: TransferMethod::Pipeline {
                format,
                recompressed: pipeline.is_recompressed(),
            },
            dry_run: self.dry_run.is_enabled(),
        };

        if self.dry_run.is_enabled() {
            self.dry_run.record_mkdir(dest_dir);
            for command in pipeline.commands() {
                self.dry_run.record_command(&command.display());
            }
            return Ok(outcome);
        }

        std::fs::create_dir_all(dest_dir).map_err(|e| PrepError::filesystem(dest_dir, e))?;
        debug!(
            "Expanding {} ({}) into {}",
            source.display(),
            format.name(),
            dest_dir.display()
        );
        pipeline.execute(self.cleanup_partial_output)?;

        if self.metadata_enabled {
            self.metadata.process_metadata_for(pipeline.final_path())?;
        }

        Ok(outcome)
    }
}

impl std::fmt::Debug for TransferExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferExecutor")
            .field("uncompress_input", &self.uncompress_input)
            .field("gzip_output", &self.gzip_output)
            .field("metadata_enabled", &self.metadata_enabled)
            .field("cleanup_partial_output", &self.cleanup_partial_output)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dry_run::DryRunSummary;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::tempdir;

    #[derive(Default, Clone)]
    struct Recorded(Rc<RefCell<Vec<PathBuf>>>);

    impl MetadataSink for Recorded {
        fn process_metadata_for(&mut self, path: &Path) -> Result<()> {
            self.0.borrow_mut().push(path.to_path_buf());
            Ok(())
        }
    }

    fn config(input: &Path, output: &Path) -> HandlerConfig {
        HandlerConfig::new(input, vec![output.to_path_buf()])
    }

    #[test]
    fn test_plain_file_is_linked() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.csv");
        let dest = dir.path().join("out").join("x").join("a.csv");
        std::fs::write(&source, b"rows").unwrap();

        let mut executor = TransferExecutor::new(&config(dir.path(), &dir.path().join("out")));
        let outcome = executor.transfer(&source, &dest).unwrap();

        assert_eq!(outcome.method, TransferMethod::Hardlink);
        assert_eq!(outcome.destination, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), b"rows");
    }

    #[test]
    fn test_compressed_without_uncompress_is_linked() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.csv.zip");
        let dest = dir.path().join("out").join("a.csv.zip");
        std::fs::write(&source, b"not really a zip").unwrap();

        let mut executor = TransferExecutor::new(&config(dir.path(), &dir.path().join("out")));
        assert!(executor.uncompress_needed(&source).is_none());
        let outcome = executor.transfer(&source, &dest).unwrap();
        assert_eq!(outcome.method, TransferMethod::Hardlink);
        assert!(dest.exists());
    }

    #[test]
    fn test_metadata_after_link() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.csv");
        let dest = dir.path().join("out").join("a.csv");
        std::fs::write(&source, b"rows").unwrap();

        let mut cfg = config(dir.path(), &dir.path().join("out"));
        cfg.metadata = true;
        let recorded = Recorded::default();
        let mut executor = TransferExecutor::new(&cfg);
        executor.set_metadata_sink(Box::new(recorded.clone()));

        executor.transfer(&source, &dest).unwrap();
        assert_eq!(*recorded.0.borrow(), vec![dest]);
    }

    #[test]
    fn test_dry_run_link_records_only() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.csv");
        let dest = dir.path().join("out").join("a.csv");
        std::fs::write(&source, b"rows").unwrap();

        let mut cfg = config(dir.path(), &dir.path().join("out"));
        cfg.dry_run = true;
        let mut executor = TransferExecutor::new(&cfg);
        let outcome = executor.transfer(&source, &dest).unwrap();

        assert!(outcome.dry_run);
        assert!(!dir.path().join("out").exists());
        assert_eq!(
            executor.dry_run().summary(),
            DryRunSummary {
                mkdir_count: 1,
                link_count: 1,
                command_count: 0,
            }
        );
    }

    #[test]
    fn test_dry_run_pipeline_skips_commands_and_metadata() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.csv.gz");
        let dest = dir.path().join("out").join("slug-a.csv.gz");
        std::fs::write(&source, b"not gzip").unwrap();

        let mut cfg = config(dir.path(), &dir.path().join("out"));
        cfg.dry_run = true;
        cfg.uncompress_input = true;
        cfg.gzip_output = true;
        cfg.metadata = true;
        let recorded = Recorded::default();
        let mut executor = TransferExecutor::new(&cfg);
        executor.set_metadata_sink(Box::new(recorded.clone()));

        let outcome = executor.transfer(&source, &dest).unwrap();
        assert_eq!(outcome.destination, dir.path().join("out").join("a.csv.gz"));
        assert_eq!(
            outcome.method,
            TransferMethod::Pipeline {
                format: CompressedFormat::Gzip,
                recompressed: true
            }
        );
        assert_eq!(executor.dry_run().summary().command_count, 2);
        assert!(recorded.0.borrow().is_empty());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_link_failure_is_filesystem_error() {
        let dir = tempdir().unwrap();
        let mut executor = TransferExecutor::new(&config(dir.path(), &dir.path().join("out")));
        let err = executor
            .transfer(&dir.path().join("ghost.csv"), &dir.path().join("out").join("ghost.csv"))
            .unwrap_err();
        assert!(matches!(err, PrepError::Filesystem { .. }));
    }
}
