/*!
 * Per-file dispatch
 *
 * A [`Handler`] owns one input directory and a fixed set of output
 * directories. The driver calls [`Handler::process`] once per discovered
 * file; each call runs to completion before the next one starts:
 *
 * 1. `before_process` hook
 * 2. compute the destination with the handler's [`PathStrategy`] and transfer
 * 3. on success, advance the rotation counter
 * 4. on failure, report through `on_error`; the counter is left alone and
 *    nothing the transfer may have written is cleaned up here
 */

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

use crate::config::HandlerConfig;
use crate::core::dry_run::DryRunSummary;
use crate::core::input::InputFile;
use crate::core::rotation::OutputRotation;
use crate::core::strategy::{PathStrategy, RouteContext};
use crate::core::transfer::{TransferExecutor, TransferOutcome};
use crate::error::{PrepError, Result};
use crate::metadata::MetadataSink;

/// Extension points around each processed file
pub trait ProcessHooks {
    /// Runs before the transfer; an error fails the file
    fn before_process(&mut self, _original: &Path) -> Result<()> {
        Ok(())
    }

    /// Runs when processing a file failed
    fn on_error(&mut self, original: &Path, err: &PrepError) {
        error!(
            file = %original.display(),
            kind = %err.category(),
            "Could not process <{}>: {} -- {}",
            original.display(),
            err.category(),
            err
        );
    }
}

/// Hooks with only the default behaviour
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl ProcessHooks for DefaultHooks {}

/// Routes and transfers files from one input directory
pub struct Handler {
    config: HandlerConfig,
    strategy: PathStrategy,
    rotation: OutputRotation,
    processing_time: DateTime<Utc>,
    executor: TransferExecutor,
    hooks: Box<dyn ProcessHooks>,
}

impl Handler {
    /// Create a handler for a validated `config`.
    ///
    /// Processing time is captured here, once, and shared by every file
    /// this handler processes.
    pub fn new(config: HandlerConfig) -> Result<Self> {
        config.validate()?;

        let strategy = PathStrategy::from_config(&config);
        let rotation = OutputRotation::new(config.output.clone())?;
        let executor = TransferExecutor::new(&config);

        debug!(
            "Handler for {} using {} strategy, starting at output {}",
            config.input.display(),
            strategy.name(),
            rotation.current().display()
        );

        Ok(Self {
            config,
            strategy,
            rotation,
            processing_time: Utc::now(),
            executor,
            hooks: Box::new(DefaultHooks),
        })
    }

    /// Start the rotation counter at `counter`
    pub fn with_counter(mut self, counter: u64) -> Self {
        self.rotation.set_counter(counter);
        self
    }

    /// Fix the processing time
    pub fn with_processing_time(mut self, time: DateTime<Utc>) -> Self {
        self.processing_time = time;
        self
    }

    /// Use `sink` for metadata emission
    pub fn with_metadata_sink(mut self, sink: Box<dyn MetadataSink>) -> Self {
        self.executor.set_metadata_sink(sink);
        self
    }

    pub fn with_hooks(mut self, hooks: Box<dyn ProcessHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub fn strategy(&self) -> PathStrategy {
        self.strategy
    }

    pub fn counter(&self) -> u64 {
        self.rotation.counter()
    }

    pub fn processing_time(&self) -> DateTime<Utc> {
        self.processing_time
    }

    /// Output directory the next file goes to
    pub fn current_output_directory(&self) -> &Path {
        self.rotation.current()
    }

    /// Counts of operations recorded instead of performed in dry-run mode
    pub fn dry_run_summary(&self) -> DryRunSummary {
        self.executor.dry_run().summary()
    }

    /// Destination the active strategy computes for `file` right now
    pub fn output_path_for(&self, file: &InputFile) -> Result<PathBuf> {
        let ctx = RouteContext {
            config: &self.config,
            output_dir: self.rotation.current(),
            counter: self.rotation.counter(),
            processing_time: self.processing_time,
        };
        self.strategy.output_path(file, &ctx)
    }

    /// Process the `original` file in the input directory.
    ///
    /// Never fails: errors are reported through the `on_error` hook and
    /// turned into `false`.
    pub fn process(&mut self, original: &Path) -> bool {
        match self.try_process(original) {
            Ok(_) => true,
            Err(err) => {
                self.hooks.on_error(original, &err);
                false
            }
        }
    }

    /// Like [`Handler::process`] but returns the outcome or the error
    /// instead of reporting it.
    pub fn try_process(&mut self, original: &Path) -> Result<TransferOutcome> {
        self.hooks.before_process(original)?;
        let outcome = self.process_input(original)?;
        self.after_process();
        Ok(outcome)
    }

    /// Route and transfer one file, without hooks or counter changes
    pub fn process_input(&mut self, original: &Path) -> Result<TransferOutcome> {
        let file = InputFile::open(original)?;
        let destination = self.output_path_for(&file)?;
        self.executor.transfer(file.path(), &destination)
    }

    fn after_process(&mut self) {
        self.rotation.advance();
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("input", &self.config.input)
            .field("strategy", &self.strategy)
            .field("rotation", &self.rotation)
            .field("processing_time", &self.processing_time)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}
