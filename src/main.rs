/*!
 * prepsync CLI - Command Line Interface
 */

use clap::{Parser, ValueEnum};
use prepsync::{
    config::{HandlerConfig, LogLevel, OrderedStrategy},
    error::{Result, EXIT_PARTIAL, EXIT_SUCCESS},
    logging, Handler, PrepareSyncer,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "prepsync")]
#[command(version, about = "Prepare landed files for loading: route, link or decompress into output directories", long_about = None)]
struct Cli {
    /// Input directory to prepare files from
    #[arg(short = 'i', long = "input", value_name = "DIR")]
    input: Option<PathBuf>,

    /// Output directory (repeat to rotate across several)
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    output: Vec<PathBuf>,

    /// Load settings from a TOML file; flags given here override it
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log what would be done instead of doing it
    #[arg(long)]
    dry_run: bool,

    /// Create time-ordered output instead of mirroring relative paths
    #[arg(long)]
    ordered: bool,

    /// Ordering strategy used with --ordered
    #[arg(long, value_enum)]
    ordered_strategy: Option<StrategyArg>,

    /// Order by the time of this run instead of file modification times
    #[arg(long)]
    ordered_by_processing_time: bool,

    /// strftime pattern for time directories (default: %Y/%m/%d)
    #[arg(long, value_name = "PATTERN")]
    ordered_time_pattern: Option<String>,

    /// Write a JSON metadata sidecar for each prepared file
    #[arg(long)]
    metadata: bool,

    /// Gzip decompressed output
    #[arg(long)]
    gzip_output: bool,

    /// Decompress recognised archives (.zip, .gz, .bz2) instead of linking them
    #[arg(long)]
    uncompress_input: bool,

    /// Remove partial output when a decompress/gzip command fails
    #[arg(long)]
    cleanup_partial_output: bool,

    /// Log level
    #[arg(long, value_enum)]
    log_level: Option<LogLevelArg>,

    /// Log to this file as JSON lines instead of stdout
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Verbose logging (debug level)
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum StrategyArg {
    Default,
    Cmag,
    Datorama,
    Lotame,
    Silverpop,
}

impl From<StrategyArg> for OrderedStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Default => OrderedStrategy::Default,
            StrategyArg::Cmag => OrderedStrategy::Cmag,
            StrategyArg::Datorama => OrderedStrategy::Datorama,
            StrategyArg::Lotame => OrderedStrategy::Lotame,
            StrategyArg::Silverpop => OrderedStrategy::Silverpop,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = build_config(cli)?;

    if let Err(e) = logging::init_logging(&config) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let handler = Handler::new(config)?;
    let mut syncer = PrepareSyncer::new(handler);
    let summary = syncer.sync()?;

    if summary.is_clean() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_PARTIAL)
    }
}

/// Merge the optional config file with command-line overrides
fn build_config(cli: Cli) -> Result<HandlerConfig> {
    let mut config = match cli.config {
        Some(ref path) => HandlerConfig::from_file(path)?,
        None => HandlerConfig::default(),
    };

    if let Some(input) = cli.input {
        config.input = input;
    }
    if !cli.output.is_empty() {
        config.output = cli.output;
    }
    if let Some(strategy) = cli.ordered_strategy {
        config.ordered_strategy = strategy.into();
    }
    if let Some(pattern) = cli.ordered_time_pattern {
        config.ordered_time_pattern = pattern;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log.is_some() {
        config.log_file = cli.log;
    }

    config.dry_run |= cli.dry_run;
    config.ordered |= cli.ordered;
    config.ordered_by_processing_time |= cli.ordered_by_processing_time;
    config.metadata |= cli.metadata;
    config.gzip_output |= cli.gzip_output;
    config.uncompress_input |= cli.uncompress_input;
    config.cleanup_partial_output |= cli.cleanup_partial_output;
    config.verbose |= cli.verbose;

    Ok(config)
}
