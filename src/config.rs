/*!
 * Configuration types for prepsync
 */

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PrepError, Result};

/// Vendor-specific ordering strategy used when `ordered` is set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderedStrategy {
    /// Slug-named files under a time directory from the file mtime
    #[default]
    Default,

    /// Date token embedded in the file name
    Cmag,

    /// Time directory plus an mtime epoch directory
    Datorama,

    /// Date token embedded in the containing directory name
    Lotame,

    /// "Raw Recipient Data Export" file name template
    Silverpop,
}

/// Configuration for one handler instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Input root the handler owns
    #[serde(default)]
    pub input: PathBuf,

    /// Output directories, cycled through as files succeed
    #[serde(default)]
    pub output: Vec<PathBuf>,

    /// Log what would be done instead of doing it
    #[serde(default)]
    pub dry_run: bool,

    /// Route through a path strategy instead of mirroring relative paths
    #[serde(default)]
    pub ordered: bool,

    /// Which ordering strategy to use when `ordered` is set
    #[serde(default)]
    pub ordered_strategy: OrderedStrategy,

    /// Use the handler's processing time instead of file mtimes
    #[serde(default)]
    pub ordered_by_processing_time: bool,

    /// strftime pattern for the time directory
    #[serde(default = "default_time_pattern")]
    pub ordered_time_pattern: String,

    /// Emit a metadata record for each output file
    #[serde(default)]
    pub metadata: bool,

    /// Recompress decompressed output with gzip
    #[serde(default)]
    pub gzip_output: bool,

    /// Decompress recognised archives instead of linking them
    #[serde(default)]
    pub uncompress_input: bool,

    /// Remove partially written pipeline output when a command fails
    #[serde(default)]
    pub cleanup_partial_output: bool,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stdout)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: Vec::new(),
            dry_run: false,
            ordered: false,
            ordered_strategy: OrderedStrategy::Default,
            ordered_by_processing_time: false,
            ordered_time_pattern: default_time_pattern(),
            metadata: false,
            gzip_output: false,
            uncompress_input: false,
            cleanup_partial_output: false,
            log_level: LogLevel::Info,
            log_file: None,
            verbose: false,
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn default_time_pattern() -> String {
    "%Y/%m/%d".to_string()
}

impl HandlerConfig {
    /// Create a configuration for the given input root and output directories
    pub fn new(input: impl Into<PathBuf>, output: Vec<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output,
            ..Default::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PrepError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&contents)
            .map_err(|e| PrepError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| PrepError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Check the invariants every handler relies on
    pub fn validate(&self) -> Result<()> {
        if self.input.as_os_str().is_empty() {
            return Err(PrepError::Config("An input directory is required".to_string()));
        }

        if self.output.is_empty() {
            return Err(PrepError::Config(
                "At least one output directory is required".to_string(),
            ));
        }

        if StrftimeItems::new(&self.ordered_time_pattern).any(|item| matches!(item, Item::Error)) {
            return Err(PrepError::Config(format!(
                "Invalid ordered time pattern: {:?}",
                self.ordered_time_pattern
            )));
        }

        Ok(())
    }
}
