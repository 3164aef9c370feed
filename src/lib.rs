/*!
 * prepsync - landing-zone file preparation
 *
 * Takes files that have landed in an input directory and materialises each
 * one in one of several output directories:
 * - Destination paths from a per-handler strategy (plain mirroring, or
 *   time-ordered layouts with vendor-specific date extraction)
 * - Round-robin distribution across output directories
 * - Zero-copy hardlinks, or decompression (and optional gzip) through
 *   external tools
 * - Optional JSON sidecar metadata per prepared file
 * - Dry-run mode that records instead of acting
 */

pub mod compression;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod syncer;

// Re-export commonly used types
pub use config::{HandlerConfig, LogLevel, OrderedStrategy};
pub use crate::core::{Handler, InputFile, PathStrategy, ProcessHooks, TransferOutcome};
pub use error::{PrepError, Result};
pub use metadata::{MetadataSink, SidecarMetadata};
pub use syncer::{PrepareSyncer, SyncSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
