/*!
 * Error types for prepsync
 */

use std::fmt;
use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, PrepError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

#[derive(Debug)]
pub enum PrepError {
    /// A path strategy could not derive the timestamp it needs
    Routing { path: PathBuf, reason: String },

    /// An external decompress/recompress command failed
    Transfer {
        command: String,
        status: Option<i32>,
    },

    /// Directory or link creation failed for a specific path
    Filesystem { path: PathBuf, source: io::Error },

    /// I/O error
    Io(io::Error),

    /// Metadata collaborator failure
    Metadata(String),

    /// Configuration error
    Config(String),

    /// Path is not usable (not under the input root, no file name, ...)
    InvalidPath(PathBuf),
}

impl PrepError {
    /// Wrap an I/O error with the path it happened on
    pub fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        PrepError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PrepError::Config(_) | PrepError::InvalidPath(_) => EXIT_FATAL,
            _ => EXIT_PARTIAL,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            PrepError::Routing { .. } => ErrorCategory::Routing,
            PrepError::Transfer { .. } => ErrorCategory::Transfer,
            PrepError::Filesystem { .. } | PrepError::Io(_) => ErrorCategory::Filesystem,
            PrepError::Metadata(_) => ErrorCategory::Metadata,
            PrepError::Config(_) => ErrorCategory::Configuration,
            PrepError::InvalidPath(_) => ErrorCategory::Validation,
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Destination path could not be derived
    Routing,
    /// External pipeline command failed
    Transfer,
    /// Directory, link or read failures
    Filesystem,
    /// Metadata emission failed
    Metadata,
    /// Configuration errors
    Configuration,
    /// Path validation errors
    Validation,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Routing => write!(f, "routing"),
            ErrorCategory::Transfer => write!(f, "transfer"),
            ErrorCategory::Filesystem => write!(f, "filesystem"),
            ErrorCategory::Metadata => write!(f, "metadata"),
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Validation => write!(f, "validation"),
        }
    }
}

impl fmt::Display for PrepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrepError::Routing { path, reason } => {
                write!(f, "Cannot route {}: {}", path.display(), reason)
            }
            PrepError::Transfer { command, status } => match status {
                Some(code) => write!(f, "Command exited with status {}: {}", code, command),
                None => write!(f, "Command exited unsuccessfully: {}", command),
            },
            PrepError::Filesystem { path, source } => {
                write!(f, "Filesystem error at {}: {}", path.display(), source)
            }
            PrepError::Io(err) => {
                write!(f, "I/O error: {}", err)
            }
            PrepError::Metadata(msg) => {
                write!(f, "Metadata generation failed: {}", msg)
            }
            PrepError::Config(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            PrepError::InvalidPath(path) => {
                write!(f, "Invalid path: {}", path.display())
            }
        }
    }
}

impl std::error::Error for PrepError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PrepError::Io(err) => Some(err),
            PrepError::Filesystem { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for PrepError {
    fn from(err: io::Error) -> Self {
        PrepError::Io(err)
    }
}

impl From<serde_json::Error> for PrepError {
    fn from(err: serde_json::Error) -> Self {
        PrepError::Metadata(format!("JSON error: {}", err))
    }
}
