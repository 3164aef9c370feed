/*!
 * Decompress/recompress pipeline built from external commands
 *
 * Archives are expanded with the system `unzip`, `gzip` and `bzip2`
 * binaries; success is decided by exit status alone.
 */

use std::ffi::OsString;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

use crate::error::{PrepError, Result};

/// Compressed input formats the pipeline knows how to expand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressedFormat {
    Zip,
    Gzip,
    Bzip2,
}

impl CompressedFormat {
    /// Recognise a format from the file name suffix (case-insensitive)
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        [Self::Zip, Self::Gzip, Self::Bzip2]
            .into_iter()
            .find(|format| name.len() > format.suffix().len() && name.ends_with(format.suffix()))
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Zip => ".zip",
            Self::Gzip => ".gz",
            Self::Bzip2 => ".bz2",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
        }
    }

    /// Input file name with the compression suffix removed
    pub fn decompressed_name(&self, file_name: &str) -> String {
        file_name[..file_name.len() - self.suffix().len()].to_string()
    }
}

/// One external process invocation, optionally with stdout captured to a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    program: OsString,
    args: Vec<OsString>,
    stdout_to: Option<PathBuf>,
}

impl ExternalCommand {
    pub fn new<I, S>(program: impl Into<OsString>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            stdout_to: None,
        }
    }

    /// Send the command's stdout to `path` instead of inheriting it
    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout_to = Some(path.into());
        self
    }

    /// Human-readable form for logs and error messages
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.to_string_lossy().into_owned()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        if let Some(ref out) = self.stdout_to {
            parts.push(">".to_string());
            parts.push(out.display().to_string());
        }
        parts.join(" ")
    }

    /// Run to completion; a non-zero exit is an error
    pub fn run(&self) -> Result<()> {
        let mut command = Command::new(&self.program);
        command.args(&self.args).stdin(Stdio::null());

        if let Some(ref out) = self.stdout_to {
            let file = File::create(out).map_err(|e| PrepError::filesystem(out, e))?;
            command.stdout(Stdio::from(file));
        }

        debug!("Running {}", self.display());

        let status = command.status().map_err(|e| PrepError::Transfer {
            command: format!("{} ({})", self.display(), e),
            status: None,
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(PrepError::Transfer {
                command: self.display(),
                status: status.code(),
            })
        }
    }
}

/// The commands that turn one compressed input into its prepared output.
///
/// Commands write into a staging directory next to the destination. Only
/// after every command succeeded are the results moved into the destination
/// directory, replacing directory entries instead of writing through them,
/// so an existing hardlink to an input file is never modified.
#[derive(Debug, Clone)]
pub struct Pipeline {
    format: CompressedFormat,
    dest_dir: PathBuf,
    staging: PathBuf,
    decompressed: PathBuf,
    recompressed: Option<PathBuf>,
    commands: Vec<ExternalCommand>,
}

impl Pipeline {
    /// Plan the expansion of `source` into `dest_dir`, optionally gzipping the result
    pub fn plan(
        format: CompressedFormat,
        source: &Path,
        dest_dir: &Path,
        gzip_output: bool,
    ) -> Result<Self> {
        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PrepError::InvalidPath(source.to_path_buf()))?;
        let name = format.decompressed_name(file_name);
        let staging = dest_dir.join(format!(".{}{}", name, STAGING_SUFFIX));
        let staged = staging.join(&name);

        let mut commands = vec![match format {
            CompressedFormat::Zip => ExternalCommand::new(
                "unzip",
                [
                    OsString::from("-o"),
                    OsString::from("-q"),
                    source.as_os_str().to_owned(),
                    OsString::from("-d"),
                    staging.as_os_str().to_owned(),
                ],
            ),
            CompressedFormat::Gzip => {
                ExternalCommand::new("gzip", [OsString::from("-dc"), source.as_os_str().to_owned()])
                    .stdout_to(&staged)
            }
            CompressedFormat::Bzip2 => {
                ExternalCommand::new("bzip2", [OsString::from("-dc"), source.as_os_str().to_owned()])
                    .stdout_to(&staged)
            }
        }];

        let decompressed = dest_dir.join(&name);
        let recompressed = if gzip_output {
            commands.push(ExternalCommand::new(
                "gzip",
                [OsString::from("-f"), staged.into_os_string()],
            ));
            Some(dest_dir.join(format!("{}.gz", name)))
        } else {
            None
        };

        Ok(Self {
            format,
            dest_dir: dest_dir.to_path_buf(),
            staging,
            decompressed,
            recompressed,
            commands,
        })
    }

    pub fn format(&self) -> CompressedFormat {
        self.format
    }

    pub fn commands(&self) -> &[ExternalCommand] {
        &self.commands
    }

    pub fn is_recompressed(&self) -> bool {
        self.recompressed.is_some()
    }

    /// Directory the commands write into before results are published
    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    /// Path of the file the pipeline leaves behind
    pub fn final_path(&self) -> &Path {
        self.recompressed.as_deref().unwrap_or(self.decompressed.as_path())
    }

    /// Run every command in order, stopping at the first failure, then
    /// publish the staged results into the destination directory.
    ///
    /// With `cleanup_on_failure`, the staging directory is removed when a
    /// command fails; otherwise it is left in place. The destination
    /// directory is not touched by a failed run either way.
    pub fn execute(&self, cleanup_on_failure: bool) -> Result<()> {
        reset_dir(&self.staging)?;

        for command in &self.commands {
            if let Err(err) = command.run() {
                if cleanup_on_failure {
                    self.remove_partial_output();
                }
                return Err(err);
            }
        }

        publish(&self.staging, &self.dest_dir)?;
        std::fs::remove_dir(&self.staging).map_err(|e| PrepError::filesystem(&self.staging, e))
    }

    fn remove_partial_output(&self) {
        match std::fs::remove_dir_all(&self.staging) {
            Ok(()) => debug!("Removed partial output {}", self.staging.display()),
            Err(e) => warn!(
                "Could not remove partial output {}: {}",
                self.staging.display(),
                e
            ),
        }
    }
}

/// Suffix of the hidden per-file staging directory
const STAGING_SUFFIX: &str = ".partial";

/// Start from an empty directory, discarding leftovers of an earlier failed run
fn reset_dir(dir: &Path) -> Result<()> {
    if dir.symlink_metadata().is_ok() {
        std::fs::remove_dir_all(dir).map_err(|e| PrepError::filesystem(dir, e))?;
    }
    std::fs::create_dir_all(dir).map_err(|e| PrepError::filesystem(dir, e))
}

/// Move every entry of `from` into `to`.
///
/// Existing files are unlinked before the rename, so other names for their
/// inode keep their contents. Directories are merged. A file and a directory
/// never replace each other.
fn publish(from: &Path, to: &Path) -> Result<()> {
    let entries = std::fs::read_dir(from).map_err(|e| PrepError::filesystem(from, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| PrepError::filesystem(from, e))?;
        let source = entry.path();
        let target = to.join(entry.file_name());
        let source_is_dir = entry
            .file_type()
            .map_err(|e| PrepError::filesystem(&source, e))?
            .is_dir();

        if let Ok(existing) = target.symlink_metadata() {
            match (source_is_dir, existing.is_dir()) {
                (true, true) => {
                    publish(&source, &target)?;
                    std::fs::remove_dir(&source).map_err(|e| PrepError::filesystem(&source, e))?;
                    continue;
                }
                (false, false) => {
                    std::fs::remove_file(&target)
                        .map_err(|e| PrepError::filesystem(&target, e))?;
                }
                _ => {
                    return Err(PrepError::filesystem(
                        &target,
                        io::Error::new(
                            io::ErrorKind::AlreadyExists,
                            "a file and a directory share this name",
                        ),
                    ))
                }
            }
        }

        std::fs::rename(&source, &target).map_err(|e| PrepError::filesystem(&target, e))?;
        debug!("Published {}", target.display());
    }

    Ok(())
}
