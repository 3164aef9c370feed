/*!
 * Round-robin output directory rotation
 */

use rand::Rng;
use std::path::{Path, PathBuf};

use crate::error::{PrepError, Result};

/// Cycles through a fixed, non-empty list of output directories.
///
/// The counter doubles as the uniqueness token in ordered file names, so it
/// only moves forward when a file has been transferred successfully.
#[derive(Debug, Clone)]
pub struct OutputRotation {
    dirs: Vec<PathBuf>,
    counter: u64,
}

impl OutputRotation {
    /// Start at a random position when there is more than one directory, so
    /// handlers launched together do not all begin on the same target.
    pub fn new(dirs: Vec<PathBuf>) -> Result<Self> {
        if dirs.is_empty() {
            return Err(PrepError::Config(
                "At least one output directory is required".to_string(),
            ));
        }

        let counter = if dirs.len() > 1 {
            rand::rng().random_range(0..dirs.len() as u64)
        } else {
            0
        };

        Ok(Self { dirs, counter })
    }

    /// Same as [`OutputRotation::new`] but with an explicit starting counter
    pub fn starting_at(dirs: Vec<PathBuf>, counter: u64) -> Result<Self> {
        let mut rotation = Self::new(dirs)?;
        rotation.counter = counter;
        Ok(rotation)
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn set_counter(&mut self, counter: u64) {
        self.counter = counter;
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// `dirs[counter mod len]`
    pub fn current(&self) -> &Path {
        let index = (self.counter % self.dirs.len() as u64) as usize;
        &self.dirs[index]
    }

    /// Move to the next directory after a successful transfer
    pub fn advance(&mut self) {
        self.counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dirs(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("/out/{}", i))).collect()
    }

    #[test]
    fn test_empty_is_rejected() {
        assert!(OutputRotation::new(Vec::new()).is_err());
    }

    #[test]
    fn test_single_dir_starts_at_zero() {
        let rotation = OutputRotation::new(dirs(1)).unwrap();
        assert_eq!(rotation.counter(), 0);
        assert_eq!(rotation.current(), Path::new("/out/0"));
    }

    #[test]
    fn test_random_start_is_in_range() {
        for _ in 0..50 {
            let rotation = OutputRotation::new(dirs(3)).unwrap();
            assert!(rotation.counter() < 3);
        }
    }

    #[test]
    fn test_cycles_in_order() {
        let mut rotation = OutputRotation::starting_at(dirs(3), 2).unwrap();
        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(rotation.current().to_path_buf());
            rotation.advance();
        }
        assert_eq!(
            seen,
            ["/out/2", "/out/0", "/out/1", "/out/2", "/out/0", "/out/1"]
                .iter()
                .map(PathBuf::from)
                .collect::<Vec<_>>()
        );
        assert_eq!(rotation.counter(), 8);
    }

    #[test]
    fn test_even_distribution() {
        let mut rotation = OutputRotation::starting_at(dirs(4), 1).unwrap();
        let mut counts = [0usize; 4];
        for _ in 0..10 {
            let index = rotation.dirs().iter().position(|d| d == rotation.current()).unwrap();
            counts[index] += 1;
            rotation.advance();
        }
        for count in counts {
            assert!(count == 2 || count == 3);
        }
    }
}
