use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{Config, FORECAST_FILE};
use crate::data_io::DataError;

pub mod slp;
pub mod time_fix;

pub use slp::derive_sea_level_pressure;
pub use time_fix::reconstruct_time_axis;

/// Errors that abort a pipeline stage
#[derive(Error, Debug)]
pub enum StageError {
    #[error("Input file does not exist: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Required variable not found: {0}")]
    MissingVariable(String),

    #[error("Failed to open {}: {source}", .path.display())]
    Open { path: PathBuf, source: DataError },

    #[error("Failed to load reference file {}: {source}", .path.display())]
    ReferenceLoad { path: PathBuf, source: DataError },

    #[error("Computation failed: {0}")]
    Computation(#[from] DataError),

    #[error("Failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: DataError },
}

/// The run directory's current artifact file. Each stage hands the slot
/// forward: a destructive stage consumes the artifact and replaces it, a
/// non-destructive stage borrows it and derives a sibling.
#[derive(Debug, Clone)]
pub struct RunArtifact {
    path: PathBuf,
}

impl RunArtifact {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace this artifact with its successor, deleting the original file.
    ///
    /// The original is only removed once the successor is confirmed present
    /// on disk; if it is not, the slot keeps pointing at the original and a
    /// warning is printed. A failed delete is also only a warning.
    pub fn advance(self, successor: PathBuf, keep_input: bool) -> RunArtifact {
        if !successor.exists() {
            eprintln!(
                "⚠ Output file not found, keeping original: {}",
                self.path.display()
            );
            return self;
        }
        if keep_input {
            println!("Keeping original file: {}", self.path.display());
        } else {
            match fs::remove_file(&self.path) {
                Ok(()) => println!("✓ Deleted original file: {}", self.path.display()),
                Err(e) => eprintln!(
                    "⚠ Could not delete original file {}: {}",
                    self.path.display(),
                    e
                ),
            }
        }
        RunArtifact::new(successor)
    }

    /// Record a derived sibling without touching this artifact's file
    pub fn derive(&self, successor: PathBuf) -> RunArtifact {
        RunArtifact::new(successor)
    }
}

/// Run both stages over a forecast directory: rebuild the time axis, then
/// reduce surface pressure to sea level.
pub fn run_pipeline(config: &Config) -> Result<RunArtifact, StageError> {
    let initial = RunArtifact::new(config.run_dir.join(FORECAST_FILE));
    let tracked = reconstruct_time_axis(config, initial)?;
    derive_sea_level_pressure(config, &tracked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_deletes_original_when_successor_exists() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("a.nc");
        let successor = dir.path().join("b.nc");
        fs::write(&original, b"a").unwrap();
        fs::write(&successor, b"b").unwrap();

        let artifact = RunArtifact::new(original.clone()).advance(successor.clone(), false);
        assert_eq!(artifact.path(), successor.as_path());
        assert!(!original.exists());
        assert!(successor.exists());
    }

    #[test]
    fn test_advance_keeps_original_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("a.nc");
        let successor = dir.path().join("b.nc");
        fs::write(&original, b"a").unwrap();
        fs::write(&successor, b"b").unwrap();

        let artifact = RunArtifact::new(original.clone()).advance(successor.clone(), true);
        assert_eq!(artifact.path(), successor.as_path());
        assert!(original.exists());
    }

    #[test]
    fn test_advance_refuses_when_successor_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("a.nc");
        let successor = dir.path().join("b.nc");
        fs::write(&original, b"a").unwrap();

        let artifact = RunArtifact::new(original.clone()).advance(successor, false);
        assert_eq!(artifact.path(), original.as_path());
        assert!(original.exists());
    }

    #[test]
    fn test_derive_leaves_original_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("a.nc");
        fs::write(&original, b"a").unwrap();

        let base = RunArtifact::new(original.clone());
        let derived = base.derive(dir.path().join("c.nc"));
        assert!(original.exists());
        assert_eq!(base.path(), original.as_path());
        assert_eq!(derived.path(), dir.path().join("c.nc").as_path());
    }
}
