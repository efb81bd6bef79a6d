//! # Checkpoint Store
//!
//! Durable record of the last log row id confirmed delivered to Loki.
//!
//! The file holds a single decimal integer and nothing else. A missing file is
//! the only state that means "never shipped anything"; every other read or
//! write failure is fatal, because continuing without a trustworthy position
//! would either skip rows or replay the whole table.
//!
//! Writes go to a sibling temporary file which is synced and then renamed over
//! the real path, so a crash leaves either the old value or the new one.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Failed to read checkpoint file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write checkpoint file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Checkpoint file {path} does not contain a valid id: {contents:?}")]
    Parse { path: String, contents: String },
}

impl CheckpointError {
    pub fn read(path: &Path, source: std::io::Error) -> Self {
        Self::Read {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn write(path: &Path, source: std::io::Error) -> Self {
        Self::Write {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn parse(path: impl AsRef<Path>, contents: impl Into<String>) -> Self {
        Self::Parse {
            path: path.as_ref().display().to_string(),
            contents: contents.into(),
        }
    }
}

pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// Persistence seam for the shipped position
pub trait CheckpointStore: Send {
    /// Last persisted position, or `None` when nothing was ever persisted
    fn read(&self) -> CheckpointResult<Option<u64>>;

    /// Persist `position`; must not return before the value is durable
    fn write(&mut self, position: u64) -> CheckpointResult<()>;

    /// Startup self-test: rewrite the position just read so an unwritable
    /// medium fails now instead of after the first successful ship.
    fn verify_writable(&mut self, position: u64) -> CheckpointResult<()> {
        self.write(position)
    }
}

/// Plain-text checkpoint file
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn sync_parent_dir(&self) {
        let Some(parent) = self.path.parent() else {
            return;
        };
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        // Directory handles cannot be opened for sync on every platform.
        if let Err(e) = File::open(parent).and_then(|dir| dir.sync_all()) {
            debug!(dir = %parent.display(), error = %e, "Could not sync checkpoint directory");
        }
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn read(&self) -> CheckpointResult<Option<u64>> {
        debug!("Reading checkpoint from: {}", self.path.display());

        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No checkpoint file at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(CheckpointError::read(&self.path, e)),
        };

        let position = contents
            .trim()
            .parse::<u64>()
            .map_err(|_| CheckpointError::parse(&self.path, contents.clone()))?;

        debug!(checkpoint = position, "Checkpoint value read");
        Ok(Some(position))
    }

    fn write(&mut self, position: u64) -> CheckpointResult<()> {
        debug!(
            checkpoint = position,
            "Writing checkpoint to {}",
            self.path.display()
        );

        let temp_path = self.temp_path();
        let result = (|| {
            let mut file = File::create(&temp_path)?;
            file.write_all(position.to_string().as_bytes())?;
            file.sync_all()?;
            fs::rename(&temp_path, &self.path)
        })();

        if let Err(e) = result {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                if cleanup.kind() != ErrorKind::NotFound {
                    warn!(path = %temp_path.display(), error = %cleanup, "Failed to remove temporary checkpoint file");
                }
            }
            return Err(CheckpointError::write(&self.path, e));
        }

        self.sync_parent_dir();
        Ok(())
    }
}
