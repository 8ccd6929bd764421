//! File-backed progress tracking for long batch runs.
//!
//! The tracker file doubles as a lock: it names the owning pid, and a file
//! whose pid is no longer a live batch process is considered stale and removed.

mod process;
mod state;

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

pub use process::{ProcessTable, PsProcessTable};
pub use state::{now, ParseState, DATE_FORMAT};

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("tracker I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tracker file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Persists `ParseState` for the current batch run.
pub struct ProgressTracker {
    path: PathBuf,
    processes: Box<dyn ProcessTable>,
}

impl ProgressTracker {
    pub fn new(path: impl Into<PathBuf>, processes: Box<dyn ProcessTable>) -> Self {
        Self {
            path: path.into(),
            processes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Begin a run owned by the current process, replacing any previous file.
    pub fn start(&self) -> Result<ParseState, TrackerError> {
        let state = ParseState::for_current_process();
        self.write(&state)?;
        info!("Tracking batch run (pid {}) in {}", state.process_id, self.path.display());
        Ok(state)
    }

    /// Whether a live process owns the tracker file. Stale files are deleted.
    pub fn is_active(&self) -> Result<bool, TrackerError> {
        let Some(state) = self.read()? else {
            return Ok(false);
        };

        if self.processes.is_running(state.process_id) {
            return Ok(true);
        }

        warn!(
            "Removing stale tracker file {} (pid {} is gone)",
            self.path.display(),
            state.process_id
        );
        self.remove()?;
        Ok(false)
    }

    /// Current state, when a run is active.
    pub fn state(&self) -> Result<Option<ParseState>, TrackerError> {
        if !self.is_active()? {
            return Ok(None);
        }
        self.read()
    }

    /// Record the outcome of one query. Does nothing without an active run.
    pub fn commit(&self, error: Option<&str>) -> Result<(), TrackerError> {
        let Some(mut state) = self.state()? else {
            debug!("No active run, skipping tracker commit");
            return Ok(());
        };

        match error {
            None => state.record_success(now()),
            Some(message) => state.record_error(message, now()),
        }
        self.write(&state)
    }

    /// Finish the active run, if any.
    pub fn end(&self) -> Result<(), TrackerError> {
        if self.is_active()? {
            self.remove()?;
            info!("Batch run finished, removed {}", self.path.display());
        }
        Ok(())
    }

    fn read(&self) -> Result<Option<ParseState>, TrackerError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(self.io_error(source)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| TrackerError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    /// Write through a temp file in the same directory so readers never see a partial file.
    fn write(&self, state: &ParseState) -> Result<(), TrackerError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| self.io_error(e))?;

        let json = serde_json::to_vec_pretty(state).map_err(|source| TrackerError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.io_error(e))?;
        tmp.write_all(&json).map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;
        Ok(())
    }

    fn remove(&self) -> Result<(), TrackerError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn io_error(&self, source: std::io::Error) -> TrackerError {
        TrackerError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
