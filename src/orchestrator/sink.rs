//! Destinations for finished proceeding batches.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;

use crate::models::{ProceedingBatch, RawProceedingRecord};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode batch: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// Receives every batch the orchestrator completes.
pub trait ProceedingSink: Send {
    fn store(&mut self, batch: &ProceedingBatch) -> Result<(), SinkError>;
}

/// Row shape handed downstream, termination info normalised.
#[derive(Debug, Serialize)]
struct StoredProceeding<'a> {
    name: &'a str,
    exe_production: &'a str,
    details: &'a str,
    subject: &'a str,
    department: &'a str,
    bailiff: &'a str,
    ip_end: Option<String>,
}

impl<'a> From<&'a RawProceedingRecord> for StoredProceeding<'a> {
    fn from(record: &'a RawProceedingRecord) -> Self {
        Self {
            name: &record.subject_description,
            exe_production: &record.production_number_and_date,
            details: &record.document_details,
            subject: &record.subject_of_execution,
            department: &record.department,
            bailiff: &record.bailiff,
            ip_end: record.normalized_termination(),
        }
    }
}

#[derive(Debug, Serialize)]
struct StoredBatch<'a> {
    client_id: Option<i64>,
    request_id: Option<i64>,
    task_start: NaiveDateTime,
    task_end: NaiveDateTime,
    by_client_name: bool,
    by_proceeding_number: bool,
    proceedings: Vec<StoredProceeding<'a>>,
}

impl<'a> From<&'a ProceedingBatch> for StoredBatch<'a> {
    fn from(batch: &'a ProceedingBatch) -> Self {
        Self {
            client_id: batch.client_id,
            request_id: batch.request_id,
            task_start: batch.task_start,
            task_end: batch.task_end,
            by_client_name: batch.kind.by_client_name,
            by_proceeding_number: batch.kind.by_proceeding_number,
            proceedings: batch.records().iter().map(StoredProceeding::from).collect(),
        }
    }
}

/// Appends one JSON object per batch to a file.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> SinkError {
        SinkError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl ProceedingSink for JsonlSink {
    fn store(&mut self, batch: &ProceedingBatch) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(&StoredBatch::from(batch))?;
        line.push('\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        file.write_all(line.as_bytes()).map_err(|e| self.io_error(e))
    }
}

/// Keeps batches in memory. Clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    batches: Arc<Mutex<Vec<ProceedingBatch>>>,
}

impl MemorySink {
    /// Snapshot of everything stored so far.
    pub fn batches(&self) -> Vec<ProceedingBatch> {
        self.batches
            .lock()
            .map(|stored| stored.clone())
            .unwrap_or_default()
    }
}

impl ProceedingSink for MemorySink {
    fn store(&mut self, batch: &ProceedingBatch) -> Result<(), SinkError> {
        self.batches
            .lock()
            .map_err(|_| SinkError::Unavailable("memory sink lock poisoned".to_string()))?
            .push(batch.clone());
        Ok(())
    }
}
