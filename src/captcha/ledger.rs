//! Append-only record of captcha challenges and how they fared.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{CaptchaAttempt, CaptchaChallenge};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger line {line} is not valid JSON: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode ledger entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One ledger line.
///
/// Challenges gathered for labelling carry neither a machine code nor a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub challenge: CaptchaChallenge,
    #[serde(default)]
    pub machine_code: Option<String>,
    #[serde(default)]
    pub is_resolved: Option<bool>,
    pub recorded_at: NaiveDateTime,
}

impl LedgerEntry {
    pub fn solved(attempt: &CaptchaAttempt, is_resolved: bool) -> Self {
        Self {
            challenge: attempt.challenge.clone(),
            machine_code: Some(attempt.code.clone()),
            is_resolved: Some(is_resolved),
            recorded_at: Local::now().naive_local(),
        }
    }

    pub fn unlabelled(challenge: CaptchaChallenge) -> Self {
        Self {
            challenge,
            machine_code: None,
            is_resolved: None,
            recorded_at: Local::now().naive_local(),
        }
    }
}

/// Destination for captcha observations.
pub trait CaptchaLedger: Send + Sync {
    fn record(&self, entry: &LedgerEntry) -> Result<(), LedgerError>;
}

/// JSON-lines file ledger.
#[derive(Debug, Clone)]
pub struct JsonlCaptchaLedger {
    path: PathBuf,
}

impl JsonlCaptchaLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every entry back, oldest first.
    pub fn entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = serde_json::from_str(&line).map_err(|source| LedgerError::Json {
                line: idx + 1,
                source,
            })?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

impl CaptchaLedger for JsonlCaptchaLedger {
    fn record(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}
