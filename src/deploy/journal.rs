//! On-disk record of deployment progress.
//!
//! The journal lets a later run notice that an earlier one stopped while a
//! transaction was in flight, so it does not resubmit blindly.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::blockchain::types::TxHash;
use crate::deploy::state::{DeployState, Transition};

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("Journal I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Journal at {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Submitted transaction whose outcome is not yet known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InFlight {
    pub transition: Transition,
    pub hash: TxHash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    pub run_id: Uuid,
    pub state: DeployState,
    pub in_flight: Option<InFlight>,
    /// Failure that ended the run, if any.
    pub failure: Option<String>,
    /// Seconds since the Unix epoch.
    pub updated_at: u64,
}

impl JournalRecord {
    pub fn new(run_id: Uuid, state: DeployState) -> Self {
        Self {
            run_id,
            state,
            in_flight: None,
            failure: None,
            updated_at: now_secs(),
        }
    }

    /// In-flight transaction that cannot safely be repeated.
    pub fn ambiguous_in_flight(&self) -> Option<&InFlight> {
        self.in_flight
            .as_ref()
            .filter(|in_flight| !in_flight.transition.is_idempotent())
    }
}

/// JSON journal file.
#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last written record, `None` when no journal exists.
    pub fn load(&self) -> Result<Option<JournalRecord>, JournalError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(JournalError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|source| JournalError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    /// Replace the journal contents.
    ///
    /// Writes to a sibling temp file first so a crash never leaves a torn record.
    pub fn write(&self, record: &JournalRecord) -> Result<(), JournalError> {
        let io_err = |source| JournalError::Io {
            path: self.path.clone(),
            source,
        };

        let mut record = record.clone();
        record.updated_at = now_secs();
        let bytes = serde_json::to_vec_pretty(&record).map_err(|source| JournalError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }

    /// Remove the journal, acknowledging whatever it recorded.
    pub fn discard(&self) -> Result<Option<JournalRecord>, JournalError> {
        let previous = self.load().unwrap_or(None);
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(previous),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(JournalError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
