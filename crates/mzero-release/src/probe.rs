use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::de::DeserializeOwned;

use crate::error::ReleaseError;

/// Result of looking for one batch input. Fatal problems are returned as
/// `Err` by the probing functions instead.
#[derive(Debug)]
pub enum Probe<T> {
    Ready(T),
    Absent(PathBuf),
    Malformed { path: PathBuf, details: String },
}

impl<T> Probe<T> {
    /// The soft error describing why this input is skipped.
    #[must_use]
    pub fn skip_error(&self) -> Option<ReleaseError> {
        match self {
            Self::Ready(_) => None,
            Self::Absent(path) => Some(ReleaseError::MissingArtifact { path: path.clone() }),
            Self::Malformed { path, details } => Some(ReleaseError::MalformedManifest {
                path: path.clone(),
                details: details.clone(),
            }),
        }
    }

    /// The ready value, or `None` after logging the skip.
    pub fn ready_or_warn(self) -> Option<T> {
        if let Some(error) = self.skip_error() {
            warn!("{error}");
        }
        match self {
            Self::Ready(value) => Some(value),
            Self::Absent(_) | Self::Malformed { .. } => None,
        }
    }
}

/// Whether a file is present. Never fails.
#[must_use]
pub fn probe_exists(path: &Path) -> Probe<()> {
    if path.exists() {
        Probe::Ready(())
    } else {
        Probe::Absent(path.to_path_buf())
    }
}

/// Read a text file. Missing or unreadable files are absent: another job may
/// still be writing them.
#[must_use]
pub fn probe_text(path: &Path) -> Probe<String> {
    match std::fs::read(path) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Probe::Ready(text),
            Err(error) => Probe::Malformed {
                path: path.to_path_buf(),
                details: error.to_string(),
            },
        },
        Err(error) => {
            debug!("{} is not readable: {error}", path.display());
            Probe::Absent(path.to_path_buf())
        }
    }
}

/// Read and parse a JSON file. A parse failure is reported as malformed.
#[must_use]
pub fn probe_json<T: DeserializeOwned>(path: &Path) -> Probe<T> {
    match probe_text(path) {
        Probe::Ready(text) => match serde_json::from_str(&text) {
            Ok(value) => Probe::Ready(value),
            Err(error) => Probe::Malformed {
                path: path.to_path_buf(),
                details: error.to_string(),
            },
        },
        Probe::Absent(path) => Probe::Absent(path),
        Probe::Malformed { path, details } => Probe::Malformed { path, details },
    }
}
