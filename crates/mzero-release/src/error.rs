use std::path::{Path, PathBuf};

use mzero_core::archive::ArchiveError;
use thiserror::Error;

use crate::integrity::IntegrityError;

#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("{0}")]
    Usage(String),

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error("failed to download {url}: {details}")]
    Network { url: String, details: String },

    #[error("Not found: {}", path.display())]
    MissingArtifact { path: PathBuf },

    #[error("Skipped {}: {details}", path.display())]
    MalformedManifest { path: PathBuf, details: String },

    #[error("No platforms found in latest.json files")]
    EmptyUnion,

    #[error("invalid release config {}: {details}", path.display())]
    Config { path: PathBuf, details: String },

    #[error("unexpected archive layout: {} is missing", path.display())]
    ArchiveLayout { path: PathBuf },

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("{context} ({}): {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReleaseError {
    pub fn io(context: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn network(url: &str, details: impl std::fmt::Display) -> Self {
        Self::Network {
            url: url.to_string(),
            details: details.to_string(),
        }
    }

    /// Soft conditions skip one unit of work; everything else stops the batch.
    #[must_use]
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            Self::MissingArtifact { .. } | Self::MalformedManifest { .. }
        )
    }

    /// Usage problems print the command's usage text before exiting.
    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_) | Self::UnknownPlatform(_))
    }
}
