use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("ExifTool binary not found")]
    NotFound,

    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Invalid file path: {}", path.display())]
    InvalidPath { path: PathBuf },

    #[error("ExifTool error: {stderr}")]
    CommandFailed { stderr: String },

    #[error("Failed to parse ExifTool output: {details}")]
    ParseError { details: String },

    #[error("IO error ({kind}): {message}")]
    IoError {
        kind: std::io::ErrorKind,
        message: String,
    },
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::IoError {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::ParseError {
            details: err.to_string(),
        }
    }
}
