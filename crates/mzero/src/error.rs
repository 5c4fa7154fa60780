use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppErrorDetail {
    #[error("{0}")]
    Message(String),
    #[error("{kind}: {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
    },
    #[error(transparent)]
    Backend(mzero_backend::BackendError),
}

impl From<String> for AppErrorDetail {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

impl From<&str> for AppErrorDetail {
    fn from(value: &str) -> Self {
        Self::Message(value.to_string())
    }
}

impl From<std::io::Error> for AppErrorDetail {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl From<mzero_backend::BackendError> for AppErrorDetail {
    fn from(value: mzero_backend::BackendError) -> Self {
        Self::Backend(value)
    }
}

impl From<mzero_core::auto_update::AutoUpdateError> for AppErrorDetail {
    fn from(value: mzero_core::auto_update::AutoUpdateError) -> Self {
        Self::Message(value.to_string())
    }
}

impl From<mzero_core::UpdateError> for AppErrorDetail {
    fn from(value: mzero_core::UpdateError) -> Self {
        Self::Message(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("{0}")]
    Message(String),
    #[error("{operation} failed: {details}")]
    OperationFailed {
        operation: &'static str,
        details: AppErrorDetail,
    },
    #[error("App update {phase} failed: {details}")]
    AutoUpdateFailed {
        phase: &'static str,
        details: AppErrorDetail,
    },
    #[error(
        "Failed to restart: {details}\n\nPlease close and reopen MetadataZero manually to apply the update."
    )]
    RestartFailed { details: AppErrorDetail },
}

impl AppError {
    pub fn operation_failed(operation: &'static str, details: impl Into<AppErrorDetail>) -> Self {
        Self::OperationFailed {
            operation,
            details: details.into(),
        }
    }

    pub fn auto_update_failed(phase: &'static str, details: impl Into<AppErrorDetail>) -> Self {
        Self::AutoUpdateFailed {
            phase,
            details: details.into(),
        }
    }

    pub fn restart_failed(details: impl Into<AppErrorDetail>) -> Self {
        Self::RestartFailed {
            details: details.into(),
        }
    }
}

impl From<String> for AppError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

impl From<&str> for AppError {
    fn from(value: &str) -> Self {
        Self::Message(value.to_string())
    }
}
