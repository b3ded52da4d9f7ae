use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HybridError>;

#[derive(Debug, Error)]
pub enum HybridError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Wrong password")]
    WrongPassword,

    #[error("Decryption failed: wrong key or corrupted data")]
    DecryptionFailed,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fieldless discriminant of [`HybridError`], convenient for matching in callers and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidParameter,
    InvalidOperation,
    InvalidFormat,
    NotFound,
    WrongPassword,
    DecryptionFailed,
    InvalidConfig,
    Io,
    Json,
}

impl HybridError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Self::InvalidOperation(_) => ErrorKind::InvalidOperation,
            Self::InvalidFormat(_) => ErrorKind::InvalidFormat,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::WrongPassword => ErrorKind::WrongPassword,
            Self::DecryptionFailed => ErrorKind::DecryptionFailed,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Self::Io(_) => ErrorKind::Io,
            Self::Json(_) => ErrorKind::Json,
        }
    }

    pub(crate) fn public_only(operation: &str) -> Self {
        Self::InvalidOperation(format!("{} requires a private key", operation))
    }
}
