use thiserror::Error;

use crate::transport::TransportError;

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested blob or container was not found.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// An I/O error occurred.
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The container or blob name is not acceptable.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// The blob exceeds the configured size limit.
    #[error("blob exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },

    /// The storage service answered with a non-success status.
    #[error("storage service returned {status} ({}): {message}", code.as_deref().unwrap_or("no error code"))]
    Service {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The request never produced a response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The client could not be set up from the given settings.
    #[error("invalid storage configuration: {0}")]
    InvalidConfiguration(String),
}

impl StorageError {
    /// Service error code, when the service reported one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Service { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
