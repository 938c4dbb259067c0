//! Error types for stowage.

use thiserror::Error;

/// Common error type for stowage.
///
/// Every variant is a closed failure kind; the web layer maps each one to a
/// transport status code in [`crate::web::ApiError`]. Per-file rejections
/// (disallowed type, oversized file) are not errors: they are recorded as
/// [`crate::file::FailureReason`] in the upload report.
#[derive(Error, Debug)]
pub enum StowageError {
    /// Name is empty, blank, or otherwise unusable after sanitization.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Resolved path escapes the storage root.
    #[error("path escapes storage root: {0}")]
    PathTraversal(String),

    /// Folder creation conflicts with an existing entry.
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// Request carries more files than allowed.
    #[error("too many files: at most {limit} per upload")]
    TooManyFiles { limit: usize },

    /// Upload request contains no files at all.
    #[error("no files were uploaded")]
    NoFiles,

    /// Client stream broke off before a file was fully received.
    #[error("upload interrupted: {0}")]
    Interrupted(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl StowageError {
    /// Whether the failure was caused by client input rather than the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, StowageError::Io(_) | StowageError::Config(_))
    }
}

/// Result type alias for stowage operations.
pub type Result<T> = std::result::Result<T, StowageError>;
