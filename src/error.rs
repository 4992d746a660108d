//! Error types shared by every module in the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`CsrError`].
pub type Result<T> = std::result::Result<T, CsrError>;

/// Represents errors that can occur while building, encoding or verifying a
/// certificate request.
///
/// A signature that does not match is not an error: verification reports it
/// as `Ok(false)`.
#[derive(Debug, Error)]
pub enum CsrError {
    /// A field that must be present (the subject common name) is absent.
    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    /// Error due to invalid input (key without private half, empty path, bad signer ID).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not allowed in the request's current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A read operation was attempted before anything was generated or loaded.
    #[error("Not loaded: {0}")]
    NotLoaded(String),

    /// DER data is structurally invalid.
    #[error("Malformed encoding: {0}")]
    MalformedEncoding(String),

    /// PEM markers are missing or mismatched, or the base64 body is invalid.
    #[error("Invalid PEM format: {0}")]
    InvalidPemFormat(String),

    /// Reading or writing a request file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The signing backend refused to produce a signature.
    #[error("Signer error: {0}")]
    Signer(String),
}

impl CsrError {
    /// Shorthand for a [`CsrError::MalformedEncoding`] with a fixed message.
    pub fn malformed(message: impl Into<String>) -> Self {
        CsrError::MalformedEncoding(message.into())
    }
}

impl From<der::Error> for CsrError {
    /// Converts a `der::Error` into a `CsrError`.
    fn from(err: der::Error) -> Self {
        CsrError::MalformedEncoding(err.to_string())
    }
}

impl From<pem::PemError> for CsrError {
    fn from(err: pem::PemError) -> Self {
        CsrError::InvalidPemFormat(err.to_string())
    }
}
