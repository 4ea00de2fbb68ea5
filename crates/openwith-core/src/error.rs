//! Error types for openwith.
//!
//! Input errors are reported before any registry access. Lookup errors come
//! from the registry reader and carry the path that failed.

use thiserror::Error;

/// Main error type for the openwith library.
#[derive(Debug, Error)]
pub enum OpenWithError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Registry lookup failed for {path}: {message}")]
    LookupFailure {
        path: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Invalid registry path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for openwith operations.
pub type Result<T> = std::result::Result<T, OpenWithError>;

impl OpenWithError {
    /// Create an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        OpenWithError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a lookup failure for `path` from an OS error.
    pub fn lookup(path: impl Into<String>, err: std::io::Error) -> Self {
        OpenWithError::LookupFailure {
            path: path.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a lookup failure reporting that `path` does not exist.
    pub fn key_not_found(path: impl Into<String>) -> Self {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "registry key not found");
        Self::lookup(path, err)
    }

    /// Report an unusable registry path as a failed lookup of that path.
    ///
    /// Other errors are returned unchanged.
    pub fn into_lookup_failure(self) -> Self {
        match self {
            OpenWithError::InvalidPath { path, reason } => OpenWithError::LookupFailure {
                path,
                message: reason,
                source: None,
            },
            other => other,
        }
    }

    /// Returns true for errors caused by bad caller input.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, OpenWithError::InvalidArgument { .. })
    }

    /// Returns true for registry lookup failures.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(self, OpenWithError::LookupFailure { .. })
    }

    /// Returns true if this is a lookup failure caused by a missing key.
    pub fn is_not_found(&self) -> bool {
        match self {
            OpenWithError::LookupFailure {
                source: Some(err), ..
            } => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
