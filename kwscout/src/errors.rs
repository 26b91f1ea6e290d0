//! Error types for kwscout.
//!
//! Only failures that make a whole search call meaningless surface as a
//! `SearchError` to the caller: a malformed request, a worker pool that cannot
//! be built, or a worker executable that cannot be started at all. Failures
//! tied to a single file are reported through [`crate::diagnostics`] and the
//! search carries on with the next file.
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Invalid keyword: {0}")]
    InvalidKeyword(String),
    #[error("Worker launch failed: {0}")]
    WorkerLaunch(String),
    #[error("Worker protocol error: {0}")]
    WorkerProtocol(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Invalid UTF-8 in file {path}: {source}")]
    EncodingError {
        path: PathBuf,
        source: std::str::Utf8Error,
    },
}

impl SearchError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn invalid_keyword(msg: impl Into<String>) -> Self {
        Self::InvalidKeyword(msg.into())
    }

    pub fn worker_launch(msg: impl Into<String>) -> Self {
        Self::WorkerLaunch(msg.into())
    }

    pub fn worker_protocol(msg: impl Into<String>) -> Self {
        Self::WorkerProtocol(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn encoding_error(path: impl Into<PathBuf>, source: std::str::Utf8Error) -> Self {
        Self::EncodingError {
            path: path.into(),
            source,
        }
    }

    /// Maps an I/O error raised while opening or reading `path` onto the
    /// path-aware variants.
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::file_not_found(path),
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::IoError(error),
        }
    }
}

impl From<config::ConfigError> for SearchError {
    fn from(error: config::ConfigError) -> Self {
        Self::ConfigError(error.to_string())
    }
}
