//! VFS error types.

use std::io;
use std::path::Path;
use thiserror::Error;

/// VFS error type.
#[derive(Debug, Error)]
pub enum VfsError {
    /// Input was not a usable path (empty, or not a string at all).
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Resolved path escapes its configured boundary (security violation).
    #[error("path is outside the {boundary} directory: {path}")]
    OutOfBounds {
        path: String,
        boundary: Boundary,
    },

    /// File or directory not found.
    #[error("no such path: {0}")]
    NotFound(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// File exceeds the configured read limit.
    #[error("file too large: {path} ({size} bytes, limit {limit})")]
    FileTooLarge { path: String, size: u64, limit: u64 },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Which sandbox boundary a check was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Boundary {
    Root,
    Base,
}

impl VfsError {
    /// Create an InvalidPath error.
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }

    /// Create an OutOfBounds error.
    pub fn out_of_bounds(path: &Path, boundary: Boundary) -> Self {
        Self::OutOfBounds {
            path: path.display().to_string(),
            boundary,
        }
    }

    /// Create a NotFound error.
    pub fn not_found(path: &Path) -> Self {
        Self::NotFound(path.display().to_string())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: &Path) -> Self {
        Self::NotADirectory(path.display().to_string())
    }

    /// Map an I/O error for `path`, keeping `NotFound` distinct.
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::not_found(path),
            io::ErrorKind::NotADirectory => Self::not_a_directory(path),
            _ => Self::Io(err),
        }
    }

    /// Returns true for errors caused by the caller's input rather than the host.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, VfsError::Io(_))
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;
