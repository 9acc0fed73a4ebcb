//! Request handlers, one module per API area.

pub(crate) mod base_dir;
pub(crate) mod content;
pub(crate) mod cursor;
pub(crate) mod search;
pub(crate) mod tree;
pub(crate) mod watcher;

use crate::error::ApiError;

/// Unwrap a required parameter; empty strings count as missing.
fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::missing(name)),
    }
}
