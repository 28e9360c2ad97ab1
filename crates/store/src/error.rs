//! Store Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use crate::models::MediaType;
use derive_more::{Display, Error};
use std::path::PathBuf;

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Attempted to merge items of one media type into a collection that was
    /// created with another. Nothing was changed.
    #[display("collection '{collection}' holds {existing} items, cannot add {requested} items")]
    MediaTypeMismatch {
        collection: String,
        existing: MediaType,
        requested: MediaType,
    },
    /// Collection names must be non-blank and can't use the reserved `_` prefix.
    #[display("invalid collection name: '{_0}'")]
    InvalidName(#[error(not(source))] String),
    /// Reading or writing the snapshot file failed.
    #[display("I/O error: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// The in-memory document could not be serialized.
    #[display("could not serialize collections")]
    Serialization,
    /// The on-disk document is unreadable, malformed, or from a newer schema.
    #[display("corrupt collections document: {_0}")]
    Corrupt(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        let err = ErrorKind::MediaTypeMismatch {
            collection: "Marvel".to_string(),
            existing: MediaType::Movie,
            requested: MediaType::Show,
        };
        assert_eq!(err.to_string(), "collection 'Marvel' holds movie items, cannot add show items");
        assert_eq!(ErrorKind::Serialization.to_string(), "could not serialize collections");
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Io(PathBuf::from("collections.json")).is_retryable());
        assert!(!ErrorKind::Corrupt("bad".to_string()).is_retryable());
    }
}
