//! Engine Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Only a handful of failures ever reach a caller: most problems during a pass
//! are per-item and end up in the pass report instead.

use derive_more::{Display, Error};
use marquee_store::error::{Error as StoreError, ErrorKind as StoreErrorKind};

/// An engine error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The collection already exists with the other media type.
    #[display("{_0}")]
    MediaTypeMismatch(#[error(not(source))] String),
    /// A monitor pass is already running; the request was rejected, not queued.
    #[display("a monitor pass is already running")]
    ConcurrencyConflict,
    /// Caller-supplied input was unusable (empty collection name, no items).
    #[display("invalid input: {_0}")]
    InvalidInput(#[error(not(source))] String),
    /// The collection store failed.
    #[display("collection store error")]
    Store,
    /// The list discovery service failed.
    #[display("list discovery error")]
    Discovery,
}

impl ErrorKind {
    /// Convert a store error into an engine error, keeping the store's `Exn`
    /// frame as a child in the error tree.
    #[track_caller]
    pub fn store(err: StoreError) -> Error {
        let kind = match &*err {
            mismatch @ StoreErrorKind::MediaTypeMismatch { .. } => Self::MediaTypeMismatch(mismatch.to_string()),
            StoreErrorKind::InvalidName(name) => Self::InvalidInput(format!("invalid collection name '{name}'")),
            _ => Self::Store,
        };
        err.raise(kind)
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConcurrencyConflict => true,
            Self::MediaTypeMismatch(_) | Self::InvalidInput(_) | Self::Store | Self::Discovery => false,
        }
    }
}
