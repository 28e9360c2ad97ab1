//! Service Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A service error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request never got a response (connection refused, timeout, etc.).
    #[display("network error talking to {_0}")]
    Network(#[error(not(source))] String),
    /// The service answered with an unexpected status code.
    #[display("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    /// The response body didn't have the expected shape.
    #[display("invalid response from {_0}")]
    InvalidResponse(#[error(not(source))] String),
    /// The configured library section doesn't exist on the server.
    #[display("library section not found: {_0}")]
    SectionNotFound(#[error(not(source))] String),
    /// A configured base URL couldn't be parsed.
    #[display("invalid URL: {_0}")]
    InvalidUrl(#[error(not(source))] String),
    /// The HTTP client itself couldn't be constructed.
    #[display("could not build HTTP client")]
    Client,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
