//! CLI Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    /// A service client couldn't be built or a request failed.
    #[display("service error")]
    Service,
    #[display("engine error")]
    Engine,
    /// Command-line input that parsed but can't be acted on.
    #[display("{_0}")]
    Input(#[error(not(source))] String),
    #[display("could not read input")]
    Io,
}
