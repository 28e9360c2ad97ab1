//! Clients for the external services marquee talks to.
//!
//! - [`library`]: the media server that holds what's already available
//! - [`acquisition`]: the movie and show services that fetch what's missing
//! - [`discovery`]: public lists that can be imported as collections
//!
//! Each is a trait with an `Arc<dyn ...>` handle type, so the engine never
//! sees a concrete client. Enable the `mock` feature for in-memory
//! implementations.

pub mod acquisition;
pub mod discovery;
pub mod error;
pub mod http;
pub mod library;
#[cfg(feature = "mock")]
pub mod mock;

pub use crate::acquisition::{AcquisitionHandle, AcquisitionService, Candidate};
pub use crate::discovery::{DiscoveryHandle, DiscoveryService, ListItem, ListRef, ListSummary};
pub use crate::library::{LibraryEntry, LibraryHandle, LibraryService};
