//! Persisted collection store.
//!
//! The [`Store`] is the single source of truth for every tracked collection
//! and the items in it. It is loaded once at start-up from a JSON snapshot
//! (see [`document`] for the format), mutated through a handful of
//! operations, and written back after every mutation that changes what's on
//! disk.
//!
//! The library server and acquisition services are never consulted from
//! here; this crate only knows what the user asked for and what has already
//! been found.

pub mod document;
pub mod error;
pub mod models;
mod store;

pub use crate::models::{Collection, CollectionStatus, Item, ItemKey, MediaType, PendingCollection};
pub use crate::store::Store;
