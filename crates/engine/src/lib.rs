//! Keeping desired media collections in sync with a library.
//!
//! A collection is a named list of `Title (Year)` items. The engine finds
//! each item in the library (see [`matcher`]), tags it with the collection
//! name, and asks an acquisition service to fetch whatever is missing (see
//! [`dispatch`]). Items nobody has yet are re-checked by monitor passes until
//! they turn up.
//!
//! Drive everything through a [`Coordinator`].

pub mod cancel;
mod context;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod ingest;
pub mod matcher;
pub mod scan;
#[cfg(test)]
mod testing;

pub use crate::cancel::{CancelFlag, MonitorGate, MonitorPermit};
pub use crate::context::Context;
pub use crate::coordinator::Coordinator;
pub use crate::scan::{ItemOutcome, Outcome, Pass, PassReport, ScanEvent};
