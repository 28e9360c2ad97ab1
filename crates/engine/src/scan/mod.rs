//! Reconciling desired items against the library.
//!
//! Two kinds of pass, both streaming [`ScanEvent`]s:
//!
//! - [`ingest`]: newly added items of one collection. Misses are handed to
//!   the acquisition dispatcher once the pass is done.
//! - [`monitor`]: every still-pending item of one or all collections, to
//!   notice arrivals. Never dispatches. Needs a [`MonitorPermit`](crate::cancel::MonitorPermit).
//!
//! Items only ever go from pending to found; found items are never looked
//! at again.

mod event;
mod item;
mod stream;

pub use self::event::{ItemOutcome, Outcome, Pass, PassReport, ScanEvent};
pub use self::item::reconcile_item;
pub use self::stream::{ingest, monitor};
