//! Media library (what is already on the server).
//!
//! The reconciliation engine needs exactly two things from the library:
//! search for entries by title, and tag an entry as belonging to a
//! collection. [`LibraryService`] is that interface; [`PlexLibrary`] is the
//! concrete implementation talking to a Plex Media Server.

mod plex;

pub use self::plex::PlexLibrary;
use crate::error::Result;
use async_trait::async_trait;
use marquee_store::MediaType;
use std::sync::Arc;

pub type LibraryHandle = Arc<dyn LibraryService + Send + Sync>;

/// A library entry returned by a title search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LibraryEntry {
    /// Server-side identifier used when tagging.
    pub id: String,
    pub title: String,
    /// Some servers leave the year blank for badly matched media.
    pub year: Option<i32>,
}
impl LibraryEntry {
    pub fn new(id: impl Into<String>, title: impl Into<String>, year: impl Into<Option<i32>>) -> Self {
        Self { id: id.into(), title: title.into(), year: year.into() }
    }
}

#[async_trait]
pub trait LibraryService: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Searches the section holding `media_type` for entries matching
    /// `title`. Deciding which (if any) result is the wanted item is up to
    /// the caller.
    async fn search(&self, media_type: MediaType, title: &str) -> Result<Vec<LibraryEntry>>;

    /// Adds `entry` to the server-side collection called `collection`.
    async fn tag(&self, media_type: MediaType, entry: &LibraryEntry, collection: &str) -> Result<()>;
}
