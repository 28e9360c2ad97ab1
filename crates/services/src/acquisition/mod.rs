//! Acquisition services (the things that go and fetch what's missing).
//!
//! Movies and shows are handled by separate services with the same shape:
//! look a term up, get back candidates, submit the chosen one. Building the
//! lookup term and picking a candidate is the dispatcher's job; an
//! [`AcquisitionService`] only speaks the wire protocol.

mod radarr;
mod sonarr;

pub use self::radarr::RadarrClient;
pub use self::sonarr::SonarrClient;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub type AcquisitionHandle = Arc<dyn AcquisitionService + Send + Sync>;

/// A lookup result.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Candidate {
    pub title: String,
    pub year: Option<i32>,
    /// Metadata-provider identifier (TMDB for movies, TVDB for shows).
    pub external_id: Option<u64>,
    /// URL slug, only used by show services.
    pub slug: Option<String>,
    /// The service's own identifier. Present when the service already knows
    /// about (tracks) the candidate, whether or not it has been downloaded.
    pub tracking_id: Option<u64>,
}
impl Candidate {
    pub fn new(title: impl Into<String>, year: impl Into<Option<i32>>) -> Self {
        Self { title: title.into(), year: year.into(), ..Default::default() }
    }

    pub fn with_external_id(mut self, id: u64) -> Self {
        self.external_id = Some(id);
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_tracking_id(mut self, id: u64) -> Self {
        self.tracking_id = Some(id);
        self
    }

    /// Already known to the service; submitting again would be rejected or
    /// create a duplicate.
    pub fn is_tracked(&self) -> bool {
        self.tracking_id.is_some_and(|id| id != 0)
    }
}

#[async_trait]
pub trait AcquisitionService: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Free-text lookup against the service's metadata provider.
    async fn lookup(&self, term: &str) -> Result<Vec<Candidate>>;

    /// Asks the service to start tracking `candidate` and search for it
    /// immediately. Succeeds only if the service reports it as created.
    async fn submit(&self, candidate: &Candidate) -> Result<()>;
}
