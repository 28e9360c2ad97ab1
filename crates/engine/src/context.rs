use marquee_services::{AcquisitionHandle, LibraryHandle};
use marquee_store::{MediaType, Store};
use std::sync::Arc;

/// Everything a pass needs: the store plus the services it talks to.
///
/// Cheap to clone; every field is a shared handle.
#[derive(Clone)]
pub struct Context {
    pub store: Arc<Store>,
    pub library: LibraryHandle,
    /// Movie acquisition. `None` when not configured.
    pub movies: Option<AcquisitionHandle>,
    /// Show acquisition. `None` when not configured.
    pub shows: Option<AcquisitionHandle>,
}

impl Context {
    pub fn new(store: Arc<Store>, library: LibraryHandle) -> Self {
        Self { store, library, movies: None, shows: None }
    }

    pub fn with_movies(mut self, service: AcquisitionHandle) -> Self {
        self.movies = Some(service);
        self
    }

    pub fn with_shows(mut self, service: AcquisitionHandle) -> Self {
        self.shows = Some(service);
        self
    }

    pub fn acquisition(&self, media_type: MediaType) -> Option<&AcquisitionHandle> {
        match media_type {
            MediaType::Movie => self.movies.as_ref(),
            MediaType::Show => self.shows.as_ref(),
        }
    }
}
