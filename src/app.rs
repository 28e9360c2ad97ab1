//! Building a coordinator from configuration.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use marquee_config::Config;
use marquee_engine::{Context, Coordinator};
use marquee_services::acquisition::{RadarrClient, SonarrClient};
use marquee_services::discovery::TraktDiscovery;
use marquee_services::library::PlexLibrary;
use marquee_services::{AcquisitionHandle, DiscoveryHandle, LibraryHandle};
use marquee_store::Store;
use std::sync::Arc;
use tracing::{debug, info};

pub struct App {
    pub coordinator: Coordinator,
    /// `None` without a discovery client id.
    pub discovery: Option<DiscoveryHandle>,
    pub config: Config,
}

impl App {
    pub async fn build(config: Config) -> Result<Self> {
        let timeout = config.http.timeout();
        let store = Arc::new(Store::load(&config.store_path).await);
        info!(path = %config.store_path.display(), "Loaded collection store");

        let library: LibraryHandle = Arc::new(
            PlexLibrary::new(
                &config.library.url,
                config.library.token.as_str(),
                config.library.movie_section.as_str(),
                config.library.show_section.as_str(),
                timeout,
            )
            .or_raise(|| ErrorKind::Service)?,
        );
        let mut ctx = Context::new(store, library);

        if config.movies.is_configured() {
            let movies: AcquisitionHandle = Arc::new(
                RadarrClient::new(
                    &config.movies.url,
                    config.movies.api_key.as_str(),
                    config.movies.root_folder.as_str(),
                    config.movies.quality_profile,
                    timeout,
                )
                .or_raise(|| ErrorKind::Service)?,
            );
            ctx = ctx.with_movies(movies);
        } else {
            debug!("Movie acquisition not configured");
        }
        if config.shows.is_configured() {
            let shows: AcquisitionHandle = Arc::new(
                SonarrClient::new(
                    &config.shows.url,
                    config.shows.api_key.as_str(),
                    config.shows.root_folder.as_str(),
                    config.shows.quality_profile,
                    timeout,
                )
                .or_raise(|| ErrorKind::Service)?,
            );
            ctx = ctx.with_shows(shows);
        } else {
            debug!("Show acquisition not configured");
        }

        let discovery = if config.discovery.is_configured() {
            let trakt = TraktDiscovery::new(&config.discovery.url, config.discovery.client_id.as_str(), timeout)
                .or_raise(|| ErrorKind::Service)?;
            Some(Arc::new(trakt) as DiscoveryHandle)
        } else {
            None
        };

        Ok(Self { coordinator: Coordinator::new(ctx), discovery, config })
    }

    pub fn discovery(&self) -> Result<&DiscoveryHandle> {
        match &self.discovery {
            Some(discovery) => Ok(discovery),
            None => exn::bail!(ErrorKind::Input("list discovery needs discovery.client_id to be set".to_string())),
        }
    }
}
