//! Radarr (movies), v3 API.

use super::{AcquisitionService, Candidate};
use crate::error::{ErrorKind, Result};
use crate::http;
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

const NAME: &str = "radarr";
const API_KEY_HEADER: &str = "X-Api-Key";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupMovie {
    title: String,
    year: Option<i32>,
    tmdb_id: Option<u64>,
    id: Option<u64>,
}
impl From<LookupMovie> for Candidate {
    fn from(m: LookupMovie) -> Self {
        Candidate {
            title: m.title,
            year: m.year,
            external_id: m.tmdb_id,
            slug: None,
            tracking_id: m.id,
        }
    }
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddMovie<'a> {
    tmdb_id: Option<u64>,
    title: &'a str,
    year: Option<i32>,
    quality_profile_id: u32,
    root_folder_path: &'a str,
    monitored: bool,
    add_options: AddOptions,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddOptions {
    search_for_movie: bool,
}

pub struct RadarrClient {
    http: Client,
    base: Url,
    api_key: String,
    root_folder: String,
    quality_profile: u32,
}

impl RadarrClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        root_folder: impl Into<String>,
        quality_profile: u32,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            http: http::client(timeout)?,
            base: http::base_url(base_url)?,
            api_key: api_key.into(),
            root_folder: root_folder.into(),
            quality_profile,
        })
    }

    fn payload<'a>(&'a self, candidate: &'a Candidate) -> AddMovie<'a> {
        AddMovie {
            tmdb_id: candidate.external_id,
            title: &candidate.title,
            year: candidate.year,
            quality_profile_id: self.quality_profile,
            root_folder_path: &self.root_folder,
            monitored: true,
            add_options: AddOptions { search_for_movie: true },
        }
    }
}

#[async_trait]
impl AcquisitionService for RadarrClient {
    fn name(&self) -> &str {
        NAME
    }

    #[instrument(skip(self), err(Debug))]
    async fn lookup(&self, term: &str) -> Result<Vec<Candidate>> {
        let url = http::join(&self.base, "api/v3/movie/lookup")?;
        let response = self
            .http
            .get(url)
            .query(&[("term", term)])
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .or_raise(|| ErrorKind::Network(NAME.to_string()))?;
        let response = http::expect_status(response, Some(StatusCode::OK)).await?;
        let movies: Vec<LookupMovie> = http::json(response, NAME).await?;
        Ok(movies.into_iter().map(Candidate::from).collect())
    }

    #[instrument(skip(self, candidate), fields(title = %candidate.title), err(Debug))]
    async fn submit(&self, candidate: &Candidate) -> Result<()> {
        let url = http::join(&self.base, "api/v3/movie")?;
        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&self.payload(candidate))
            .send()
            .await
            .or_raise(|| ErrorKind::Network(NAME.to_string()))?;
        http::expect_status(response, Some(StatusCode::CREATED)).await?;
        Ok(())
    }
}
