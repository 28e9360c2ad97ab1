//! Sonarr (shows), v3 API.

use super::{AcquisitionService, Candidate};
use crate::error::{ErrorKind, Result};
use crate::http;
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

const NAME: &str = "sonarr";
const API_KEY_HEADER: &str = "X-Api-Key";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupSeries {
    title: String,
    year: Option<i32>,
    tvdb_id: Option<u64>,
    title_slug: Option<String>,
    id: Option<u64>,
}
impl From<LookupSeries> for Candidate {
    fn from(s: LookupSeries) -> Self {
        Candidate {
            title: s.title,
            year: s.year,
            external_id: s.tvdb_id,
            slug: s.title_slug,
            tracking_id: s.id,
        }
    }
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddSeries<'a> {
    tvdb_id: Option<u64>,
    title: &'a str,
    title_slug: Option<&'a str>,
    quality_profile_id: u32,
    root_folder_path: &'a str,
    monitored: bool,
    add_options: AddOptions,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddOptions {
    search_for_missing_episodes: bool,
}

pub struct SonarrClient {
    http: Client,
    base: Url,
    api_key: String,
    root_folder: String,
    quality_profile: u32,
}

impl SonarrClient {
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

    fn payload<'a>(&'a self, candidate: &'a Candidate) -> AddSeries<'a> {
        AddSeries {
            tvdb_id: candidate.external_id,
            title: &candidate.title,
            title_slug: candidate.slug.as_deref(),
            quality_profile_id: self.quality_profile,
            root_folder_path: &self.root_folder,
            monitored: true,
            add_options: AddOptions { search_for_missing_episodes: true },
        }
    }
}

#[async_trait]
impl AcquisitionService for SonarrClient {
    fn name(&self) -> &str {
        NAME
    }

    #[instrument(skip(self), err(Debug))]
    async fn lookup(&self, term: &str) -> Result<Vec<Candidate>> {
        let url = http::join(&self.base, "api/v3/series/lookup")?;
        let response = self
            .http
            .get(url)
            .query(&[("term", term)])
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .or_raise(|| ErrorKind::Network(NAME.to_string()))?;
        let response = http::expect_status(response, Some(StatusCode::OK)).await?;
        let series: Vec<LookupSeries> = http::json(response, NAME).await?;
        Ok(series.into_iter().map(Candidate::from).collect())
    }

    #[instrument(skip(self, candidate), fields(title = %candidate.title), err(Debug))]
    async fn submit(&self, candidate: &Candidate) -> Result<()> {
        let url = http::join(&self.base, "api/v3/series")?;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lookup() {
        let json = r#"[{"title":"Dark","year":2017,"tvdbId":334824,"titleSlug":"dark","seasons":[]}]"#;
        let series: Vec<LookupSeries> = serde_json::from_str(json).unwrap();
        let candidate: Candidate = series.into_iter().next().unwrap().into();
        assert_eq!(candidate, Candidate::new("Dark", 2017).with_external_id(334824).with_slug("dark"));
    }

    #[test]
    fn test_payload() {
        let client = SonarrClient::new("http://127.0.0.1:8989", "key", "/tv", 1, Duration::from_secs(1)).unwrap();
        let candidate = Candidate::new("Dark", 2017).with_external_id(334824).with_slug("dark");
        let json = serde_json::to_value(client.payload(&candidate)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "tvdbId": 334824,
                "title": "Dark",
                "titleSlug": "dark",
                "qualityProfileId": 1,
                "rootFolderPath": "/tv",
                "monitored": true,
                "addOptions": {"searchForMissingEpisodes": true},
            })
        );
    }
}
