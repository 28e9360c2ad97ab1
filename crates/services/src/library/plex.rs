//! Plex Media Server library.

use super::{LibraryEntry, LibraryService};
use crate::error::{ErrorKind, Result};
use crate::http;
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use marquee_store::MediaType;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::instrument;

const NAME: &str = "plex";
const TOKEN_HEADER: &str = "X-Plex-Token";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "MediaContainer")]
    container: T,
}

#[derive(Debug, Deserialize)]
struct SectionList {
    #[serde(rename = "Directory", default)]
    directories: Vec<Section>,
}

#[derive(Debug, Deserialize)]
struct Section {
    key: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct MetadataList {
    #[serde(rename = "Metadata", default)]
    metadata: Vec<Metadata>,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    #[serde(rename = "ratingKey")]
    rating_key: String,
    title: String,
    year: Option<i32>,
}
impl From<Metadata> for LibraryEntry {
    fn from(m: Metadata) -> Self {
        LibraryEntry::new(m.rating_key, m.title, m.year)
    }
}

/// Library backed by a Plex Media Server.
///
/// Movies and shows live in separately named library sections. Section keys
/// are looked up by name on first use and remembered afterwards.
pub struct PlexLibrary {
    http: Client,
    base: Url,
    token: String,
    movie_section: String,
    show_section: String,
    keys: RwLock<HashMap<MediaType, String>>,
}

impl PlexLibrary {
    pub fn new(
        base_url: &str,
        token: impl Into<String>,
        movie_section: impl Into<String>,
        show_section: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            http: http::client(timeout)?,
            base: http::base_url(base_url)?,
            token: token.into(),
            movie_section: movie_section.into(),
            show_section: show_section.into(),
            keys: RwLock::new(HashMap::new()),
        })
    }

    fn section_name(&self, media_type: MediaType) -> &str {
        match media_type {
            MediaType::Movie => &self.movie_section,
            MediaType::Show => &self.show_section,
        }
    }

    /// Plex's numeric metadata type, needed when editing tags.
    fn metadata_type(media_type: MediaType) -> &'static str {
        match media_type {
            MediaType::Movie => "1",
            MediaType::Show => "2",
        }
    }

    async fn section_key(&self, media_type: MediaType) -> Result<String> {
        if let Some(key) = self.keys.read().await.get(&media_type) {
            return Ok(key.clone());
        }
        let url = http::join(&self.base, "library/sections")?;
        let response = self
            .http
            .get(url)
            .header(TOKEN_HEADER, &self.token)
            .header("Accept", "application/json")
            .send()
            .await
            .or_raise(|| ErrorKind::Network(NAME.to_string()))?;
        let response = http::expect_status(response, None).await?;
        let sections: Envelope<SectionList> = http::json(response, NAME).await?;
        let key = find_section(sections.container.directories, self.section_name(media_type))
            .ok_or_raise(|| ErrorKind::SectionNotFound(self.section_name(media_type).to_string()))?;
        self.keys.write().await.insert(media_type, key.clone());
        Ok(key)
    }
}

fn find_section(sections: Vec<Section>, name: &str) -> Option<String> {
    sections.into_iter().find(|s| s.title == name).map(|s| s.key)
}

#[async_trait]
impl LibraryService for PlexLibrary {
    fn name(&self) -> &str {
        NAME
    }

    #[instrument(skip(self), err(Debug))]
    async fn search(&self, media_type: MediaType, title: &str) -> Result<Vec<LibraryEntry>> {
        let key = self.section_key(media_type).await?;
        let url = http::join(&self.base, &format!("library/sections/{key}/all"))?;
        let response = self
            .http
            .get(url)
            .query(&[("title", title)])
            .header(TOKEN_HEADER, &self.token)
            .header("Accept", "application/json")
            .send()
            .await
            .or_raise(|| ErrorKind::Network(NAME.to_string()))?;
        let response = http::expect_status(response, None).await?;
        let results: Envelope<MetadataList> = http::json(response, NAME).await?;
        Ok(results.container.metadata.into_iter().map(LibraryEntry::from).collect())
    }

    #[instrument(skip(self, entry), fields(id = %entry.id), err(Debug))]
    async fn tag(&self, media_type: MediaType, entry: &LibraryEntry, collection: &str) -> Result<()> {
        let key = self.section_key(media_type).await?;
        let url = http::join(&self.base, &format!("library/sections/{key}/all"))?;
        let response = self
            .http
            .put(url)
            .query(&[
                ("type", Self::metadata_type(media_type)),
                ("id", entry.id.as_str()),
                ("collection[0].tag.tag", collection),
                ("collection.locked", "1"),
            ])
            .header(TOKEN_HEADER, &self.token)
            .send()
            .await
            .or_raise(|| ErrorKind::Network(NAME.to_string()))?;
        http::expect_status(response, None).await?;
        Ok(())
    }
}
