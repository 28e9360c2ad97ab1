//! Trakt list search and list contents.

use super::{DiscoveryService, ListItem, ListRef, ListSummary};
use crate::error::{ErrorKind, Result};
use crate::http;
use async_trait::async_trait;
use exn::ResultExt;
use marquee_store::MediaType;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

const NAME: &str = "trakt";
const API_VERSION: &str = "2";

#[derive(Debug, Deserialize)]
struct SearchResult {
    list: Option<TraktList>,
}

#[derive(Debug, Deserialize)]
struct TraktList {
    name: Option<String>,
    #[serde(default)]
    likes: u64,
    #[serde(default)]
    item_count: u64,
    ids: ListIds,
    user: TraktUser,
}

#[derive(Debug, Deserialize)]
struct ListIds {
    trakt: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TraktUser {
    ids: UserIds,
}

#[derive(Debug, Deserialize)]
struct UserIds {
    slug: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(rename = "type")]
    kind: String,
    movie: Option<Media>,
    show: Option<Media>,
}

#[derive(Debug, Deserialize)]
struct Media {
    title: Option<String>,
    year: Option<i32>,
}

fn summaries(results: Vec<SearchResult>) -> Vec<ListSummary> {
    results
        .into_iter()
        .filter_map(|r| {
            let list = r.list?;
            Some(ListSummary {
                name: list.name.unwrap_or_default(),
                likes: list.likes,
                item_count: list.item_count,
                list_ref: ListRef::new(list.user.ids.slug?, list.ids.trakt?.to_string()),
            })
        })
        .collect()
}

fn items(entries: Vec<Entry>, media_type: MediaType) -> Vec<ListItem> {
    entries
        .into_iter()
        .filter(|e| e.kind == media_type.as_str())
        .filter_map(|e| {
            let media = match media_type {
                MediaType::Movie => e.movie,
                MediaType::Show => e.show,
            }?;
            let title = media.title.filter(|t| !t.trim().is_empty())?;
            let year = media.year.filter(|y| *y != 0)?;
            Some(ListItem::new(title, year))
        })
        .collect()
}

pub struct TraktDiscovery {
    http: Client,
    base: Url,
    client_id: String,
}

impl TraktDiscovery {
    pub fn new(base_url: &str, client_id: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self { http: http::client(timeout)?, base: http::base_url(base_url)?, client_id: client_id.into() })
    }

    fn get(&self, url: Url) -> RequestBuilder {
        self.http
            .get(url)
            .header("Content-Type", "application/json")
            .header("trakt-api-version", API_VERSION)
            .header("trakt-api-key", &self.client_id)
    }
}

#[async_trait]
impl DiscoveryService for TraktDiscovery {
    fn name(&self) -> &str {
        NAME
    }

    #[instrument(skip(self), err(Debug))]
    async fn search_lists(&self, query: &str) -> Result<Vec<ListSummary>> {
        let url = http::join(&self.base, "search/list")?;
        let response = self
            .get(url)
            .query(&[("query", query)])
            .send()
            .await
            .or_raise(|| ErrorKind::Network(NAME.to_string()))?;
        let response = http::expect_status(response, Some(StatusCode::OK)).await?;
        let results: Vec<SearchResult> = http::json(response, NAME).await?;
        Ok(summaries(results))
    }

    #[instrument(skip(self, list), fields(list = %list), err(Debug))]
    async fn list_items(&self, list: &ListRef, media_type: MediaType) -> Result<Vec<ListItem>> {
        let url = http::join(&self.base, &format!("users/{}/lists/{}/items", list.user, list.id))?;
        let response = self.get(url).send().await.or_raise(|| ErrorKind::Network(NAME.to_string()))?;
        let response = http::expect_status(response, Some(StatusCode::OK)).await?;
        let entries: Vec<Entry> = http::json(response, NAME).await?;
        Ok(items(entries, media_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH: &str = r#"[
        {"type":"list","score":42.1,"list":{
            "name":"Marvel Cinematic Universe","likes":812,"item_count":33,
            "ids":{"trakt":1248149,"slug":"mcu"},
            "user":{"username":"Donxy","ids":{"slug":"donxy"}}
        }},
        {"type":"list","score":3.0,"list":{
            "name":"Broken","ids":{"trakt":null},"user":{"ids":{"slug":"nobody"}}
        }}
    ]"#;

    const ITEMS: &str = r#"[
        {"rank":1,"type":"movie","movie":{"title":"Iron Man","year":2008,"ids":{"trakt":1}}},
        {"rank":2,"type":"show","show":{"title":"Loki","year":2021}},
        {"rank":3,"type":"movie","movie":{"title":"Untitled Marvel Project","year":null}},
        {"rank":4,"type":"movie","movie":{"title":"","year":2030}},
        {"rank":5,"type":"episode","episode":{"title":"Glorious Purpose"}},
        {"rank":6,"type":"movie","movie":{"title":"The Avengers","year":2012}}
    ]"#;

    #[test]
    fn test_search_results() {
        let results: Vec<SearchResult> = serde_json::from_str(SEARCH).unwrap();
        assert_eq!(
            summaries(results),
            vec![ListSummary {
                name: "Marvel Cinematic Universe".to_string(),
                likes: 812,
                item_count: 33,
                list_ref: ListRef::new("donxy", "1248149"),
            }]
        );
    }

    #[test]
    fn test_movie_items() {
        let entries: Vec<Entry> = serde_json::from_str(ITEMS).unwrap();
        assert_eq!(
            items(entries, MediaType::Movie),
            vec![ListItem::new("Iron Man", 2008), ListItem::new("The Avengers", 2012)]
        );
    }

    #[test]
    fn test_show_items() {
        let entries: Vec<Entry> = serde_json::from_str(ITEMS).unwrap();
        assert_eq!(items(entries, MediaType::Show), vec![ListItem::new("Loki", 2021)]);
    }
}
