//! List discovery (public curated lists that can be imported as collections).

mod trakt;

pub use self::trakt::TraktDiscovery;
use crate::error::Result;
use async_trait::async_trait;
use marquee_store::MediaType;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub type DiscoveryHandle = Arc<dyn DiscoveryService + Send + Sync>;

/// Identifies a list on the discovery service: owner plus list id.
///
/// Rendered (and parsed) as `user|id`, the form the CLI accepts.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListRef {
    pub user: String,
    pub id: String,
}
impl ListRef {
    pub fn new(user: impl Into<String>, id: impl Into<String>) -> Self {
        Self { user: user.into(), id: id.into() }
    }
}
impl fmt::Display for ListRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.user, self.id)
    }
}
impl FromStr for ListRef {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().split_once('|') {
            Some((user, id)) if !user.is_empty() && !id.is_empty() && !id.contains('|') => {
                Ok(Self::new(user, id))
            },
            _ => Err(format!("expected USER|ID, got '{s}'")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListSummary {
    pub name: String,
    pub likes: u64,
    pub item_count: u64,
    pub list_ref: ListRef,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListItem {
    pub title: String,
    pub year: i32,
}
impl ListItem {
    pub fn new(title: impl Into<String>, year: i32) -> Self {
        Self { title: title.into(), year }
    }
}

#[async_trait]
pub trait DiscoveryService: Send + Sync {
    fn name(&self) -> &str;

    async fn search_lists(&self, query: &str) -> Result<Vec<ListSummary>>;

    /// Items of `media_type` on the list. Entries of the other media type,
    /// and entries missing a title or year, are left out.
    async fn list_items(&self, list: &ListRef, media_type: MediaType) -> Result<Vec<ListItem>>;
}
