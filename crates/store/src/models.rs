//! Collection models.
//!
//! These types are both the in-memory representation held by the
//! [`Store`](crate::Store) and the records written to the snapshot document.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of media a collection tracks. Fixed when the collection is
/// created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Show,
}
impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Show => "show",
        }
    }
}
impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" | "movies" => Ok(Self::Movie),
            "show" | "shows" | "tv" => Ok(Self::Show),
            other => Err(format!("unknown media type: {other}")),
        }
    }
}

/// Identity of an item within a collection: lowercased title plus year.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    pub title: String,
    pub year: i32,
}
impl ItemKey {
    pub fn new(title: impl AsRef<str>, year: i32) -> Self {
        Self { title: title.as_ref().to_lowercase(), year }
    }
}
impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.year)
    }
}

/// A desired media item. Starts out pending (`found == false`) and becomes
/// found once a library entry has been matched and tagged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub title: String,
    pub year: i32,
    #[serde(default)]
    pub found: bool,
}
impl Item {
    pub fn new(title: impl Into<String>, year: i32) -> Self {
        Self { title: title.into(), year, found: false }
    }

    pub fn key(&self) -> ItemKey {
        ItemKey::new(&self.title, self.year)
    }

    pub fn is_pending(&self) -> bool {
        !self.found
    }
}
impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.year)
    }
}

/// A named, typed set of desired items. The name is the key it is stored
/// under and isn't repeated in the record itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(rename = "type")]
    pub media_type: MediaType,
    #[serde(default)]
    pub items: Vec<Item>,
}
impl Collection {
    pub fn new(media_type: MediaType) -> Self {
        Self { media_type, items: Vec::new() }
    }

    pub fn contains(&self, key: &ItemKey) -> bool {
        self.items.iter().any(|i| &i.key() == key)
    }

    pub fn found(&self) -> usize {
        self.items.iter().filter(|i| i.found).count()
    }
}

/// Summary row for status listings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionStatus {
    pub name: String,
    pub media_type: MediaType,
    pub found: usize,
    pub total: usize,
}
impl CollectionStatus {
    /// Whole-number percentage of found items, rounded down.
    pub fn percent(&self) -> usize {
        match self.total {
            0 => 0,
            total => self.found * 100 / total,
        }
    }
}

/// Snapshot of a collection's still-pending items, detached from the store
/// so it can be worked through without holding the lock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingCollection {
    pub name: String,
    pub media_type: MediaType,
    pub items: Vec<Item>,
}
