//! In-memory service implementations for testing.
//!
//! Every mock records the calls made against it so that tests can assert on
//! what the engine asked for, not just on what came back.

use crate::acquisition::{AcquisitionService, Candidate};
use crate::discovery::{DiscoveryService, ListItem, ListRef, ListSummary};
use crate::error::{ErrorKind, Result};
use crate::http::{ERROR_BODY_LIMIT, truncate};
use crate::library::{LibraryEntry, LibraryService};
use async_trait::async_trait;
use exn::ResultExt;
use marquee_store::MediaType;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};

fn normalize(text: &str) -> String {
    text.chars().filter(|c| c.is_alphanumeric()).flat_map(char::to_lowercase).collect()
}

/// In-memory media library.
///
/// Search is a case-insensitive substring match ignoring punctuation, which
/// is roughly how a real media server behaves (`"Spider-Man"` finds
/// `"Spiderman"`).
///
/// # Examples
///
/// ```
/// use marquee_services::library::{LibraryEntry, LibraryService};
/// use marquee_services::mock::MockLibrary;
/// use marquee_store::MediaType;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let library = MockLibrary::default()
///     .with_entries(MediaType::Movie, [LibraryEntry::new("1", "Spiderman", 2002)]);
/// let results = library.search(MediaType::Movie, "Spider-Man").await?;
/// assert_eq!(results.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct MockLibrary {
    name: String,
    entries: HashMap<MediaType, Vec<LibraryEntry>>,
    failing_searches: HashSet<String>,
    failing_tags: HashSet<String>,
    gate: Option<Arc<Semaphore>>,
    searches: RwLock<Vec<(MediaType, String)>>,
    tags: RwLock<Vec<(String, String)>>,
}

impl MockLibrary {
    pub fn with_entries(mut self, media_type: MediaType, entries: impl IntoIterator<Item = LibraryEntry>) -> Self {
        self.entries.entry(media_type).or_default().extend(entries);
        self
    }

    /// Searches for `title` fail with a network error.
    pub fn failing_search(mut self, title: &str) -> Self {
        self.failing_searches.insert(normalize(title));
        self
    }

    /// Tagging the entry with `id` fails with a network error.
    pub fn failing_tag(mut self, id: impl Into<String>) -> Self {
        self.failing_tags.insert(id.into());
        self
    }

    /// Every search takes (and consumes) a permit from `gate` after being
    /// recorded, so a test can hold a pass in flight.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Searches made so far, in order.
    pub async fn searches(&self) -> Vec<(MediaType, String)> {
        self.searches.read().await.clone()
    }

    /// Successful tags so far as `(entry id, collection)`.
    pub async fn tags(&self) -> Vec<(String, String)> {
        self.tags.read().await.clone()
    }
}
impl Default for MockLibrary {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            entries: HashMap::new(),
            failing_searches: HashSet::new(),
            failing_tags: HashSet::new(),
            gate: None,
            searches: RwLock::new(Vec::new()),
            tags: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LibraryService for MockLibrary {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, media_type: MediaType, title: &str) -> Result<Vec<LibraryEntry>> {
        self.searches.write().await.push((media_type, title.to_string()));
        if let Some(gate) = &self.gate {
            gate.acquire().await.or_raise(|| ErrorKind::Network(self.name.clone()))?.forget();
        }
        let query = normalize(title);
        if self.failing_searches.contains(&query) {
            exn::bail!(ErrorKind::Network(self.name.clone()));
        }
        let Some(entries) = self.entries.get(&media_type) else {
            return Ok(Vec::new());
        };
        Ok(entries.iter().filter(|e| normalize(&e.title).contains(&query)).cloned().collect())
    }

    async fn tag(&self, _media_type: MediaType, entry: &LibraryEntry, collection: &str) -> Result<()> {
        if self.failing_tags.contains(&entry.id) {
            exn::bail!(ErrorKind::Network(self.name.clone()));
        }
        self.tags.write().await.push((entry.id.clone(), collection.to_string()));
        Ok(())
    }
}

/// In-memory acquisition service.
pub struct MockAcquisition {
    name: String,
    results: HashMap<String, Vec<Candidate>>,
    failing_lookups: bool,
    rejection: Option<(u16, String)>,
    lookups: RwLock<Vec<String>>,
    submissions: RwLock<Vec<Candidate>>,
}

impl MockAcquisition {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Candidates returned when looking up exactly `term`.
    pub fn with_results(mut self, term: impl Into<String>, candidates: impl IntoIterator<Item = Candidate>) -> Self {
        self.results.entry(term.into()).or_default().extend(candidates);
        self
    }

    /// Every lookup fails with a network error.
    pub fn failing_lookups(mut self) -> Self {
        self.failing_lookups = true;
        self
    }

    /// Every submission is answered with `status` instead of "created".
    pub fn rejecting(mut self, status: u16, body: impl Into<String>) -> Self {
        self.rejection = Some((status, body.into()));
        self
    }

    pub async fn lookups(&self) -> Vec<String> {
        self.lookups.read().await.clone()
    }

    /// Accepted submissions.
    pub async fn submissions(&self) -> Vec<Candidate> {
        self.submissions.read().await.clone()
    }
}
impl Default for MockAcquisition {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            results: HashMap::new(),
            failing_lookups: false,
            rejection: None,
            lookups: RwLock::new(Vec::new()),
            submissions: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AcquisitionService for MockAcquisition {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, term: &str) -> Result<Vec<Candidate>> {
        self.lookups.write().await.push(term.to_string());
        if self.failing_lookups {
            exn::bail!(ErrorKind::Network(self.name.clone()));
        }
        Ok(self.results.get(term).cloned().unwrap_or_default())
    }

    async fn submit(&self, candidate: &Candidate) -> Result<()> {
        if let Some((status, body)) = &self.rejection {
            exn::bail!(ErrorKind::Status { status: *status, body: truncate(body, ERROR_BODY_LIMIT) });
        }
        self.submissions.write().await.push(candidate.clone());
        Ok(())
    }
}

/// In-memory list discovery.
#[derive(Default)]
pub struct MockDiscovery {
    lists: Vec<ListSummary>,
    items: HashMap<ListRef, Vec<(MediaType, ListItem)>>,
}

impl MockDiscovery {
    pub fn with_list(
        mut self,
        summary: ListSummary,
        items: impl IntoIterator<Item = (MediaType, ListItem)>,
    ) -> Self {
        self.items.entry(summary.list_ref.clone()).or_default().extend(items);
        self.lists.push(summary);
        self
    }
}

#[async_trait]
impl DiscoveryService for MockDiscovery {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search_lists(&self, query: &str) -> Result<Vec<ListSummary>> {
        let query = normalize(query);
        Ok(self.lists.iter().filter(|l| normalize(&l.name).contains(&query)).cloned().collect())
    }

    async fn list_items(&self, list: &ListRef, media_type: MediaType) -> Result<Vec<ListItem>> {
        let Some(items) = self.items.get(list) else {
            exn::bail!(ErrorKind::Status { status: 404, body: format!("list {list} not found") });
        };
        Ok(items.iter().filter(|(t, _)| *t == media_type).map(|(_, item)| item.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ops::Deref;

    #[tokio::test]
    async fn test_library_search_ignores_case_and_punctuation() {
        let library = MockLibrary::default().with_entries(
            MediaType::Movie,
            [LibraryEntry::new("1", "Spiderman", 2002), LibraryEntry::new("2", "Alien", 1979)],
        );
        let results = library.search(MediaType::Movie, "SPIDER-MAN").await.unwrap();
        assert_eq!(results, vec![LibraryEntry::new("1", "Spiderman", 2002)]);
        assert!(library.search(MediaType::Show, "Alien").await.unwrap().is_empty());
        assert_eq!(library.searches().await.len(), 2);
    }

    #[tokio::test]
    async fn test_library_failures() {
        let library = MockLibrary::default().failing_search("Heat").failing_tag("7");
        let err = library.search(MediaType::Movie, "heat").await.unwrap_err();
        assert!(err.deref().is_retryable());
        let entry = LibraryEntry::new("7", "Heat", 1995);
        assert!(library.tag(MediaType::Movie, &entry, "Mann").await.is_err());
        assert!(library.tags().await.is_empty());
    }

    #[tokio::test]
    async fn test_library_gate_holds_search() {
        let gate = Arc::new(Semaphore::new(0));
        let library = Arc::new(MockLibrary::default().with_gate(Arc::clone(&gate)));
        let task = tokio::spawn({
            let library = Arc::clone(&library);
            async move { library.search(MediaType::Movie, "Heat").await }
        });
        while library.searches().await.is_empty() {
            tokio::task::yield_now().await;
        }
        assert!(!task.is_finished());
        gate.add_permits(1);
        assert!(task.await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_acquisition_records_calls() {
        let acquisition = MockAcquisition::default()
            .with_name("radarr")
            .with_results("Heat 1995", [Candidate::new("Heat", 1995)]);
        assert_eq!(acquisition.name(), "radarr");
        let candidates = acquisition.lookup("Heat 1995").await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert!(acquisition.lookup("Ronin 1998").await.unwrap().is_empty());
        acquisition.submit(&candidates[0]).await.unwrap();
        assert_eq!(acquisition.lookups().await, vec!["Heat 1995", "Ronin 1998"]);
        assert_eq!(acquisition.submissions().await, candidates);
    }

    #[tokio::test]
    async fn test_acquisition_rejection_truncates_body() {
        let acquisition = MockAcquisition::default().rejecting(400, "x".repeat(500));
        let err = acquisition.submit(&Candidate::new("Heat", 1995)).await.unwrap_err();
        let ErrorKind::Status { status, body } = err.deref() else {
            panic!("expected status error, got {err:?}");
        };
        assert_eq!(*status, 400);
        assert_eq!(body.len(), ERROR_BODY_LIMIT);
        assert!(acquisition.submissions().await.is_empty());
    }

    #[tokio::test]
    async fn test_discovery_filters_media_type() {
        let list_ref = ListRef::new("donxy", "1");
        let discovery = MockDiscovery::default().with_list(
            ListSummary { name: "Marvel".to_string(), likes: 1, item_count: 2, list_ref: list_ref.clone() },
            [(MediaType::Movie, ListItem::new("Iron Man", 2008)), (MediaType::Show, ListItem::new("Loki", 2021))],
        );
        assert_eq!(discovery.search_lists("marvel").await.unwrap().len(), 1);
        assert_eq!(
            discovery.list_items(&list_ref, MediaType::Show).await.unwrap(),
            vec![ListItem::new("Loki", 2021)]
        );
        assert!(discovery.list_items(&ListRef::new("x", "y"), MediaType::Movie).await.is_err());
    }
}
