//! Starting, stopping and observing passes.
//!
//! The [`Coordinator`] is the front door for anything driving the engine. It
//! merges ingested items, spawns passes as tokio tasks and republishes their
//! events on a broadcast channel. Front ends subscribe and render; nothing
//! in the engine ever calls back into them.

use crate::cancel::{CancelFlag, MonitorGate};
use crate::context::Context;
use crate::error::{ErrorKind, Result};
use crate::ingest::{parse_items, render_ingest_text};
use crate::scan::{self, Pass, PassReport, ScanEvent};
use exn::ResultExt;
use futures::{Stream, StreamExt};
use marquee_services::{DiscoveryService, ListRef};
use marquee_store::{CollectionStatus, Item, MediaType};
use std::ops::Deref;
use std::pin::pin;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Events a subscriber can fall behind by before it starts missing some.
pub const EVENT_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct Coordinator {
    ctx: Context,
    events: broadcast::Sender<ScanEvent>,
    ingest_cancel: CancelFlag,
    monitor_cancel: CancelFlag,
    gate: MonitorGate,
}

impl Coordinator {
    pub fn new(ctx: Context) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            ctx,
            events,
            ingest_cancel: CancelFlag::new(),
            monitor_cancel: CancelFlag::new(),
            gate: MonitorGate::new(),
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Events of every pass started after subscribing.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.events.subscribe()
    }

    pub fn ingest_token(&self) -> &CancelFlag {
        &self.ingest_cancel
    }

    pub fn monitor_token(&self) -> &CancelFlag {
        &self.monitor_cancel
    }

    /// Stops the running ingestion pass (and its dispatch) after the current
    /// item. Monitor passes are unaffected.
    pub fn cancel_ingest(&self) {
        self.ingest_cancel.cancel();
    }

    /// Stops the running monitor pass after the current item. Ingestion
    /// passes are unaffected.
    pub fn cancel_monitor(&self) {
        self.monitor_cancel.cancel();
    }

    pub fn is_monitor_running(&self) -> bool {
        self.gate.is_active()
    }

    /// Merges `items` into `collection` and spawns an ingestion pass over the
    /// ones that were new.
    ///
    /// # Errors
    /// - [`ErrorKind::InvalidInput`] for a blank name or no items.
    /// - [`ErrorKind::MediaTypeMismatch`] if the collection holds the other
    ///   media type. Nothing is merged and no pass starts.
    pub async fn start_ingest(
        &self,
        collection: &str,
        media_type: MediaType,
        items: Vec<Item>,
    ) -> Result<JoinHandle<PassReport>> {
        let collection = collection.trim();
        if collection.is_empty() {
            exn::bail!(ErrorKind::InvalidInput("collection name is empty".to_string()));
        }
        if items.is_empty() {
            exn::bail!(ErrorKind::InvalidInput("no valid items".to_string()));
        }
        let added = self.ctx.store.merge(collection, media_type, items).await.map_err(ErrorKind::store)?;
        if added.is_empty() {
            info!(collection, "No new items to process");
        }

        self.ingest_cancel.reset();
        let ctx = self.ctx.clone();
        let cancel = self.ingest_cancel.clone();
        let events = self.events.clone();
        let collection = collection.to_string();
        Ok(tokio::spawn(async move {
            let pass = scan::ingest(&ctx, &collection, media_type, added, &cancel);
            forward(Pass::Ingest, pass, &events).await
        }))
    }

    /// Parses ingestion text, then behaves like [`start_ingest`](Self::start_ingest).
    /// Malformed lines are logged and skipped.
    pub async fn ingest_text(
        &self,
        collection: &str,
        media_type: MediaType,
        text: &str,
    ) -> Result<JoinHandle<PassReport>> {
        let parsed = parse_items(text);
        if !parsed.skipped.is_empty() {
            info!(skipped = parsed.skipped.len(), "Some lines were skipped");
        }
        self.start_ingest(collection, media_type, parsed.items).await
    }

    /// Fetches a discovery list and ingests its items of `media_type` into
    /// `collection`, going through the same text format as manual input.
    pub async fn import_list(
        &self,
        discovery: &dyn DiscoveryService,
        list: &ListRef,
        media_type: MediaType,
        collection: &str,
    ) -> Result<JoinHandle<PassReport>> {
        let items = discovery.list_items(list, media_type).await.or_raise(|| ErrorKind::Discovery)?;
        info!(list = %list, items = items.len(), "Importing list");
        self.ingest_text(collection, media_type, &render_ingest_text(&items)).await
    }

    /// Spawns a monitor pass over every collection (`None`) or just one.
    ///
    /// # Errors
    /// [`ErrorKind::ConcurrencyConflict`] if a monitor pass is already
    /// running. The request is rejected, not queued.
    pub fn start_monitor(&self, target: Option<&str>) -> Result<JoinHandle<PassReport>> {
        let Some(permit) = self.gate.try_acquire() else {
            warn!(collection = target, "A monitor pass is already running; request rejected");
            exn::bail!(ErrorKind::ConcurrencyConflict);
        };
        self.monitor_cancel.reset();
        let ctx = self.ctx.clone();
        let cancel = self.monitor_cancel.clone();
        let events = self.events.clone();
        let target = target.map(str::to_string);
        Ok(tokio::spawn(async move {
            let pass = scan::monitor(&ctx, target.as_deref(), permit, &cancel);
            forward(Pass::Monitor, pass, &events).await
        }))
    }

    /// Forced monitor pass over a single collection.
    pub fn rescan(&self, collection: &str) -> Result<JoinHandle<PassReport>> {
        self.start_monitor(Some(collection))
    }

    /// Attempts a monitor pass over every collection every `every`, starting
    /// immediately. Ticks that find a pass already running are skipped.
    /// Abort the returned handle to stop.
    pub fn spawn_auto_scan(&self, every: Duration) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            let mut ticker = time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match coordinator.start_monitor(None) {
                    Ok(pass) => {
                        if let Err(e) = pass.await {
                            debug!(error = %e, "Auto-scan pass did not finish");
                        }
                    },
                    Err(e) => info!(reason = %e.deref(), "Skipping auto-scan"),
                }
            }
        })
    }

    pub async fn status(&self) -> Vec<CollectionStatus> {
        self.ctx.store.status().await
    }

    /// Stops tracking a collection. Returns `false` if there was none.
    pub async fn delete(&self, collection: &str) -> bool {
        self.ctx.store.delete(collection).await.is_some()
    }
}

/// Drives a pass to completion, publishing every event. Sending only fails
/// when nobody is subscribed, which is fine.
async fn forward(pass: Pass, stream: impl Stream<Item = ScanEvent>, events: &broadcast::Sender<ScanEvent>) -> PassReport {
    let mut stream = pin!(stream);
    let mut report = PassReport::new(pass);
    while let Some(event) = stream.next().await {
        if let ScanEvent::Finished(finished) = &event {
            report = finished.clone();
        }
        let _ = events.send(event);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchResult;
    use crate::scan::{ItemOutcome, Outcome};
    use crate::testing::Logs;
    use marquee_services::mock::{MockAcquisition, MockDiscovery, MockLibrary};
    use marquee_services::{Candidate, LibraryEntry, ListItem, ListSummary};
    use marquee_store::Store;
    use std::sync::Arc;
    use tokio::sync::Semaphore;

    fn coordinator(library: Arc<MockLibrary>) -> Coordinator {
        Coordinator::new(Context::new(Arc::new(Store::in_memory()), library))
    }

    async fn wait_for_searches(library: &MockLibrary, count: usize) {
        while library.searches().await.len() < count {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_end_to_end_ingest() {
        let library =
            Arc::new(MockLibrary::default().with_entries(MediaType::Movie, [LibraryEntry::new("1", "The Matrix", 1999)]));
        let movies = Arc::new(
            MockAcquisition::default()
                .with_results("Inception 2010", [Candidate::new("Inception", 2010).with_external_id(27205)]),
        );
        let coordinator =
            Coordinator::new(Context::new(Arc::new(Store::in_memory()), library.clone()).with_movies(movies.clone()));
        let mut events = coordinator.subscribe();

        let pass = coordinator
            .ingest_text("Favourites", MediaType::Movie, "The Matrix (1999)\nBadLine\nInception (2010)")
            .await
            .unwrap();
        let report = pass.await.unwrap();

        assert_eq!((report.scanned, report.found, report.missed), (2, 1, 1));
        assert_eq!(report.dispatch.map(|d| d.added), Some(1));
        let collection = coordinator.context().store.collection("Favourites").await.unwrap();
        assert_eq!(collection.items.len(), 2);
        assert!(collection.items[0].found);
        assert!(!collection.items[1].found);
        assert_eq!(library.tags().await, vec![("1".to_string(), "Favourites".to_string())]);
        assert_eq!(movies.submissions().await.len(), 1);

        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            received.push(event);
        }
        assert!(matches!(received.first(), Some(ScanEvent::Started { pass: Pass::Ingest, .. })));
        assert!(received.iter().any(|e| matches!(e, ScanEvent::Dispatched { result: DispatchResult::Added(_), .. })));
        assert!(matches!(received.last(), Some(ScanEvent::Finished(_))));
    }

    #[tokio::test]
    async fn test_ingest_merges_idempotently() {
        let coordinator = coordinator(Arc::new(MockLibrary::default()));
        let items = vec![Item::new("Heat", 1995), Item::new("Ronin", 1998)];
        coordinator.start_ingest("Mann", MediaType::Movie, items.clone()).await.unwrap().await.unwrap();
        let report = coordinator.start_ingest("Mann", MediaType::Movie, items).await.unwrap().await.unwrap();
        assert_eq!(report.scanned, 0);
        assert_eq!(coordinator.context().store.collection("Mann").await.unwrap().items.len(), 2);
    }

    #[tokio::test]
    async fn test_media_type_mismatch_is_rejected_synchronously() {
        let coordinator = coordinator(Arc::new(MockLibrary::default()));
        coordinator.start_ingest("Mann", MediaType::Movie, vec![Item::new("Heat", 1995)]).await.unwrap();
        let err = coordinator.start_ingest("Mann", MediaType::Show, vec![Item::new("Heat", 1995)]).await.unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::MediaTypeMismatch(_)));
        let collection = coordinator.context().store.collection("Mann").await.unwrap();
        assert_eq!(collection.media_type, MediaType::Movie);
        assert_eq!(collection.items.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_input() {
        let coordinator = coordinator(Arc::new(MockLibrary::default()));
        let err = coordinator.start_ingest("  ", MediaType::Movie, vec![Item::new("Heat", 1995)]).await.unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::InvalidInput(_)));
        let err = coordinator.ingest_text("Mann", MediaType::Movie, "BadLine\n").await.unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::InvalidInput(_)));
        assert!(coordinator.status().await.is_empty());
    }

    #[tokio::test]
    async fn test_monitor_passes_are_mutually_exclusive() {
        let gate = Arc::new(Semaphore::new(0));
        let library = Arc::new(MockLibrary::default().with_gate(gate.clone()));
        let coordinator = coordinator(library.clone());
        coordinator.context().store.merge("Mann", MediaType::Movie, vec![Item::new("Heat", 1995)]).await.unwrap();

        let first = coordinator.start_monitor(None).unwrap();
        wait_for_searches(&library, 1).await;
        assert!(coordinator.is_monitor_running());
        let (err, logs) = Logs::capture(|| coordinator.rescan("Mann").unwrap_err());
        assert!(matches!(err.deref(), ErrorKind::ConcurrencyConflict));
        assert!(logs.contains("A monitor pass is already running"), "{logs}");
        assert!(logs.contains("collection=\"Mann\""), "{logs}");

        gate.add_permits(1);
        first.await.unwrap();
        assert!(!coordinator.is_monitor_running());
        gate.add_permits(1);
        coordinator.start_monitor(None).unwrap().await.unwrap();
    }

    #[tokio::test]
    async fn test_ingest_runs_alongside_monitor() {
        let gate = Arc::new(Semaphore::new(0));
        let library = Arc::new(MockLibrary::default().with_gate(gate.clone()));
        let coordinator = coordinator(library.clone());
        coordinator.context().store.merge("Mann", MediaType::Movie, vec![Item::new("Heat", 1995)]).await.unwrap();

        let monitor = coordinator.start_monitor(None).unwrap();
        wait_for_searches(&library, 1).await;
        let ingest = coordinator.start_ingest("Scott", MediaType::Movie, vec![Item::new("Alien", 1979)]).await.unwrap();
        wait_for_searches(&library, 2).await;

        gate.add_permits(2);
        assert_eq!(monitor.await.unwrap().scanned, 1);
        assert_eq!(ingest.await.unwrap().scanned, 1);
    }

    #[tokio::test]
    async fn test_cancellation_isolation() {
        let gate = Arc::new(Semaphore::new(0));
        let library = Arc::new(
            MockLibrary::default()
                .with_entries(MediaType::Movie, [LibraryEntry::new("1", "Heat", 1995), LibraryEntry::new("2", "Alien", 1979)])
                .with_gate(gate.clone()),
        );
        let coordinator = coordinator(library.clone());
        coordinator.context().store.merge("Mann", MediaType::Movie, vec![Item::new("Heat", 1995)]).await.unwrap();

        let monitor = coordinator.start_monitor(None).unwrap();
        wait_for_searches(&library, 1).await;
        let items = vec![Item::new("Alien", 1979), Item::new("Aliens", 1986)];
        let ingest = coordinator.start_ingest("Scott", MediaType::Movie, items).await.unwrap();
        wait_for_searches(&library, 2).await;

        coordinator.cancel_ingest();
        assert!(!coordinator.monitor_token().is_cancelled());
        gate.add_permits(2);

        let monitor = monitor.await.unwrap();
        assert_eq!(monitor.outcome, Outcome::Completed);
        assert_eq!(monitor.found, 1);
        let ingest = ingest.await.unwrap();
        assert_eq!(ingest.outcome, Outcome::Cancelled);
        assert_eq!(ingest.scanned, 1);
        let scott = coordinator.context().store.collection("Scott").await.unwrap();
        assert!(scott.items[0].found);
        assert!(!scott.items[1].found);
    }

    #[tokio::test]
    async fn test_tokens_reset_on_start() {
        let coordinator = coordinator(Arc::new(MockLibrary::default()));
        coordinator.cancel_monitor();
        coordinator.cancel_ingest();
        let report = coordinator.start_monitor(None).unwrap().await.unwrap();
        assert_eq!(report.outcome, Outcome::Completed);
        assert!(coordinator.ingest_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_import_list() {
        let library = Arc::new(MockLibrary::default().with_entries(MediaType::Show, [LibraryEntry::new("9", "Loki", 2021)]));
        let coordinator = coordinator(library);
        let list_ref = ListRef::new("donxy", "1");
        let discovery = MockDiscovery::default().with_list(
            ListSummary { name: "Marvel".to_string(), likes: 0, item_count: 2, list_ref: list_ref.clone() },
            [(MediaType::Movie, ListItem::new("Iron Man", 2008)), (MediaType::Show, ListItem::new("Loki", 2021))],
        );

        let report =
            coordinator.import_list(&discovery, &list_ref, MediaType::Show, "Marvel").await.unwrap().await.unwrap();

        assert_eq!((report.scanned, report.found), (1, 1));
        let err = coordinator.import_list(&discovery, &ListRef::new("x", "y"), MediaType::Show, "X").await.unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::Discovery));
    }

    #[tokio::test]
    async fn test_delete() {
        let coordinator = coordinator(Arc::new(MockLibrary::default()));
        coordinator.start_ingest("Mann", MediaType::Movie, vec![Item::new("Heat", 1995)]).await.unwrap().await.unwrap();
        assert!(coordinator.delete("Mann").await);
        assert!(!coordinator.delete("Mann").await);
        assert!(coordinator.status().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_scan_finds_new_arrivals() {
        let library = Arc::new(MockLibrary::default().with_entries(MediaType::Movie, [LibraryEntry::new("1", "Heat", 1995)]));
        let coordinator = coordinator(library);
        coordinator.context().store.merge("Mann", MediaType::Movie, vec![Item::new("Heat", 1995)]).await.unwrap();
        let mut events = coordinator.subscribe();

        let auto = coordinator.spawn_auto_scan(Duration::from_secs(600));
        let found = loop {
            match events.recv().await.unwrap() {
                ScanEvent::Reconciled { outcome, .. } => break outcome,
                _ => continue,
            }
        };
        auto.abort();

        assert!(matches!(found, ItemOutcome::Found(_)));
        assert_eq!(coordinator.status().await[0].percent(), 100);
    }
}
