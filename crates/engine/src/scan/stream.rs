use super::{ItemOutcome, Outcome, Pass, PassReport, ScanEvent, reconcile_item};
use crate::cancel::{CancelFlag, MonitorPermit};
use crate::context::Context;
use crate::dispatch::{DispatchSummary, dispatch};
use async_stream::stream;
use futures::{Stream, StreamExt};
use marquee_store::{Item, MediaType};
use tracing::{debug, info, warn};

/// Streams an ingestion pass over `items` (the items a merge just added to
/// `collection`).
///
/// Items are reconciled in order, checking `cancel` before each one and
/// skipping any that are no longer pending in the store. Items
/// that found no match, including those whose search failed, are then sent to
/// the acquisition service for `media_type`, unless the pass was cancelled or
/// no such service is configured.
pub fn ingest<'a>(
    ctx: &'a Context,
    collection: &'a str,
    media_type: MediaType,
    items: Vec<Item>,
    cancel: &'a CancelFlag,
) -> impl Stream<Item = ScanEvent> + Send + 'a {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        let mut report = PassReport::new(Pass::Ingest);
        yield ScanEvent::Started { pass: Pass::Ingest, collection: Some(collection.to_string()), items: items.len() };

        let mut misses = Vec::new();
        for item in items {
            if cancel.is_cancelled() {
                report.outcome = Outcome::Cancelled;
                break;
            }
            if !ctx.store.is_pending(collection, &item.key()).await {
                debug!(collection, item = %item, "No longer pending; skipping");
                continue;
            }
            let outcome = reconcile_item(ctx, collection, media_type, &item).await;
            report.record(&outcome);
            if matches!(outcome, ItemOutcome::Missing | ItemOutcome::SearchFailed(_)) {
                misses.push(item.clone());
            }
            yield ScanEvent::Reconciled { collection: collection.to_string(), item, outcome };
        }

        if !misses.is_empty() && !report.is_cancelled() {
            match ctx.acquisition(media_type) {
                Some(service) => {
                    let mut summary = DispatchSummary::default();
                    let mut results = Box::pin(dispatch(service.as_ref(), media_type, misses, cancel));
                    while let Some((item, result)) = results.next().await {
                        summary.record(&result);
                        yield ScanEvent::Dispatched { collection: collection.to_string(), item, result };
                    }
                    if cancel.is_cancelled() {
                        report.outcome = Outcome::Cancelled;
                    }
                    report.dispatch = Some(summary);
                },
                None => {
                    info!(%media_type, misses = misses.len(), "No acquisition service configured; misses stay pending");
                },
            }
        }

        info!(collection, %report, "Pass finished");
        yield ScanEvent::Finished(report);
    })
}

/// Streams a monitor pass over the pending items of `target` (or of every
/// collection when `None`).
///
/// Items found since the pending list was taken are skipped. The `permit`
/// is held until the stream finishes or is dropped.
pub fn monitor<'a>(
    ctx: &'a Context,
    target: Option<&'a str>,
    permit: MonitorPermit,
    cancel: &'a CancelFlag,
) -> impl Stream<Item = ScanEvent> + Send + 'a {
    stream!({
        let _permit = permit;
        let mut report = PassReport::new(Pass::Monitor);

        let unknown = match target {
            Some(name) => ctx.store.collection(name).await.is_none(),
            None => false,
        };
        if unknown {
            warn!(collection = target, "No such collection; nothing to scan");
        }
        let pending = ctx.store.pending(target).await;
        let total = pending.iter().map(|c| c.items.len()).sum();
        yield ScanEvent::Started { pass: Pass::Monitor, collection: target.map(str::to_string), items: total };

        'collections: for collection in pending {
            for item in collection.items {
                if cancel.is_cancelled() {
                    report.outcome = Outcome::Cancelled;
                    break 'collections;
                }
                if !ctx.store.is_pending(&collection.name, &item.key()).await {
                    debug!(collection = %collection.name, item = %item, "No longer pending; skipping");
                    continue;
                }
                let outcome = reconcile_item(ctx, &collection.name, collection.media_type, &item).await;
                report.record(&outcome);
                yield ScanEvent::Reconciled { collection: collection.name.clone(), item, outcome };
            }
        }

        info!(%report, "Pass finished");
        yield ScanEvent::Finished(report);
    })
}
