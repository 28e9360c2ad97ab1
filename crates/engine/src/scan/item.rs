use super::ItemOutcome;
use crate::context::Context;
use crate::matcher::find_match;
use marquee_store::{Item, MediaType};
use std::ops::Deref;
use tracing::{info, warn};

/// Looks `item` up in the library and, on a match, tags the entry with the
/// collection name and marks the item found.
///
/// The store lock is only taken for the final state change, never around the
/// library calls.
pub async fn reconcile_item(ctx: &Context, collection: &str, media_type: MediaType, item: &Item) -> ItemOutcome {
    let entries = match ctx.library.search(media_type, &item.title).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(collection, item = %item, error = %e.deref(), "Library search failed");
            return ItemOutcome::SearchFailed(e.deref().to_string());
        },
    };
    let Some(found) = find_match(&item.title, item.year, &entries) else {
        return ItemOutcome::Missing;
    };
    if let Err(e) = ctx.library.tag(media_type, found.entry, collection).await {
        warn!(collection, item = %item, error = %e.deref(), "Tagging failed");
        return ItemOutcome::TagFailed(e.deref().to_string());
    }
    ctx.store.mark_found(collection, &item.key(), true).await;
    info!(collection, item = %item, "Found");
    ItemOutcome::Found(found.rule)
}
