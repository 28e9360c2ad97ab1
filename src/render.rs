//! Turning engine events and store listings into terminal lines.

use marquee_engine::dispatch::DispatchResult;
use marquee_engine::matcher::MatchRule;
use marquee_engine::{ItemOutcome, ScanEvent};
use marquee_services::ListSummary;
use marquee_store::{Collection, CollectionStatus};
use std::fmt::Write;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

pub fn event(event: &ScanEvent) -> String {
    match event {
        ScanEvent::Started { pass, collection: Some(collection), items } => {
            format!("Starting {pass} pass over '{collection}' ({items} items)")
        },
        ScanEvent::Started { pass, collection: None, items } => {
            format!("Starting {pass} pass over all collections ({items} pending items)")
        },
        ScanEvent::Reconciled { collection, item, outcome } => {
            let outcome = match outcome {
                ItemOutcome::Found(MatchRule::Exact) => "found".to_string(),
                ItemOutcome::Found(MatchRule::TitleOnly) => "found (title only)".to_string(),
                ItemOutcome::Found(MatchRule::Fuzzy(score)) => format!("found (fuzzy {score:.2})"),
                ItemOutcome::Missing => "missing".to_string(),
                ItemOutcome::SearchFailed(reason) => format!("search failed: {reason}"),
                ItemOutcome::TagFailed(reason) => format!("tag failed: {reason}"),
            };
            format!("  [{collection}] {item}: {outcome}")
        },
        ScanEvent::Dispatched { collection, item, result } => {
            let result = match result {
                DispatchResult::Added(candidate) => format!("added '{}'", candidate.title),
                DispatchResult::AlreadyTracked(candidate) => format!("already tracked as '{}'", candidate.title),
                DispatchResult::NoCandidates => "no candidates".to_string(),
                DispatchResult::LookupFailed(reason) => format!("lookup failed: {reason}"),
                DispatchResult::Rejected { status: Some(status), body } => format!("rejected ({status}): {body}"),
                DispatchResult::Rejected { status: None, body } => format!("rejected: {body}"),
            };
            format!("  [{collection}] {item} -> {result}")
        },
        ScanEvent::Finished(report) => report.to_string(),
    }
}

pub fn status(rows: &[CollectionStatus]) -> String {
    if rows.is_empty() {
        return "No collections\n".to_string();
    }
    let width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for row in rows {
        let _ = writeln!(
            out,
            "{:<width$}  {:<5}  {:>3}%  ({}/{})",
            row.name,
            row.media_type,
            row.percent(),
            row.found,
            row.total
        );
    }
    out
}

pub fn collection(name: &str, collection: &Collection) -> String {
    let mut out = format!("{name} ({}, {}/{} found)\n", collection.media_type, collection.found(), collection.items.len());
    for item in &collection.items {
        let state = if item.found { "Complete" } else { "Pending" };
        let _ = writeln!(out, "  {item}  {state}");
    }
    out
}

pub fn lists(lists: &[ListSummary]) -> String {
    if lists.is_empty() {
        return "No lists found\n".to_string();
    }
    let mut out = String::new();
    for list in lists {
        let _ = writeln!(out, "{}  ({} items, {} likes)  {}", list.name, list.item_count, list.likes, list.list_ref);
    }
    out
}

/// Prints events until a pass finishes or the channel closes.
pub async fn follow(mut events: Receiver<ScanEvent>, until_finished: bool) {
    loop {
        match events.recv().await {
            Ok(ev) => {
                println!("{}", event(&ev));
                if until_finished && matches!(ev, ScanEvent::Finished(_)) {
                    break;
                }
            },
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Output fell behind, some events were not shown"),
            Err(RecvError::Closed) => break,
        }
    }
}
