//! Handing missing items to the acquisition services.
//!
//! For every miss: look the item up, pick a candidate (the one from the same
//! year, else the first), skip it if the service already tracks it, else
//! submit it with an immediate search. Each item stands alone; a failure is
//! logged and the dispatcher moves on.

use crate::cancel::CancelFlag;
use async_stream::stream;
use futures::Stream;
use marquee_services::error::ErrorKind as ServiceErrorKind;
use marquee_services::{AcquisitionService, Candidate};
use marquee_store::{Item, MediaType};
use std::ops::Deref;
use tracing::{info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchResult {
    /// Submitted and accepted (created).
    Added(Candidate),
    /// The chosen candidate is already tracked by the service.
    AlreadyTracked(Candidate),
    /// The lookup returned nothing.
    NoCandidates,
    LookupFailed(String),
    /// The service didn't create the candidate. `status` is `None` when no
    /// response came back at all.
    Rejected { status: Option<u16>, body: String },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub added: usize,
    pub already_tracked: usize,
    pub no_candidates: usize,
    pub failed: usize,
}
impl DispatchSummary {
    pub fn record(&mut self, result: &DispatchResult) {
        match result {
            DispatchResult::Added(_) => self.added += 1,
            DispatchResult::AlreadyTracked(_) => self.already_tracked += 1,
            DispatchResult::NoCandidates => self.no_candidates += 1,
            DispatchResult::LookupFailed(_) | DispatchResult::Rejected { .. } => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.added + self.already_tracked + self.no_candidates + self.failed
    }
}

/// Search term sent to the service. Movie lookups include the year, show
/// lookups work better on the title alone.
pub fn lookup_term(media_type: MediaType, item: &Item) -> String {
    match media_type {
        MediaType::Movie => format!("{} {}", item.title, item.year),
        MediaType::Show => item.title.clone(),
    }
}

pub fn choose_candidate(candidates: &[Candidate], year: i32) -> Option<&Candidate> {
    candidates.iter().find(|c| c.year == Some(year)).or_else(|| candidates.first())
}

pub async fn dispatch_item(service: &dyn AcquisitionService, media_type: MediaType, item: &Item) -> DispatchResult {
    let term = lookup_term(media_type, item);
    let candidates = match service.lookup(&term).await {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!(service = service.name(), item = %item, error = %e.deref(), "Lookup failed");
            return DispatchResult::LookupFailed(e.deref().to_string());
        },
    };
    let Some(candidate) = choose_candidate(&candidates, item.year) else {
        info!(service = service.name(), item = %item, "No lookup results");
        return DispatchResult::NoCandidates;
    };
    if candidate.is_tracked() {
        info!(service = service.name(), item = %item, "Already tracked; skipping");
        return DispatchResult::AlreadyTracked(candidate.clone());
    }
    match service.submit(candidate).await {
        Ok(()) => {
            info!(service = service.name(), item = %item, "Added");
            DispatchResult::Added(candidate.clone())
        },
        Err(e) => {
            let (status, body) = match e.deref() {
                ServiceErrorKind::Status { status, body } => (Some(*status), body.clone()),
                other => (None, other.to_string()),
            };
            warn!(service = service.name(), item = %item, status = ?status, body = %body, "Submission rejected");
            DispatchResult::Rejected { status, body }
        },
    }
}

/// Streams one result per item, in order. Stops early (without an event)
/// once `cancel` is set; check it afterwards to tell the difference.
pub fn dispatch<'a>(
    service: &'a dyn AcquisitionService,
    media_type: MediaType,
    items: Vec<Item>,
    cancel: &'a CancelFlag,
) -> impl Stream<Item = (Item, DispatchResult)> + Send + 'a {
    stream! {
        info!(service = service.name(), items = items.len(), "Sending missing items to acquisition");
        for item in items {
            if cancel.is_cancelled() {
                break;
            }
            let result = dispatch_item(service, media_type, &item).await;
            yield (item, result);
        }
    }
}
