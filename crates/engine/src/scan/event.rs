use crate::dispatch::{DispatchResult, DispatchSummary};
use crate::matcher::MatchRule;
use derive_more::Display;
use marquee_store::Item;
use std::fmt;

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum Pass {
    #[display("ingestion")]
    Ingest,
    #[display("monitor")]
    Monitor,
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum Outcome {
    #[display("completed")]
    Completed,
    #[display("cancelled")]
    Cancelled,
}

/// What happened to one item during a pass.
#[derive(Clone, Debug, PartialEq)]
pub enum ItemOutcome {
    /// Matched, tagged, and now marked found.
    Found(MatchRule),
    /// Nothing in the library matched.
    Missing,
    /// The library search itself failed; the item stays pending.
    SearchFailed(String),
    /// Matched but tagging failed; the item stays pending and isn't
    /// treated as missing.
    TagFailed(String),
}

/// Progress events emitted by a pass.
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started), exactly once.
/// 2. [`Reconciled`](Self::Reconciled), once per item looked at.
/// 3. [`Dispatched`](Self::Dispatched), once per miss handed to acquisition
///    (ingestion passes only).
/// 4. [`Finished`](Self::Finished), exactly once.
#[derive(Clone, Debug, PartialEq)]
pub enum ScanEvent {
    Started { pass: Pass, collection: Option<String>, items: usize },
    Reconciled { collection: String, item: Item, outcome: ItemOutcome },
    Dispatched { collection: String, item: Item, result: DispatchResult },
    Finished(PassReport),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassReport {
    pub pass: Pass,
    pub outcome: Outcome,
    pub scanned: usize,
    pub found: usize,
    pub missed: usize,
    /// Search or tag failures.
    pub failed: usize,
    /// Present when misses were handed to an acquisition service.
    pub dispatch: Option<DispatchSummary>,
}
impl PassReport {
    pub fn new(pass: Pass) -> Self {
        Self { pass, outcome: Outcome::Completed, scanned: 0, found: 0, missed: 0, failed: 0, dispatch: None }
    }

    pub(crate) fn record(&mut self, outcome: &ItemOutcome) {
        self.scanned += 1;
        match outcome {
            ItemOutcome::Found(_) => self.found += 1,
            ItemOutcome::Missing => self.missed += 1,
            ItemOutcome::SearchFailed(_) | ItemOutcome::TagFailed(_) => self.failed += 1,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.outcome == Outcome::Cancelled
    }
}
impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pass {}: {} scanned, {} found, {} missing, {} failed",
            self.pass, self.outcome, self.scanned, self.found, self.missed, self.failed
        )?;
        if let Some(d) = &self.dispatch {
            write!(
                f,
                "; acquisition: {} added, {} already tracked, {} not found, {} failed",
                d.added, d.already_tracked, d.no_candidates, d.failed
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_display() {
        let mut report = PassReport::new(Pass::Ingest);
        report.record(&ItemOutcome::Found(MatchRule::Exact));
        report.record(&ItemOutcome::Missing);
        report.record(&ItemOutcome::TagFailed("timeout".to_string()));
        assert_eq!(report.to_string(), "ingestion pass completed: 3 scanned, 1 found, 1 missing, 1 failed");
        report.dispatch = Some(DispatchSummary { added: 1, ..Default::default() });
        report.outcome = Outcome::Cancelled;
        assert_eq!(
            report.to_string(),
            "ingestion pass cancelled: 3 scanned, 1 found, 1 missing, 1 failed; \
             acquisition: 1 added, 0 already tracked, 0 not found, 0 failed"
        );
    }
}
