//! The plain-text item list format.
//!
//! One item per line, `Title (Year)`, e.g. `The Matrix (1999)`. The year is
//! whatever sits inside the *last* parenthesis pair, so titles may contain
//! parentheses of their own: `Birdman (or The Unexpected Virtue of Ignorance) (2014)`.

use derive_more::Display;
use marquee_services::ListItem;
use marquee_store::Item;
use tracing::warn;

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum SkipReason {
    #[display("expected 'Title (Year)'")]
    NotTitleYear,
    #[display("year is not a number")]
    InvalidYear,
    #[display("title is empty")]
    EmptyTitle,
}

/// A non-blank line that couldn't be parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based.
    pub line_number: usize,
    pub line: String,
    pub reason: SkipReason,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Parsed {
    pub items: Vec<Item>,
    pub skipped: Vec<SkippedLine>,
}

/// Parses ingestion text. Never fails: blank lines are ignored, anything else
/// that isn't `Title (Year)` is logged and reported in [`Parsed::skipped`].
pub fn parse_items(text: &str) -> Parsed {
    let mut parsed = Parsed::default();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(item) => parsed.items.push(item),
            Err(reason) => {
                warn!(line_number = index + 1, line, %reason, "skipping malformed line");
                parsed.skipped.push(SkippedLine { line_number: index + 1, line: line.to_string(), reason });
            },
        }
    }
    parsed
}

fn parse_line(line: &str) -> Result<Item, SkipReason> {
    let Some(inner) = line.strip_suffix(')') else {
        return Err(SkipReason::NotTitleYear);
    };
    let Some((title, year)) = inner.rsplit_once('(') else {
        return Err(SkipReason::NotTitleYear);
    };
    let year: i32 = year.trim().parse().map_err(|_| SkipReason::InvalidYear)?;
    let title = title.trim();
    if title.is_empty() {
        return Err(SkipReason::EmptyTitle);
    }
    Ok(Item::new(title, year))
}

/// Renders list items back into ingestion text, one `Title (Year)` per line.
pub fn render_ingest_text(items: &[ListItem]) -> String {
    items.iter().map(|i| format!("{} ({})\n", i.title, i.year)).collect()
}
