//! Deciding which library entry (if any) is the item we want.
//!
//! Library searches are loose: asking for "Alien" returns "Aliens", "Alien
//! Resurrection" and friends. [`find_match`] picks one entry using three rules,
//! in order, the first one producing a hit wins:
//!
//! 1. [`MatchRule::Exact`]: same year, same title ignoring case.
//! 2. [`MatchRule::TitleOnly`]: same title ignoring case, whatever the year.
//! 3. [`MatchRule::Fuzzy`]: same year and a title [`similarity`] above
//!    [`FUZZY_THRESHOLD`].
//!
//! Fuzzy matching never crosses a year mismatch: "Spider-Man (2004)" is not
//! "Spiderman (2002)".

use marquee_services::LibraryEntry;
use tracing::info;

/// Titles must score strictly above this to match fuzzily.
pub const FUZZY_THRESHOLD: f64 = 0.9;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MatchRule {
    Exact,
    TitleOnly,
    /// Carries the similarity score.
    Fuzzy(f64),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Match<'a> {
    pub entry: &'a LibraryEntry,
    pub rule: MatchRule,
}

pub fn find_match<'a>(title: &str, year: i32, candidates: &'a [LibraryEntry]) -> Option<Match<'a>> {
    let wanted = title.to_lowercase();
    let same_title = |e: &&LibraryEntry| e.title.to_lowercase() == wanted;
    let same_year = |e: &&LibraryEntry| e.year == Some(year);

    if let Some(entry) = candidates.iter().filter(same_year).find(same_title) {
        return Some(Match { entry, rule: MatchRule::Exact });
    }
    if let Some(entry) = candidates.iter().find(same_title) {
        return Some(Match { entry, rule: MatchRule::TitleOnly });
    }
    candidates.iter().filter(same_year).find_map(|entry| {
        let score = similarity(&entry.title.to_lowercase(), &wanted);
        if score <= FUZZY_THRESHOLD {
            return None;
        }
        info!(rule = "fuzzy", wanted = title, matched = %entry.title, score, "fuzzy match");
        Some(Match { entry, rule: MatchRule::Fuzzy(score) })
    })
}

/// Ratcliff/Obershelp "gestalt" similarity of two strings, in `0.0..=1.0`.
///
/// Finds the longest common substring, then recurses on the unmatched parts
/// either side of it; the score is `2 * matched / (len(a) + len(b))`.
/// Comparison is per `char` and case-sensitive; lowercase first for
/// case-insensitive scores.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_chars(&a, &b) as f64 / total as f64
}

fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, size) = longest_common(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            queue.push((i + size, ahi, j + size, bhi));
        }
    }
    matched
}

/// Longest block `a[i..i+size] == b[j..j+size]` within the given bounds.
/// Ties go to the block starting earliest in `a`, then earliest in `b`.
fn longest_common(a: &[char], b: &[char], alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    // `prev[j + 1]` is the length of the common run ending at a[i - 1], b[j].
    let mut prev = vec![0usize; b.len() + 1];
    for i in alo..ahi {
        let mut row = vec![0usize; b.len() + 1];
        for j in blo..bhi {
            if a[i] != b[j] {
                continue;
            }
            let k = prev[j] + 1;
            row[j + 1] = k;
            if k > best_size {
                best_i = i + 1 - k;
                best_j = j + 1 - k;
                best_size = k;
            }
        }
        prev = row;
    }
    (best_i, best_j, best_size)
}
