//! Multi-factor fuzzy scoring between a parsed citation and a candidate
//! metadata record.
//!
//! Each factor (title, year, authors) is gated on both sides carrying the
//! field: missing data drops the factor from the numerator *and* the
//! denominator rather than counting as zero, so sparse citations are not
//! penalized for what they never claimed.

use std::collections::BTreeSet;

use crate::config::SimilarityWeights;
use crate::{Citation, MetadataRecord};

/// Year difference within which a near-miss still earns partial credit.
const YEAR_TOLERANCE: i32 = 1;

/// Split into lowercase alphanumeric word tokens.
fn tokens(s: &str) -> BTreeSet<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn join_nonempty(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_string(),
        (_, true) => a.to_string(),
        _ => format!("{} {}", a, b),
    }
}

/// Order-independent token-set similarity in [0, 1].
///
/// Compares the shared token set against each side's token set rebuilt in
/// sorted order and takes the best pairing, so word reordering scores 1.0
/// and a title that is a pure token subset of the other still scores high.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a = tokens(a);
    let tokens_b = tokens(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let shared: Vec<&str> = tokens_a.intersection(&tokens_b).map(|s| s.as_str()).collect();
    let only_a: Vec<&str> = tokens_a.difference(&tokens_b).map(|s| s.as_str()).collect();
    let only_b: Vec<&str> = tokens_b.difference(&tokens_a).map(|s| s.as_str()).collect();

    if only_a.is_empty() && only_b.is_empty() {
        return 1.0;
    }

    // BTreeSet iteration order keeps each joined string deterministic.
    let sect = shared.join(" ");
    let combined_a = join_nonempty(&sect, &only_a.join(" "));
    let combined_b = join_nonempty(&sect, &only_b.join(" "));

    let mut best = rapidfuzz::fuzz::ratio(combined_a.chars(), combined_b.chars());
    if !sect.is_empty() {
        best = best
            .max(rapidfuzz::fuzz::ratio(sect.chars(), combined_a.chars()))
            .max(rapidfuzz::fuzz::ratio(sect.chars(), combined_b.chars()));
    }
    best
}

/// Full-string edit similarity, case-insensitive.
fn name_ratio(a: &str, b: &str) -> f64 {
    rapidfuzz::fuzz::ratio(a.to_lowercase().chars(), b.to_lowercase().chars())
}

fn year_diff(a: &str, b: &str) -> Option<i32> {
    let a: i32 = a.trim().parse().ok()?;
    let b: i32 = b.trim().parse().ok()?;
    Some((a - b).abs())
}

/// Weighted similarity between a citation and one candidate record.
///
/// Factors and weights:
/// - title: token-set ratio
/// - year: exact match earns the full weight, a difference of at most one
///   year earns two thirds of it
/// - authors: maximum pairwise edit similarity across the two author lists
///
/// The accumulated contribution is divided by the weights actually
/// applied. Returns 0.0 when no factor is comparable.
pub fn score_candidate(
    citation: &Citation,
    record: &MetadataRecord,
    weights: &SimilarityWeights,
) -> f64 {
    let mut score = 0.0;
    let mut applied = 0.0;

    if let Some(title) = &citation.title {
        if !record.title.is_empty() {
            score += token_set_ratio(title, &record.title) * weights.title;
            applied += weights.title;
        }
    }

    if let (Some(cite_year), Some(rec_year)) = (&citation.year, &record.year) {
        if cite_year == rec_year {
            score += weights.year;
        } else if year_diff(cite_year, rec_year).is_some_and(|d| d <= YEAR_TOLERANCE) {
            score += weights.year * 2.0 / 3.0;
        }
        applied += weights.year;
    }

    if !citation.authors.is_empty() && !record.authors.is_empty() {
        let best = citation
            .authors
            .iter()
            .flat_map(|c| record.authors.iter().map(move |r| name_ratio(c, r)))
            .fold(0.0, f64::max);
        score += best * weights.authors;
        applied += weights.authors;
    }

    if applied > 0.0 { score / applied } else { 0.0 }
}
