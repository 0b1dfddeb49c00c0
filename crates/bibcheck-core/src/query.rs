//! Search query composition from extracted citation fields.

use crate::Citation;

/// Titles at or below this length are too ambiguous to query on.
const MIN_QUERY_TITLE_LEN: usize = 5;

/// Build the free-text search query for a citation.
///
/// Fixed field order, joined with single spaces: the title wrapped in
/// double quotes (only when longer than five characters), the first
/// author's surname (text before the first comma), and the year. Returns
/// an empty string when no field qualifies; callers treat an empty query
/// as not-found and skip the external lookup entirely.
pub fn build_query(citation: &Citation) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(title) = &citation.title {
        if title.chars().count() > MIN_QUERY_TITLE_LEN {
            parts.push(format!("\"{}\"", title));
        }
    }

    if let Some(first) = citation.authors.first() {
        let surname = first.split(',').next().unwrap_or(first).trim();
        if !surname.is_empty() {
            parts.push(surname.to_string());
        }
    }

    if let Some(year) = &citation.year {
        parts.push(year.clone());
    }

    parts.join(" ")
}
