/// A candidate line must be longer than this many characters.
const MIN_LINE_LEN: usize = 30;

/// Split the bibliography section into candidate citation lines.
///
/// A trimmed line qualifies only if it is longer than 30 characters,
/// contains at least one digit, and contains at least one period.
/// Precision over recall: short headers and page numbers are rejected,
/// while real citation lines almost always carry a year and terminal
/// punctuation. Citations spanning multiple physical lines are only ever
/// captured from their first qualifying line; no merging is attempted.
pub fn segment(section_text: &str) -> Vec<String> {
    section_text
        .lines()
        .map(str::trim)
        .filter(|line| is_candidate(line))
        .map(|line| line.to_string())
        .collect()
}

/// The three candidate gates, applied together.
fn is_candidate(line: &str) -> bool {
    line.chars().count() > MIN_LINE_LEN
        && line.chars().any(|c| c.is_ascii_digit())
        && line.contains('.')
}
