//! Per-field extraction rules for a single citation line.
//!
//! Each rule is applied independently with no backtracking across fields,
//! so new citation styles can be supported by adding rule variants without
//! touching the existing ones.

use once_cell::sync::Lazy;
use regex::Regex;

use bibcheck_core::Citation;

/// First 4-digit token that reads as a plausible publication year.
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19|20)\d{2}\b").unwrap());

/// DOI lexical pattern: `10.<registrant>/<suffix>`.
static DOI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"10\.\d+/\S+").unwrap());

/// Leading "Surname, I." run at the start of the line.
static AUTHOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z][a-z]+(?:,\s[A-Z]\.?)*)").unwrap());

/// Title inside double quotes.
static QUOTED_TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]+)""#).unwrap());

/// Title as the first sentence-like segment between periods.
static SENTENCE_TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.?\s([A-Z][^.]+)\.").unwrap());

/// Accepted title captures must be longer than this.
const MIN_TITLE_LEN: usize = 10;

/// Year field: first match wins, absent if none.
pub fn extract_year(text: &str) -> Option<String> {
    YEAR_RE.find(text).map(|m| m.as_str().to_string())
}

/// DOI field: first match wins, absent if none.
pub fn extract_doi(text: &str) -> Option<String> {
    DOI_RE.find(text).map(|m| m.as_str().to_string())
}

/// Author field: a line opening with a recognizable "Surname, I." run
/// yields that run as the sole entry. Multi-author lines are not split
/// further.
pub fn extract_authors(text: &str) -> Vec<String> {
    AUTHOR_RE
        .captures(text)
        .map(|caps| vec![caps[1].trim().to_string()])
        .unwrap_or_default()
}

/// Title field, tried in order: text in double quotes, then the first
/// capitalized inter-period segment. Either must exceed 10 characters;
/// the first satisfying pattern wins.
pub fn extract_title(text: &str) -> Option<String> {
    for pattern in [&*QUOTED_TITLE_RE, &*SENTENCE_TITLE_RE] {
        if let Some(caps) = pattern.captures(text) {
            let candidate = caps[1].trim();
            if candidate.chars().count() > MIN_TITLE_LEN {
                return Some(candidate.to_string());
            }
        }
    }
    None
}

/// Extract all structural fields from one candidate citation line.
///
/// Total: any input yields a Citation without failing, `original_text`
/// preserved verbatim. A line with no recognizable structure produces a
/// record with every optional field absent.
pub fn extract(candidate_text: &str) -> Citation {
    Citation {
        original_text: candidate_text.to_string(),
        authors: extract_authors(candidate_text),
        year: extract_year(candidate_text),
        title: extract_title(candidate_text),
        doi: extract_doi(candidate_text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const APA_LINE: &str =
        "Smith, J. (2020). \"Deep Learning Methods.\" Journal of AI, 45(2), 100-120.";

    // =========================================================================
    // year
    // =========================================================================

    #[test]
    fn year_first_match_wins() {
        assert_eq!(extract_year(APA_LINE).as_deref(), Some("2020"));
        assert_eq!(
            extract_year("Reprinted 1998, original 2004.").as_deref(),
            Some("1998")
        );
    }

    #[test]
    fn year_requires_19_or_20_prefix() {
        assert!(extract_year("volume 1844, pages 3-10").is_none());
        assert_eq!(extract_year("published 1987").as_deref(), Some("1987"));
    }

    #[test]
    fn year_requires_word_boundary() {
        assert!(extract_year("id 12019 and 20203 numbers").is_none());
    }

    // =========================================================================
    // doi
    // =========================================================================

    #[test]
    fn doi_extracted_when_present() {
        assert_eq!(
            extract_doi("… ML Review. doi:10.1234/abc-def.12").as_deref(),
            Some("10.1234/abc-def.12")
        );
    }

    #[test]
    fn doi_absent_when_no_pattern() {
        assert!(extract_doi(APA_LINE).is_none());
    }

    #[test]
    fn doi_stops_at_whitespace() {
        assert_eq!(
            extract_doi("10.5555/xyz123 and more text").as_deref(),
            Some("10.5555/xyz123")
        );
    }

    // =========================================================================
    // authors
    // =========================================================================

    #[test]
    fn leading_author_run_captured() {
        assert_eq!(extract_authors(APA_LINE), vec!["Smith, J.".to_string()]);
    }

    #[test]
    fn surname_alone_captured() {
        assert_eq!(
            extract_authors("Turing. On computable numbers. 1936."),
            vec!["Turing".to_string()]
        );
    }

    #[test]
    fn no_authors_when_line_starts_lowercase() {
        assert!(extract_authors("see also: Smith, J. (2020)").is_empty());
    }

    #[test]
    fn no_authors_when_line_starts_with_digit() {
        assert!(extract_authors("[12] Smith, J. (2020). A paper.").is_empty());
    }

    // =========================================================================
    // title
    // =========================================================================

    #[test]
    fn quoted_title_preferred() {
        assert_eq!(
            extract_title(APA_LINE).as_deref(),
            Some("Deep Learning Methods.")
        );
    }

    #[test]
    fn short_quoted_text_falls_through() {
        // The quoted capture is too short; the sentence segment after the
        // first period qualifies instead.
        let line = "Smith, J. \"Notes\" An Extended Treatise on Learning. Journal, 2020.";
        assert_eq!(
            extract_title(line).as_deref(),
            Some("An Extended Treatise on Learning")
        );
    }

    #[test]
    fn sentence_title_used_without_quotes() {
        let line = "Smith, J. Statistical Methods for Citation Analysis. Journal of AI, 2020.";
        assert_eq!(
            extract_title(line).as_deref(),
            Some("Statistical Methods for Citation Analysis")
        );
    }

    #[test]
    fn no_title_when_nothing_qualifies() {
        assert!(extract_title("short. 2020. x.").is_none());
    }

    // =========================================================================
    // extract (totality)
    // =========================================================================

    #[test]
    fn extract_is_total_and_preserves_text() {
        for input in [
            APA_LINE,
            "",
            "no structure here whatsoever",
            "1234567890",
            "\"\"",
            "… unicode — punctuation · everywhere …",
        ] {
            let citation = extract(input);
            assert_eq!(citation.original_text, input);
        }
    }

    #[test]
    fn unstructured_line_yields_empty_fields() {
        let citation = extract("an unparseable line with no recognizable fields");
        assert!(citation.authors.is_empty());
        assert!(citation.year.is_none());
        assert!(citation.title.is_none());
        assert!(citation.doi.is_none());
    }

    #[test]
    fn apa_line_fully_parsed() {
        let citation = extract(APA_LINE);
        assert_eq!(citation.authors, vec!["Smith, J.".to_string()]);
        assert_eq!(citation.year.as_deref(), Some("2020"));
        assert_eq!(citation.title.as_deref(), Some("Deep Learning Methods."));
        assert!(citation.doi.is_none());
    }
}
