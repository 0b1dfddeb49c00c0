//! Report artifact generation for verification runs.
//!
//! The report is the sole persisted output: a metadata block (source
//! filename, generation timestamp, totals, aggregate accuracy), a summary
//! block (counts per status), and an ordered per-citation detail list.

use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use bibcheck_core::{CheckStats, Citation, MetadataRecord, VerificationResult, VerificationStatus};

mod clock;

pub use clock::iso_timestamp;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

/// The persisted verification report.
#[derive(Debug, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub summary: ReportSummary,
    pub detailed_results: Vec<ReportEntry>,
}

#[derive(Debug, Serialize)]
pub struct ReportMetadata {
    pub filename: String,
    /// ISO-8601 UTC generation timestamp.
    pub generated_at: String,
    pub total_citations: usize,
    /// `100 × verified / total`; 0.0 for an empty run.
    pub accuracy_percentage: f64,
}

#[derive(Debug, Serialize)]
pub struct ReportSummary {
    pub verified: usize,
    pub uncertain: usize,
    pub errors: usize,
    pub not_found: usize,
}

#[derive(Debug, Serialize)]
pub struct ReportEntry {
    /// 1-based position in the verified bibliography.
    pub id: usize,
    pub original_text: String,
    pub status: VerificationStatus,
    pub score: f64,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_match: Option<MetadataRecord>,
}

/// Assemble the report for one run.
///
/// `results` must parallel `citations`: exactly one VerificationResult
/// per Citation, in citation order.
pub fn build_report(
    filename: &str,
    citations: &[Citation],
    results: &[VerificationResult],
) -> Report {
    let stats = CheckStats::from_results(results);

    let detailed_results = citations
        .iter()
        .zip(results)
        .enumerate()
        .map(|(i, (citation, result))| ReportEntry {
            id: i + 1,
            original_text: citation.original_text.clone(),
            status: result.status,
            score: result.score,
            errors: result.error_messages.clone(),
            best_match: result.best_match.clone(),
        })
        .collect();

    Report {
        metadata: ReportMetadata {
            filename: filename.to_string(),
            generated_at: clock::iso_timestamp(),
            total_citations: stats.total,
            accuracy_percentage: stats.accuracy_pct(),
        },
        summary: ReportSummary {
            verified: stats.verified,
            uncertain: stats.uncertain,
            errors: stats.errors,
            not_found: stats.not_found,
        },
        detailed_results,
    }
}

impl Report {
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), ReportError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citation(text: &str) -> Citation {
        Citation {
            original_text: text.to_string(),
            authors: vec![],
            year: None,
            title: None,
            doi: None,
        }
    }

    fn result(status: VerificationStatus, score: f64) -> VerificationResult {
        VerificationResult {
            status,
            score,
            best_match: None,
            error_messages: vec![],
        }
    }

    #[test]
    fn accuracy_is_exact_ratio() {
        let citations: Vec<Citation> = (0..4).map(|i| citation(&format!("c{i}"))).collect();
        let results = vec![
            result(VerificationStatus::Verified, 0.9),
            result(VerificationStatus::Verified, 0.85),
            result(VerificationStatus::Uncertain, 0.7),
            result(VerificationStatus::NotFound, 0.0),
        ];
        let report = build_report("paper.txt", &citations, &results);
        assert_eq!(report.metadata.total_citations, 4);
        assert_eq!(report.metadata.accuracy_percentage, 100.0 * 2.0 / 4.0);
        assert_eq!(report.summary.verified, 2);
        assert_eq!(report.summary.uncertain, 1);
        assert_eq!(report.summary.not_found, 1);
        assert_eq!(report.summary.errors, 0);
    }

    #[test]
    fn empty_run_has_zero_accuracy_without_division_fault() {
        let report = build_report("empty.txt", &[], &[]);
        assert_eq!(report.metadata.total_citations, 0);
        assert_eq!(report.metadata.accuracy_percentage, 0.0);
        assert!(report.detailed_results.is_empty());
    }

    #[test]
    fn entry_ids_are_one_based_and_ordered() {
        let citations = vec![citation("first"), citation("second")];
        let results = vec![
            result(VerificationStatus::Verified, 1.0),
            result(VerificationStatus::Error, 0.2),
        ];
        let report = build_report("paper.txt", &citations, &results);
        assert_eq!(report.detailed_results[0].id, 1);
        assert_eq!(report.detailed_results[0].original_text, "first");
        assert_eq!(report.detailed_results[1].id, 2);
        assert_eq!(report.detailed_results[1].original_text, "second");
    }

    #[test]
    fn json_keeps_the_metadata_summary_detail_triad_in_order() {
        let report = build_report("paper.txt", &[citation("c")], &[result(
            VerificationStatus::Verified,
            0.95,
        )]);
        let json = report.to_json().unwrap();
        let metadata_pos = json.find("\"metadata\"").unwrap();
        let summary_pos = json.find("\"summary\"").unwrap();
        let detail_pos = json.find("\"detailed_results\"").unwrap();
        assert!(metadata_pos < summary_pos && summary_pos < detail_pos);
    }

    #[test]
    fn status_serializes_snake_case() {
        let mut r = result(VerificationStatus::NotFound, 0.0);
        r.error_messages = vec!["citation not found in academic databases".to_string()];
        let report = build_report("paper.txt", &[citation("c")], &[r]);
        let json = report.to_json().unwrap();
        assert!(json.contains("\"not_found\""));
    }

    #[test]
    fn absent_best_match_is_omitted() {
        let report = build_report("paper.txt", &[citation("c")], &[result(
            VerificationStatus::NotFound,
            0.0,
        )]);
        let json = report.to_json().unwrap();
        assert!(!json.contains("best_match"));
    }

    #[test]
    fn present_best_match_is_embedded() {
        let mut r = result(VerificationStatus::Verified, 1.0);
        r.best_match = Some(MetadataRecord {
            title: "Deep Learning Methods".to_string(),
            authors: vec!["Smith, J.".to_string()],
            year: Some("2020".to_string()),
            journal: Some("Journal of AI".to_string()),
            doi: "10.1000/xyz".to_string(),
            source_name: "CrossRef".to_string(),
        });
        let report = build_report("paper.txt", &[citation("c")], &[r]);
        let json = report.to_json().unwrap();
        assert!(json.contains("\"best_match\""));
        assert!(json.contains("Deep Learning Methods"));
        assert!(json.contains("10.1000/xyz"));
    }
}
