use serde::Serialize;
use tokio_util::sync::CancellationToken;

pub mod config;
pub mod config_file;
pub mod engine;
pub mod query;
pub mod rate_limit;
pub mod similarity;
pub mod source;

// Re-export for convenience
pub use config::{ConfigError, SimilarityWeights, Thresholds, VerifyConfig};
pub use engine::VerificationEngine;
pub use query::build_query;
pub use rate_limit::{RequestPacer, SourceError, SourcePacers};
pub use similarity::{score_candidate, token_set_ratio};

/// A single bibliographic entry parsed from a document's reference list.
///
/// `original_text` is preserved verbatim for display and audit. All other
/// fields are best-effort extractions and may be absent simultaneously; a
/// citation with no recognizable structure is still a meaningful record,
/// since its presence in the bibliography is itself a claim to verify.
#[derive(Debug, Clone)]
pub struct Citation {
    pub original_text: String,
    /// Author names in order of appearance in the text.
    pub authors: Vec<String>,
    /// 4-digit publication year, if one was recognized.
    pub year: Option<String>,
    /// Best-guess title substring.
    pub title: Option<String>,
    /// DOI in `10.<registrant>/<suffix>` form.
    pub doi: Option<String>,
}

/// One candidate bibliographic description returned by a metadata index
/// for a query. Value equality only; multiple records may describe the
/// same real work.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataRecord {
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<String>,
    pub journal: Option<String>,
    pub doi: String,
    /// Which index produced this record (e.g. "CrossRef").
    pub source_name: String,
}

/// Confidence classification for a single citation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Best candidate scored at or above the verified threshold.
    Verified,
    /// Best candidate landed in the manual-review band.
    Uncertain,
    /// Candidates were found but none scored reliably.
    Error,
    /// No candidates, or nothing searchable could be extracted.
    NotFound,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Verified => "verified",
            VerificationStatus::Uncertain => "uncertain",
            VerificationStatus::Error => "error",
            VerificationStatus::NotFound => "not_found",
        }
    }
}

/// The outcome of verifying a single citation. Created once per citation
/// and held only for report aggregation.
#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub status: VerificationStatus,
    /// Best candidate score in [0, 1].
    pub score: f64,
    /// The best-scoring candidate, attached even on low-confidence
    /// outcomes so it can be presented for manual review.
    pub best_match: Option<MetadataRecord>,
    pub error_messages: Vec<String>,
}

/// Summary statistics for a complete verification run.
#[derive(Debug, Clone, Default)]
pub struct CheckStats {
    pub total: usize,
    pub verified: usize,
    pub uncertain: usize,
    pub errors: usize,
    pub not_found: usize,
}

impl CheckStats {
    pub fn from_results(results: &[VerificationResult]) -> Self {
        let mut stats = CheckStats {
            total: results.len(),
            ..Default::default()
        };
        for result in results {
            match result.status {
                VerificationStatus::Verified => stats.verified += 1,
                VerificationStatus::Uncertain => stats.uncertain += 1,
                VerificationStatus::Error => stats.errors += 1,
                VerificationStatus::NotFound => stats.not_found += 1,
            }
        }
        stats
    }

    /// Aggregate accuracy: `100 × verified / total`, 0.0 for an empty run.
    pub fn accuracy_pct(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.verified as f64 / self.total as f64 * 100.0
        }
    }
}

/// Progress events emitted during a verification run.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Checking {
        index: usize,
        total: usize,
        text: String,
    },
    Result {
        index: usize,
        total: usize,
        result: Box<VerificationResult>,
    },
}

/// Verify a list of citations against the configured metadata sources.
///
/// Citations are processed strictly sequentially; results mirror input
/// order. Progress events are emitted via the callback and the run can be
/// cancelled between citations via the CancellationToken. Fails only if
/// the configuration is invalid.
pub async fn verify_citations(
    citations: &[Citation],
    config: VerifyConfig,
    progress: impl Fn(ProgressEvent),
    cancel: CancellationToken,
) -> Result<Vec<VerificationResult>, ConfigError> {
    let engine = VerificationEngine::new(config)?;
    Ok(engine.verify_all(citations, progress, cancel).await)
}
