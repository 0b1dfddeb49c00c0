use std::sync::Arc;

use thiserror::Error;

use crate::rate_limit::SourcePacers;

/// Weights for the similarity factors. Must sum to 1.0.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityWeights {
    pub title: f64,
    pub year: f64,
    pub authors: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            title: 0.5,
            year: 0.3,
            authors: 0.2,
        }
    }
}

impl SimilarityWeights {
    pub fn sum(&self) -> f64 {
        self.title + self.year + self.authors
    }
}

/// Score thresholds for status classification. `verified` and `uncertain`
/// must both lie in [0, 1] with `uncertain <= verified`.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub verified: f64,
    pub uncertain: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            verified: 0.8,
            uncertain: 0.6,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("similarity weights must sum to 1.0, got {0:.3}")]
    WeightSum(f64),
    #[error(
        "thresholds must satisfy 0.0 <= uncertain <= verified <= 1.0, \
         got uncertain={uncertain}, verified={verified}"
    )]
    ThresholdRange { verified: f64, uncertain: f64 },
    #[error("max_results must be at least 1")]
    ZeroMaxResults,
}

/// Configuration for the verification engine.
#[derive(Clone)]
pub struct VerifyConfig {
    pub weights: SimilarityWeights,
    pub thresholds: Thresholds,
    /// Maximum candidate records requested per search.
    pub max_results: usize,
    pub request_timeout_secs: u64,
    /// Retries per source lookup before degrading to empty results.
    pub max_retries: u32,
    /// Base backoff between retries; scales linearly with the attempt.
    pub retry_backoff_ms: u64,
    /// Contact email for the CrossRef polite pool.
    pub crossref_mailto: Option<String>,
    pub pacers: Arc<SourcePacers>,
}

impl std::fmt::Debug for VerifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifyConfig")
            .field("weights", &self.weights)
            .field("thresholds", &self.thresholds)
            .field("max_results", &self.max_results)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field(
                "crossref_mailto",
                &self.crossref_mailto.as_ref().map(|_| "***"),
            )
            .finish_non_exhaustive()
    }
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            weights: SimilarityWeights::default(),
            thresholds: Thresholds::default(),
            max_results: 3,
            request_timeout_secs: 10,
            max_retries: 2,
            retry_backoff_ms: 500,
            crossref_mailto: None,
            pacers: Arc::new(SourcePacers::default()),
        }
    }
}

impl VerifyConfig {
    /// Check configuration invariants. Called once when the engine is
    /// built, so verification never re-validates weights or thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sum = self.weights.sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::WeightSum(sum));
        }

        let t = self.thresholds;
        let in_range = |v: f64| (0.0..=1.0).contains(&v);
        if !in_range(t.verified) || !in_range(t.uncertain) || t.uncertain > t.verified {
            return Err(ConfigError::ThresholdRange {
                verified: t.verified,
                uncertain: t.uncertain,
            });
        }

        if self.max_results == 0 {
            return Err(ConfigError::ZeroMaxResults);
        }

        Ok(())
    }
}
