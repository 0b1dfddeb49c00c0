//! The verification engine: builds the query for a citation, retrieves
//! candidate records, scores them, and classifies the best score.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::{ConfigError, Thresholds, VerifyConfig};
use crate::query::build_query;
use crate::rate_limit::search_with_pacing;
use crate::similarity::score_candidate;
use crate::source::MetadataSource;
use crate::source::crossref::CrossRef;
use crate::{Citation, MetadataRecord, ProgressEvent, VerificationResult, VerificationStatus};

/// Map a best-candidate score onto a status and its user-facing messages.
pub fn classify(score: f64, thresholds: &Thresholds) -> (VerificationStatus, Vec<String>) {
    if score >= thresholds.verified {
        (VerificationStatus::Verified, vec![])
    } else if score >= thresholds.uncertain {
        (
            VerificationStatus::Uncertain,
            vec!["uncertain match - manual verification required".to_string()],
        )
    } else {
        (
            VerificationStatus::Error,
            vec!["no reliable match found".to_string()],
        )
    }
}

pub struct VerificationEngine {
    config: VerifyConfig,
    sources: Vec<Arc<dyn MetadataSource>>,
    client: reqwest::Client,
}

impl VerificationEngine {
    /// Build an engine with the default CrossRef source.
    pub fn new(config: VerifyConfig) -> Result<Self, ConfigError> {
        let crossref = CrossRef {
            mailto: config.crossref_mailto.clone(),
        };
        Self::with_sources(config, vec![Arc::new(crossref)])
    }

    /// Build an engine over explicit sources (tests inject mocks here).
    ///
    /// Configuration invariants are checked once, here, so verification
    /// never re-validates weights or thresholds.
    pub fn with_sources(
        config: VerifyConfig,
        sources: Vec<Arc<dyn MetadataSource>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            sources,
            client: reqwest::Client::new(),
        })
    }

    /// Verify a single citation.
    ///
    /// An empty query short-circuits to `NotFound` without any external
    /// call. Otherwise candidates are fetched, each is scored, and the
    /// strictly-best one (first-seen wins on ties, since sources rank by
    /// relevance) determines the status. The best candidate is attached
    /// even on low-confidence outcomes for manual review.
    pub async fn verify(&self, citation: &Citation) -> VerificationResult {
        let query = build_query(citation);
        if query.is_empty() {
            return VerificationResult {
                status: VerificationStatus::NotFound,
                score: 0.0,
                best_match: None,
                error_messages: vec!["citation has no searchable fields".to_string()],
            };
        }

        let mut candidates = self.fetch_candidates(&query).await;
        if candidates.is_empty() {
            return VerificationResult {
                status: VerificationStatus::NotFound,
                score: 0.0,
                best_match: None,
                error_messages: vec!["citation not found in academic databases".to_string()],
            };
        }

        let mut best_idx = 0;
        let mut best_score = score_candidate(citation, &candidates[0], &self.config.weights);
        for (i, record) in candidates.iter().enumerate().skip(1) {
            let score = score_candidate(citation, record, &self.config.weights);
            if score > best_score {
                best_score = score;
                best_idx = i;
            }
        }

        let (status, error_messages) = classify(best_score, &self.config.thresholds);
        VerificationResult {
            status,
            score: best_score,
            best_match: Some(candidates.swap_remove(best_idx)),
            error_messages,
        }
    }

    /// Query every configured source, concatenating candidate lists.
    ///
    /// A failing source is retried with backoff up to `max_retries`, then
    /// degrades to an empty list; a single lookup failure never aborts
    /// processing of the remaining bibliography.
    async fn fetch_candidates(&self, query: &str) -> Vec<MetadataRecord> {
        let timeout = Duration::from_secs(self.config.request_timeout_secs);
        let mut candidates = Vec::new();

        for source in &self.sources {
            let mut attempt: u32 = 0;
            loop {
                let paced = search_with_pacing(
                    source.as_ref(),
                    query,
                    self.config.max_results,
                    &self.client,
                    timeout,
                    &self.config.pacers,
                )
                .await;

                match paced.result {
                    Ok(records) => {
                        tracing::debug!(
                            source = source.name(),
                            count = records.len(),
                            elapsed_ms = paced.elapsed.as_millis() as u64,
                            "search complete"
                        );
                        candidates.extend(records);
                        break;
                    }
                    Err(err) if attempt < self.config.max_retries => {
                        attempt += 1;
                        let backoff =
                            Duration::from_millis(self.config.retry_backoff_ms * u64::from(attempt));
                        tracing::warn!(
                            source = source.name(),
                            error = %err,
                            attempt,
                            "search failed, backing off"
                        );
                        tokio::time::sleep(backoff).await;
                    }
                    Err(err) => {
                        tracing::warn!(
                            source = source.name(),
                            error = %err,
                            "search failed, treating as no results"
                        );
                        break;
                    }
                }
            }
        }

        candidates
    }

    /// Verify citations sequentially, mirroring input order in the output.
    ///
    /// One citation is fully resolved before the next begins; the pacer
    /// spaces the underlying external calls, which is the backpressure
    /// mechanism against the metadata source's rate limit. Cancellation
    /// is honored between citations, returning the results collected so
    /// far.
    pub async fn verify_all(
        &self,
        citations: &[Citation],
        progress: impl Fn(ProgressEvent),
        cancel: CancellationToken,
    ) -> Vec<VerificationResult> {
        let total = citations.len();
        let mut results = Vec::with_capacity(total);

        for (index, citation) in citations.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(completed = index, total, "run cancelled");
                break;
            }

            progress(ProgressEvent::Checking {
                index,
                total,
                text: citation.original_text.clone(),
            });

            let result = self.verify(citation).await;
            progress(ProgressEvent::Result {
                index,
                total,
                result: Box::new(result.clone()),
            });
            results.push(result);
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Threshold classification
    // =========================================================================

    #[test]
    fn score_085_is_verified() {
        let (status, messages) = classify(0.85, &Thresholds::default());
        assert_eq!(status, VerificationStatus::Verified);
        assert!(messages.is_empty());
    }

    #[test]
    fn score_065_is_uncertain() {
        let (status, messages) = classify(0.65, &Thresholds::default());
        assert_eq!(status, VerificationStatus::Uncertain);
        assert_eq!(
            messages,
            vec!["uncertain match - manual verification required".to_string()]
        );
    }

    #[test]
    fn score_040_is_error() {
        let (status, messages) = classify(0.40, &Thresholds::default());
        assert_eq!(status, VerificationStatus::Error);
        assert_eq!(messages, vec!["no reliable match found".to_string()]);
    }

    #[test]
    fn thresholds_are_inclusive() {
        let t = Thresholds::default();
        assert_eq!(classify(0.8, &t).0, VerificationStatus::Verified);
        assert_eq!(classify(0.6, &t).0, VerificationStatus::Uncertain);
        assert_eq!(
            classify(0.7999999, &t).0,
            VerificationStatus::Uncertain
        );
        assert_eq!(classify(0.5999999, &t).0, VerificationStatus::Error);
    }
}
