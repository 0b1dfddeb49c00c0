//! Pacing of external metadata lookups.
//!
//! Each search waits on its source's governor permit before the request
//! goes out, which spaces successive lookups at the configured period
//! (one per second for CrossRef). On 429 the governor is slowed and the
//! request is retried once after honoring Retry-After.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::MetadataRecord;
use crate::source::MetadataSource;

/// Type alias for governor's direct rate limiter.
type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Error type for metadata searches, distinguishing rate limiting from
/// other failures.
#[derive(Debug, Clone)]
pub enum SourceError {
    /// Server returned 429 Too Many Requests.
    RateLimited { retry_after: Option<Duration> },
    /// Any other transport or payload error.
    Other(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::RateLimited {
                retry_after: Some(d),
            } => write!(f, "Rate limited (429), retry after {:.1}s", d.as_secs_f64()),
            SourceError::RateLimited { retry_after: None } => write!(f, "Rate limited (429)"),
            SourceError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<String> for SourceError {
    fn from(s: String) -> Self {
        SourceError::Other(s)
    }
}

/// Paces requests to one source at a fixed period, slowing down on 429.
///
/// The active governor is swapped atomically: each 429 doubles the period
/// (capped at 16x the base), and after 60 seconds without a 429 the base
/// rate is restored.
pub struct RequestPacer {
    limiter: ArcSwap<DirectLimiter>,
    /// Base period between allowed requests.
    base_period: Duration,
    /// Current slowdown factor (1 = normal, 2 = half rate, ...).
    slowdown: AtomicU32,
    /// Timestamp of the last 429 response.
    last_429: std::sync::Mutex<Option<Instant>>,
}

impl RequestPacer {
    /// Create a pacer allowing one request per `period`.
    pub fn new(period: Duration) -> Self {
        let quota = Quota::with_period(period).expect("period must be > 0");
        let limiter = Arc::new(DirectLimiter::direct(quota));
        Self {
            limiter: ArcSwap::from(limiter),
            base_period: period,
            slowdown: AtomicU32::new(1),
            last_429: std::sync::Mutex::new(None),
        }
    }

    /// Create a pacer allowing `n` requests per second.
    pub fn per_second(n: u32) -> Self {
        let ms = 1000 / n.max(1) as u64;
        Self::new(Duration::from_millis(ms))
    }

    /// Wait until the pacer allows a request.
    ///
    /// Blocks the calling future until a token is available, spacing
    /// successive lookups regardless of their outcome.
    pub async fn acquire(&self) {
        self.try_decay();
        let limiter = self.limiter.load();
        limiter.until_ready().await;
    }

    /// Called when a 429 is received. Doubles the slowdown factor and
    /// swaps in a slower governor.
    pub fn on_rate_limited(&self) {
        if let Ok(mut last) = self.last_429.lock() {
            *last = Some(Instant::now());
        }

        let _ = self
            .slowdown
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |f| {
                Some((f * 2).min(16))
            });

        let factor = self.slowdown.load(Ordering::SeqCst);
        if let Some(scaled) = self.base_period.checked_mul(factor) {
            if let Some(quota) = Quota::with_period(scaled) {
                self.limiter.store(Arc::new(DirectLimiter::direct(quota)));
            }
        }
    }

    /// If 60s have passed since the last 429, restore the base rate.
    fn try_decay(&self) {
        let should_restore = self
            .last_429
            .lock()
            .ok()
            .and_then(|last| last.map(|t| t.elapsed().as_secs() >= 60))
            .unwrap_or(false);

        if should_restore && self.slowdown.load(Ordering::SeqCst) > 1 {
            self.slowdown.store(1, Ordering::SeqCst);
            let quota = Quota::with_period(self.base_period).expect("base period valid");
            self.limiter.store(Arc::new(DirectLimiter::direct(quota)));
        }
    }
}

/// Registry of pacers keyed by source name.
///
/// Sources without an entry (offline or mock backends) are not throttled.
pub struct SourcePacers {
    pacers: HashMap<&'static str, RequestPacer>,
}

impl Default for SourcePacers {
    fn default() -> Self {
        Self::with_period(Duration::from_secs(1))
    }
}

impl SourcePacers {
    /// Build the registry with every networked source paced at one
    /// request per `period`.
    pub fn with_period(period: Duration) -> Self {
        let mut pacers = HashMap::new();
        pacers.insert("CrossRef", RequestPacer::new(period));
        Self { pacers }
    }

    /// Get the pacer for a given source, if one exists.
    pub fn get(&self, source_name: &str) -> Option<&RequestPacer> {
        self.pacers.get(source_name)
    }
}

/// Check if an HTTP response is a 429 and extract Retry-After if present.
///
/// Returns `Err(SourceError::RateLimited { .. })` if 429, `Ok(())` otherwise.
pub fn check_rate_limit_response(resp: &reqwest::Response) -> Result<(), SourceError> {
    if resp.status().as_u16() == 429 {
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        Err(SourceError::RateLimited { retry_after })
    } else {
        Ok(())
    }
}

/// Parse a Retry-After header value (seconds or HTTP-date).
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    if let Ok(secs) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    // HTTP-dates get a conservative fixed wait rather than date math.
    if value.contains(',') || value.contains("GMT") {
        return Some(Duration::from_secs(5));
    }
    None
}

/// Result of a paced search, with elapsed time measured after the
/// governor wait (HTTP round-trip only).
pub struct PacedSearch {
    pub result: Result<Vec<MetadataRecord>, SourceError>,
    pub elapsed: Duration,
}

/// Run one search through the source's pacer.
///
/// 1. Acquires the per-source governor permit (waits if needed)
/// 2. Performs the search
/// 3. On 429: slows the governor, honors Retry-After capped at the
///    request timeout, and retries once
/// 4. On other errors or success: returns immediately
pub async fn search_with_pacing(
    source: &dyn MetadataSource,
    query: &str,
    max_results: usize,
    client: &reqwest::Client,
    timeout: Duration,
    pacers: &SourcePacers,
) -> PacedSearch {
    let pacer = pacers.get(source.name());

    if let Some(p) = pacer {
        p.acquire().await;
    }

    let start = Instant::now();

    let result = match source.search(query, max_results, client, timeout).await {
        Ok(records) => Ok(records),
        Err(SourceError::RateLimited { retry_after }) => {
            if let Some(p) = pacer {
                p.on_rate_limited();
            }

            let wait = retry_after.unwrap_or(Duration::from_secs(2)).min(timeout);
            tracing::info!(
                source = source.name(),
                wait_secs = wait.as_secs_f64(),
                "rate limited (429), retrying after wait"
            );
            tokio::time::sleep(wait).await;

            if let Some(p) = pacer {
                p.acquire().await;
            }

            // Single retry; if still rate limited, give up.
            source.search(query, max_results, client, timeout).await
        }
        Err(other) => Err(other),
    };

    PacedSearch {
        result,
        elapsed: start.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mock::{MockResponse, MockSource};

    // ── parse_retry_after ──────────────────────────────────────────────

    #[test]
    fn parse_integer_seconds() {
        assert_eq!(parse_retry_after("5"), Some(Duration::from_secs(5)));
    }

    #[test]
    fn parse_zero() {
        assert_eq!(parse_retry_after("0"), Some(Duration::from_secs(0)));
    }

    #[test]
    fn parse_http_date() {
        let val = "Wed, 21 Oct 2015 07:28:00 GMT";
        assert_eq!(parse_retry_after(val), Some(Duration::from_secs(5)));
    }

    #[test]
    fn parse_garbage_none() {
        assert_eq!(parse_retry_after("xyz"), None);
    }

    // ── check_rate_limit_response ──────────────────────────────────────

    #[test]
    fn ok_on_200() {
        let http_resp = http::Response::builder().status(200).body("").unwrap();
        let resp = reqwest::Response::from(http_resp);
        assert!(check_rate_limit_response(&resp).is_ok());
    }

    #[test]
    fn rate_limited_429_no_header() {
        let http_resp = http::Response::builder().status(429).body("").unwrap();
        let resp = reqwest::Response::from(http_resp);
        let err = check_rate_limit_response(&resp).unwrap_err();
        match err {
            SourceError::RateLimited { retry_after } => assert!(retry_after.is_none()),
            _ => panic!("expected RateLimited"),
        }
    }

    #[test]
    fn rate_limited_429_with_retry_after() {
        let http_resp = http::Response::builder()
            .status(429)
            .header("retry-after", "10")
            .body("")
            .unwrap();
        let resp = reqwest::Response::from(http_resp);
        let err = check_rate_limit_response(&resp).unwrap_err();
        match err {
            SourceError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Some(Duration::from_secs(10)));
            }
            _ => panic!("expected RateLimited"),
        }
    }

    // ── RequestPacer ───────────────────────────────────────────────────

    #[test]
    fn starts_at_factor_1() {
        let pacer = RequestPacer::per_second(10);
        assert_eq!(pacer.slowdown.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn on_rate_limited_doubles() {
        let pacer = RequestPacer::per_second(10);
        pacer.on_rate_limited();
        assert_eq!(pacer.slowdown.load(Ordering::SeqCst), 2);
        pacer.on_rate_limited();
        assert_eq!(pacer.slowdown.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn factor_caps_at_16() {
        let pacer = RequestPacer::per_second(10);
        for _ in 0..10 {
            pacer.on_rate_limited();
        }
        assert_eq!(pacer.slowdown.load(Ordering::SeqCst), 16);
    }

    #[tokio::test]
    async fn acquire_completes() {
        // With a generous rate, the first acquire returns instantly.
        let pacer = RequestPacer::per_second(10);
        pacer.acquire().await;
    }

    #[tokio::test]
    async fn decay_restores_after_60s() {
        let pacer = RequestPacer::per_second(10);
        pacer.on_rate_limited();
        pacer.on_rate_limited();
        assert_eq!(pacer.slowdown.load(Ordering::SeqCst), 4);

        // Backdate last_429 to 61 seconds ago.
        {
            let mut last = pacer.last_429.lock().unwrap();
            *last = Some(Instant::now() - Duration::from_secs(61));
        }

        // acquire() calls try_decay() internally.
        pacer.acquire().await;
        assert_eq!(pacer.slowdown.load(Ordering::SeqCst), 1);
    }

    // ── SourcePacers ───────────────────────────────────────────────────

    #[test]
    fn default_paces_crossref() {
        let pacers = SourcePacers::default();
        assert!(pacers.get("CrossRef").is_some());
        assert_eq!(
            pacers.get("CrossRef").unwrap().base_period,
            Duration::from_secs(1)
        );
    }

    #[test]
    fn unknown_source_returns_none() {
        let pacers = SourcePacers::default();
        assert!(pacers.get("NoSuchIndex").is_none());
    }

    // ── search_with_pacing ─────────────────────────────────────────────

    fn record(title: &str) -> MetadataRecord {
        MetadataRecord {
            title: title.to_string(),
            authors: vec![],
            year: None,
            journal: None,
            doi: String::new(),
            source_name: "MockSource".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn success_first_try() {
        let source = MockSource::new(
            "MockSource",
            MockResponse::Found(vec![record("A Paper")]),
        );
        let client = reqwest::Client::new();
        let pacers = SourcePacers::default();

        let paced = search_with_pacing(
            &source,
            "a paper",
            3,
            &client,
            Duration::from_secs(10),
            &pacers,
        )
        .await;

        let records = paced.result.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "A Paper");
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_retries_once() {
        let source = MockSource::new(
            "MockSource",
            MockResponse::RateLimited {
                retry_after: Some(Duration::from_secs(5)),
            },
        );
        let client = reqwest::Client::new();
        let pacers = SourcePacers::default();

        let paced = search_with_pacing(
            &source,
            "a paper",
            3,
            &client,
            Duration::from_secs(10),
            &pacers,
        )
        .await;

        assert!(paced.result.is_err());
        // Initial attempt + one retry after honoring Retry-After.
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn other_error_no_retry() {
        let source = MockSource::new("MockSource", MockResponse::Error("connection refused".into()));
        let client = reqwest::Client::new();
        let pacers = SourcePacers::default();

        let paced = search_with_pacing(
            &source,
            "a paper",
            3,
            &client,
            Duration::from_secs(10),
            &pacers,
        )
        .await;

        assert!(paced.result.is_err());
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_then_found() {
        let source = MockSource::with_sequence(
            "MockSource",
            vec![
                MockResponse::RateLimited { retry_after: None },
                MockResponse::Found(vec![record("Recovered")]),
            ],
        );
        let client = reqwest::Client::new();
        let pacers = SourcePacers::default();

        let paced = search_with_pacing(
            &source,
            "recovered",
            3,
            &client,
            Duration::from_secs(10),
            &pacers,
        )
        .await;

        let records = paced.result.unwrap();
        assert_eq!(records[0].title, "Recovered");
        assert_eq!(source.call_count(), 2);
    }
}
