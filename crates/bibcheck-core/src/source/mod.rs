//! Metadata source trait and implementations for querying scholarly indexes.

pub mod crossref;
pub mod mock;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::MetadataRecord;
use crate::rate_limit::SourceError;

/// An external scholarly index searchable with a free-text query.
///
/// Results are expected in relevance order; the engine keeps the first
/// strictly-best scoring candidate, so source ordering breaks ties.
pub trait MetadataSource: Send + Sync {
    /// The canonical name of this index (e.g., "CrossRef").
    fn name(&self) -> &str;

    /// Search for up to `max_results` candidate records matching the query.
    ///
    /// Transport failures surface as [`SourceError`]; callers degrade them
    /// to an empty candidate list rather than aborting the run.
    fn search<'a>(
        &'a self,
        query: &'a str,
        max_results: usize,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<MetadataRecord>, SourceError>> + Send + 'a>>;
}
