//! Origin collaborator traits and structured error types.
//!
//! The pipeline talks to the outside world through three seams: a news origin,
//! a market-index origin, and an object store (see `remote`). Keeping them
//! behind traits lets tests swap in counting or always-failing stubs.

use crate::domain::{DateKey, MarketIndexArtifact, NewsArtifact};
use thiserror::Error;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} from {origin}")]
    HttpStatus { origin: String, status: u16 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("object not found: {key}")]
    NotFound { key: String },

    #[error("malformed artifact: {0}")]
    Codec(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Source of daily headlines.
///
/// Implementations absorb their own transient failures: a date whose feed
/// cannot be fetched yields an empty artifact instead of an error, so one bad
/// day never blocks a long backfill.
pub trait NewsOrigin: Send + Sync {
    /// Human-readable name of this origin.
    fn name(&self) -> &str;

    /// Fetch every headline published on `date`.
    fn fetch(&self, date: DateKey) -> NewsArtifact;

    /// Fetch an inclusive date range, concatenating daily results in date order.
    fn fetch_range(&self, from: DateKey, till: DateKey) -> NewsArtifact {
        let mut all = NewsArtifact::new();
        for date in from.iter_days().take_while(|d| *d <= till) {
            all.extend(self.fetch(date));
        }
        all
    }
}

/// Source of index candles.
///
/// Unlike [`NewsOrigin`], failures surface as errors; callers decide whether
/// one failed date aborts anything beyond itself.
pub trait MarketIndexOrigin: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch daily candles for an inclusive date range.
    fn fetch(&self, from: DateKey, till: DateKey) -> Result<MarketIndexArtifact, DataError>;
}

/// A single, non-retrying attempt at the upstream news feed.
///
/// Wrapped by [`crate::data::RetryingNewsOrigin`] to get the bounded
/// retry-then-degrade behavior of a [`NewsOrigin`].
pub trait FeedSource: Send + Sync {
    fn name(&self) -> &str;

    fn fetch_once(&self, date: DateKey) -> Result<NewsArtifact, DataError>;
}
