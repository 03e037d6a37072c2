//! Regenerate missing dates from the origins and persist them to the bucket.
//!
//! Backfill always writes to the remote tier; the local copy arrives through
//! [`crate::sync::RemoteSync`]. A failed market-index fetch skips its date and
//! the run moves on. A failed bucket write aborts the run.

use crate::progress::PipelineProgress;
use imoexlab_core::data::{DataError, MarketIndexOrigin, NewsOrigin, RemoteTier};
use imoexlab_core::domain::{DateKey, RawArtifact};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{info, warn};

const STAGE: &str = "backfill";

#[derive(Debug, Error)]
pub enum BackfillError {
    #[error("market index fetch failed for {date}: {source}")]
    MarketIndex {
        date: DateKey,
        #[source]
        source: DataError,
    },

    #[error("remote write failed for {date}: {source}")]
    Storage {
        date: DateKey,
        #[source]
        source: DataError,
    },
}

impl BackfillError {
    /// Storage failures end the run; everything else is per-date.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BackfillError::Storage { .. })
    }
}

/// Outcome of a backfill pass.
#[derive(Debug, Default)]
pub struct BackfillSummary {
    pub total: usize,
    pub succeeded: Vec<DateKey>,
    pub failed: Vec<(DateKey, BackfillError)>,
    /// Dates whose news origin came back empty.
    pub empty_news: Vec<DateKey>,
}

impl BackfillSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_dates(&self) -> BTreeSet<DateKey> {
        self.failed.iter().map(|(d, _)| *d).collect()
    }
}

pub struct OriginBackfiller<'a> {
    news: &'a dyn NewsOrigin,
    market: &'a dyn MarketIndexOrigin,
    remote: &'a RemoteTier,
}

impl<'a> OriginBackfiller<'a> {
    pub fn new(
        news: &'a dyn NewsOrigin,
        market: &'a dyn MarketIndexOrigin,
        remote: &'a RemoteTier,
    ) -> Self {
        Self {
            news,
            market,
            remote,
        }
    }

    /// Fetch both artifacts for `date` and write them to the bucket.
    ///
    /// Returns whether the news artifact came back empty.
    pub fn backfill(&self, date: DateKey) -> Result<bool, BackfillError> {
        let news = self.news.fetch(date);
        let candles = self
            .market
            .fetch(date, date)
            .map_err(|source| BackfillError::MarketIndex { date, source })?;

        let empty_news = news.is_empty();
        for artifact in [RawArtifact::News(news), RawArtifact::MarketIndex(candles)] {
            self.remote
                .put_artifact(date, &artifact)
                .map_err(|source| BackfillError::Storage { date, source })?;
        }
        Ok(empty_news)
    }

    /// Backfill each date in order. Returns early only on a storage failure.
    pub fn backfill_all(
        &self,
        dates: &BTreeSet<DateKey>,
        progress: &dyn PipelineProgress,
    ) -> Result<BackfillSummary, BackfillError> {
        let total = dates.len();
        let mut summary = BackfillSummary {
            total,
            ..Default::default()
        };
        progress.on_stage_start(STAGE, total);

        for (i, &date) in dates.iter().enumerate() {
            match self.backfill(date) {
                Ok(empty_news) => {
                    progress.on_item(STAGE, date, i, total, None);
                    if empty_news {
                        warn!(%date, origin = self.news.name(), "no headlines for date");
                        summary.empty_news.push(date);
                    }
                    summary.succeeded.push(date);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(%date, origin = self.market.name(), error = %e, "skipping date");
                    progress.on_item(STAGE, date, i, total, Some(&e.to_string()));
                    summary.failed.push((date, e));
                }
            }
        }

        progress.on_stage_complete(STAGE, summary.succeeded.len(), summary.failed.len());
        info!(
            succeeded = summary.succeeded.len(),
            failed = summary.failed.len(),
            empty_news = summary.empty_news.len(),
            "backfill complete"
        );
        Ok(summary)
    }
}
