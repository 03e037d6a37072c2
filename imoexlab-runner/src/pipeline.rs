//! End-to-end reconciliation and dataset build.
//!
//! Materialize the range, find local gaps, find which of those the bucket
//! also lacks, backfill those from the origins into the bucket, copy the
//! local gaps down, then assemble and export the table. Each stage only sees
//! the gap set of the stage before it, so a range already complete on disk
//! makes no network calls.

use crate::assemble::{AssemblyReport, DatasetAssembler, MergePolicy};
use crate::availability::{MissingSet, TierAvailabilityChecker};
use crate::backfill::{BackfillError, BackfillSummary, OriginBackfiller};
use crate::config::{ConfigError, PipelineConfig};
use crate::dataset::ExportError;
use crate::dates::DateRange;
use crate::progress::PipelineProgress;
use crate::sync::{RemoteSync, SyncSummary};
use imoexlab_core::data::{
    DataError, FsObjectStore, HttpNewsFeed, LocalTier, MarketIndexOrigin, MoexIssProvider,
    NewsOrigin, RemoteTier, RetryingNewsOrigin,
};
use imoexlab_core::features::NewsFeaturizer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("storage error: {0}")]
    Storage(#[from] DataError),
    /// An origin client could not be set up.
    #[error("origin error: {0}")]
    Origin(DataError),
    #[error("backfill error: {0}")]
    Backfill(#[from] BackfillError),
    #[error("export error: {0}")]
    Export(#[from] ExportError),
}

/// Gap counts for a range, without fetching anything.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub requested: usize,
    /// Dates lacking an artifact on disk.
    pub local_missing: MissingSet,
    /// Of `local_missing`, dates the bucket also lacks.
    pub remote_missing: MissingSet,
}

#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub requested: usize,
    pub local_missing: MissingSet,
    pub remote_missing: MissingSet,
    pub backfill: Option<BackfillSummary>,
    pub sync: Option<SyncSummary>,
}

impl ReconcileReport {
    /// Dates the run could not bring to the local tier.
    pub fn unresolved(&self) -> MissingSet {
        let mut out = MissingSet::new();
        if let Some(b) = &self.backfill {
            out.extend(b.failed_dates());
        }
        if let Some(s) = &self.sync {
            out.extend(s.missing.iter().map(|(d, _)| *d));
        }
        out
    }
}

#[derive(Debug)]
pub struct PipelineReport {
    pub reconcile: ReconcileReport,
    pub assembly: AssemblyReport,
    pub rows: usize,
    pub columns: usize,
    pub output_path: PathBuf,
    /// blake3 of the written CSV.
    pub dataset_hash: String,
}

pub struct Pipeline {
    local: LocalTier,
    remote: RemoteTier,
    news: Box<dyn NewsOrigin>,
    market: Box<dyn MarketIndexOrigin>,
    assembler: DatasetAssembler,
    output_path: PathBuf,
}

impl Pipeline {
    pub fn new(
        local: LocalTier,
        remote: RemoteTier,
        news: Box<dyn NewsOrigin>,
        market: Box<dyn MarketIndexOrigin>,
        assembler: DatasetAssembler,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            local,
            remote,
            news,
            market,
            assembler,
            output_path: output_path.into(),
        }
    }

    /// Wire up HTTP origins, the mounted bucket and the TF-IDF featurizer.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let remote_dir = config.storage.remote_dir.as_ref().ok_or_else(|| {
            ConfigError::Invalid(
                "no remote tier configured (set storage.remote_dir or IMOEXLAB_REMOTE_DIR)".into(),
            )
        })?;

        let local = LocalTier::new(&config.storage.data_dir);
        let remote = RemoteTier::new(Arc::new(FsObjectStore::new(
            remote_dir.join(&config.storage.bucket),
        )));

        let feed = HttpNewsFeed::new(&config.news.url_template, config.news.timeout())
            .map_err(PipelineError::Origin)?;
        let news = RetryingNewsOrigin::new(feed, config.news.retry_policy());
        let market = MoexIssProvider::new(
            &config.market_index.base_url,
            config.market_index.interval,
            config.market_index.timeout(),
        )
        .map_err(PipelineError::Origin)?;

        let assembler = DatasetAssembler::new(
            Box::new(NewsFeaturizer::russian(config.features.max_features)),
            config.dataset.merge_policy,
        );

        Ok(Self::new(
            local,
            remote,
            Box::new(news),
            Box::new(market),
            assembler,
            config.output_path(),
        ))
    }

    pub fn local(&self) -> &LocalTier {
        &self.local
    }

    pub fn remote(&self) -> &RemoteTier {
        &self.remote
    }

    pub fn merge_policy(&self) -> MergePolicy {
        self.assembler.policy()
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Report gaps at each tier for `range`.
    pub fn status(&self, range: &DateRange) -> Result<StatusReport, PipelineError> {
        let dates = range.dates();
        let checker = TierAvailabilityChecker::new(&self.local, &self.remote);
        let local_missing = checker.missing_local(&dates);
        let remote_missing = if local_missing.is_empty() {
            MissingSet::new()
        } else {
            checker.missing_remote(&local_missing)?
        };
        Ok(StatusReport {
            requested: dates.len(),
            local_missing,
            remote_missing,
        })
    }

    /// Bring every date in `range` to the local tier, as far as the origins allow.
    pub fn reconcile(
        &self,
        range: &DateRange,
        progress: &dyn PipelineProgress,
    ) -> Result<ReconcileReport, PipelineError> {
        let dates = range.dates();
        let checker = TierAvailabilityChecker::new(&self.local, &self.remote);
        let mut report = ReconcileReport {
            requested: dates.len(),
            ..Default::default()
        };

        report.local_missing = checker.missing_local(&dates);
        info!(
            requested = dates.len(),
            missing = report.local_missing.len(),
            from = %range.start(),
            till = %range.end(),
            "local tier checked"
        );
        if report.local_missing.is_empty() {
            return Ok(report);
        }

        report.remote_missing = checker.missing_remote(&report.local_missing)?;
        info!(missing = report.remote_missing.len(), "remote tier checked");

        let mut to_sync = report.local_missing.clone();
        if !report.remote_missing.is_empty() {
            let backfiller =
                OriginBackfiller::new(self.news.as_ref(), self.market.as_ref(), &self.remote);
            let summary = backfiller.backfill_all(&report.remote_missing, progress)?;
            for date in summary.failed_dates() {
                to_sync.remove(&date);
            }
            report.backfill = Some(summary);
        }

        info!(dates = to_sync.len(), "syncing remote tier to local");
        let sync = RemoteSync::new(&self.remote, &self.local).sync(&to_sync, progress)?;
        report.sync = Some(sync);

        Ok(report)
    }

    /// Reconcile `range`, assemble everything on disk and write the dataset CSV.
    pub fn make_dataset(
        &mut self,
        range: &DateRange,
        progress: &dyn PipelineProgress,
    ) -> Result<PipelineReport, PipelineError> {
        let reconcile = self.reconcile(range, progress)?;

        let assembly = self.assembler.assemble(&self.local)?;
        let bytes = assembly.table.write_csv(&self.output_path)?;
        let dataset_hash = blake3::hash(&bytes).to_hex().to_string();

        info!(
            path = %self.output_path.display(),
            rows = assembly.table.len(),
            hash = %dataset_hash,
            "dataset written"
        );

        Ok(PipelineReport {
            rows: assembly.table.len(),
            columns: assembly.table.columns.len(),
            reconcile,
            assembly: assembly.report,
            output_path: self.output_path.clone(),
            dataset_hash,
        })
    }
}
