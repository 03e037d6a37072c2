//! IMOEX Lab Runner — tier reconciliation and dataset assembly.
//!
//! This crate builds on `imoexlab-core` to provide:
//! - Date range materialization and per-tier gap detection
//! - Origin backfill into the remote tier, remote → local sync
//! - Dataset assembly with an explicit merge policy, CSV export
//! - TOML/env pipeline configuration and progress reporting

pub mod assemble;
pub mod availability;
pub mod backfill;
pub mod config;
pub mod dataset;
pub mod dates;
pub mod pipeline;
pub mod progress;
pub mod sync;

pub use assemble::{Assembly, AssemblyReport, DatasetAssembler, MergePolicy};
pub use availability::{MissingSet, Tier, TierAvailabilityChecker};
pub use backfill::{BackfillError, BackfillSummary, OriginBackfiller};
pub use config::{ConfigError, PipelineConfig};
pub use dataset::{ExportError, FeatureRow, FeatureTable};
pub use dates::{materialize, DateRange};
pub use pipeline::{Pipeline, PipelineError, PipelineReport, ReconcileReport, StatusReport};
pub use progress::{NoProgress, PipelineProgress, StdoutProgress};
pub use sync::{RemoteSync, SyncSummary};
