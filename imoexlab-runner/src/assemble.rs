//! Build the training table from every artifact in the local tier.
//!
//! News titles are vectorized together, keyed by the date of their timestamp,
//! and averaged per date. Market-index rows are keyed the same way and supply
//! the target close. The two sides are then joined according to the
//! [`MergePolicy`]. Files are read in sorted order, and since all grouping is
//! by date the result does not depend on enumeration order.

use crate::dataset::{FeatureRow, FeatureTable, FEATURE_PREFIX};
use imoexlab_core::data::{codec, DataError, LocalTier};
use imoexlab_core::domain::{normalize_timestamp, ArtifactKind, DateKey};
use imoexlab_core::features::TextFeatureTransform;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// How news features and market targets are joined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// One row per market date with a target; dates without news get zeros.
    #[default]
    AnchorOnTarget,
    /// Only dates present on both sides.
    Intersection,
}

/// What the assembler read, skipped, and imputed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssemblyReport {
    pub news_files: usize,
    pub market_files: usize,
    /// Files that failed to decode, with the reason.
    pub skipped_files: Vec<(PathBuf, String)>,
    /// Files read through a legacy encoding.
    pub legacy_files: usize,
    pub news_records: usize,
    /// Records or candles whose timestamp has no date.
    pub unkeyed_records: usize,
    /// Candles without a usable close.
    pub null_targets: usize,
    /// Anchored dates with no headlines, filled with zeros.
    pub imputed_dates: Vec<DateKey>,
}

#[derive(Debug)]
pub struct Assembly {
    pub table: FeatureTable,
    pub report: AssemblyReport,
}

pub struct DatasetAssembler {
    transform: Box<dyn TextFeatureTransform>,
    policy: MergePolicy,
}

impl DatasetAssembler {
    pub fn new(transform: Box<dyn TextFeatureTransform>, policy: MergePolicy) -> Self {
        Self { transform, policy }
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    /// Assemble the table from everything under `local`.
    pub fn assemble(&mut self, local: &LocalTier) -> Result<Assembly, DataError> {
        let mut report = AssemblyReport::default();

        let (columns, features) = self.load_features(local, &mut report)?;
        let targets = load_targets(local, &mut report)?;
        let table = merge(columns, features, targets, self.policy, &mut report);

        info!(
            rows = table.len(),
            features = table.columns.len(),
            policy = ?self.policy,
            skipped = report.skipped_files.len(),
            imputed = report.imputed_dates.len(),
            "dataset assembled"
        );
        Ok(Assembly { table, report })
    }

    /// Per-date mean feature vectors, with prefixed column names.
    fn load_features(
        &mut self,
        local: &LocalTier,
        report: &mut AssemblyReport,
    ) -> Result<(Vec<String>, BTreeMap<DateKey, Vec<f64>>), DataError> {
        let mut keys = Vec::new();
        let mut titles = Vec::new();

        let files = local.list_files(ArtifactKind::News)?;
        report.news_files = files.len();
        for path in files {
            let bytes = read_file(&path)?;
            let news = match codec::decode_news(&bytes) {
                Ok(decoded) => {
                    if decoded.encoding.is_legacy() {
                        report.legacy_files += 1;
                    }
                    decoded.artifact
                }
                Err(e) => {
                    skip(report, path, e);
                    continue;
                }
            };

            for (ts, title) in news.records() {
                report.news_records += 1;
                match normalize_timestamp(ts) {
                    Some(date) => {
                        keys.push(date);
                        titles.push(title.to_string());
                    }
                    None => report.unkeyed_records += 1,
                }
            }
        }

        let matrix = self.transform.fit_transform(&titles);
        let width = matrix.columns.len();
        debug!(titles = titles.len(), width, "text features fitted");

        let mut sums: BTreeMap<DateKey, (Vec<f64>, usize)> = BTreeMap::new();
        for (date, row) in keys.into_iter().zip(matrix.rows) {
            let (sum, count) = sums.entry(date).or_insert_with(|| (vec![0.0; width], 0));
            for (acc, v) in sum.iter_mut().zip(row) {
                *acc += v;
            }
            *count += 1;
        }

        let means = sums
            .into_iter()
            .map(|(date, (sum, count))| {
                let n = count as f64;
                (date, sum.into_iter().map(|v| v / n).collect())
            })
            .collect();

        let columns = matrix
            .columns
            .iter()
            .map(|c| format!("{FEATURE_PREFIX}{c}"))
            .collect();
        Ok((columns, means))
    }
}

/// Close per date. The last candle of a date wins.
fn load_targets(
    local: &LocalTier,
    report: &mut AssemblyReport,
) -> Result<BTreeMap<DateKey, f64>, DataError> {
    let mut targets = BTreeMap::new();

    let files = local.list_files(ArtifactKind::MarketIndex)?;
    report.market_files = files.len();
    for path in files {
        let bytes = read_file(&path)?;
        let candles = match codec::decode_market_index(&bytes) {
            Ok(decoded) => {
                if decoded.encoding.is_legacy() {
                    report.legacy_files += 1;
                }
                decoded.artifact
            }
            Err(e) => {
                skip(report, path, e);
                continue;
            }
        };

        for (dt, _open, close) in candles.rows() {
            let Some(date) = normalize_timestamp(dt) else {
                report.unkeyed_records += 1;
                continue;
            };
            match close.filter(|c| c.is_finite()) {
                Some(close) => {
                    targets.insert(date, close);
                }
                None => report.null_targets += 1,
            }
        }
    }
    Ok(targets)
}

fn merge(
    columns: Vec<String>,
    features: BTreeMap<DateKey, Vec<f64>>,
    targets: BTreeMap<DateKey, f64>,
    policy: MergePolicy,
    report: &mut AssemblyReport,
) -> FeatureTable {
    let width = columns.len();
    let mut rows = Vec::with_capacity(targets.len());

    for (date, target) in targets {
        let features = match (features.get(&date), policy) {
            (Some(f), _) => f.clone(),
            (None, MergePolicy::AnchorOnTarget) => {
                report.imputed_dates.push(date);
                vec![0.0; width]
            }
            (None, MergePolicy::Intersection) => continue,
        };
        rows.push(FeatureRow {
            date,
            features,
            target,
        });
    }

    FeatureTable { columns, rows }
}

fn read_file(path: &Path) -> Result<Vec<u8>, DataError> {
    std::fs::read(path).map_err(|e| DataError::Storage(format!("read {}: {e}", path.display())))
}

fn skip(report: &mut AssemblyReport, path: PathBuf, err: DataError) {
    warn!(path = %path.display(), error = %err, "skipping malformed artifact");
    report.skipped_files.push((path, err.to_string()));
}
