//! Raw per-date artifacts and their storage keys.
//!
//! Each artifact kind has a fixed, validated field set. Payloads that do not
//! match it are rejected when decoded, before they reach the merge.

use super::date_key::{format_key, parse_key, DateKey};
use crate::data::provider::DataError;
use serde::{Deserialize, Serialize};

/// The two raw data streams collected per date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    News,
    MarketIndex,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 2] = [ArtifactKind::News, ArtifactKind::MarketIndex];

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::News => "news",
            ArtifactKind::MarketIndex => "market_index",
        }
    }

    /// Key prefix shared by every artifact of this kind, local and remote.
    pub fn prefix(self) -> &'static str {
        match self {
            ArtifactKind::News => "raw-data/news-data-daily/",
            ArtifactKind::MarketIndex => "raw-data/imoex-data-daily/",
        }
    }

    fn file_stem(self) -> &'static str {
        match self {
            ArtifactKind::News => "rbc",
            ArtifactKind::MarketIndex => "candles",
        }
    }

    /// Storage key: `raw-data/{news|imoex}-data-daily/{stem}_{YYYY-MM-DD}.json`.
    pub fn key(self, date: DateKey) -> String {
        format!("{}{}", self.prefix(), self.file_name(date))
    }

    /// File name part of the storage key.
    pub fn file_name(self, date: DateKey) -> String {
        format!("{}_{}.json", self.file_stem(), format_key(date))
    }

    /// Recover the date from a storage key or file name of this kind.
    ///
    /// Returns `None` for keys that belong to another kind or do not follow
    /// the naming template.
    pub fn date_from_key(self, key: &str) -> Option<DateKey> {
        let name = key.rsplit('/').next()?;
        let date_part = name
            .strip_prefix(self.file_stem())?
            .strip_prefix('_')?
            .strip_suffix(".json")?;
        parse_key(date_part).ok()
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Headlines collected for one date: parallel `ts` and `title` sequences.
///
/// Item order is scrape order and carries no meaning after the merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsArtifact {
    pub ts: Vec<String>,
    pub title: Vec<String>,
}

impl NewsArtifact {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ts: impl Into<String>, title: impl Into<String>) {
        self.ts.push(ts.into());
        self.title.push(title.into());
    }

    /// Append every record of `other`, keeping its order.
    pub fn extend(&mut self, other: NewsArtifact) {
        self.ts.extend(other.ts);
        self.title.extend(other.title);
    }

    pub fn len(&self) -> usize {
        self.title.len()
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
    }

    /// Iterate over `(ts, title)` pairs.
    pub fn records(&self) -> impl Iterator<Item = (&str, &str)> {
        self.ts
            .iter()
            .zip(self.title.iter())
            .map(|(ts, title)| (ts.as_str(), title.as_str()))
    }

    /// Check the parallel sequences line up.
    ///
    /// Timestamps are not checked here; a record whose timestamp has no date
    /// is skipped and counted by the consumer, not fatal to the whole file.
    pub fn validate(&self) -> Result<(), DataError> {
        if self.ts.len() != self.title.len() {
            return Err(DataError::ValidationError(format!(
                "news artifact has {} timestamps but {} titles",
                self.ts.len(),
                self.title.len()
            )));
        }
        Ok(())
    }
}

/// Index candles for one session: parallel `dt`, `open`, `close` sequences.
///
/// Non-trading days legitimately produce an empty artifact. Older payloads
/// spell the price columns `imoex_open_val` / `imoex_close_val`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketIndexArtifact {
    pub dt: Vec<String>,
    #[serde(alias = "imoex_open_val")]
    pub open: Vec<Option<f64>>,
    #[serde(alias = "imoex_close_val")]
    pub close: Vec<Option<f64>>,
}

impl MarketIndexArtifact {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, dt: impl Into<String>, open: Option<f64>, close: Option<f64>) {
        self.dt.push(dt.into());
        self.open.push(open);
        self.close.push(close);
    }

    pub fn len(&self) -> usize {
        self.dt.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dt.is_empty()
    }

    /// Iterate over `(dt, open, close)` rows.
    pub fn rows(&self) -> impl Iterator<Item = (&str, Option<f64>, Option<f64>)> {
        self.dt
            .iter()
            .zip(self.open.iter())
            .zip(self.close.iter())
            .map(|((dt, open), close)| (dt.as_str(), *open, *close))
    }

    pub fn validate(&self) -> Result<(), DataError> {
        let n = self.dt.len();
        if self.open.len() != n || self.close.len() != n {
            return Err(DataError::ValidationError(format!(
                "market index artifact columns differ in length (dt={n}, open={}, close={})",
                self.open.len(),
                self.close.len()
            )));
        }
        Ok(())
    }
}

/// A decoded artifact of either kind.
#[derive(Debug, Clone, PartialEq)]
pub enum RawArtifact {
    News(NewsArtifact),
    MarketIndex(MarketIndexArtifact),
}

impl RawArtifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            RawArtifact::News(_) => ArtifactKind::News,
            RawArtifact::MarketIndex(_) => ArtifactKind::MarketIndex,
        }
    }

    pub fn validate(&self) -> Result<(), DataError> {
        match self {
            RawArtifact::News(a) => a.validate(),
            RawArtifact::MarketIndex(a) => a.validate(),
        }
    }
}

impl From<NewsArtifact> for RawArtifact {
    fn from(a: NewsArtifact) -> Self {
        RawArtifact::News(a)
    }
}

impl From<MarketIndexArtifact> for RawArtifact {
    fn from(a: MarketIndexArtifact) -> Self {
        RawArtifact::MarketIndex(a)
    }
}
