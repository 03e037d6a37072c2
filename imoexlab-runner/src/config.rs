//! Pipeline configuration: TOML file, environment overrides, defaults.
//!
//! ```toml
//! [storage]
//! data_dir = "./data"
//! remote_dir = "/mnt/buckets"
//!
//! [news]
//! max_attempts = 5
//! retry_delay_secs = 5
//!
//! [dataset]
//! merge_policy = "intersection"
//! ```
//!
//! Every section and key is optional. `IMOEXLAB_DATA_DIR` and
//! `IMOEXLAB_REMOTE_DIR` (from the process environment or a `.env` file)
//! override the storage paths.

use crate::assemble::MergePolicy;
use chrono::NaiveDate;
use imoexlab_core::data::{moex, news_feed, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_DATA_DIR: &str = "IMOEXLAB_DATA_DIR";
pub const ENV_REMOTE_DIR: &str = "IMOEXLAB_REMOTE_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub storage: StorageConfig,
    pub news: NewsConfig,
    pub market_index: MarketIndexConfig,
    pub features: FeaturesConfig,
    pub dataset: DatasetConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// Directory holding the mounted bucket; required for any run.
    pub remote_dir: Option<PathBuf>,
    pub bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            remote_dir: None,
            bucket: "imoex-forecaster-data".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    /// Feed endpoint; `{date}` is replaced with `DD.MM.YYYY`.
    pub url_template: String,
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
    pub timeout_secs: u64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            url_template: news_feed::DEFAULT_FEED_URL.to_string(),
            max_attempts: 5,
            retry_delay_secs: 5,
            timeout_secs: 30,
        }
    }
}

impl NewsConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_secs(self.retry_delay_secs))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketIndexConfig {
    pub base_url: String,
    pub interval: u32,
    pub timeout_secs: u64,
}

impl Default for MarketIndexConfig {
    fn default() -> Self {
        Self {
            base_url: moex::DEFAULT_ISS_URL.to_string(),
            interval: moex::DAILY_INTERVAL,
            timeout_secs: 30,
        }
    }
}

impl MarketIndexConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub max_features: usize,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self { max_features: 1000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub merge_policy: MergePolicy,
    /// Relative to `storage.data_dir`.
    pub output_file: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            merge_policy: MergePolicy::AnchorOnTarget,
            output_file: PathBuf::from("dataset.csv"),
        }
    }
}

impl PipelineConfig {
    /// Load from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.news.url_template.contains("{date}") {
            return Err(ConfigError::Invalid(
                "news.url_template must contain a {date} placeholder".into(),
            ));
        }
        if self.news.max_attempts == 0 {
            return Err(ConfigError::Invalid("news.max_attempts must be at least 1".into()));
        }
        if self.features.max_features == 0 {
            return Err(ConfigError::Invalid("features.max_features must be at least 1".into()));
        }
        if self.dataset.output_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("dataset.output_file is empty".into()));
        }
        Ok(())
    }

    /// Apply `IMOEXLAB_*` overrides from the environment and any `.env` file.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| dotenvy::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.is_empty()) {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(ENV_REMOTE_DIR).filter(|v| !v.is_empty()) {
            self.storage.remote_dir = Some(PathBuf::from(dir));
        }
    }

    /// Final dataset path.
    pub fn output_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.dataset.output_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_toml_gives_defaults() {
        let c = PipelineConfig::from_toml("").unwrap();
        assert_eq!(c, PipelineConfig::default());
        assert_eq!(c.news.max_attempts, 5);
        assert_eq!(c.news.retry_delay_secs, 5);
        assert_eq!(c.market_index.interval, 24);
        assert_eq!(c.features.max_features, 1000);
        assert_eq!(c.dataset.merge_policy, MergePolicy::AnchorOnTarget);
        assert_eq!(c.output_path(), PathBuf::from("./data/dataset.csv"));
    }

    #[test]
    fn partial_sections_override() {
        let c = PipelineConfig::from_toml(
            r#"
            [storage]
            data_dir = "/srv/imoex"

            [news]
            max_attempts = 2

            [dataset]
            merge_policy = "intersection"
            "#,
        )
        .unwrap();
        assert_eq!(c.storage.data_dir, PathBuf::from("/srv/imoex"));
        assert_eq!(c.storage.bucket, "imoex-forecaster-data");
        assert_eq!(c.news.max_attempts, 2);
        assert_eq!(c.news.retry_delay_secs, 5);
        assert_eq!(c.dataset.merge_policy, MergePolicy::Intersection);
    }

    #[test]
    fn rejects_template_without_placeholder() {
        let err = PipelineConfig::from_toml("[news]\nurl_template = \"https://feed.local\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_merge_policy() {
        let err = PipelineConfig::from_toml("[dataset]\nmerge_policy = \"outer\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn overrides_replace_storage_paths() {
        let env: HashMap<&str, &str> = [
            (ENV_DATA_DIR, "/tmp/local"),
            (ENV_REMOTE_DIR, "/tmp/bucket"),
        ]
        .into_iter()
        .collect();
        let mut c = PipelineConfig::default();
        c.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(c.storage.data_dir, PathBuf::from("/tmp/local"));
        assert_eq!(c.storage.remote_dir, Some(PathBuf::from("/tmp/bucket")));
    }

    #[test]
    fn toml_roundtrip() {
        let mut c = PipelineConfig::default();
        c.storage.remote_dir = Some(PathBuf::from("/mnt/bucket"));
        let parsed = PipelineConfig::from_toml(&c.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, c);
    }
}
