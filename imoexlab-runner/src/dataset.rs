//! Final training table and its CSV export.

use imoexlab_core::domain::{format_key, DateKey};
use std::path::Path;
use thiserror::Error;

/// Column prefix for text features.
pub const FEATURE_PREFIX: &str = "tfidf_";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to flush CSV writer: {0}")]
    Flush(String),

    #[error("write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// One row: date, aggregated feature vector, target close.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub date: DateKey,
    pub features: Vec<f64>,
    pub target: f64,
}

/// Rows ascending by date, one per date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    pub columns: Vec<String>,
    pub rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> Vec<DateKey> {
        self.rows.iter().map(|r| r.date).collect()
    }

    pub fn row(&self, date: DateKey) -> Option<&FeatureRow> {
        self.rows
            .binary_search_by_key(&date, |r| r.date)
            .ok()
            .map(|i| &self.rows[i])
    }

    /// Serialize as CSV: `dt,<features...>,target`.
    pub fn to_csv(&self) -> Result<Vec<u8>, ExportError> {
        let mut wtr = csv::Writer::from_writer(vec![]);

        let mut header = Vec::with_capacity(self.columns.len() + 2);
        header.push("dt".to_string());
        header.extend(self.columns.iter().cloned());
        header.push("target".to_string());
        wtr.write_record(&header)?;

        for row in &self.rows {
            let mut record = Vec::with_capacity(row.features.len() + 2);
            record.push(format_key(row.date));
            record.extend(row.features.iter().map(|v| v.to_string()));
            record.push(row.target.to_string());
            wtr.write_record(&record)?;
        }

        wtr.into_inner().map_err(|e| ExportError::Flush(e.to_string()))
    }

    /// Write the CSV to `path` via a temp file and rename.
    pub fn write_csv(&self, path: &Path) -> Result<Vec<u8>, ExportError> {
        let bytes = self.to_csv()?;
        let io_err = |source| ExportError::Io {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = path.with_extension("csv.tmp");
        std::fs::write(&tmp, &bytes).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;
        Ok(bytes)
    }
}
