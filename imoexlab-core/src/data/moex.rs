//! MOEX ISS market-index provider.
//!
//! Fetches daily IMOEX candles from the exchange's public ISS API. The
//! response is column-oriented: a `columns` list naming each position and a
//! `data` list of rows. Columns are located by name so reordering upstream
//! does not silently shift values.

use super::provider::{DataError, MarketIndexOrigin};
use crate::domain::{DateKey, MarketIndexArtifact};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Default candles endpoint for the IMOEX index.
pub const DEFAULT_ISS_URL: &str =
    "https://iss.moex.com/iss/engines/stock/markets/index/securities/IMOEX/candles.json";

/// Daily candle interval code.
pub const DAILY_INTERVAL: u32 = 24;

/// MOEX ISS candles response.
#[derive(Debug, Deserialize)]
struct CandlesResponse {
    candles: CandlesTable,
}

#[derive(Debug, Deserialize)]
struct CandlesTable {
    columns: Vec<String>,
    data: Vec<Vec<Value>>,
}

/// MOEX ISS data provider.
pub struct MoexIssProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    interval: u32,
}

impl MoexIssProvider {
    pub fn new(
        base_url: impl Into<String>,
        interval: u32,
        timeout: Duration,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            interval,
        })
    }

    /// Provider against the public endpoint with daily candles.
    pub fn with_defaults() -> Result<Self, DataError> {
        Self::new(DEFAULT_ISS_URL, DAILY_INTERVAL, Duration::from_secs(30))
    }

    fn column(columns: &[String], name: &str) -> Result<usize, DataError> {
        columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| DataError::ResponseFormatChanged(format!("missing column '{name}'")))
    }

    /// Parse a candles response body into a market-index artifact.
    fn parse_response(body: &str) -> Result<MarketIndexArtifact, DataError> {
        let resp: CandlesResponse = serde_json::from_str(body)
            .map_err(|e| DataError::ResponseFormatChanged(format!("ISS candles: {e}")))?;
        let table = resp.candles;

        let begin = Self::column(&table.columns, "begin")?;
        let open = Self::column(&table.columns, "open")?;
        let close = Self::column(&table.columns, "close")?;

        let mut artifact = MarketIndexArtifact::new();
        for row in &table.data {
            let dt = row.get(begin).and_then(Value::as_str).ok_or_else(|| {
                DataError::ResponseFormatChanged(format!("candle without 'begin': {row:?}"))
            })?;
            let open = row.get(open).and_then(Value::as_f64);
            let close = row.get(close).and_then(Value::as_f64);
            artifact.push(dt, open, close);
        }

        artifact.validate()?;
        Ok(artifact)
    }
}

impl MarketIndexOrigin for MoexIssProvider {
    fn name(&self) -> &str {
        "moex_iss"
    }

    fn fetch(&self, from: DateKey, till: DateKey) -> Result<MarketIndexArtifact, DataError> {
        let from = from.format("%Y-%m-%d").to_string();
        let till = till.format("%Y-%m-%d").to_string();
        let interval = self.interval.to_string();

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("interval", interval.as_str()),
                ("from", from.as_str()),
                ("till", till.as_str()),
            ])
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                origin: self.name().to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .map_err(|e| DataError::ResponseFormatChanged(format!("ISS candles body: {e}")))?;
        Self::parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "candles": {
            "metadata": {},
            "columns": ["open", "close", "high", "low", "value", "volume", "begin", "end"],
            "data": [
                [3001.5, 3050.25, 3060.0, 2990.0, 1.0e11, 0, "2022-03-04 00:00:00", "2022-03-04 23:59:59"],
                [3050.25, null, 3070.0, 3000.0, 1.1e11, 0, "2022-03-07 00:00:00", "2022-03-07 23:59:59"]
            ]
        }
    }"#;

    #[test]
    fn parses_columns_by_name() {
        let artifact = MoexIssProvider::parse_response(FIXTURE).unwrap();
        assert_eq!(artifact.len(), 2);
        let rows: Vec<_> = artifact.rows().collect();
        assert_eq!(rows[0], ("2022-03-04 00:00:00", Some(3001.5), Some(3050.25)));
        assert_eq!(rows[1].2, None);
    }

    #[test]
    fn empty_window_is_empty_artifact() {
        let body = r#"{"candles":{"columns":["open","close","begin"],"data":[]}}"#;
        assert!(MoexIssProvider::parse_response(body).unwrap().is_empty());
    }

    #[test]
    fn missing_column_is_format_change() {
        let body = r#"{"candles":{"columns":["open","begin"],"data":[]}}"#;
        let err = MoexIssProvider::parse_response(body).unwrap_err();
        assert!(err.to_string().contains("close"));
    }

    #[test]
    fn non_json_is_format_change() {
        assert!(matches!(
            MoexIssProvider::parse_response("Service Unavailable"),
            Err(DataError::ResponseFormatChanged(_))
        ));
    }
}
