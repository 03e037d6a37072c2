//! HTTP news feed source.
//!
//! The feed endpoint fronts the headline scraper and answers one date per
//! request with the collector mapping `{"ts": [...], "title": [...]}`. The URL
//! template's `{date}` placeholder is filled with `DD.MM.YYYY`, the format the
//! news site's search expects.
//!
//! Timestamps may come back either as ISO-8601 or in the site's native form
//! (`07 мар 2022, 09:10`); native ones are converted to `YYYY-MM-DD HH:MM`
//! so stored artifacts only ever hold one timestamp format.

use super::provider::{DataError, FeedSource};
use super::rbc_datetime::parse_rbc_datetime;
use crate::domain::{normalize_timestamp, DateKey, NewsArtifact};
use chrono::Datelike;
use serde::Deserialize;
use std::time::Duration;

/// Default search endpoint template.
pub const DEFAULT_FEED_URL: &str =
    "https://www.rbc.ru/search/ajax/?project=rbcnews&dateFrom={date}&dateTo={date}";

#[derive(Debug, Deserialize)]
struct FeedPayload {
    ts: Vec<String>,
    title: Vec<String>,
}

/// Single-attempt HTTP client for the news feed.
pub struct HttpNewsFeed {
    client: reqwest::blocking::Client,
    url_template: String,
}

impl HttpNewsFeed {
    pub fn new(url_template: impl Into<String>, timeout: Duration) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url_template: url_template.into(),
        })
    }

    /// Request URL for `date`.
    pub fn url_for(&self, date: DateKey) -> String {
        self.url_template
            .replace("{date}", &date.format("%d.%m.%Y").to_string())
    }

    /// Convert a feed response body into a validated artifact.
    pub fn parse_body(body: &str, date: DateKey) -> Result<NewsArtifact, DataError> {
        let payload: FeedPayload = serde_json::from_str(body)
            .map_err(|e| DataError::ResponseFormatChanged(format!("news feed: {e}")))?;

        if payload.ts.len() != payload.title.len() {
            return Err(DataError::ResponseFormatChanged(format!(
                "news feed returned {} timestamps for {} titles",
                payload.ts.len(),
                payload.title.len()
            )));
        }

        let mut artifact = NewsArtifact::new();
        for (ts, title) in payload.ts.into_iter().zip(payload.title) {
            let ts = if normalize_timestamp(&ts).is_some() {
                ts
            } else {
                parse_rbc_datetime(&ts, date.year())?
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            };
            artifact.push(ts, title.trim());
        }

        artifact.validate()?;
        Ok(artifact)
    }
}

impl FeedSource for HttpNewsFeed {
    fn name(&self) -> &str {
        "rbc_feed"
    }

    fn fetch_once(&self, date: DateKey) -> Result<NewsArtifact, DataError> {
        let url = self.url_for(date);
        let resp = self
            .client
            .get(&url)
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
            .map_err(|e| DataError::ResponseFormatChanged(format!("news feed body: {e}")))?;
        Self::parse_body(&body, date)
    }
}
