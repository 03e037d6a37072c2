//! Requested date range → canonical date set.

use crate::config::ConfigError;
use imoexlab_core::domain::DateKey;
use std::collections::BTreeSet;

/// Inclusive calendar date range with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: DateKey,
    end: DateKey,
}

impl DateRange {
    pub fn new(start: DateKey, end: DateKey) -> Result<Self, ConfigError> {
        if start > end {
            return Err(ConfigError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateKey {
        self.start
    }

    pub fn end(&self) -> DateKey {
        self.end
    }

    /// Number of calendar days, both ends included.
    pub fn len(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, date: DateKey) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn iter(&self) -> impl Iterator<Item = DateKey> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    /// Every date in the range.
    pub fn dates(&self) -> BTreeSet<DateKey> {
        self.iter().collect()
    }
}

/// Validate `(start, end)` and return the date set it covers.
pub fn materialize(start: DateKey, end: DateKey) -> Result<BTreeSet<DateKey>, ConfigError> {
    Ok(DateRange::new(start, end)?.dates())
}
