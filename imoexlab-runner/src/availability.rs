//! Per-tier gap detection.

use imoexlab_core::data::{DataError, LocalTier, RemoteTier};
use imoexlab_core::domain::{ArtifactKind, DateKey};
use std::collections::BTreeSet;

/// Dates lacking at least one artifact kind at a tier.
pub type MissingSet = BTreeSet<DateKey>;

/// Storage tiers in order of precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Local,
    Remote,
    /// The origin can regenerate any date, so nothing is ever missing there.
    Origin,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Tier::Local => "local",
            Tier::Remote => "remote",
            Tier::Origin => "origin",
        };
        f.write_str(s)
    }
}

/// Read-only availability checks against the local and remote tiers.
pub struct TierAvailabilityChecker<'a> {
    local: &'a LocalTier,
    remote: &'a RemoteTier,
}

impl<'a> TierAvailabilityChecker<'a> {
    pub fn new(local: &'a LocalTier, remote: &'a RemoteTier) -> Self {
        Self { local, remote }
    }

    /// Dates missing either artifact file on disk.
    pub fn missing_local(&self, dates: &BTreeSet<DateKey>) -> MissingSet {
        dates
            .iter()
            .copied()
            .filter(|&date| {
                ArtifactKind::ALL
                    .iter()
                    .any(|&kind| !self.local.exists(kind, date))
            })
            .collect()
    }

    /// Dates missing either artifact in the bucket. One listing per kind.
    pub fn missing_remote(&self, dates: &BTreeSet<DateKey>) -> Result<MissingSet, DataError> {
        let mut missing = MissingSet::new();
        for kind in ArtifactKind::ALL {
            let available = self.remote.available_dates(kind)?;
            missing.extend(dates.difference(&available).copied());
        }
        Ok(missing)
    }

    pub fn missing_at(&self, tier: Tier, dates: &BTreeSet<DateKey>) -> Result<MissingSet, DataError> {
        match tier {
            Tier::Local => Ok(self.missing_local(dates)),
            Tier::Remote => self.missing_remote(dates),
            Tier::Origin => Ok(MissingSet::new()),
        }
    }
}
