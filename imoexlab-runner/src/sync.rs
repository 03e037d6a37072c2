//! Copy artifacts down from the bucket into the local tier.
//!
//! Payloads are decoded on the way down and written locally in the current
//! versioned encoding, so legacy encodings stop at the remote tier. A payload
//! that does not decode is copied as-is and left for the assembler to skip.
//! Whether a date needs syncing is decided by the caller; every date handed
//! in is fetched and written again.

use crate::progress::PipelineProgress;
use imoexlab_core::data::{codec, DataError, LocalTier, RemoteTier};
use imoexlab_core::domain::{ArtifactKind, DateKey};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

const STAGE: &str = "sync";

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SyncSummary {
    /// Artifacts written locally.
    pub written: usize,
    /// Legacy payloads rewritten in the current encoding.
    pub normalized: usize,
    /// Payloads that failed to decode and were copied unchanged.
    pub copied_verbatim: usize,
    /// Artifacts absent from the bucket.
    pub missing: Vec<(DateKey, ArtifactKind)>,
}

pub struct RemoteSync<'a> {
    remote: &'a RemoteTier,
    local: &'a LocalTier,
}

impl<'a> RemoteSync<'a> {
    pub fn new(remote: &'a RemoteTier, local: &'a LocalTier) -> Self {
        Self { remote, local }
    }

    fn sync_one(
        &self,
        kind: ArtifactKind,
        date: DateKey,
        summary: &mut SyncSummary,
    ) -> Result<(), DataError> {
        let bytes = match self.remote.get(kind, date) {
            Ok(bytes) => bytes,
            Err(DataError::NotFound { key }) => {
                warn!(%date, kind = kind.as_str(), key = %key, "artifact missing from remote tier");
                summary.missing.push((date, kind));
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match codec::decode(kind, &bytes) {
            Ok(decoded) => {
                if decoded.encoding.is_legacy() {
                    debug!(%date, kind = kind.as_str(), encoding = ?decoded.encoding, "normalizing legacy artifact");
                    summary.normalized += 1;
                }
                self.local.write_artifact(date, &decoded.artifact)?;
            }
            Err(e) => {
                warn!(%date, kind = kind.as_str(), error = %e, "remote artifact does not decode; copying unchanged");
                summary.copied_verbatim += 1;
                self.local.write(kind, date, &bytes)?;
            }
        }
        summary.written += 1;
        Ok(())
    }

    /// Sync every date, both kinds. Storage errors end the pass.
    pub fn sync(
        &self,
        dates: &BTreeSet<DateKey>,
        progress: &dyn PipelineProgress,
    ) -> Result<SyncSummary, DataError> {
        let total = dates.len();
        let mut summary = SyncSummary::default();
        progress.on_stage_start(STAGE, total);

        for (i, &date) in dates.iter().enumerate() {
            let missing_before = summary.missing.len();
            for kind in ArtifactKind::ALL {
                self.sync_one(kind, date, &mut summary)?;
            }
            let error = (summary.missing.len() > missing_before).then_some("missing from remote tier");
            progress.on_item(STAGE, date, i, total, error);
        }

        let incomplete: BTreeSet<DateKey> = summary.missing.iter().map(|(d, _)| *d).collect();
        progress.on_stage_complete(STAGE, total - incomplete.len(), incomplete.len());
        info!(
            written = summary.written,
            normalized = summary.normalized,
            copied_verbatim = summary.copied_verbatim,
            missing = summary.missing.len(),
            "sync complete"
        );
        Ok(summary)
    }
}
