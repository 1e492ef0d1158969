use super::NamespaceEngine;
use crate::error::NamespaceError;
use fxhash::FxHashSet;
use loft_metadata::MetadataStore;
use loft_storage::PhysicalStore;
use std::time::{Duration, SystemTime};
use tracing::{error, info, instrument, warn};

/// Outcome of [`NamespaceEngine::sweep_orphans`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    /// Blobs bound to a live path.
    pub referenced: usize,
    /// Unreferenced blobs still inside the grace period.
    pub recent: usize,
    pub deleted: usize,
    pub failed: usize,
    /// Abandoned partial uploads removed.
    pub purged: usize,
}

impl<M: MetadataStore, P: PhysicalStore> NamespaceEngine<M, P> {
    /// Deletes blobs no index path refers to, once they are older than `grace`.
    ///
    /// Blobs are listed before the index is read, so a commit landing in between
    /// leaves its blob referenced. The grace period covers uploads whose commit is
    /// still in flight or was acknowledged late. Partial uploads older than `grace`
    /// are removed in the same pass.
    #[instrument(skip(self))]
    pub async fn sweep_orphans(&self, grace: Duration) -> Result<SweepReport, NamespaceError> {
        let blobs = match self.physical.list_blobs().await {
            Ok(blobs) => blobs,
            Err(err) => {
                error!(error = %err, "Orphan sweep could not list blobs");
                return Err(err.into());
            },
        };
        let index = self.index().await?;
        let live: FxHashSet<&str> = index.entries.values().map(String::as_str).collect();
        let cutoff = SystemTime::now().checked_sub(grace);

        let mut report = SweepReport { scanned: blobs.len(), ..SweepReport::default() };
        for blob in &blobs {
            if live.contains(blob.id.as_str()) {
                report.referenced += 1;
                continue;
            }
            if !cutoff.is_some_and(|cutoff| blob.modified <= cutoff) {
                report.recent += 1;
                continue;
            }
            match self.physical.delete(&blob.id).await {
                Ok(()) => report.deleted += 1,
                Err(err) if err.is_not_found() => {},
                Err(err) => {
                    report.failed += 1;
                    warn!(id = %blob.id, error = %err, "Orphan delete failed");
                },
            }
        }

        match self.physical.purge_partial(grace).await {
            Ok(purged) => report.purged = purged,
            Err(err) => {
                report.failed += 1;
                warn!(error = %err, "Partial upload purge failed");
            },
        }

        info!(
            scanned = report.scanned,
            referenced = report.referenced,
            recent = report.recent,
            deleted = report.deleted,
            failed = report.failed,
            purged = report.purged,
            "Orphan sweep finished"
        );
        Ok(report)
    }
}
