//! Engine front door
//!
//! [`Synchronizer`] owns a validated [`SyncConfig`] and drives a full run:
//! preflight checks, list construction (inline or through the worker pool),
//! diffing, reconciliation, and worker teardown. The worker pool - when one
//! exists - lives for the whole run and is torn down only after
//! reconciliation, mirroring the prepare/synchronize/clean sequence of the
//! classic tool.

use crate::diff::{self, DiffContext};
use crate::error::{Result, SyncError};
use crate::file_list::FileList;
use crate::messages::{Envelope, Message, TreeSide, WorkerRole};
use crate::reconciler;
use crate::types::{SyncConfig, SyncReport};
use crate::utils;
use crate::walker;
use crate::workers::{WorkerPool, SHUTDOWN_TIMEOUT};
use chrono::Utc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How long the coordinator waits for any worker progress before giving the
/// pool up as lost. Generous: it only fires when *nothing* arrives.
const COLLECT_TIMEOUT: Duration = Duration::from_secs(60);

/// One-way tree synchronization engine
///
/// # Example
///
/// ```rust,no_run
/// use dirsync::{SyncConfig, Synchronizer};
///
/// # fn main() -> dirsync::Result<()> {
/// let config = SyncConfig::new("./project", "/mnt/backup/project")
///     .with_parallel(false)
///     .with_verbose(true);
/// let report = Synchronizer::new(config).run()?;
/// println!("{} files copied", report.total_copies());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Synchronizer {
    config: SyncConfig,
}

impl Synchronizer {
    /// Create an engine around an immutable configuration
    pub fn new(config: SyncConfig) -> Self {
        Synchronizer { config }
    }

    /// The configuration this engine runs with
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Execute one full synchronization run
    ///
    /// # Errors
    ///
    /// Terminal failures only: missing or unwritable roots, an unreadable
    /// directory during enumeration, or a coordination failure
    /// ([`SyncError::WorkerLost`], [`SyncError::ChannelClosed`]). Per-entry
    /// copy failures are returned as warnings inside the report instead.
    pub fn run(&self) -> Result<SyncReport> {
        let started_at = Utc::now();
        let started = Instant::now();
        self.preflight()?;

        let pool = if self.config.parallel {
            Some(WorkerPool::prepare(&self.config)?)
        } else {
            None
        };

        let result = self.run_with_pool(pool.as_ref());

        // Teardown happens after reconciliation - and on the error path too,
        // so no worker outlives its run.
        if let Some(pool) = pool {
            match pool.shutdown(SHUTDOWN_TIMEOUT) {
                Ok(()) => {}
                Err(teardown_err) => {
                    if result.is_ok() {
                        return Err(teardown_err);
                    }
                    warn!("teardown after failed run: {}", teardown_err);
                }
            }
        }

        let mut report = result?;
        report.started_at = started_at;
        report.duration_ms = started.elapsed().as_millis() as u64;

        info!(
            "synchronized {:?} -> {:?}: {} created, {} updated, {} unchanged, {} destination-only in {}ms{}",
            self.config.source,
            self.config.destination,
            report.files_created,
            report.files_updated,
            report.files_unchanged,
            report.destination_only,
            report.duration_ms,
            if report.dry_run { " (dry run)" } else { "" }
        );
        Ok(report)
    }

    fn run_with_pool(&self, pool: Option<&WorkerPool>) -> Result<SyncReport> {
        let (mut source_list, mut dest_list) = match pool {
            Some(pool) => self.build_lists_parallel(pool)?,
            None => (
                walker::walk_tree(&self.config.source)?,
                walker::walk_tree(&self.config.destination)?,
            ),
        };

        let ctx = DiffContext {
            source_root: &self.config.source,
            dest_root: &self.config.destination,
            checksum: self.config.checksum,
        };
        let actions = diff::diff(&source_list, &dest_list, &ctx);
        let copies = actions.iter().filter(|a| a.is_copy()).count();
        let files_unchanged = source_list.len() - copies;

        let outcome = reconciler::reconcile(&actions, &self.config);

        source_list.release();
        dest_list.release();

        Ok(SyncReport {
            files_created: outcome.created,
            files_updated: outcome.updated,
            files_unchanged,
            destination_only: outcome.preserved,
            bytes_copied: outcome.bytes_copied,
            warnings: outcome.warnings,
            dry_run: self.config.dry_run,
            started_at: Utc::now(),
            duration_ms: 0,
        })
    }

    /// Verify both roots before doing any work
    ///
    /// The source must exist and be a directory; the destination must exist,
    /// be a directory, and accept writes (checked even for dry runs, matching
    /// the classic behavior - a dry run against an unwritable destination is
    /// almost certainly a user mistake).
    fn preflight(&self) -> Result<()> {
        if !self.config.source.is_dir() {
            return Err(SyncError::DirectoryNotFound(self.config.source.clone()));
        }
        if !self.config.destination.is_dir() {
            return Err(SyncError::DirectoryNotFound(self.config.destination.clone()));
        }
        if !utils::is_directory_writable(&self.config.destination) {
            return Err(SyncError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("destination {:?} is not writable", self.config.destination),
            )));
        }
        Ok(())
    }

    /// Drive the worker pool until both trees are fully listed and probed
    ///
    /// The coordinator points each lister at its root, forwards every
    /// discovered path to that side's analyzers, and folds completed entries
    /// into the side's list. Arrival order across analyzers is arbitrary, so
    /// entries are re-sorted on insertion rather than appended.
    fn build_lists_parallel(&self, pool: &WorkerPool) -> Result<(FileList, FileList)> {
        pool.lister(TreeSide::Source)
            .send(Message::AnalyzeDir(self.config.source.clone()))
            .map_err(|_| SyncError::ChannelClosed("source lister command channel"))?;
        pool.lister(TreeSide::Destination)
            .send(Message::AnalyzeDir(self.config.destination.clone()))
            .map_err(|_| SyncError::ChannelClosed("destination lister command channel"))?;

        let mut lists = [FileList::new(), FileList::new()];
        let mut pending = [0usize; 2];
        let mut listing_done = [false; 2];

        while !(listing_done.iter().all(|done| *done) && pending.iter().all(|n| *n == 0)) {
            let Envelope { from, message } = pool
                .receiver()
                .recv_timeout(COLLECT_TIMEOUT)
                .map_err(|_| {
                    SyncError::worker_lost("no worker progress while lists were incomplete")
                })?;
            let side = from.side.index();

            match message {
                Message::FileEntry(entry) => {
                    pool.analyzers(from.side)
                        .send(Message::AnalyzeFile(entry))
                        .map_err(|_| SyncError::ChannelClosed("analyzer command channel"))?;
                    pending[side] += 1;
                }
                Message::ListComplete => {
                    debug!("{} listing complete", from.side);
                    listing_done[side] = true;
                }
                Message::FileAnalyzed(entry) => {
                    pending[side] = pending[side].saturating_sub(1);
                    if let Err(e) = lists[side].insert_sorted(entry) {
                        warn!("ignoring duplicate entry from {}: {}", from, e);
                    }
                }
                Message::AnalyzeFailed(path) => match from.role {
                    // A lister that cannot enumerate dooms the whole run.
                    WorkerRole::Lister => return Err(SyncError::DirectoryNotFound(path)),
                    WorkerRole::Analyzer => {
                        warn!("skipping {:?}: probe failed on {}", path, from.side);
                        pending[side] = pending[side].saturating_sub(1);
                    }
                },
                other => warn!("{}: unexpected message: {:?}", from, other),
            }
        }

        let [source_list, dest_list] = lists;
        debug!(
            "collected {} source entries, {} destination entries",
            source_list.len(),
            dest_list.len()
        );
        Ok((source_list, dest_list))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_preflight_rejects_missing_source() {
        let dst = TempDir::new().unwrap();
        let config = SyncConfig::new("/no/such/source", dst.path()).with_parallel(false);
        let err = Synchronizer::new(config).run().unwrap_err();
        assert!(matches!(err, SyncError::DirectoryNotFound(_)));
    }

    #[test]
    fn test_preflight_rejects_missing_destination() {
        let src = TempDir::new().unwrap();
        let config = SyncConfig::new(src.path(), "/no/such/dest").with_parallel(false);
        let err = Synchronizer::new(config).run().unwrap_err();
        assert!(matches!(err, SyncError::DirectoryNotFound(_)));
    }

    #[test]
    fn test_sequential_empty_trees() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let config = SyncConfig::new(src.path(), dst.path()).with_parallel(false);

        let report = Synchronizer::new(config).run().unwrap();
        assert!(!report.has_changes());
        assert_eq!(report.files_unchanged, 0);
    }

    #[test]
    fn test_parallel_lister_failure_is_fatal() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::write(src.path().join("f.txt"), b"x").unwrap();

        let config = SyncConfig::new(src.path(), dst.path()).with_analyzers(1);
        let engine = Synchronizer::new(config);
        let pool = WorkerPool::prepare(engine.config()).unwrap();

        // Point the source lister at a root that cannot be enumerated.
        pool.lister(TreeSide::Source)
            .send(Message::AnalyzeDir("/no/such/tree".into()))
            .unwrap();
        let envelope = pool.receiver().recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(envelope.message, Message::AnalyzeFailed(_)));
        assert_eq!(envelope.from.role, WorkerRole::Lister);
        pool.shutdown(SHUTDOWN_TIMEOUT).unwrap();
    }
}
