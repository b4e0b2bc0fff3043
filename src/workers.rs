//! Worker pool for parallel traversal and probing
//!
//! In parallel mode the coordinator spawns `2N + 2` worker threads: one
//! lister per tree side, plus `N` analyzers per side competing on a shared
//! command channel (fast analyzers naturally pick up more files). Workers
//! own no shared state; every interaction is a [`Message`] over a
//! `crossbeam-channel`. Command channels are bounded, the collection channel
//! back to the coordinator is unbounded - workers therefore never block on
//! replying, which rules out dispatch/reply deadlock.
//!
//! Worker lifecycle: spawned, running, terminate-requested, terminated. A
//! worker finishes the unit of work in hand before observing `Terminate`;
//! there is no mid-task cancellation. Teardown is confirmation-based: every
//! worker must answer `TerminateOk` within a bounded wait, and one that
//! exits, stalls, or panics without confirming is a fatal
//! [`SyncError::WorkerLost`].

use crate::error::{Result, SyncError};
use crate::messages::{Envelope, Message, TreeSide, WorkerId, WorkerRole};
use crate::probe;
use crate::types::{EntryKind, FileEntry, SyncConfig};
use crate::utils;
use crate::walker;
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, SendError, Sender};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Capacity of each bounded command channel
const COMMAND_CAPACITY: usize = 1024;

/// How long teardown waits for all termination confirmations
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Command senders for one tree side
struct SideChannels {
    lister_tx: Sender<Message>,
    analyzer_tx: Sender<Message>,
}

/// Handles and channels for one run's worker threads
///
/// Created by [`WorkerPool::prepare`] before traversal, torn down by
/// [`WorkerPool::shutdown`] after reconciliation.
pub struct WorkerPool {
    sides: [SideChannels; 2],
    coordinator_rx: Receiver<Envelope>,
    handles: Vec<(WorkerId, JoinHandle<()>)>,
}

impl WorkerPool {
    /// Spawn the listers and analyzers for both tree sides
    ///
    /// # Errors
    ///
    /// A thread spawn failure is fatal to the run and surfaces as
    /// [`SyncError::Io`]; threads already spawned wind down on their own
    /// once the partially built pool is dropped.
    pub fn prepare(config: &SyncConfig) -> Result<WorkerPool> {
        let (coordinator_tx, coordinator_rx) = unbounded::<Envelope>();
        let mut handles = Vec::with_capacity(2 * config.analyzers + 2);

        let source = spawn_side(
            TreeSide::Source,
            config.source.clone(),
            config,
            &coordinator_tx,
            &mut handles,
        )?;
        let destination = spawn_side(
            TreeSide::Destination,
            config.destination.clone(),
            config,
            &coordinator_tx,
            &mut handles,
        )?;

        debug!(
            "spawned {} workers ({} analyzers per side)",
            handles.len(),
            config.analyzers
        );

        // The coordinator keeps no sender clone: once every worker exits,
        // the collection channel disconnects and a lost pool is detectable.
        Ok(WorkerPool {
            sides: [source, destination],
            coordinator_rx,
            handles,
        })
    }

    /// Command sender for a side's lister
    pub fn lister(&self, side: TreeSide) -> &Sender<Message> {
        &self.sides[side.index()].lister_tx
    }

    /// Shared command sender for a side's analyzers
    pub fn analyzers(&self, side: TreeSide) -> &Sender<Message> {
        &self.sides[side.index()].analyzer_tx
    }

    /// The collection channel carrying worker replies
    pub fn receiver(&self) -> &Receiver<Envelope> {
        &self.coordinator_rx
    }

    /// Total number of spawned workers
    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// Send `Terminate` to every worker and wait for every confirmation
    ///
    /// Blocks until all workers have answered `TerminateOk` and their
    /// threads have been joined. Replies still in flight from work dispatched
    /// before termination are drained and dropped.
    ///
    /// # Errors
    ///
    /// [`SyncError::WorkerLost`] when a worker hung up before the terminate
    /// command, failed to confirm within `timeout`, or panicked.
    pub fn shutdown(self, timeout: Duration) -> Result<()> {
        let WorkerPool {
            sides,
            coordinator_rx,
            handles,
        } = self;
        let total = handles.len();

        for side in TreeSide::BOTH {
            let channels = &sides[side.index()];
            let analyzer_count = handles
                .iter()
                .filter(|(id, _)| id.side == side && id.role == WorkerRole::Analyzer)
                .count();

            if channels.lister_tx.send(Message::Terminate).is_err() {
                return Err(SyncError::worker_lost(format!(
                    "{side} lister exited before terminate"
                )));
            }
            // One terminate per analyzer on the shared channel; each
            // consumes exactly one and exits.
            for _ in 0..analyzer_count {
                if channels.analyzer_tx.send(Message::Terminate).is_err() {
                    return Err(SyncError::worker_lost(format!(
                        "{side} analyzers exited before terminate"
                    )));
                }
            }
        }

        let deadline = Instant::now() + timeout;
        let mut confirmed = 0usize;
        while confirmed < total {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SyncError::worker_lost(format!(
                    "{} of {} workers did not confirm termination",
                    total - confirmed,
                    total
                )));
            }
            match coordinator_rx.recv_timeout(remaining) {
                Ok(envelope) => match envelope.message {
                    Message::TerminateOk => {
                        debug!("{} terminated", envelope.from);
                        confirmed += 1;
                    }
                    _ => debug!("{}: draining late reply during shutdown", envelope.from),
                },
                Err(RecvTimeoutError::Timeout) => {
                    return Err(SyncError::worker_lost(format!(
                        "{} of {} workers did not confirm termination",
                        total - confirmed,
                        total
                    )));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(SyncError::worker_lost(
                        "collection channel closed before all workers confirmed".to_string(),
                    ));
                }
            }
        }

        for (id, handle) in handles {
            if handle.join().is_err() {
                return Err(SyncError::worker_lost(format!("{id} panicked")));
            }
        }
        Ok(())
    }
}

fn spawn_side(
    side: TreeSide,
    root: PathBuf,
    config: &SyncConfig,
    coordinator_tx: &Sender<Envelope>,
    handles: &mut Vec<(WorkerId, JoinHandle<()>)>,
) -> Result<SideChannels> {
    let (lister_tx, lister_rx) = bounded::<Message>(COMMAND_CAPACITY);
    let lister_id = WorkerId {
        side,
        role: WorkerRole::Lister,
        index: 0,
    };
    let tx = coordinator_tx.clone();
    let handle = thread::Builder::new()
        .name(format!("dirsync-{side}-lister"))
        .spawn(move || lister_loop(lister_id, lister_rx, tx))?;
    handles.push((lister_id, handle));

    let (analyzer_tx, analyzer_rx) = bounded::<Message>(COMMAND_CAPACITY);
    for index in 0..config.analyzers {
        let id = WorkerId {
            side,
            role: WorkerRole::Analyzer,
            index,
        };
        let rx = analyzer_rx.clone();
        let tx = coordinator_tx.clone();
        let worker_root = root.clone();
        let checksum = config.checksum;
        let handle = thread::Builder::new()
            .name(format!("dirsync-{side}-analyzer-{index}"))
            .spawn(move || analyzer_loop(id, worker_root, checksum, rx, tx))?;
        handles.push((id, handle));
    }

    Ok(SideChannels {
        lister_tx,
        analyzer_tx,
    })
}

/// Receive loop of a lister worker
///
/// On `AnalyzeDir` the lister enumerates the tree and streams each
/// discovered file back as a `FileEntry` message, closing with
/// `ListComplete`. Enumeration failure is reported as `AnalyzeFailed` on the
/// directory itself - the coordinator treats that as fatal, since a partial
/// listing cannot be diffed correctly.
fn lister_loop(id: WorkerId, rx: Receiver<Message>, tx: Sender<Envelope>) {
    for message in rx.iter() {
        match message {
            Message::AnalyzeDir(target) => match walker::collect_paths(&target) {
                Ok(paths) => {
                    debug!("{}: listed {} files under {:?}", id, paths.len(), target);
                    for relative_path in paths {
                        let entry = FileEntry::discovered(relative_path, EntryKind::File);
                        if send(&tx, id, Message::FileEntry(entry)).is_err() {
                            return;
                        }
                    }
                    if send(&tx, id, Message::ListComplete).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!("{}: enumeration failed: {}", id, e);
                    if send(&tx, id, Message::AnalyzeFailed(target)).is_err() {
                        return;
                    }
                }
            },
            Message::Terminate => {
                let _ = send(&tx, id, Message::TerminateOk);
                return;
            }
            other => warn!("{}: unexpected command: {:?}", id, other),
        }
    }
}

/// Receive loop of an analyzer worker
///
/// Probes each requested entry under the side's root; when checksums are
/// enabled, also hashes file content up front. A probe failure becomes an
/// `AnalyzeFailed` reply; a hash failure is only logged - the entry still
/// goes back without a digest, and the diff engine's on-demand recompute
/// will fail the same way and count the pair as a mismatch.
fn analyzer_loop(
    id: WorkerId,
    root: PathBuf,
    checksum: bool,
    rx: Receiver<Message>,
    tx: Sender<Envelope>,
) {
    for message in rx.iter() {
        match message {
            Message::AnalyzeFile(entry) => {
                let reply = match probe::probe(&root, &entry.relative_path) {
                    Ok(mut probed) => {
                        if checksum && probed.kind == EntryKind::File {
                            let full_path = utils::join_path(&root, &probed.relative_path);
                            match full_path.and_then(|path| probe::hash_file(&path)) {
                                Ok(digest) => probed.content_hash = Some(digest),
                                Err(e) => {
                                    warn!("{}: hashing {:?} failed: {}", id, probed.relative_path, e)
                                }
                            }
                        }
                        Message::FileAnalyzed(probed)
                    }
                    Err(e) => {
                        warn!("{}: probing {:?} failed: {}", id, entry.relative_path, e);
                        Message::AnalyzeFailed(entry.relative_path)
                    }
                };
                if send(&tx, id, reply).is_err() {
                    return;
                }
            }
            Message::Terminate => {
                let _ = send(&tx, id, Message::TerminateOk);
                return;
            }
            other => warn!("{}: unexpected command: {:?}", id, other),
        }
    }
}

fn send(
    tx: &Sender<Envelope>,
    from: WorkerId,
    message: Message,
) -> std::result::Result<(), SendError<Envelope>> {
    tx.send(Envelope { from, message })
}
