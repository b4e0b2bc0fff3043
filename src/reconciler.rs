//! Copy engine
//!
//! Applies the diff's create/update actions to the destination tree: parent
//! directories are created as needed, content is streamed, then mode and
//! modification time are restored from the source entry so the next run's
//! metadata comparison sees the two sides as equal.
//!
//! One bad file must not block the rest of the tree: a failed copy is
//! reported as a warning and the remaining actions proceed. Only the
//! coordinating thread ever runs this code, after all diffing is complete,
//! so the destination has exactly one writer.

use crate::error::Result;
use crate::types::{Action, FileEntry, SyncConfig};
use crate::utils;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use tracing::{info, warn};

/// Outcome of applying a batch of actions
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    /// Files copied for `Create` actions
    pub created: usize,
    /// Files copied for `Update` actions
    pub updated: usize,
    /// Destination-only entries seen (and preserved)
    pub preserved: usize,
    /// Bytes written to the destination
    pub bytes_copied: u64,
    /// Per-entry failures, one line each
    pub warnings: Vec<String>,
}

/// Apply every action in order
///
/// Copy failures are collected as warnings, never propagated; the
/// destination-only count is tracked for reporting.
pub fn reconcile(actions: &[Action], config: &SyncConfig) -> ReconcileOutcome {
    let mut outcome = ReconcileOutcome::default();

    for action in actions {
        match action {
            Action::Create(entry) => match copy_entry(entry, config) {
                Ok(bytes) => {
                    outcome.created += 1;
                    outcome.bytes_copied += bytes;
                }
                Err(e) => fail_entry(&mut outcome, entry, e),
            },
            Action::Update(entry) => match copy_entry(entry, config) {
                Ok(bytes) => {
                    outcome.updated += 1;
                    outcome.bytes_copied += bytes;
                }
                Err(e) => fail_entry(&mut outcome, entry, e),
            },
            Action::DestinationOnly(entry) => {
                info!("preserved (destination only): {:?}", entry.relative_path);
                outcome.preserved += 1;
            }
        }
    }

    outcome
}

/// Copy one entry from the source tree to the destination tree
///
/// Streams the content, then restores the source entry's mode and mtime. In
/// dry-run mode only the intent is reported and the filesystem is untouched.
/// Returns the number of bytes written.
pub fn copy_entry(entry: &FileEntry, config: &SyncConfig) -> Result<u64> {
    let dest_path = utils::join_path(&config.destination, &entry.relative_path)?;

    if config.dry_run {
        info!("dry run: would copy {:?}", entry.relative_path);
        return Ok(0);
    }

    if let Some(parent) = dest_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let source_path = utils::join_path(&config.source, &entry.relative_path)?;
    let bytes = stream_copy(&source_path, &dest_path, entry.mode)?;

    utils::set_permissions(&dest_path, entry.mode)?;
    utils::set_mtime(&dest_path, entry.mtime)?;

    if config.verbose {
        info!(
            "copied {:?} ({})",
            entry.relative_path,
            utils::format_bytes(bytes)
        );
    }
    Ok(bytes)
}

/// Stream all bytes from `source_path` into a fresh `dest_path`
///
/// The destination is created (or truncated) with the source's permission
/// bits so the file never exists with wrong-mode content.
fn stream_copy(source_path: &Path, dest_path: &Path, mode: u32) -> Result<u64> {
    let mut reader = fs::File::open(source_path)?;
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode & 0o7777);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut writer = options.open(dest_path)?;
    let bytes = io::copy(&mut reader, &mut writer)?;
    Ok(bytes)
}

fn fail_entry(outcome: &mut ReconcileOutcome, entry: &FileEntry, e: crate::error::SyncError) {
    warn!("copy failed for {:?}: {}", entry.relative_path, e);
    outcome
        .warnings
        .push(format!("{}: {}", entry.relative_path.display(), e));
}
