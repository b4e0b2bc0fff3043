//! # dirsync - One-way directory tree mirroring
//!
//! A synchronization engine that mirrors the contents of a source directory
//! tree into a destination tree, copying files that are new or changed and
//! preserving permissions and modification times.
//!
//! ## Overview
//!
//! A run proceeds in four phases:
//!
//! 1. **List** - each tree is enumerated into an ordered [`FileList`] of
//!    entries keyed by relative path, either inline or through a pool of
//!    lister/analyzer workers exchanging typed messages over channels
//! 2. **Probe** - every entry gets its metadata (mode, mtime, size) from a
//!    stat call; content hashing is deferred until a comparison needs it
//! 3. **Diff** - the two path-ordered lists are merged in a single linear
//!    pass, classifying every path as create, update, or no-op; files found
//!    only in the destination are reported but never deleted
//! 4. **Reconcile** - create/update actions stream bytes into the
//!    destination and restore the source's mode and mtime; dry-run mode
//!    reports intentions without touching disk
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dirsync::{SyncConfig, Synchronizer};
//!
//! # fn main() -> dirsync::Result<()> {
//! let config = SyncConfig::new("./photos", "/mnt/backup/photos")
//!     .with_analyzers(4)
//!     .with_verbose(true);
//!
//! let report = Synchronizer::new(config).run()?;
//! println!(
//!     "{} created, {} updated, {} unchanged",
//!     report.files_created, report.files_updated, report.files_unchanged
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Change Detection
//!
//! Two entries with the same relative path are compared by size and
//! modification time first; those checks are cheap and decide almost every
//! pair. When metadata is equal and checksums are enabled, equality
//! additionally requires matching MD5 digests, computed on demand. MD5 here
//! is a change-detection fingerprint, not an integrity or security
//! guarantee.
//!
//! ## Concurrency Model
//!
//! Parallel runs use `2N + 2` worker threads (one lister per tree side, `N`
//! analyzers per side) that share no memory: every interaction is a typed
//! message over a channel, and the coordinator alone assembles lists, diffs,
//! and writes to the destination. Sequential mode performs the same phases
//! inline with no worker threads at all.
//!
//! ## Error Handling
//!
//! Operations return [`Result<T>`] with [`SyncError`] describing the
//! failure. Per-entry problems (one unreadable file) are downgraded to
//! warnings and the run continues; enumeration and worker-coordination
//! failures are terminal.

// Public API modules
pub mod diff;
pub mod engine;
pub mod error;
pub mod file_list;
pub mod messages;
pub mod probe;
pub mod reconciler;
pub mod types;
pub mod utils;
pub mod walker;
pub mod workers;

// Re-export main types for convenience
pub use diff::{diff as diff_lists, DiffContext};
pub use engine::Synchronizer;
pub use error::{Result, SyncError};
pub use file_list::FileList;
pub use types::{Action, ContentHash, EntryKind, FileEntry, ModTime, SyncConfig, SyncReport};
pub use workers::WorkerPool;
