//! Core data types used throughout the dirsync library
//!
//! This module contains the fundamental data structures shared across the
//! synchronization engine:
//! - **File System State**: [`FileEntry`], [`EntryKind`], [`ModTime`] - one
//!   filesystem object and its comparison-relevant metadata
//! - **Decisions**: [`Action`] - the classified outcome of diffing one path
//! - **Configuration**: [`SyncConfig`] - immutable parameters for one run
//! - **Results**: [`SyncReport`] - statistics and warnings from a completed run
//!
//! ## Examples
//!
//! ```rust
//! use dirsync::types::SyncConfig;
//!
//! let config = SyncConfig::new("./photos", "/mnt/backup/photos")
//!     .with_checksum(false)
//!     .with_dry_run(true);
//! assert!(config.dry_run);
//! ```

use chrono::{DateTime, Utc};
use filetime::FileTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// MD5 digest of a file's content
///
/// A change-detection fingerprint, not an integrity guarantee.
pub type ContentHash = [u8; 16];

/// Classification of a filesystem object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
}

/// Modification timestamp with nanosecond resolution
///
/// Stored as seconds since the Unix epoch plus a nanosecond remainder, the
/// same shape the platform's stat call reports. Two timestamps are equal
/// only when both components are equal.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ModTime {
    /// Whole seconds since the Unix epoch (may be negative)
    pub secs: i64,
    /// Nanosecond remainder, always in `0..1_000_000_000`
    pub nanos: u32,
}

impl From<SystemTime> for ModTime {
    fn from(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(d) => ModTime {
                secs: d.as_secs() as i64,
                nanos: d.subsec_nanos(),
            },
            Err(e) => {
                // Timestamp precedes the epoch
                let d = e.duration();
                let mut secs = -(d.as_secs() as i64);
                let mut nanos = d.subsec_nanos();
                if nanos > 0 {
                    secs -= 1;
                    nanos = 1_000_000_000 - nanos;
                }
                ModTime { secs, nanos }
            }
        }
    }
}

impl ModTime {
    /// Convert to a [`FileTime`] suitable for restoration onto disk
    pub fn to_filetime(self) -> FileTime {
        FileTime::from_unix_time(self.secs, self.nanos)
    }
}

/// One filesystem object's identity plus metadata
///
/// Entries are keyed by their path relative to the tree root; that key is
/// unique within a list and is the sole ordering criterion. `size` and
/// `mtime` are always populated for files before any diff decision is made;
/// `content_hash` is filled only when checksums are enabled, and may be
/// filled lazily at diff time rather than at probe time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path relative to the tree root; never empty
    pub relative_path: PathBuf,
    /// File or directory
    pub kind: EntryKind,
    /// Permission/type bits as reported by the filesystem
    pub mode: u32,
    /// Last modification time
    pub mtime: ModTime,
    /// Size in bytes; meaningful only for files
    pub size: u64,
    /// MD5 digest of the content; always `None` for directories
    pub content_hash: Option<ContentHash>,
}

impl FileEntry {
    /// Placeholder entry for a path discovered during traversal
    ///
    /// Carries only the relative path and kind; metadata is filled by a
    /// later probe. Listers stream these, analyzers complete them.
    pub fn discovered(relative_path: PathBuf, kind: EntryKind) -> Self {
        FileEntry {
            relative_path,
            kind,
            mode: 0,
            mtime: ModTime::default(),
            size: 0,
            content_hash: None,
        }
    }

    /// Hexadecimal rendering of the content hash, if present
    pub fn hash_hex(&self) -> Option<String> {
        self.content_hash.map(hex::encode)
    }
}

/// Immutable configuration for one synchronization run
///
/// Built by the CLI layer (or any embedding caller), validated once, then
/// passed by reference to every component that needs it. Nothing in the
/// engine mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Root of the tree to mirror from
    pub source: PathBuf,
    /// Root of the tree to mirror into
    pub destination: PathBuf,
    /// Analyzer workers per tree side in parallel mode
    pub analyzers: usize,
    /// Distribute traversal and probing across a worker pool
    pub parallel: bool,
    /// Require equal MD5 digests before declaring two entries equal
    pub checksum: bool,
    /// Report intended actions without touching the destination
    pub dry_run: bool,
    /// Emit a progress line per completed copy
    pub verbose: bool,
}

impl SyncConfig {
    /// Create a configuration with default settings
    ///
    /// Defaults mirror the classic behavior: parallel execution with one
    /// analyzer per CPU, checksums enabled, real (non-dry) run, quiet.
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        SyncConfig {
            source: source.into(),
            destination: destination.into(),
            analyzers: num_cpus::get(),
            parallel: true,
            checksum: true,
            dry_run: false,
            verbose: false,
        }
    }

    /// Set the number of analyzer workers per tree side (minimum 1)
    pub fn with_analyzers(mut self, analyzers: usize) -> Self {
        self.analyzers = analyzers.max(1);
        self
    }

    /// Enable or disable the worker pool
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Enable or disable content checksums
    pub fn with_checksum(mut self, checksum: bool) -> Self {
        self.checksum = checksum;
        self
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable or disable per-copy progress reporting
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Absolute path of `relative_path` under the source root
    pub fn source_path(&self, relative_path: &Path) -> PathBuf {
        self.source.join(relative_path)
    }

    /// Absolute path of `relative_path` under the destination root
    pub fn destination_path(&self, relative_path: &Path) -> PathBuf {
        self.destination.join(relative_path)
    }
}

/// Classified outcome of diffing one path across the two trees
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Path exists only in the source; copy it
    Create(FileEntry),
    /// Path exists on both sides but differs; copy it
    Update(FileEntry),
    /// Path exists only in the destination; preserved, never deleted
    DestinationOnly(FileEntry),
}

impl Action {
    /// The entry this action refers to
    pub fn entry(&self) -> &FileEntry {
        match self {
            Action::Create(entry) | Action::Update(entry) | Action::DestinationOnly(entry) => entry,
        }
    }

    /// Whether this action writes to the destination
    pub fn is_copy(&self) -> bool {
        matches!(self, Action::Create(_) | Action::Update(_))
    }
}

/// Statistics and warnings from a completed synchronization run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    /// Files copied because they were absent from the destination
    pub files_created: usize,
    /// Files copied because metadata or content differed
    pub files_updated: usize,
    /// Files left untouched because both sides were equal
    pub files_unchanged: usize,
    /// Files present only in the destination (preserved)
    pub destination_only: usize,
    /// Total bytes written to the destination
    pub bytes_copied: u64,
    /// Per-entry failures that did not abort the run
    pub warnings: Vec<String>,
    /// Whether this was a dry run (destination untouched)
    pub dry_run: bool,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl SyncReport {
    /// Total number of copy actions (performed or, in a dry run, intended)
    pub fn total_copies(&self) -> usize {
        self.files_created + self.files_updated
    }

    /// Check if the run found any difference between the trees
    pub fn has_changes(&self) -> bool {
        self.total_copies() > 0
    }
}
