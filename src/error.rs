//! Error types for the dirsync library
//!
//! This module defines all error types that can occur during a synchronization
//! run. The taxonomy distinguishes per-entry failures (a single file that
//! cannot be probed or copied) from run-terminal failures (an unreadable
//! directory, a lost worker): callers decide which is which, the type only
//! carries the facts.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the dirsync library
pub type Result<T> = std::result::Result<T, SyncError>;

/// Main error type for all dirsync operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Path does not exist
    #[error("Not found: {0:?}")]
    NotFound(PathBuf),

    /// Directory cannot be opened for enumeration
    #[error("Directory not found or unreadable: {0:?}")]
    DirectoryNotFound(PathBuf),

    /// Joined path exceeds the maximum supported length
    #[error("Path too long: {path:?} exceeds {limit} bytes")]
    PathTooLong {
        /// The offending joined path
        path: PathBuf,
        /// The configured length limit
        limit: usize,
    },

    /// Filesystem object is neither a regular file nor a directory
    #[error("Unsupported entry kind: {0:?}")]
    UnsupportedEntryKind(PathBuf),

    /// Insertion of a path that is already present in a file list
    #[error("Duplicate path in file list: {0:?}")]
    DuplicatePath(PathBuf),

    /// A worker exited, stalled, or panicked without confirming termination
    #[error("Worker lost: {0}")]
    WorkerLost(String),

    /// A message channel disconnected while the run still needed it
    #[error("Channel closed: {0}")]
    ChannelClosed(&'static str),
}

impl SyncError {
    /// Create a worker-lost error with a custom message
    pub fn worker_lost(msg: impl Into<String>) -> Self {
        SyncError::WorkerLost(msg.into())
    }

    /// Check whether this error is fatal to the whole run
    ///
    /// Per-entry failures (a file that vanished between listing and probing,
    /// an unreadable file) are reported and skipped; coordination and
    /// enumeration failures abort the run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::DirectoryNotFound(_)
                | SyncError::WorkerLost(_)
                | SyncError::ChannelClosed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyncError::DuplicatePath(PathBuf::from("a/b.txt"));
        assert_eq!(err.to_string(), "Duplicate path in file list: \"a/b.txt\"");
    }

    #[test]
    fn test_error_fatality() {
        assert!(SyncError::WorkerLost("source lister".to_string()).is_fatal());
        assert!(SyncError::DirectoryNotFound(PathBuf::from("/nope")).is_fatal());
        assert!(!SyncError::NotFound(PathBuf::from("x.txt")).is_fatal());
    }
}
