//! Typed inter-worker message protocol
//!
//! Workers and the coordinator never share memory; everything they exchange
//! travels as a [`Message`] over a channel. The protocol is a closed enum,
//! decoded exhaustively in each worker's receive loop, so an unhandled
//! message shape is a compile error rather than a runtime surprise.
//!
//! Worker-to-coordinator traffic is wrapped in an [`Envelope`] carrying the
//! sender's [`WorkerId`] - the coordinator routes replies and counts
//! confirmations by sender identity. Coordinator-to-worker traffic needs no
//! envelope: each worker (or worker group) owns its command channel, and the
//! channel is the address.

use crate::types::FileEntry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Which tree a worker serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeSide {
    /// The tree being mirrored from
    Source,
    /// The tree being mirrored into
    Destination,
}

impl TreeSide {
    /// Both sides, in a fixed order usable as an array index
    pub const BOTH: [TreeSide; 2] = [TreeSide::Source, TreeSide::Destination];

    /// Stable index for side-keyed arrays
    pub fn index(self) -> usize {
        match self {
            TreeSide::Source => 0,
            TreeSide::Destination => 1,
        }
    }
}

impl fmt::Display for TreeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeSide::Source => write!(f, "source"),
            TreeSide::Destination => write!(f, "destination"),
        }
    }
}

/// What a worker does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerRole {
    /// Enumerates paths in a tree
    Lister,
    /// Probes metadata (and hashes) for individual paths
    Analyzer,
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerRole::Lister => write!(f, "lister"),
            WorkerRole::Analyzer => write!(f, "analyzer"),
        }
    }
}

/// Identity of one worker: side, role, and index within the role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerId {
    /// Tree side the worker serves
    pub side: TreeSide,
    /// Lister or analyzer
    pub role: WorkerRole,
    /// Index within (side, role); listers are always index 0
    pub index: usize,
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.side, self.role, self.index)
    }
}

/// One unit of inter-worker communication
///
/// Entry-carrying variants transport the full wire payload: bounded relative
/// path, mode, mtime (seconds + nanoseconds), size, optional 16-byte content
/// hash, and entry kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Coordinator directs a lister at a tree root to enumerate
    AnalyzeDir(PathBuf),
    /// Request to probe (and hash, when enabled) one discovered entry
    AnalyzeFile(FileEntry),
    /// Analyzer returns an entry with completed metadata
    FileAnalyzed(FileEntry),
    /// Sender could not analyze the named path
    ///
    /// From an analyzer this is a per-entry failure (the coordinator logs
    /// and skips); from a lister it means tree enumeration itself failed,
    /// which is fatal to the run.
    AnalyzeFailed(PathBuf),
    /// Lister streams one discovered path (pre-probe entry)
    FileEntry(FileEntry),
    /// Sender has no more entries
    ListComplete,
    /// Coordinator requests shutdown
    Terminate,
    /// Worker confirms shutdown
    TerminateOk,
}

/// A worker-to-coordinator message with its sender's identity attached
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Which worker sent this
    pub from: WorkerId,
    /// The message itself
    pub message: Message,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_index_roundtrip() {
        for side in TreeSide::BOTH {
            assert_eq!(TreeSide::BOTH[side.index()], side);
        }
    }

    #[test]
    fn test_worker_id_display() {
        let id = WorkerId {
            side: TreeSide::Destination,
            role: WorkerRole::Analyzer,
            index: 3,
        };
        assert_eq!(id.to_string(), "destination analyzer 3");
    }
}
