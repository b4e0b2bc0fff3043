//! Entry metadata probing and content hashing
//!
//! The prober answers one question: what does the filesystem say about this
//! path right now? It fills a [`FileEntry`] from a single stat call and
//! classifies the object as a file or directory; anything else (sockets,
//! FIFOs, device nodes) is rejected as unsupported.
//!
//! Hashing is deliberately a separate operation. Probing every file is cheap;
//! hashing every file is not, and most comparisons are already decided by
//! size and mtime alone. The diff engine invokes [`hash_file`] only on pairs
//! whose metadata agrees, and parallel-mode analyzers invoke it up front only
//! when the run has checksums enabled.

use crate::error::{Result, SyncError};
use crate::types::{ContentHash, EntryKind, FileEntry, ModTime};
use crate::utils;
use md5::{Digest, Md5};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::{fs, io};

/// Chunk size for streaming hash computation
const HASH_BUF_LEN: usize = 8192;

/// Probe a path's metadata into a [`FileEntry`]
///
/// Uses the platform's default stat semantics (`fs::metadata`, which follows
/// symlinks like the classic stat call does). The returned entry carries no
/// content hash; see [`hash_file`].
///
/// # Errors
///
/// - [`SyncError::NotFound`] if the path does not exist
/// - [`SyncError::UnsupportedEntryKind`] for non-file, non-directory objects
/// - [`SyncError::Io`] for any other stat failure
pub fn probe(root: &Path, relative_path: &Path) -> Result<FileEntry> {
    let full_path = utils::join_path(root, relative_path)?;
    let metadata = match fs::metadata(&full_path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(SyncError::NotFound(full_path));
        }
        Err(e) => return Err(e.into()),
    };

    let file_type = metadata.file_type();
    let kind = if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_file() {
        EntryKind::File
    } else {
        return Err(SyncError::UnsupportedEntryKind(full_path));
    };

    Ok(FileEntry {
        relative_path: relative_path.to_path_buf(),
        kind,
        mode: utils::mode_of(&metadata),
        mtime: ModTime::from(metadata.modified()?),
        size: match kind {
            EntryKind::File => metadata.len(),
            EntryKind::Directory => 0,
        },
        content_hash: None,
    })
}

/// Compute a file's MD5 digest by streaming its content
///
/// Reads the file in fixed-size chunks through an incremental hasher, so
/// memory use is constant regardless of file size.
///
/// # Errors
///
/// - [`SyncError::NotFound`] if the file does not exist
/// - [`SyncError::Io`] on any open or read failure
pub fn hash_file(path: &Path) -> Result<ContentHash> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(SyncError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let mut hasher = Md5::new();
    let mut buffer = [0u8; HASH_BUF_LEN];
    loop {
        let bytes_read = read_retrying(&mut file, &mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().into())
}

fn read_retrying(file: &mut File, buffer: &mut [u8]) -> io::Result<usize> {
    loop {
        match file.read(buffer) {
            Ok(n) => return Ok(n),
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_probe_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("f.txt"), b"hello").unwrap();

        let entry = probe(temp_dir.path(), Path::new("f.txt")).unwrap();
        assert_eq!(entry.kind, EntryKind::File);
        assert_eq!(entry.size, 5);
        assert_eq!(entry.relative_path, PathBuf::from("f.txt"));
        assert!(entry.content_hash.is_none());
        assert!(entry.mtime.secs > 0);
    }

    #[test]
    fn test_probe_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("sub")).unwrap();

        let entry = probe(temp_dir.path(), Path::new("sub")).unwrap();
        assert_eq!(entry.kind, EntryKind::Directory);
        assert_eq!(entry.size, 0);
    }

    #[test]
    fn test_probe_missing_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let err = probe(temp_dir.path(), Path::new("ghost.txt")).unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[test]
    fn test_hash_file_known_digest() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("h.txt");
        fs::write(&path, b"hello world").unwrap();

        let digest = hash_file(&path).unwrap();
        assert_eq!(hex::encode(digest), "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[test]
    fn test_hash_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty");
        fs::write(&path, b"").unwrap();

        let digest = hash_file(&path).unwrap();
        assert_eq!(hex::encode(digest), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_hash_missing_is_not_found() {
        let err = hash_file(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }
}
