//! Utility functions for dirsync
//!
//! Path joining, permission and timestamp restoration, and byte formatting,
//! shared by the prober, the walker, and the reconciler.
//!
//! All functions here are pure or operate on a single path; none hold state.

use crate::error::{Result, SyncError};
use crate::types::ModTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Maximum supported length, in bytes, of a joined path
pub const MAX_PATH_LEN: usize = 4096;

/// Join a directory path and a name with exactly one separator
///
/// Behaves identically whether or not `base` carries a trailing separator.
/// `name` must be a relative path; joining an absolute `name` would replace
/// `base` entirely and is a caller bug.
///
/// # Errors
///
/// Returns [`SyncError::PathTooLong`] when the joined path exceeds
/// [`MAX_PATH_LEN`] bytes.
///
/// # Example
///
/// ```rust
/// use dirsync::utils::join_path;
/// use std::path::{Path, PathBuf};
///
/// let joined = join_path(Path::new("/data/"), Path::new("a/b.txt")).unwrap();
/// assert_eq!(joined, PathBuf::from("/data/a/b.txt"));
/// ```
pub fn join_path(base: &Path, name: &Path) -> Result<PathBuf> {
    let joined = base.join(name);
    if joined.as_os_str().len() > MAX_PATH_LEN {
        return Err(SyncError::PathTooLong {
            path: joined,
            limit: MAX_PATH_LEN,
        });
    }
    Ok(joined)
}

/// Extract permission bits from metadata
#[cfg(unix)]
pub fn mode_of(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

/// Extract permission bits from metadata (Windows implementation)
///
/// Windows has no Unix mode; map the read-only attribute to a familiar
/// octal shape so comparisons stay meaningful.
#[cfg(windows)]
pub fn mode_of(metadata: &fs::Metadata) -> u32 {
    let mut mode = if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    };
    if metadata.is_dir() {
        mode |= 0o111;
    }
    mode
}

/// Set Unix permissions
#[cfg(unix)]
pub fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let permissions = fs::Permissions::from_mode(mode);
    fs::set_permissions(path, permissions)?;
    Ok(())
}

/// Set permissions (Windows implementation)
///
/// Only the read-only attribute can be restored here.
#[cfg(windows)]
pub fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    let metadata = fs::metadata(path)?;
    let mut perms = metadata.permissions();
    perms.set_readonly(mode & 0o200 == 0);
    fs::set_permissions(path, perms)?;
    Ok(())
}

/// Restore a file's modification time
pub fn set_mtime(path: &Path, mtime: ModTime) -> Result<()> {
    filetime::set_file_mtime(path, mtime.to_filetime())?;
    trace!("restored mtime on {:?}", path);
    Ok(())
}

/// Check whether a directory accepts writes
///
/// Probed the honest way: create a scratch file inside it and remove it
/// again. Permission bits alone lie on some mounts.
pub fn is_directory_writable(path: &Path) -> bool {
    let probe = path.join(".dirsync-write-probe");
    match fs::File::create(&probe) {
        Ok(file) => {
            drop(file);
            let _ = fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}

/// Format bytes in human-readable form
///
/// Binary units (1024-based); values under one KiB print as whole numbers.
///
/// # Example
///
/// ```rust
/// use dirsync::utils::format_bytes;
///
/// assert_eq!(format_bytes(1023), "1023 B");
/// assert_eq!(format_bytes(1536), "1.50 KB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_join_path_single_separator() {
        let with_sep = join_path(Path::new("/data/"), Path::new("x.txt")).unwrap();
        let without_sep = join_path(Path::new("/data"), Path::new("x.txt")).unwrap();
        assert_eq!(with_sep, without_sep);
        assert_eq!(with_sep, PathBuf::from("/data/x.txt"));
    }

    #[test]
    fn test_join_path_too_long() {
        let long_name = "x".repeat(MAX_PATH_LEN);
        let err = join_path(Path::new("/data"), Path::new(&long_name)).unwrap_err();
        assert!(matches!(err, SyncError::PathTooLong { .. }));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1_048_576), "1.00 MB");
        assert_eq!(format_bytes(1_073_741_824), "1.00 GB");
    }

    #[test]
    fn test_set_and_read_mtime() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("t.txt");
        fs::write(&file, b"content").unwrap();

        let wanted = ModTime {
            secs: 1_600_000_000,
            nanos: 500_000_000,
        };
        set_mtime(&file, wanted).unwrap();

        let read_back = ModTime::from(fs::metadata(&file).unwrap().modified().unwrap());
        assert_eq!(read_back.secs, wanted.secs);
    }

    #[test]
    fn test_is_directory_writable() {
        let temp_dir = TempDir::new().unwrap();
        assert!(is_directory_writable(temp_dir.path()));
        assert!(!is_directory_writable(Path::new("/nonexistent/surely")));
    }
}
