//! Directory traversal
//!
//! Traversal runs in two decoupled passes: first enumerate the tree into a
//! plain list of relative file paths, then probe each path for metadata.
//! Keeping the passes separate means directory reads and stat calls can be
//! parallelized independently - in parallel mode the lister workers run the
//! first pass and the analyzer workers run the second.
//!
//! The self and parent pseudo-entries never appear; directories are recursed
//! into but not recorded, so a walked list contains file entries only. An
//! unreadable directory aborts the whole walk - an incomplete enumeration
//! would produce a wrong diff, which is worse than no diff.

use crate::error::{Result, SyncError};
use crate::file_list::FileList;
use crate::probe;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Recursively enumerate the file paths under `root`
///
/// Returns paths relative to `root`, in unspecified order (ordering is
/// established later by sorted insertion, not by traversal). Symlinks are
/// not followed during traversal.
///
/// # Errors
///
/// - [`SyncError::DirectoryNotFound`] if `root` or any directory below it
///   cannot be opened
pub fn collect_paths(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(SyncError::DirectoryNotFound(root.to_path_buf()));
    }

    let mut paths = Vec::new();
    for dir_entry in WalkDir::new(root).min_depth(1).follow_links(false) {
        let dir_entry = dir_entry.map_err(|e| {
            let failed = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf());
            SyncError::DirectoryNotFound(failed)
        })?;

        if !dir_entry.file_type().is_file() {
            continue;
        }
        match dir_entry.path().strip_prefix(root) {
            Ok(relative) => paths.push(relative.to_path_buf()),
            Err(_) => warn!("entry outside root, skipping: {:?}", dir_entry.path()),
        }
    }
    Ok(paths)
}

/// Walk a tree into a fully probed, sorted [`FileList`]
///
/// Sequential-mode traversal: enumerate, then probe every path inline. A
/// probe failure on a single file (vanished mid-walk, unreadable) is logged
/// and the entry skipped; only enumeration failures abort.
pub fn walk_tree(root: &Path) -> Result<FileList> {
    let started = Instant::now();
    let paths = collect_paths(root)?;

    let mut list = FileList::with_capacity(paths.len());
    for relative_path in paths {
        match probe::probe(root, &relative_path) {
            Ok(entry) => {
                if let Err(e) = list.insert_sorted(entry) {
                    warn!("ignoring duplicate entry: {}", e);
                }
            }
            Err(e) => warn!("skipping {:?}: {}", relative_path, e),
        }
    }

    debug!(
        "walked {:?}: {} files in {:?}",
        root,
        list.len(),
        started.elapsed()
    );
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn build_tree(root: &Path) {
        fs::create_dir_all(root.join("sub/inner")).unwrap();
        fs::write(root.join("top.txt"), b"top").unwrap();
        fs::write(root.join("sub/mid.txt"), b"mid").unwrap();
        fs::write(root.join("sub/inner/deep.txt"), b"deep").unwrap();
    }

    #[test]
    fn test_collect_paths_files_only() {
        let temp_dir = TempDir::new().unwrap();
        build_tree(temp_dir.path());

        let mut paths = collect_paths(temp_dir.path()).unwrap();
        paths.sort();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("sub/inner/deep.txt"),
                PathBuf::from("sub/mid.txt"),
                PathBuf::from("top.txt"),
            ]
        );
    }

    #[test]
    fn test_collect_paths_missing_root() {
        let err = collect_paths(Path::new("/no/such/tree")).unwrap_err();
        assert!(matches!(err, SyncError::DirectoryNotFound(_)));
    }

    #[test]
    fn test_walk_tree_sorted_and_probed() {
        let temp_dir = TempDir::new().unwrap();
        build_tree(temp_dir.path());

        let list = walk_tree(temp_dir.path()).unwrap();
        assert_eq!(list.len(), 3);

        let paths: Vec<_> = list.iter().map(|e| e.relative_path.clone()).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);

        let deep = list
            .find_by_path(Path::new("sub/inner/deep.txt"))
            .expect("probed entry present");
        assert_eq!(deep.size, 4);
    }

    #[test]
    fn test_walk_tree_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let list = walk_tree(temp_dir.path()).unwrap();
        assert!(list.is_empty());
    }
}
