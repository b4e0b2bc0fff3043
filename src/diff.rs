//! Tree difference computation
//!
//! Both trees' file lists are sorted by relative path, so one linear
//! two-pointer merge classifies every path in O(n + m): present only in the
//! source (copy it), present only in the destination (preserved, but
//! reported), or present in both (compare).
//!
//! ## Comparison order
//!
//! Metadata is strictly cheaper than content, so [`mismatch`] checks size
//! and mtime first and treats any difference there as decisive - a file
//! whose timestamp changed is copied even if its bytes happen to be
//! identical. Content hashing only ever runs on a pair that already agrees
//! on size and time, and only when checksums are enabled. A hash that cannot
//! be computed counts as a mismatch: re-copying a file is cheap, silently
//! keeping a possibly stale one is not.

use crate::file_list::FileList;
use crate::probe;
use crate::types::{Action, ContentHash, FileEntry};
use crate::utils;
use std::cmp::Ordering;
use std::path::Path;
use tracing::{debug, warn};

/// Inputs the diff needs beyond the two lists
///
/// The roots are required because hashes may be computed on demand, which
/// means opening the actual files behind the entries.
#[derive(Debug, Clone, Copy)]
pub struct DiffContext<'a> {
    /// Root of the source tree
    pub source_root: &'a Path,
    /// Root of the destination tree
    pub dest_root: &'a Path,
    /// Whether equal metadata must also be backed by equal content hashes
    pub checksum: bool,
}

/// Merge two path-ordered lists into a classified action sequence
///
/// Actions come out in ascending path order. Destination-only paths are
/// emitted as [`Action::DestinationOnly`] so callers can report them; no
/// deletion is ever performed.
pub fn diff(source: &FileList, dest: &FileList, ctx: &DiffContext<'_>) -> Vec<Action> {
    let mut actions = Vec::new();
    let mut source_iter = source.iter().peekable();
    let mut dest_iter = dest.iter().peekable();

    loop {
        match (source_iter.peek(), dest_iter.peek()) {
            (Some(src), Some(dst)) => match src.relative_path.cmp(&dst.relative_path) {
                Ordering::Less => {
                    actions.push(Action::Create((*src).clone()));
                    source_iter.next();
                }
                Ordering::Greater => {
                    actions.push(Action::DestinationOnly((*dst).clone()));
                    dest_iter.next();
                }
                Ordering::Equal => {
                    if mismatch(src, dst, ctx) {
                        actions.push(Action::Update((*src).clone()));
                    }
                    source_iter.next();
                    dest_iter.next();
                }
            },
            (Some(src), None) => {
                actions.push(Action::Create((*src).clone()));
                source_iter.next();
            }
            (None, Some(dst)) => {
                actions.push(Action::DestinationOnly((*dst).clone()));
                dest_iter.next();
            }
            (None, None) => break,
        }
    }

    let copies = actions.iter().filter(|a| a.is_copy()).count();
    debug!(
        "diff: {} source entries, {} destination entries, {} copies pending",
        source.len(),
        dest.len(),
        copies
    );
    actions
}

/// Decide whether a source/destination pair differs enough to copy
///
/// Deterministic: the same two entries with the same `ctx` always yield the
/// same verdict.
pub fn mismatch(src: &FileEntry, dst: &FileEntry, ctx: &DiffContext<'_>) -> bool {
    if src.size != dst.size || src.mtime != dst.mtime {
        return true;
    }
    if !ctx.checksum {
        return false;
    }

    let src_digest = digest_of(src, ctx.source_root);
    let dst_digest = digest_of(dst, ctx.dest_root);
    match (src_digest, dst_digest) {
        (Some(a), Some(b)) => a != b,
        // Unhashable on either side: assume mismatch rather than skip.
        _ => true,
    }
}

/// An entry's digest: reuse the probed one, otherwise compute it now
fn digest_of(entry: &FileEntry, root: &Path) -> Option<ContentHash> {
    if let Some(digest) = entry.content_hash {
        return Some(digest);
    }
    let result = utils::join_path(root, &entry.relative_path).and_then(|path| probe::hash_file(&path));
    match result {
        Ok(digest) => Some(digest),
        Err(e) => {
            warn!("hashing {:?} failed: {}", entry.relative_path, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntryKind, ModTime};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn file_entry(path: &str, size: u64, secs: i64) -> FileEntry {
        FileEntry {
            relative_path: PathBuf::from(path),
            kind: EntryKind::File,
            mode: 0o644,
            mtime: ModTime { secs, nanos: 0 },
            size,
            content_hash: None,
        }
    }

    fn list_of(entries: Vec<FileEntry>) -> FileList {
        let mut list = FileList::new();
        for entry in entries {
            list.insert_sorted(entry).unwrap();
        }
        list
    }

    /// Roots that do not exist: any attempted hash fails loudly as a
    /// mismatch, so a no-action verdict proves hashing was never invoked.
    fn no_hash_ctx(checksum: bool) -> DiffContext<'static> {
        DiffContext {
            source_root: Path::new("/dirsync-test/no-such-source"),
            dest_root: Path::new("/dirsync-test/no-such-dest"),
            checksum,
        }
    }

    #[test]
    fn test_identical_lists_no_actions() {
        let source = list_of(vec![file_entry("a.txt", 10, 100), file_entry("b.txt", 20, 200)]);
        let dest = list_of(vec![file_entry("a.txt", 10, 100), file_entry("b.txt", 20, 200)]);

        let actions = diff(&source, &dest, &no_hash_ctx(false));
        assert!(actions.is_empty());
    }

    #[test]
    fn test_source_only_yields_create() {
        let source = list_of(vec![file_entry("a/b.txt", 100, 50)]);
        let dest = FileList::new();

        let actions = diff(&source, &dest, &no_hash_ctx(false));
        assert_eq!(actions.len(), 1);
        assert!(matches!(&actions[0], Action::Create(e) if e.relative_path == PathBuf::from("a/b.txt")));
    }

    #[test]
    fn test_destination_only_is_distinguishable() {
        let source = FileList::new();
        let dest = list_of(vec![file_entry("stale.txt", 5, 10)]);

        let actions = diff(&source, &dest, &no_hash_ctx(false));
        assert_eq!(actions.len(), 1);
        assert!(matches!(&actions[0], Action::DestinationOnly(_)));
        assert!(!actions[0].is_copy());
    }

    #[test]
    fn test_size_difference_yields_update() {
        let source = list_of(vec![file_entry("x.txt", 10, 100)]);
        let dest = list_of(vec![file_entry("x.txt", 11, 100)]);

        let actions = diff(&source, &dest, &no_hash_ctx(false));
        assert!(matches!(&actions[0], Action::Update(_)));
    }

    #[test]
    fn test_nanosecond_difference_yields_update() {
        let mut src = file_entry("x.txt", 10, 100);
        let mut dst = file_entry("x.txt", 10, 100);
        src.mtime.nanos = 1;
        dst.mtime.nanos = 2;

        assert!(mismatch(&src, &dst, &no_hash_ctx(false)));
    }

    #[test]
    fn test_time_differs_update_even_with_equal_hashes() {
        // Touched but same content: time is a primary signal, checked
        // before and independently of hashing.
        let mut src = file_entry("x.txt", 10, 100);
        let mut dst = file_entry("x.txt", 10, 999);
        let digest = [0xab; 16];
        src.content_hash = Some(digest);
        dst.content_hash = Some(digest);

        assert!(mismatch(&src, &dst, &no_hash_ctx(true)));
    }

    #[test]
    fn test_equal_metadata_no_hashing_when_disabled() {
        // Bogus roots would make any hash attempt fail as a mismatch; the
        // no-action outcome proves hash_file was not called.
        let source = list_of(vec![file_entry("y.txt", 10, 100)]);
        let dest = list_of(vec![file_entry("y.txt", 10, 100)]);

        let actions = diff(&source, &dest, &no_hash_ctx(false));
        assert!(actions.is_empty());
    }

    #[test]
    fn test_equal_metadata_precomputed_hash_difference_yields_update() {
        let mut src = file_entry("z.txt", 10, 100);
        let mut dst = file_entry("z.txt", 10, 100);
        src.content_hash = Some([0x01; 16]);
        dst.content_hash = Some([0x02; 16]);

        assert!(mismatch(&src, &dst, &no_hash_ctx(true)));
    }

    #[test]
    fn test_equal_metadata_hash_failure_is_mismatch() {
        // No precomputed digests and unreadable roots: lazy hashing fails,
        // which must favor re-copying.
        let src = file_entry("z.txt", 10, 100);
        let dst = file_entry("z.txt", 10, 100);

        assert!(mismatch(&src, &dst, &no_hash_ctx(true)));
    }

    #[test]
    fn test_lazy_hash_computed_from_disk() {
        let src_dir = TempDir::new().unwrap();
        let dst_dir = TempDir::new().unwrap();
        fs::write(src_dir.path().join("f.txt"), b"same bytes").unwrap();
        fs::write(dst_dir.path().join("f.txt"), b"same bytes").unwrap();

        let ctx = DiffContext {
            source_root: src_dir.path(),
            dest_root: dst_dir.path(),
            checksum: true,
        };
        let src = file_entry("f.txt", 10, 100);
        let dst = file_entry("f.txt", 10, 100);
        assert!(!mismatch(&src, &dst, &ctx));

        fs::write(dst_dir.path().join("f.txt"), b"diff bytes").unwrap();
        assert!(mismatch(&src, &dst, &ctx));
    }

    #[test]
    fn test_mismatch_deterministic() {
        let src = file_entry("d.txt", 10, 100);
        let dst = file_entry("d.txt", 10, 100);
        let ctx = no_hash_ctx(true);

        let first = mismatch(&src, &dst, &ctx);
        for _ in 0..5 {
            assert_eq!(mismatch(&src, &dst, &ctx), first);
        }
    }

    #[test]
    fn test_merge_interleaves_in_path_order() {
        let source = list_of(vec![
            file_entry("a.txt", 1, 1),
            file_entry("c.txt", 1, 1),
            file_entry("e.txt", 1, 1),
        ]);
        let dest = list_of(vec![file_entry("b.txt", 1, 1), file_entry("c.txt", 1, 1)]);

        let actions = diff(&source, &dest, &no_hash_ctx(false));
        let described: Vec<_> = actions
            .iter()
            .map(|a| (a.entry().relative_path.clone(), a.is_copy()))
            .collect();
        assert_eq!(
            described,
            vec![
                (PathBuf::from("a.txt"), true),
                (PathBuf::from("b.txt"), false),
                (PathBuf::from("e.txt"), true),
            ]
        );
    }
}
