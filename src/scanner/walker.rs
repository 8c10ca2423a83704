//! Directory walking via jwalk.
//!
//! Collects every regular file under a root as a
//! [`SourceFile`](crate::inode::SourceFile). Symlinks are never
//! followed; unreadable entries are logged and skipped rather than
//! aborting the walk. Entries are yielded in sorted order so the
//! insertion order of inodes is reproducible.

use std::path::Path;
use std::sync::atomic::Ordering;

use jwalk::WalkDir;

use crate::inode::SourceFile;
use crate::progress::ProgressSnapshot;

use super::WalkError;

/// Walk `root` and collect all regular files.
///
/// Updates `progress.files_found` as files are discovered.
pub fn walk(root: &Path, progress: &ProgressSnapshot) -> Result<Vec<SourceFile>, WalkError> {
    if !root.exists() {
        return Err(WalkError::NotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(WalkError::NotADirectory(root.to_path_buf()));
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(root).skip_hidden(false).sort(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("skipping unreadable entry: {e}");
                continue;
            }
        };

        let file_type = entry.file_type();
        if !file_type.is_file() || file_type.is_symlink() {
            continue;
        }

        let path = entry.path();
        let metadata = match std::fs::symlink_metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                log::warn!("skipping {}: {e}", path.display());
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        files.push(SourceFile::new(path, metadata.len()));
        progress.files_found.fetch_add(1, Ordering::Relaxed);
    }

    log::debug!("walk found {} regular files", files.len());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_walk_collects_regular_files() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        File::create(dir.path().join("a.txt"))
            .unwrap()
            .write_all(b"aaa")
            .unwrap();
        File::create(dir.path().join("sub/b.txt"))
            .unwrap()
            .write_all(b"bb")
            .unwrap();

        let progress = ProgressSnapshot::default();
        let files = walk(dir.path(), &progress).unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(progress.files_found.load(Ordering::Relaxed), 2);

        let sizes: Vec<u64> = files.iter().map(|f| f.size).collect();
        assert!(sizes.contains(&3));
        assert!(sizes.contains(&2));
    }

    #[test]
    fn test_walk_missing_root_fails() {
        let progress = ProgressSnapshot::default();
        let result = walk(Path::new("/definitely/not/here"), &progress);
        assert!(matches!(result, Err(WalkError::NotFound(_))));
    }

    #[test]
    fn test_walk_file_root_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file");
        File::create(&path).unwrap();

        let progress = ProgressSnapshot::default();
        let result = walk(&path, &progress);
        assert!(matches!(result, Err(WalkError::NotADirectory(_))));
    }

    #[test]
    fn test_walk_is_deterministic() {
        let dir = tempdir().unwrap();
        for name in ["c", "a", "b"] {
            File::create(dir.path().join(name)).unwrap();
        }

        let progress = ProgressSnapshot::default();
        let first = walk(dir.path(), &progress).unwrap();
        let second = walk(dir.path(), &progress).unwrap();
        assert_eq!(first, second);
    }
}
