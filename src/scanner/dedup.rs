//! Content-level deduplication.
//!
//! # Overview
//!
//! Groups files by exact byte content in two phases, mirroring the
//! classic duplicate-detection pipeline:
//!
//! 1. **Size grouping**: files with different sizes cannot share
//!    content, so most files are separated without any I/O.
//! 2. **Content hashing**: within each multi-file size group, a BLAKE3
//!    hash of the full content splits the group into identity classes.
//!
//! Every empty file lands in one shared group, so the builder creates
//! at most one empty inode. The returned groups are sorted by
//! representative path, making inode creation order reproducible.

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::Path;

use crate::inode::SourceFile;

/// Summary of one dedup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupStats {
    /// Files considered
    pub total_files: usize,
    /// Distinct content identities (inodes to create)
    pub unique_contents: usize,
    /// Files collapsed into another file's identity
    pub duplicate_files: usize,
    /// Files with zero size
    pub empty_files: usize,
}

/// Hash a file's full content.
fn content_hash(path: &Path) -> io::Result<blake3::Hash> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize())
}

/// Collapse `files` into groups of identical content.
///
/// Files that fail to hash are kept as singleton groups; a read error
/// must never cause two different files to be merged.
pub fn dedup_files(files: Vec<SourceFile>) -> (Vec<Vec<SourceFile>>, DedupStats) {
    let mut stats = DedupStats {
        total_files: files.len(),
        ..Default::default()
    };

    let mut by_size: HashMap<u64, Vec<SourceFile>> = HashMap::new();
    for file in files {
        by_size.entry(file.size).or_default().push(file);
    }

    let mut groups: Vec<Vec<SourceFile>> = Vec::new();

    for (size, mut candidates) in by_size {
        if size == 0 {
            stats.empty_files = candidates.len();
            candidates.sort_by(|a, b| a.path.cmp(&b.path));
            groups.push(candidates);
            continue;
        }

        if candidates.len() == 1 {
            groups.push(candidates);
            continue;
        }

        let mut by_hash: HashMap<blake3::Hash, Vec<SourceFile>> = HashMap::new();
        for file in candidates {
            match content_hash(&file.path) {
                Ok(hash) => by_hash.entry(hash).or_default().push(file),
                Err(e) => {
                    log::warn!("failed to hash {}: {e}", file.path.display());
                    groups.push(vec![file]);
                }
            }
        }
        for (_, mut group) in by_hash {
            group.sort_by(|a, b| a.path.cmp(&b.path));
            groups.push(group);
        }
    }

    groups.sort_by(|a, b| a[0].path.cmp(&b[0].path));

    stats.unique_contents = groups.len();
    stats.duplicate_files = stats.total_files.saturating_sub(groups.len());
    (groups, stats)
}
