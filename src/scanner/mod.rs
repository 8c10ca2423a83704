//! Source tree scanning: directory walking and content deduplication.
//!
//! # Overview
//!
//! The scanner turns a directory tree into groups of identical files,
//! one group per future inode:
//!
//! 1. [`walker`]: parallel directory traversal collecting regular
//!    files as [`SourceFile`](crate::inode::SourceFile) entries.
//! 2. [`dedup`]: size grouping, then BLAKE3 content hashing within
//!    each size group, collapsing byte-identical files.
//!
//! Both phases report into the shared progress snapshot.

pub mod dedup;
pub mod walker;

pub use dedup::{dedup_files, DedupStats};
pub use walker::walk;

use std::path::PathBuf;

/// Errors that can occur while walking the source tree.
#[derive(thiserror::Error, Debug)]
pub enum WalkError {
    /// The root path was not found.
    #[error("path not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The root path is not a directory.
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}
