//! Error types for the blockpack library.
//!
//! The ordering engine recovers from nothing: any error here aborts the
//! build. Errors name the implicated inode by its representative path
//! whenever one is known.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from inode bookkeeping.
///
/// These indicate API misuse by the caller (the walker or the packer)
/// and are treated as fatal.
#[derive(Debug, Error)]
pub enum InodeError {
    /// Metadata or a fingerprint was requested from an inode with no
    /// files attached.
    #[error("inode has no file")]
    NoFile,

    /// `set_files` was called on an inode that already has files.
    #[error("files already set for inode {}", .0.display())]
    AlreadySet(PathBuf),
}

/// Errors surfaced while scanning an inode's content.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The file mapper failed to map the representative file.
    #[error("failed to map {}: {source}", .path.display())]
    Io {
        /// Path of the file being mapped
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The inode had no files attached.
    #[error(transparent)]
    Inode(#[from] InodeError),
}

/// Errors from the ordering engine.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The script policy was selected but no usable ordering hook was
    /// supplied.
    #[error("script cannot order inodes")]
    ScriptCannotOrder,

    /// The nilsimsa ordering loop lost or duplicated inodes. This is a
    /// bug in the engine, never a user error.
    #[error("internal error: nilsimsa ordering emitted {emitted} of {expected} inodes")]
    NilsimsaOrderingInvariantViolated {
        /// Inodes actually emitted
        emitted: usize,
        /// Inodes that were created
        expected: usize,
    },

    /// An inode was missing files mid-ordering.
    #[error(transparent)]
    Inode(#[from] InodeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(InodeError::NoFile.to_string(), "inode has no file");
        assert_eq!(
            InodeError::AlreadySet(PathBuf::from("/data/a")).to_string(),
            "files already set for inode /data/a"
        );
        assert_eq!(
            OrderError::ScriptCannotOrder.to_string(),
            "script cannot order inodes"
        );
        assert_eq!(
            OrderError::NilsimsaOrderingInvariantViolated {
                emitted: 3,
                expected: 4
            }
            .to_string(),
            "internal error: nilsimsa ordering emitted 3 of 4 inodes"
        );
    }
}
