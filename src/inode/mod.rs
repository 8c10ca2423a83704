//! Inode objects: deduplicated content identities.
//!
//! # Overview
//!
//! An inode represents one unique file content. It carries the set of
//! source files that dedup to that content, the two similarity
//! fingerprints computed during the scan phase, and the chunk list
//! filled in by the downstream packer. The ordering engine consumes
//! inodes through the [`Inode`] trait so tests can substitute doubles;
//! [`FileInode`] is the one concrete implementation.
//!
//! # Lifecycle
//!
//! Inodes are created during the walk, receive their files exactly
//! once, are fingerprinted by [`Inode::scan`], ordered and numbered
//! exactly once, then surrendered to the packer.

use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use serde::{Deserialize, Serialize};

use crate::config::InodeOptions;
use crate::error::{InodeError, ScanError};
use crate::mapper::FileMapper;
use crate::similarity::{Nilsimsa, NilsimsaDigest, SimilarityHasher};

/// Sentinel for an inode that has not been numbered yet.
pub const UNASSIGNED: u32 = u32::MAX;

/// Size of the scan window fed to the fingerprint hashers.
///
/// After each full window the mapper is told to release the consumed
/// prefix, so peak RSS stays bounded for arbitrarily large files.
pub const SCAN_WINDOW: u64 = 16 * 1024 * 1024;

/// One source file feeding an inode.
///
/// All files attached to the same inode have identical size and byte
/// content; the dedup layer guarantees this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path of the file
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
}

impl SourceFile {
    /// Create a new source file entry.
    #[must_use]
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self { path, size }
    }

    /// The final path component.
    #[must_use]
    pub fn name(&self) -> Cow<'_, str> {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default()
    }
}

/// One chunk of an inode's content in the output archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Output block holding the chunk
    pub block: usize,
    /// Offset within the block
    pub offset: usize,
    /// Chunk size in bytes
    pub size: usize,
}

/// Capability set of a deduplicated content identity.
pub trait Inode: Send + Sync + fmt::Debug {
    /// Assign the inode number. Called exactly once, by the ordering
    /// engine.
    fn set_num(&self, num: u32);

    /// The assigned inode number, or [`UNASSIGNED`].
    fn num(&self) -> u32;

    /// Attach the source files sharing this content. Fails with
    /// [`InodeError::AlreadySet`] on a second call.
    fn set_files(&self, files: Vec<SourceFile>) -> Result<(), InodeError>;

    /// The attached files, empty if none were set yet.
    fn files(&self) -> &[SourceFile];

    /// The representative file (the first one attached).
    fn any(&self) -> Result<&SourceFile, InodeError>;

    /// Byte size of the content.
    fn size(&self) -> Result<u64, InodeError>;

    /// Stream the content through the enabled fingerprint hashers.
    fn scan(&self, mapper: &dyn FileMapper, options: &InodeOptions) -> Result<(), ScanError>;

    /// The 32-bit coarse similarity hash. Zero until a scan with
    /// `with_similarity` ran.
    fn similarity_hash(&self) -> Result<u32, InodeError>;

    /// The 256-bit nilsimsa digest. All-zero until a scan with
    /// `with_nilsimsa` ran.
    fn nilsimsa_similarity_hash(&self) -> Result<NilsimsaDigest, InodeError>;

    /// Record one output chunk for this inode.
    fn add_chunk(&self, block: usize, offset: usize, size: usize);

    /// Append this inode's chunks to `out`.
    fn append_chunks_to(&self, out: &mut Vec<Chunk>);
}

/// Shared handle to an inode.
pub type InodeRef = Arc<dyn Inode>;

/// The concrete inode used by the builder.
#[derive(Debug)]
pub struct FileInode {
    num: AtomicU32,
    files: OnceLock<Vec<SourceFile>>,
    similarity_hash: OnceLock<u32>,
    nilsimsa_hash: OnceLock<NilsimsaDigest>,
    chunks: Mutex<Vec<Chunk>>,
}

impl FileInode {
    /// Create an unnumbered inode with no files attached.
    #[must_use]
    pub fn new() -> Self {
        Self {
            num: AtomicU32::new(UNASSIGNED),
            files: OnceLock::new(),
            similarity_hash: OnceLock::new(),
            nilsimsa_hash: OnceLock::new(),
            chunks: Mutex::new(Vec::new()),
        }
    }
}

impl Default for FileInode {
    fn default() -> Self {
        Self::new()
    }
}

impl Inode for FileInode {
    fn set_num(&self, num: u32) {
        self.num.store(num, Ordering::Relaxed);
    }

    fn num(&self) -> u32 {
        self.num.load(Ordering::Relaxed)
    }

    fn set_files(&self, files: Vec<SourceFile>) -> Result<(), InodeError> {
        debug_assert!(!files.is_empty(), "inode files must not be empty");
        self.files.set(files).map_err(|_| {
            let path = self
                .files
                .get()
                .and_then(|f| f.first())
                .map(|f| f.path.clone())
                .unwrap_or_default();
            InodeError::AlreadySet(path)
        })
    }

    fn files(&self) -> &[SourceFile] {
        self.files.get().map_or(&[], Vec::as_slice)
    }

    fn any(&self) -> Result<&SourceFile, InodeError> {
        self.files().first().ok_or(InodeError::NoFile)
    }

    fn size(&self) -> Result<u64, InodeError> {
        Ok(self.any()?.size)
    }

    fn scan(&self, mapper: &dyn FileMapper, options: &InodeOptions) -> Result<(), ScanError> {
        if !options.needs_scan() {
            return Ok(());
        }

        let file = self.any()?;
        let size = file.size;

        if size > 0 {
            let mapping = mapper
                .map_file(&file.path, size)
                .map_err(|source| ScanError::Io {
                    path: file.path.clone(),
                    source,
                })?;

            let mut similarity = options.with_similarity.then(SimilarityHasher::new);
            let mut nilsimsa = options.with_nilsimsa.then(Nilsimsa::new);

            let mut update = |bytes: &[u8]| {
                if let Some(hasher) = similarity.as_mut() {
                    hasher.update(bytes);
                }
                if let Some(hasher) = nilsimsa.as_mut() {
                    hasher.update(bytes);
                }
            };

            let window = SCAN_WINDOW as usize;
            let mut offset = 0usize;
            while offset + window <= size as usize {
                update(&mapping.view_bytes_at(offset)[..window]);
                offset += window;
                mapping.release_up_to(offset);
            }
            if offset < size as usize {
                update(&mapping.view_bytes_at(offset)[..size as usize - offset]);
            }

            if let Some(hasher) = similarity {
                let _ = self.similarity_hash.set(hasher.finalize());
            }
            if let Some(hasher) = nilsimsa {
                let _ = self.nilsimsa_hash.set(hasher.finalize());
            }
        }

        Ok(())
    }

    fn similarity_hash(&self) -> Result<u32, InodeError> {
        self.any()?;
        Ok(self.similarity_hash.get().copied().unwrap_or(0))
    }

    fn nilsimsa_similarity_hash(&self) -> Result<NilsimsaDigest, InodeError> {
        self.any()?;
        Ok(self.nilsimsa_hash.get().copied().unwrap_or_default())
    }

    fn add_chunk(&self, block: usize, offset: usize, size: usize) {
        self.chunks.lock().unwrap().push(Chunk {
            block,
            offset,
            size,
        });
    }

    fn append_chunks_to(&self, out: &mut Vec<Chunk>) {
        out.extend(self.chunks.lock().unwrap().iter().copied());
    }
}
