//! Windowed read-only file mapping.
//!
//! # Overview
//!
//! The inode scan streams file contents through the fingerprint hashers
//! in fixed windows. [`FileMapper`] abstracts how the bytes are
//! produced so tests can substitute in-memory data; the production
//! implementation is [`MmapFileMapper`], which memory-maps the file and
//! tells the OS when a consumed prefix will not be revisited, keeping
//! peak RSS bounded independent of file size.

use std::fs::File;
use std::io;
use std::path::Path;

use memmap2::Mmap;

/// A read-only view of one mapped file.
pub trait FileMapping {
    /// Bytes from `offset` to the end of the file.
    fn view_bytes_at(&self, offset: usize) -> &[u8];

    /// Hint that bytes before `offset` will not be revisited.
    ///
    /// Advisory only; implementations are free to ignore it.
    fn release_up_to(&self, offset: usize);
}

/// Maps files for streaming scans.
pub trait FileMapper: Send + Sync {
    /// Map the file at `path`, which is `size` bytes long.
    ///
    /// The mapping may borrow from the mapper, so in-memory test
    /// mappers can serve views of their own buffers.
    fn map_file(&self, path: &Path, size: u64) -> io::Result<Box<dyn FileMapping + '_>>;
}

/// Production mapper backed by `memmap2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MmapFileMapper;

struct MmapFileMapping {
    map: Mmap,
}

impl FileMapper for MmapFileMapper {
    fn map_file(&self, path: &Path, _size: u64) -> io::Result<Box<dyn FileMapping + '_>> {
        let file = File::open(path)?;
        // Safety: the mapping is read-only and the builder never writes
        // to its own source files while packing.
        let map = unsafe { Mmap::map(&file)? };
        Ok(Box::new(MmapFileMapping { map }))
    }
}

impl FileMapping for MmapFileMapping {
    fn view_bytes_at(&self, offset: usize) -> &[u8] {
        &self.map[offset..]
    }

    fn release_up_to(&self, offset: usize) {
        #[cfg(unix)]
        {
            // DONTNEED on a read-only file mapping drops clean pages;
            // a later read simply refaults them from the file.
            let result = unsafe {
                self.map
                    .unchecked_advise_range(memmap2::UncheckedAdvice::DontNeed, 0, offset)
            };
            if let Err(e) = result {
                log::debug!("madvise(DONTNEED) failed: {e}");
            }
        }
        #[cfg(not(unix))]
        let _ = offset;
    }
}
