//! Coarse 32-bit similarity hashing.
//!
//! # Overview
//!
//! This module provides [`SimilarityHasher`], a streaming SimHash over a
//! rolling 8-byte shingle window sampled every 4 bytes. Each sampled
//! shingle votes on 32 bit positions; the finalized hash is the sign
//! vector of the vote accumulator. Files with largely overlapping
//! content end up with equal or numerically close hashes, which the
//! similarity ordering policy exploits to band related inodes together.
//!
//! The hasher is deterministic and chunk-boundary transparent: feeding a
//! byte range in one `update` call or in many produces the same result.

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Seed mixed into the tail feature so inputs shorter than one shingle
/// still hash distinctly.
const TAIL_SEED: u64 = 0xdead_beef_cafe_babe;

/// Length of the rolling shingle window in bytes.
const SHINGLE_LEN: u64 = 8;

/// Sampling stride: one feature per this many input bytes.
const STRIDE: u64 = 4;

#[inline]
fn fnv1a64(seed: u64, bytes: &[u8]) -> u64 {
    let mut hash = seed;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Streaming coarse similarity hasher.
///
/// # Example
///
/// ```
/// use blockpack::similarity::SimilarityHasher;
///
/// let mut hasher = SimilarityHasher::new();
/// hasher.update(b"hello, ");
/// hasher.update(b"world");
/// let split = hasher.finalize();
///
/// let mut hasher = SimilarityHasher::new();
/// hasher.update(b"hello, world");
/// assert_eq!(split, hasher.finalize());
/// ```
#[derive(Debug, Clone)]
pub struct SimilarityHasher {
    /// Rolling shingle: the last 8 bytes seen, most recent in the low byte.
    shingle: u64,
    /// Total number of bytes consumed.
    seen: u64,
    /// Per-bit vote accumulator.
    votes: [i64; 32],
}

impl SimilarityHasher {
    /// Create a new hasher with empty state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shingle: 0,
            seen: 0,
            votes: [0; 32],
        }
    }

    /// Feed a chunk of bytes into the hasher.
    pub fn update(&mut self, data: &[u8]) {
        for &b in data {
            self.shingle = (self.shingle << 8) | u64::from(b);
            self.seen += 1;
            // Sampling is keyed to the absolute position, so chunk
            // boundaries cannot shift which shingles get counted.
            if self.seen >= SHINGLE_LEN && (self.seen - SHINGLE_LEN) % STRIDE == 0 {
                let h = fnv1a64(FNV_OFFSET_BASIS, &self.shingle.to_be_bytes());
                vote(&mut self.votes, h);
            }
        }
    }

    /// Finalize the hash over everything fed so far.
    ///
    /// Does not consume the hasher; further `update` calls continue from
    /// the same state.
    #[must_use]
    pub fn finalize(&self) -> u32 {
        if self.seen == 0 {
            return 0;
        }

        let mut votes = self.votes;
        if self.seen < SHINGLE_LEN {
            // Short input, no full shingle yet. Hash what we have as a
            // single tail feature.
            let h = fnv1a64(FNV_OFFSET_BASIS ^ TAIL_SEED, &self.shingle.to_be_bytes());
            vote(&mut votes, h);
        }

        let mut out = 0u32;
        for (bit, score) in votes.iter().enumerate() {
            if *score >= 0 {
                out |= 1 << bit;
            }
        }
        out
    }
}

impl Default for SimilarityHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn vote(votes: &mut [i64; 32], h: u64) {
    for (bit, slot) in votes.iter_mut().enumerate() {
        if (h >> bit) & 1 == 1 {
            *slot += 1;
        } else {
            *slot -= 1;
        }
    }
}

/// Compute the coarse similarity hash of a byte range in one call.
#[must_use]
pub fn similarity_hash(data: &[u8]) -> u32 {
    let mut hasher = SimilarityHasher::new();
    hasher.update(data);
    hasher.finalize()
}
