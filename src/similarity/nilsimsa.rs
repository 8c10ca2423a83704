//! Nilsimsa locality-sensitive hashing.
//!
//! # Overview
//!
//! This module provides [`Nilsimsa`], a streaming implementation of the
//! nilsimsa digest, and [`nilsimsa_similarity`], the distance function
//! used by the greedy nearest-neighbor ordering policy.
//!
//! The digest accumulates trigram features over a sliding window of the
//! last four bytes. Finalization thresholds each of the 256 feature
//! buckets against the expected mean and packs the outcome into four
//! 64-bit words. Two digests are compared by counting the bits in which
//! they agree: 256 means identical content structure, 128 is the
//! expectation for unrelated inputs.
//!
//! Chunk boundaries are transparent: streaming a file through `update`
//! in any partition yields the same digest as a single call.

/// A finalized nilsimsa digest: 256 bits as four 64-bit words.
///
/// The words are compared directly and never serialized byte-wise, so
/// the layout is independent of host endianness.
pub type NilsimsaDigest = [u64; 4];

/// Number of bits in a digest, and the maximum similarity score.
pub const DIGEST_BITS: u32 = 256;

/// Byte permutation table based on the 53-multiplier construction of the
/// original nilsimsa reference code.
#[rustfmt::skip]
const TRAN: [u8; 256] = [
    0x02, 0xD6, 0x9E, 0x6F, 0xF9, 0x1D, 0x04, 0xAB,
    0xD0, 0x22, 0x16, 0x1F, 0xD8, 0x73, 0xA1, 0xAC,
    0x3B, 0x70, 0x62, 0x96, 0x1E, 0x6E, 0x8F, 0x39,
    0x9D, 0x05, 0x14, 0x4A, 0xA6, 0xBE, 0xAE, 0x0E,
    0xCF, 0xB9, 0x9C, 0x9A, 0xC7, 0x68, 0x13, 0xE1,
    0x2D, 0xA4, 0xEB, 0x51, 0x8D, 0x64, 0x6B, 0x50,
    0x23, 0x80, 0x03, 0x41, 0xEC, 0xBB, 0x71, 0xCC,
    0x7A, 0x86, 0x7F, 0x98, 0xF2, 0x36, 0x5E, 0xEE,
    0x8E, 0xCE, 0x4F, 0xB8, 0x32, 0xB6, 0x5F, 0x59,
    0xDC, 0x1B, 0x31, 0x4C, 0x7B, 0xF0, 0x63, 0x01,
    0x6C, 0xBA, 0x07, 0xE8, 0x12, 0x77, 0x49, 0x3C,
    0xDA, 0x46, 0xFE, 0x2F, 0x79, 0x1C, 0x9B, 0x30,
    0xE3, 0x00, 0x06, 0x7E, 0x2E, 0x0F, 0x38, 0x33,
    0x21, 0xAD, 0xA5, 0x54, 0xCA, 0xA7, 0x29, 0xFC,
    0x5A, 0x47, 0x69, 0x7D, 0xC5, 0x95, 0xB5, 0xF4,
    0x0B, 0x90, 0xA3, 0x81, 0x6D, 0x25, 0x55, 0x35,
    0xF5, 0x75, 0x74, 0x0A, 0x26, 0xBF, 0x19, 0x5C,
    0x1A, 0xC6, 0xFF, 0x99, 0x5D, 0x84, 0xAA, 0x66,
    0x3E, 0xAF, 0x78, 0xB3, 0x20, 0x43, 0xC1, 0xED,
    0x24, 0xEA, 0xE6, 0x3F, 0x18, 0xF3, 0xA0, 0x42,
    0x57, 0x08, 0x53, 0x60, 0xC3, 0xC0, 0x83, 0x40,
    0x82, 0xD7, 0x09, 0xBD, 0x44, 0x2A, 0x67, 0xA8,
    0x93, 0xE0, 0xC2, 0x56, 0x9F, 0xD9, 0xDD, 0x85,
    0x15, 0xB4, 0x8A, 0x27, 0x28, 0x92, 0x76, 0xDE,
    0xEF, 0xF8, 0xB2, 0xB7, 0xC9, 0x3D, 0x45, 0x94,
    0x4B, 0x11, 0x0D, 0x65, 0xD5, 0x34, 0x8B, 0x91,
    0x0C, 0xFA, 0x87, 0xE9, 0x7C, 0x5B, 0xB1, 0x4D,
    0xE5, 0xD4, 0xCB, 0x10, 0xA2, 0x17, 0x89, 0xBC,
    0xDB, 0xB0, 0xE2, 0x97, 0x88, 0x52, 0xF7, 0x48,
    0xD3, 0x61, 0x2C, 0x3A, 0x2B, 0xD1, 0x8C, 0xFB,
    0xF1, 0xCD, 0xE4, 0x6A, 0xE7, 0xA9, 0xFD, 0xC4,
    0x37, 0xC8, 0xD2, 0xF6, 0xDF, 0x58, 0x72, 0x4E,
];

#[inline]
fn tran3(a: u8, b: u8, c: u8, n: u8) -> u8 {
    let x = TRAN[a.wrapping_add(n) as usize] ^ TRAN[b as usize].wrapping_mul(2 * n + 1);
    x.wrapping_add(TRAN[(c ^ TRAN[n as usize]) as usize])
}

/// Streaming nilsimsa digest computation.
///
/// # Example
///
/// ```
/// use blockpack::similarity::{nilsimsa_similarity, Nilsimsa};
///
/// let mut a = Nilsimsa::new();
/// a.update(b"The rain in Spain falls mainly on the plain.");
/// let a = a.finalize();
///
/// assert_eq!(nilsimsa_similarity(&a, &a), 256);
/// ```
#[derive(Debug, Clone)]
pub struct Nilsimsa {
    /// Trigram feature buckets.
    acc: [u64; 256],
    /// The last four bytes seen, most recent first. `None` until filled.
    window: [Option<u8>; 4],
    /// Total number of bytes consumed.
    count: u64,
}

impl Nilsimsa {
    /// Create a new hasher with empty state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            acc: [0; 256],
            window: [None; 4],
            count: 0,
        }
    }

    /// Feed a chunk of bytes into the hasher.
    pub fn update(&mut self, data: &[u8]) {
        for &b in data {
            self.count += 1;
            let [w0, w1, w2, w3] = self.window;
            if let (Some(c0), Some(c1)) = (w0, w1) {
                self.acc[tran3(b, c0, c1, 0) as usize] += 1;
                if let Some(c2) = w2 {
                    self.acc[tran3(b, c0, c2, 1) as usize] += 1;
                    self.acc[tran3(b, c1, c2, 2) as usize] += 1;
                    if let Some(c3) = w3 {
                        self.acc[tran3(b, c0, c3, 3) as usize] += 1;
                        self.acc[tran3(b, c1, c3, 4) as usize] += 1;
                        self.acc[tran3(b, c2, c3, 5) as usize] += 1;
                        self.acc[tran3(c3, c0, b, 6) as usize] += 1;
                        self.acc[tran3(c3, c2, b, 7) as usize] += 1;
                    }
                }
            }
            self.window = [Some(b), w0, w1, w2];
        }
    }

    /// Finalize the digest over everything fed so far.
    ///
    /// Does not consume the hasher; further `update` calls continue from
    /// the same state.
    #[must_use]
    pub fn finalize(&self) -> NilsimsaDigest {
        // Expected total number of trigram features for `count` bytes.
        let total: u64 = match self.count {
            0..=2 => 0,
            3 => 1,
            4 => 4,
            n => 8 * n - 28,
        };
        let threshold = total / 256;

        let mut digest = [0u64; 4];
        for (i, &bucket) in self.acc.iter().enumerate() {
            if bucket > threshold {
                digest[i / 64] |= 1 << (i % 64);
            }
        }
        digest
    }
}

impl Default for Nilsimsa {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute the nilsimsa digest of a byte range in one call.
#[must_use]
pub fn nilsimsa_digest(data: &[u8]) -> NilsimsaDigest {
    let mut hasher = Nilsimsa::new();
    hasher.update(data);
    hasher.finalize()
}

/// Similarity between two digests: the number of bits in which they
/// agree, in `[0, 256]`.
///
/// Symmetric, and returns 256 exactly when the digests are identical.
/// The scalar popcount below is the authoritative reference; hardware
/// popcount is picked up by the compiler where the target supports it.
#[inline]
#[must_use]
pub fn nilsimsa_similarity(a: &NilsimsaDigest, b: &NilsimsaDigest) -> u32 {
    let mut agree = 0;
    for i in 0..4 {
        agree += (!(a[i] ^ b[i])).count_ones();
    }
    agree
}
