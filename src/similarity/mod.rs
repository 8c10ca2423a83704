//! Similarity fingerprinting primitives.
//!
//! # Overview
//!
//! Two independent fingerprints are computed while streaming a file's bytes:
//!
//! - [`coarse::SimilarityHasher`]: a 32-bit coarse hash whose equality
//!   identifies likely-related files. Cheap to compute and compare.
//! - [`nilsimsa::Nilsimsa`]: a 256-bit locality-sensitive digest whose
//!   distance is the bitwise agreement count, used for near-duplicate
//!   chaining during inode ordering.
//!
//! Both hashers accept arbitrarily sized chunks via `update`; the chunk
//! boundaries never affect the finalized value, so callers are free to
//! stream files in fixed windows.

pub mod coarse;
pub mod nilsimsa;

pub use coarse::SimilarityHasher;
pub use nilsimsa::{nilsimsa_similarity, Nilsimsa, NilsimsaDigest};
