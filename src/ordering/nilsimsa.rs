//! Greedy nearest-neighbor inode chaining over nilsimsa digests.
//!
//! # Overview
//!
//! The nilsimsa policy emits each inode next to the one it most
//! resembles, within a bounded comparison window:
//!
//! 1. The (at most one) empty inode is emitted first.
//! 2. The rest are presorted by `(size asc, name desc, path desc)`,
//!    clustering same-size files and fixing a deterministic start.
//! 3. The presort tail seeds the chain; every following step scans the
//!    last `depth` unemitted entries tail-to-head for the candidate
//!    most similar to the previously emitted inode, stopping early
//!    once the configured similarity limit is reached.
//! 4. The winner is rotated to the end of the working set and popped,
//!    so the unemitted remainder keeps its presort order and the tail
//!    stays the densest region for the next scan.
//!
//! The window `depth` adapts to the block fill level reported by the
//! downstream packer: a packer that keeps its blocks full can afford a
//! wide search, a starved one wants the chain to move on quickly. The
//! current depth is published to the progress snapshot as telemetry.

use std::sync::atomic::Ordering;

use crate::config::FileOrderOptions;
use crate::error::OrderError;
use crate::inode::InodeRef;
use crate::progress::ProgressSnapshot;
use crate::similarity::{nilsimsa_similarity, NilsimsaDigest};

use super::{InodeCallback, InodeManager};

/// Emissions before depth adaptation starts.
const ADAPT_WARMUP: u64 = 4096;

/// Emissions between depth adaptation steps.
const ADAPT_INTERVAL: u64 = 32;

/// Full-scale value of the packer's block fill signal.
const FILL_SCALE: u64 = 2048;

/// Per-inode snapshot used by the chaining loop, so the hot path never
/// goes back through the trait object.
struct ChainEntry {
    size: u64,
    digest: NilsimsaDigest,
    name: String,
    path: String,
    ino: InodeRef,
}

/// One exponential smoothing step of the comparison window.
///
/// The fill signal is mapped linearly onto `[0, max_depth]` and the
/// current depth moves 1/512th of the way toward it.
fn adapted_depth(depth: usize, fill: u32, max_depth: usize) -> usize {
    let fill = u64::from(fill).min(FILL_SCALE);
    let target = (fill * max_depth as u64 / FILL_SCALE) as usize;
    (511 * depth + target) / 512
}

impl InodeManager {
    pub(crate) fn order_by_nilsimsa(
        &mut self,
        options: &FileOrderOptions,
        progress: &ProgressSnapshot,
        first_inode: u32,
        callback: &mut InodeCallback<'_>,
    ) -> Result<(), OrderError> {
        let expected = self.inodes.len();

        let max_depth = options.nilsimsa_depth.max(1);
        let min_depth = options.nilsimsa_min_depth.clamp(1, max_depth);
        let limit = options.nilsimsa_limit;

        let mut ordered: Vec<InodeRef> = Vec::with_capacity(expected);
        let mut next_num = first_inode;
        let mut emitted: u64 = 0;
        let mut depth = max_depth;
        progress.nilsimsa_depth.store(depth, Ordering::Relaxed);

        // Split off the empty inodes (the dedup layer collapses them,
        // so there is at most one) and snapshot the rest.
        let mut empties: Vec<InodeRef> = Vec::new();
        let mut working: Vec<ChainEntry> = Vec::with_capacity(expected);
        for ino in self.inodes.drain(..) {
            if ino.size()? == 0 {
                empties.push(ino);
            } else {
                let digest = ino.nilsimsa_similarity_hash()?;
                let size = ino.size()?;
                let (name, path) = {
                    let file = ino.any()?;
                    (
                        file.name().into_owned(),
                        file.path.to_string_lossy().into_owned(),
                    )
                };
                working.push(ChainEntry {
                    size,
                    digest,
                    name,
                    path,
                    ino,
                });
            }
        }

        let mut emit = |ino: InodeRef,
                        fill_to_depth: bool,
                        ordered: &mut Vec<InodeRef>,
                        emitted: &mut u64,
                        next_num: &mut u32,
                        depth: &mut usize|
         -> u32 {
            ino.set_num(*next_num);
            *next_num += 1;
            let fill = callback(&ino);
            *emitted += 1;
            progress.inodes_ordered.fetch_add(1, Ordering::Relaxed);
            ordered.push(ino);

            if fill_to_depth && *emitted >= ADAPT_WARMUP && *emitted % ADAPT_INTERVAL == 0 {
                *depth = adapted_depth(*depth, fill, max_depth).clamp(min_depth, max_depth);
                progress.nilsimsa_depth.store(*depth, Ordering::Relaxed);
            }
            fill
        };

        // Empty inodes come first.
        for ino in empties {
            emit(
                ino,
                false,
                &mut ordered,
                &mut emitted,
                &mut next_num,
                &mut depth,
            );
        }

        // Presort. The comparator is total: dedup guarantees distinct
        // paths, so no two entries compare equal.
        let mut name_ties = 0u64;
        let mut path_ties = 0u64;
        working.sort_by(|a, b| {
            a.size.cmp(&b.size).then_with(|| {
                name_ties += 1;
                b.name.cmp(&a.name).then_with(|| {
                    path_ties += 1;
                    b.path.cmp(&a.path)
                })
            })
        });
        log::debug!("presort tiebreaks: {name_ties} by name, {path_ties} by path");

        // Seed the chain with the presort tail.
        let mut ref_digest = NilsimsaDigest::default();
        if let Some(seed) = working.pop() {
            ref_digest = seed.digest;
            emit(
                seed.ino,
                true,
                &mut ordered,
                &mut emitted,
                &mut next_num,
                &mut depth,
            );
        }

        while !working.is_empty() {
            // Scan the active window tail-to-head for the best match.
            // On equal similarity the first-found candidate wins, so
            // ties resolve toward the presort-descending end.
            let window_start = working.len().saturating_sub(depth);
            let mut best_pos = working.len() - 1;
            let mut best_sim = nilsimsa_similarity(&ref_digest, &working[best_pos].digest);
            if best_sim < limit {
                for pos in (window_start..working.len() - 1).rev() {
                    let sim = nilsimsa_similarity(&ref_digest, &working[pos].digest);
                    if sim > best_sim {
                        best_pos = pos;
                        best_sim = sim;
                        if sim >= limit {
                            break;
                        }
                    }
                }
            }

            // Rotate the winner to the end and pop it, keeping the
            // remainder in presort order.
            working[best_pos..].rotate_left(1);
            let Some(chosen) = working.pop() else {
                break;
            };
            ref_digest = chosen.digest;
            emit(
                chosen.ino,
                true,
                &mut ordered,
                &mut emitted,
                &mut next_num,
                &mut depth,
            );
        }

        if ordered.len() != expected {
            return Err(OrderError::NilsimsaOrderingInvariantViolated {
                emitted: ordered.len(),
                expected,
            });
        }

        log::debug!(
            "nilsimsa ordering done: {} inodes, final depth {}",
            ordered.len(),
            depth
        );
        self.inodes = ordered;
        Ok(())
    }
}
