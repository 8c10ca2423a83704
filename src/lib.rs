//! BlockPack - deduplicating read-only archive layout builder.
//!
//! BlockPack walks a directory tree, collapses byte-identical files
//! into inodes, fingerprints each inode's content, and emits the
//! inodes in an order chosen to maximize inter-file redundancy inside
//! downstream compression windows. The emission order is the single
//! biggest lever on the final compression ratio, so most of the crate
//! is the ordering engine.
//!
//! # Pipeline
//!
//! 1. [`scanner`]: walk the tree, dedup identical contents.
//! 2. [`inode`]: one inode per content identity; a streaming scan
//!    computes two similarity fingerprints per inode.
//! 3. [`ordering`]: emit inodes under one of five policies; the
//!    nilsimsa policy chains each inode to its nearest unemitted
//!    neighbor within an adaptive window.
//! 4. [`progress`]: a background reporter samples shared telemetry
//!    while the pipeline runs.

pub mod cli;
pub mod config;
pub mod error;
pub mod inode;
pub mod logging;
pub mod mapper;
pub mod ordering;
pub mod progress;
pub mod scanner;
pub mod script;
pub mod similarity;
