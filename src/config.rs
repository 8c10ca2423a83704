//! Packer configuration.
//!
//! # Overview
//!
//! This module holds the options recognized by the ordering core:
//! which fingerprints to compute during the scan ([`InodeOptions`]) and
//! which ordering policy to apply ([`FileOrderOptions`]). A [`Config`]
//! bundles both, can be loaded from a JSON file, and is merged with CLI
//! flags by the binary (CLI wins).
//!
//! ```json
//! {
//!     "file_order": {
//!         "mode": "nilsimsa",
//!         "nilsimsa_depth": 20000,
//!         "nilsimsa_min_depth": 1000,
//!         "nilsimsa_limit": 255
//!     },
//!     "inode_options": {
//!         "with_similarity": false,
//!         "with_nilsimsa": true
//!     }
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Inode ordering policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FileOrderMode {
    /// Keep the order in which inodes were created.
    None,
    /// Sort by representative path name.
    Path,
    /// Delegate ordering to an external script hook.
    Script,
    /// Band by coarse similarity hash.
    Similarity,
    /// Greedy nearest-neighbor chaining over nilsimsa digests.
    #[default]
    Nilsimsa,
}

impl std::fmt::Display for FileOrderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Path => "path",
            Self::Script => "script",
            Self::Similarity => "similarity",
            Self::Nilsimsa => "nilsimsa",
        };
        write!(f, "{name}")
    }
}

/// Ordering policy plus the nilsimsa tuning parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOrderOptions {
    /// Selected policy.
    #[serde(default)]
    pub mode: FileOrderMode,

    /// Maximum nilsimsa comparison window.
    #[serde(default = "default_nilsimsa_depth")]
    pub nilsimsa_depth: usize,

    /// Lower bound for the adaptive window. Clamped to
    /// `<= nilsimsa_depth` at use.
    #[serde(default = "default_nilsimsa_min_depth")]
    pub nilsimsa_min_depth: usize,

    /// Early-exit similarity threshold (0-256). The window scan stops
    /// as soon as a candidate reaches this similarity.
    #[serde(default = "default_nilsimsa_limit")]
    pub nilsimsa_limit: u32,
}

fn default_nilsimsa_depth() -> usize {
    20_000
}

fn default_nilsimsa_min_depth() -> usize {
    1_000
}

fn default_nilsimsa_limit() -> u32 {
    255
}

impl Default for FileOrderOptions {
    fn default() -> Self {
        Self {
            mode: FileOrderMode::default(),
            nilsimsa_depth: default_nilsimsa_depth(),
            nilsimsa_min_depth: default_nilsimsa_min_depth(),
            nilsimsa_limit: default_nilsimsa_limit(),
        }
    }
}

/// Which fingerprints to compute while scanning an inode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InodeOptions {
    /// Compute the 32-bit coarse similarity hash.
    #[serde(default)]
    pub with_similarity: bool,

    /// Compute the 256-bit nilsimsa digest.
    #[serde(default)]
    pub with_nilsimsa: bool,
}

impl InodeOptions {
    /// Whether the scan phase has any work to do.
    #[must_use]
    pub fn needs_scan(&self) -> bool {
        self.with_similarity || self.with_nilsimsa
    }
}

/// Full packer configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Ordering policy and parameters.
    #[serde(default)]
    pub file_order: FileOrderOptions,

    /// Scan-phase fingerprint selection.
    #[serde(default)]
    pub inode_options: InodeOptions,
}

impl Config {
    /// Load a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Scan options with the selected ordering policy's fingerprint
    /// requirement folded in.
    ///
    /// Selecting the similarity or nilsimsa policy implies computing
    /// the corresponding fingerprint even when the config left it off.
    #[must_use]
    pub fn effective_inode_options(&self) -> InodeOptions {
        let mut opts = self.inode_options;
        match self.file_order.mode {
            FileOrderMode::Similarity => opts.with_similarity = true,
            FileOrderMode::Nilsimsa => opts.with_nilsimsa = true,
            _ => {}
        }
        opts
    }
}
