//! Disk usage sampling
//!
//! Reduces the filesystem statistics of the monitored path to a single
//! fullness percentage. Blocks and inodes are considered independently and
//! whichever is scarcer wins, since exhausting either one blocks image writes.

use crate::models::UsageSample;
use anyhow::{Context, Result};
use async_trait::async_trait;
use nix::sys::statvfs::statvfs;
use std::path::PathBuf;

/// Source of disk usage samples
#[async_trait]
pub trait UsageSampler: Send + Sync {
    /// Take a fresh sample
    async fn sample(&self) -> Result<UsageSample>;
}

/// Raw counters from a filesystem stat call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsStats {
    pub blocks_available: u64,
    pub blocks_total: u64,
    pub inodes_available: u64,
    pub inodes_total: u64,
}

impl FsStats {
    /// Percentage used, `100 * (1 - min(block_fraction, inode_fraction))`
    pub fn percent_used(&self) -> f64 {
        let blocks = available_fraction(self.blocks_available, self.blocks_total);
        let inodes = available_fraction(self.inodes_available, self.inodes_total);
        (100.0 * (1.0 - blocks.min(inodes))).clamp(0.0, 100.0)
    }
}

/// Fraction of a resource still available. A zero total means the filesystem
/// does not account for that resource, so it never limits writes.
fn available_fraction(available: u64, total: u64) -> f64 {
    if total == 0 {
        return 1.0;
    }
    (available as f64 / total as f64).min(1.0)
}

/// Samples the filesystem backing a path via statvfs(3)
pub struct StatvfsSampler {
    path: PathBuf,
}

impl StatvfsSampler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the block and inode counters for the path
    #[allow(clippy::useless_conversion)]
    pub fn stats(&self) -> Result<FsStats> {
        let stat = statvfs(self.path.as_path())
            .with_context(|| format!("Failed to statvfs {}", self.path.display()))?;

        Ok(FsStats {
            blocks_available: u64::from(stat.blocks_available()),
            blocks_total: u64::from(stat.blocks()),
            inodes_available: u64::from(stat.files_available()),
            inodes_total: u64::from(stat.files()),
        })
    }
}

#[async_trait]
impl UsageSampler for StatvfsSampler {
    async fn sample(&self) -> Result<UsageSample> {
        Ok(UsageSample::new(self.stats()?.percent_used()))
    }
}
