//! Core data models for the image cleaner

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Bytes per GiB, used for human-readable image sizes in logs
const BYTES_PER_GIB: f64 = (1u64 << 30) as f64;

/// A container image as reported by the local runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    /// Runtime-assigned image id
    pub id: String,
    /// Repository tags, empty for dangling images
    pub tags: Vec<String>,
    pub size_bytes: u64,
}

impl ImageRecord {
    pub fn new(id: impl Into<String>, tags: Vec<String>, size_bytes: u64) -> Self {
        Self {
            id: id.into(),
            tags,
            size_bytes,
        }
    }

    /// Whether the image has no repository tags
    pub fn is_dangling(&self) -> bool {
        self.tags.is_empty()
    }

    /// Name used in log lines: the first tag (e.g. `jupyter/base-notebook:1234`),
    /// falling back to the id for untagged images
    pub fn display_name(&self) -> &str {
        self.tags.first().map(String::as_str).unwrap_or(&self.id)
    }

    pub fn size_gib(&self) -> f64 {
        self.size_bytes as f64 / BYTES_PER_GIB
    }
}

/// Disk fullness of the monitored filesystem
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageSample {
    /// Percentage in `[0, 100]`, the worse of block and inode utilization
    pub percent_used: f64,
}

impl UsageSample {
    pub fn new(percent_used: f64) -> Self {
        Self { percent_used }
    }
}

/// Outcome of one high-to-low eviction pass
#[derive(Debug, Clone)]
pub struct PassSummary {
    pub started_at: DateTime<Utc>,
    /// Candidates in the snapshot taken at pass start
    pub images_before: usize,
    /// Confirmed removals only
    pub images_deleted: usize,
    /// Images the runtime refused to remove (in use)
    pub images_skipped: usize,
    /// Images already gone when their removal was attempted
    pub images_missing: usize,
    pub timeouts: usize,
    pub duration: Duration,
    /// Last usage sample taken during the pass
    pub final_usage: f64,
}

impl PassSummary {
    pub fn started(images_before: usize, usage: f64) -> Self {
        Self {
            started_at: Utc::now(),
            images_before,
            images_deleted: 0,
            images_skipped: 0,
            images_missing: 0,
            timeouts: 0,
            duration: Duration::ZERO,
            final_usage: usage,
        }
    }

    /// Number of candidates consumed from the snapshot
    pub fn images_attempted(&self) -> usize {
        self.images_deleted + self.images_skipped + self.images_missing + self.timeouts
    }
}
