//! Structured event logging for the image cleaner
//!
//! Every significant event is a single JSON log line with an `event` field,
//! so operators can follow passes and deletions from the log stream alone.

use crate::models::{ImageRecord, PassSummary};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Placeholder node label when no node identity is configured
const NO_NODE: &str = "-";

/// Structured logger for cleaner events
#[derive(Clone)]
pub struct StructuredLogger {
    node_name: String,
}

impl StructuredLogger {
    pub fn new(node_name: Option<&str>) -> Self {
        Self {
            node_name: node_name.unwrap_or(NO_NODE).to_string(),
        }
    }

    /// Log agent startup
    pub fn log_startup(&self, version: &str, path: &Path, gc_low: f64, gc_high: f64) {
        info!(
            event = "cleaner_started",
            node = %self.node_name,
            version = %version,
            path = %path.display(),
            gc_low = gc_low,
            gc_high = gc_high,
            "Pruning docker images when {} has {}% inodes or blocks used",
            path.display(),
            gc_high
        );
    }

    /// Log the inventory found at startup
    pub fn log_inventory(&self, images: usize, dangling: usize) {
        info!(
            event = "inventory",
            node = %self.node_name,
            images = images,
            dangling = dangling,
            "Found {} images on the runtime",
            images
        );
    }

    /// Log a poll sample
    pub fn log_usage(&self, percent_used: f64) {
        info!(
            event = "usage_sampled",
            node = %self.node_name,
            percent_used = percent_used,
            "{:.1}% used",
            percent_used
        );
    }

    /// Log the start of an eviction pass
    pub fn log_pass_started(&self, candidates: usize, percent_used: f64) {
        if candidates == 0 {
            info!(
                event = "pass_started",
                node = %self.node_name,
                candidates = 0,
                percent_used = percent_used,
                "No images to delete"
            );
        } else {
            info!(
                event = "pass_started",
                node = %self.node_name,
                candidates = candidates,
                percent_used = percent_used,
                "{} images available to prune",
                candidates
            );
        }
    }

    /// Log a cordon or uncordon request
    pub fn log_cordon(&self, unschedulable: bool) {
        let (event, action) = if unschedulable {
            ("node_cordon", "Cordoning")
        } else {
            ("node_uncordon", "Uncordoning")
        };
        info!(
            event = event,
            node = %self.node_name,
            "{} node {}",
            action,
            self.node_name
        );
    }

    /// Log a failed cordon re-assertion, which does not stop the pass
    pub fn log_cordon_failed(&self, error: &anyhow::Error) {
        warn!(
            event = "node_cordon_failed",
            node = %self.node_name,
            error = %format!("{:#}", error),
            "Failed to re-assert cordon, continuing"
        );
    }

    /// Log a deletion attempt
    pub fn log_removing(&self, image: &ImageRecord) {
        info!(
            event = "image_removing",
            node = %self.node_name,
            image = %image.display_name(),
            image_id = %image.id,
            size_gb = %format!("{:.2}", image.size_gib()),
            "Removing {} (size={:.2}GB)",
            image.display_name(),
            image.size_gib()
        );
    }

    /// Log a confirmed removal
    pub fn log_removed(&self, image: &ImageRecord) {
        info!(
            event = "image_removed",
            node = %self.node_name,
            image = %image.display_name(),
            image_id = %image.id,
            size_bytes = image.size_bytes,
            "Removed {}",
            image.display_name()
        );
    }

    /// Log an image the runtime refused to remove
    pub fn log_conflict(&self, image: &ImageRecord, details: &str) {
        info!(
            event = "image_conflict",
            node = %self.node_name,
            image = %image.display_name(),
            image_id = %image.id,
            details = %details,
            "Failed to remove {}, skipping this image",
            image.display_name()
        );
    }

    /// Log an image that was already gone
    pub fn log_not_found(&self, image: &ImageRecord) {
        info!(
            event = "image_not_found",
            node = %self.node_name,
            image = %image.display_name(),
            image_id = %image.id,
            "{} not found, probably already deleted",
            image.display_name()
        );
    }

    /// Log a timed-out removal and the backoff applied
    pub fn log_timeout(&self, image: &ImageRecord, backoff: Duration) {
        warn!(
            event = "image_timeout",
            node = %self.node_name,
            image = %image.display_name(),
            image_id = %image.id,
            backoff_secs = backoff.as_secs_f64(),
            "Timeout removing {}",
            image.display_name()
        );
    }

    /// Log the summary of a finished pass
    pub fn log_pass_summary(&self, summary: &PassSummary) {
        info!(
            event = "pass_finished",
            node = %self.node_name,
            started_at = %summary.started_at.to_rfc3339(),
            images_before = summary.images_before,
            images_attempted = summary.images_attempted(),
            images_deleted = summary.images_deleted,
            images_skipped = summary.images_skipped,
            images_missing = summary.images_missing,
            timeouts = summary.timeouts,
            duration_secs = summary.duration.as_secs(),
            final_usage = summary.final_usage,
            "Deleted {} images in {} seconds",
            summary.images_deleted,
            summary.duration.as_secs()
        );
    }

    /// Log agent shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "cleaner_shutdown",
            node = %self.node_name,
            reason = %reason,
            "Image cleaner shutting down"
        );
    }
}
