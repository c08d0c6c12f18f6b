//! Image inventory and deletion priority
//!
//! Untagged ("dangling") images are almost always unreferenced build
//! leftovers, so they go first regardless of size. Within each class larger
//! images go first to reclaim the most space per deletion.

use crate::models::ImageRecord;
use crate::runtime::ImageLister;
use anyhow::Result;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// Ordering used for eviction: most-deletable first
pub fn deletion_priority(a: &ImageRecord, b: &ImageRecord) -> Ordering {
    (b.is_dangling(), b.size_bytes).cmp(&(a.is_dangling(), a.size_bytes))
}

/// Stable in-place sort of images into deletion order
pub fn sort_for_deletion(images: &mut [ImageRecord]) {
    images.sort_by(deletion_priority);
}

/// Produces fresh, ordered snapshots of the runtime's images
#[derive(Clone)]
pub struct ImageInventory {
    lister: Arc<dyn ImageLister>,
}

impl ImageInventory {
    pub fn new(lister: Arc<dyn ImageLister>) -> Self {
        Self { lister }
    }

    /// List all images in deletion order. Nothing is cached between calls.
    pub async fn snapshot(&self) -> Result<VecDeque<ImageRecord>> {
        let mut images = self.lister.list_images().await?;
        sort_for_deletion(&mut images);

        debug!(
            count = images.len(),
            dangling = images.iter().filter(|i| i.is_dangling()).count(),
            "Took image inventory snapshot"
        );

        Ok(images.into())
    }
}
