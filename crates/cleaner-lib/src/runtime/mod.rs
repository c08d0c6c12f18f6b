//! Container runtime access
//!
//! The eviction engine only needs two capabilities from the runtime: listing
//! the local images and force-removing one of them. Both are expressed as
//! traits so the engine can be driven by fakes in tests.

mod docker;

pub use docker::{DockerRuntime, DEFAULT_DOCKER_TIMEOUT};

use crate::models::ImageRecord;
use anyhow::Result;
use async_trait::async_trait;

/// Errors from a forced image removal, classified by recoverability
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The image cannot be removed right now, usually because it is in use
    #[error("image cannot be removed right now: {0}")]
    Conflict(String),

    /// The image no longer exists
    #[error("image not found: {0}")]
    NotFound(String),

    /// The request to the runtime timed out
    #[error("runtime request timed out")]
    Timeout,

    #[error("runtime error: {0}")]
    Other(String),
}

/// Enumerates images known to the local runtime
#[async_trait]
pub trait ImageLister: Send + Sync {
    /// List all images, including intermediate ones
    async fn list_images(&self) -> Result<Vec<ImageRecord>>;
}

/// Removes images from the local runtime
#[async_trait]
pub trait ImageDeleter: Send + Sync {
    /// Force-remove an image by id, even when a stopped container references it
    async fn remove_image(&self, id: &str) -> std::result::Result<(), RuntimeError>;
}
