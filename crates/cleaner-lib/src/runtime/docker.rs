//! Docker Engine API client
//!
//! Talks to the local Docker daemon (unix socket by default, `DOCKER_HOST`
//! when set) through bollard.

use super::{ImageDeleter, ImageLister, RuntimeError};
use crate::models::ImageRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use bollard::errors::Error as BollardError;
use bollard::image::{ListImagesOptions, RemoveImageOptions};
use bollard::models::ImageSummary;
use bollard::Docker;
use std::time::Duration;
use tracing::debug;

/// Per-request timeout for Docker API calls
pub const DEFAULT_DOCKER_TIMEOUT: Duration = Duration::from_secs(60);

/// Placeholder the daemon reports for images without a repository tag
const UNTAGGED_PLACEHOLDER: &str = "<none>:<none>";

/// Docker-backed image lister and deleter
#[derive(Clone)]
pub struct DockerRuntime {
    client: Docker,
}

impl DockerRuntime {
    /// Connect using the local defaults with the given request timeout
    pub fn connect(timeout: Duration) -> Result<Self> {
        let client = Docker::connect_with_local_defaults()
            .context("Failed to connect to the Docker daemon")?
            .with_timeout(timeout);
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageLister for DockerRuntime {
    async fn list_images(&self) -> Result<Vec<ImageRecord>> {
        let options = ListImagesOptions::<String> {
            all: true,
            ..Default::default()
        };

        let summaries = self
            .client
            .list_images(Some(options))
            .await
            .context("Failed to list Docker images")?;

        debug!(count = summaries.len(), "Listed Docker images");
        Ok(summaries.into_iter().map(record_from_summary).collect())
    }
}

#[async_trait]
impl ImageDeleter for DockerRuntime {
    async fn remove_image(&self, id: &str) -> std::result::Result<(), RuntimeError> {
        let options = RemoveImageOptions {
            force: true,
            ..Default::default()
        };

        self.client
            .remove_image(id, Some(options), None)
            .await
            .map(|_| ())
            .map_err(classify_error)
    }
}

/// Convert a Docker image summary, dropping the untagged placeholder
pub(crate) fn record_from_summary(summary: ImageSummary) -> ImageRecord {
    let tags = summary
        .repo_tags
        .into_iter()
        .filter(|tag| tag != UNTAGGED_PLACEHOLDER)
        .collect();

    ImageRecord::new(summary.id, tags, summary.size.max(0) as u64)
}

/// Map a bollard error onto the removal error taxonomy
pub(crate) fn classify_error(error: BollardError) -> RuntimeError {
    match error {
        BollardError::DockerResponseServerError {
            status_code: 409,
            message,
        } => RuntimeError::Conflict(message),
        BollardError::DockerResponseServerError {
            status_code: 404,
            message,
        } => RuntimeError::NotFound(message),
        BollardError::RequestTimeoutError => RuntimeError::Timeout,
        other => RuntimeError::Other(other.to_string()),
    }
}
