// ABOUTME: The daemon-facing collaborator an update cycle drives.
// ABOUTME: Lists, checks, stops, starts, and cleans up containers.

use super::container::Container;
use super::filter::EligibilityFilter;
use crate::runtime::{ContainerError, ImageError};
use async_trait::async_trait;
use std::time::Duration;

/// Operations an update cycle needs from the container daemon.
///
/// Calls are issued one at a time and awaited before the next one.
#[async_trait]
pub trait UpdateClient: Send + Sync {
    /// Running containers admitted by `filter`.
    async fn list_containers(
        &self,
        filter: &EligibilityFilter,
    ) -> Result<Vec<Container>, ClientError>;

    /// Whether a newer image is available for `container`.
    async fn is_stale(&self, container: &Container) -> Result<bool, ClientError>;

    /// Stop `container`, forcing it down after `timeout`.
    async fn stop(&self, container: &Container, timeout: Duration) -> Result<(), ClientError>;

    /// Bring `container` back up on its refreshed image.
    async fn start(&self, container: &Container) -> Result<(), ClientError>;

    /// Remove the image `container` was running before the update.
    async fn remove_image(&self, container: &Container) -> Result<(), ClientError>;

    /// Forget identifiers resolved during the cycle.
    fn clear_cache(&self);
}

/// Errors from daemon client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("container {0} was not listed in this cycle")]
    UnknownContainer(String),

    #[error("image {0} is missing after pull")]
    ImageMissing(String),
}
