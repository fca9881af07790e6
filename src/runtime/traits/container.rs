// ABOUTME: Container operations trait for container runtimes.
// ABOUTME: List, inspect, recreate, connect, start, stop, and remove containers.

use super::sealed::Sealed;
use super::shared_types::{ContainerDetails, ContainerSpec};
use crate::types::{ContainerId, ImageRef};
use async_trait::async_trait;
use bollard::models::EndpointSettings;
use std::time::Duration;

/// Container lifecycle operations.
#[async_trait]
pub trait ContainerOps: Sealed + Send + Sync {
    /// List running containers.
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, ContainerError>;

    /// Inspect a container, capturing what is needed to recreate it.
    async fn inspect_container(&self, id: &ContainerId)
    -> Result<ContainerDetails, ContainerError>;

    /// Create a container named `name` from captured settings, running `image`.
    ///
    /// Only the primary network is attached; see [`ContainerOps::connect_network`].
    async fn create_container(
        &self,
        name: &str,
        spec: &ContainerSpec,
        image: &ImageRef,
    ) -> Result<ContainerId, ContainerError>;

    /// Attach a created container to one more network.
    async fn connect_network(
        &self,
        id: &ContainerId,
        network: &str,
        endpoint: &EndpointSettings,
    ) -> Result<(), ContainerError>;

    /// Start a created container.
    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError>;

    /// Stop a running container, killing it after `timeout`.
    async fn stop_container(
        &self,
        id: &ContainerId,
        timeout: Duration,
    ) -> Result<(), ContainerError>;

    /// Remove a container.
    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError>;
}

/// Summary information about a container.
#[derive(Debug, Clone)]
pub struct ContainerSummary {
    pub id: ContainerId,
    /// Name without the daemon's leading slash.
    pub name: String,
}

/// Errors from container operations.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("container already exists: {0}")]
    AlreadyExists(String),

    #[error("container not running: {0}")]
    NotRunning(String),

    #[error("container already running: {0}")]
    AlreadyRunning(String),

    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
