// ABOUTME: Shared types used across runtime trait definitions.
// ABOUTME: ContainerDetails, ContainerSpec, ContainerState, RuntimeMetadata.

use crate::types::{ContainerId, ImageId};
use bollard::models::{ContainerCreateBody, EndpointSettings};
use std::collections::HashMap;

/// Everything the updater needs to know about one container.
#[derive(Debug, Clone)]
pub struct ContainerDetails {
    pub id: ContainerId,
    /// Name as the daemon reports it, including the leading slash.
    pub name: String,
    /// Image reference the container was created from.
    pub image: String,
    /// Image the container is actually running.
    pub image_id: ImageId,
    pub state: ContainerState,
    pub labels: HashMap<String, String>,
    /// Names of linked containers.
    pub links: Vec<String>,
    pub network_mode: Option<String>,
    pub spec: ContainerSpec,
}

/// Container state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
}

/// Creation settings captured from an existing container.
///
/// Replayed by `ContainerOps::create_container` to build a replacement that
/// differs only in its image.
#[derive(Debug, Clone, Default)]
pub struct ContainerSpec {
    pub(crate) body: ContainerCreateBody,
    /// Networks joined after creation, with their endpoint settings.
    pub(crate) extra_networks: Vec<(String, EndpointSettings)>,
}

impl ContainerSpec {
    /// Number of networks the replacement will join after creation.
    pub fn extra_network_count(&self) -> usize {
        self.extra_networks.len()
    }

    /// Target of a `container:<id|name>` network mode.
    pub fn namespace_owner(&self) -> Option<&str> {
        self.body
            .host_config
            .as_ref()?
            .network_mode
            .as_deref()?
            .strip_prefix("container:")
    }

    /// Join the network namespace of the container named `owner`.
    pub(crate) fn share_namespace_with(&mut self, owner: &str) {
        let host_config = self.body.host_config.get_or_insert_with(Default::default);
        host_config.network_mode = Some(format!("container:{owner}"));
    }
}

/// Runtime metadata.
#[derive(Debug, Clone)]
pub struct RuntimeMetadata {
    /// Runtime name (e.g., "Docker", "Podman").
    pub name: String,
    pub version: String,
    pub api_version: String,
    pub os: String,
    pub arch: String,
}
