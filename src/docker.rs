// ABOUTME: Daemon client driving update cycles through a container runtime.
// ABOUTME: Snapshots containers on listing and recreates them from the snapshot on start.

use crate::runtime::{
    BollardRuntime, ContainerDetails, ContainerError, ContainerOps, ContainerSpec,
    ContainerState, ContainerSummary, ImageError, ImageOps,
};
use crate::types::{ContainerId, ImageId, ImageRef};
use crate::update::{ClientError, Container, EligibilityFilter, UpdateClient};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Options for [`DockerClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Pull each image reference before comparing image ids.
    pub pull: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self { pull: true }
    }
}

#[derive(Debug, Default)]
struct Cache {
    /// Creation settings captured when the container was listed.
    specs: HashMap<ContainerId, ContainerSpec>,
    /// Latest local image id per reference, resolved once per cycle.
    latest: HashMap<ImageRef, ImageId>,
}

/// [`UpdateClient`] backed by a Docker-compatible runtime.
pub struct DockerClient<R = BollardRuntime> {
    runtime: R,
    options: ClientOptions,
    hostname: Option<String>,
    cache: Mutex<Cache>,
}

impl<R> DockerClient<R>
where
    R: ContainerOps + ImageOps,
{
    pub fn new(runtime: R, options: ClientOptions) -> Self {
        let hostname = gethostname::gethostname().into_string().ok();
        Self {
            runtime,
            options,
            hostname,
            cache: Mutex::new(Cache::default()),
        }
    }

    /// Override the hostname used to recognise the updater's own container.
    pub fn with_hostname(mut self, hostname: Option<String>) -> Self {
        self.hostname = hostname;
        self
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Whether `id` belongs to the container this process runs in.
    ///
    /// Container runtimes default the hostname to the short container id.
    fn is_own_container(&self, id: &ContainerId) -> bool {
        self.hostname
            .as_deref()
            .is_some_and(|h| looks_like_short_id(h) && id.matches_prefix(h))
    }

    fn to_container(&self, details: &ContainerDetails) -> Option<Container> {
        let name = details.name.trim_start_matches('/');
        if details.image.starts_with("sha256:") {
            warn!(container = name, "created from an image id, skipping");
            return None;
        }
        let image = match ImageRef::parse(&details.image) {
            Ok(image) => image,
            Err(e) => {
                warn!(container = name, error = %e, "unusable image reference, skipping");
                return None;
            }
        };

        let mut container = Container::new(
            details.id.clone(),
            details.name.clone(),
            image,
            details.image_id.clone(),
        )
        .with_labels(details.labels.clone())
        .with_links(details.links.iter().cloned());
        if let Some(mode) = &details.network_mode {
            container = container.with_network_mode(mode.clone());
        }
        if self.is_own_container(&details.id) {
            container = container.as_updater();
        }
        Some(container)
    }

    async fn latest_image_id(&self, reference: &ImageRef) -> Result<ImageId, ClientError> {
        if let Some(id) = self.cache.lock().latest.get(reference) {
            return Ok(id.clone());
        }

        if self.options.pull {
            debug!(image = %reference, "pulling");
            self.runtime.pull_image(reference).await?;
        }
        let id = self
            .runtime
            .image_id(reference)
            .await?
            .ok_or_else(|| ClientError::ImageMissing(reference.to_string()))?;

        self.cache
            .lock()
            .latest
            .insert(reference.clone(), id.clone());
        Ok(id)
    }
}

fn looks_like_short_id(hostname: &str) -> bool {
    hostname.len() >= 12 && hostname.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Name of the listed container that `target` (an id, id prefix or name)
/// refers to. Names survive recreation, ids do not.
fn current_name(listed: &[ContainerSummary], target: &str) -> Option<String> {
    let target = target.trim_start_matches('/');
    listed
        .iter()
        .find(|s| s.name == target || s.id.matches_prefix(target))
        .map(|s| s.name.clone())
}

#[async_trait]
impl<R> UpdateClient for DockerClient<R>
where
    R: ContainerOps + ImageOps,
{
    async fn list_containers(
        &self,
        filter: &EligibilityFilter,
    ) -> Result<Vec<Container>, ClientError> {
        let summaries = self.runtime.list_containers().await?;

        let mut containers = Vec::with_capacity(summaries.len());
        for summary in &summaries {
            let mut details = match self.runtime.inspect_container(&summary.id).await {
                Ok(details) => details,
                // Gone between listing and inspecting.
                Err(ContainerError::NotFound(_)) => {
                    debug!(container = %summary.name, "vanished before inspection");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if details.state != ContainerState::Running {
                debug!(container = %summary.name, state = ?details.state, "no longer running");
                continue;
            }

            let Some(container) = self.to_container(&details) else {
                continue;
            };
            if !filter.admits(&container) {
                debug!(container = container.short_name(), "not eligible");
                continue;
            }

            // The owner of a shared namespace may be recreated first.
            let owner = details
                .spec
                .namespace_owner()
                .and_then(|target| current_name(&summaries, target));
            if let Some(owner) = owner {
                details.spec.share_namespace_with(&owner);
            }

            self.cache
                .lock()
                .specs
                .insert(details.id.clone(), details.spec);
            containers.push(container);
        }

        Ok(containers)
    }

    async fn is_stale(&self, container: &Container) -> Result<bool, ClientError> {
        let reference = container.image();
        if reference.is_pinned() {
            debug!(container = container.short_name(), "pinned by digest");
            return Ok(false);
        }

        let latest = self.latest_image_id(reference).await?;
        Ok(&latest != container.image_id())
    }

    async fn stop(&self, container: &Container, timeout: Duration) -> Result<(), ClientError> {
        match self.runtime.stop_container(container.id(), timeout).await {
            Ok(()) => {}
            Err(ContainerError::NotRunning(_)) => {
                debug!(container = container.short_name(), "already stopped");
            }
            Err(e) => return Err(e.into()),
        }
        self.runtime.remove_container(container.id(), false).await?;
        Ok(())
    }

    async fn start(&self, container: &Container) -> Result<(), ClientError> {
        let spec = self
            .cache
            .lock()
            .specs
            .get(container.id())
            .cloned()
            .ok_or_else(|| ClientError::UnknownContainer(container.short_name().to_string()))?;

        let id = self
            .runtime
            .create_container(container.short_name(), &spec, container.image())
            .await?;
        for (network, endpoint) in &spec.extra_networks {
            if let Err(e) = self.runtime.connect_network(&id, network, endpoint).await {
                // A replacement missing a network must not keep the name.
                if let Err(cleanup) = self.runtime.remove_container(&id, true).await {
                    warn!(id = id.short(), error = %cleanup, "failed to discard replacement");
                }
                return Err(e.into());
            }
        }
        self.runtime.start_container(&id).await?;
        debug!(
            container = container.short_name(),
            id = id.short(),
            networks = spec.extra_network_count(),
            "recreated"
        );
        Ok(())
    }

    async fn remove_image(&self, container: &Container) -> Result<(), ClientError> {
        match self.runtime.remove_image(container.image_id(), false).await {
            Ok(()) => Ok(()),
            // Another container on the same image got there first.
            Err(ImageError::NotFound(_)) => Ok(()),
            // Still tagged elsewhere or used by another container.
            Err(ImageError::InUse(_)) => {
                debug!(image = container.image_id().short(), "still referenced, kept");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn clear_cache(&self) {
        let mut cache = self.cache.lock();
        cache.specs.clear();
        cache.latest.clear();
    }
}
