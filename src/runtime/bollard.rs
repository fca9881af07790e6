// ABOUTME: Bollard-based container runtime implementation.
// ABOUTME: Supports both Docker and Podman via Docker-compatible API.

use crate::runtime::traits::sealed::Sealed;
use crate::runtime::traits::{
    ContainerDetails, ContainerError, ContainerOps, ContainerSpec, ContainerState,
    ContainerSummary, ImageError, ImageOps, RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
};
use crate::runtime::types::RuntimeType;
use crate::types::{ContainerId, ImageId, ImageRef};
use async_trait::async_trait;
use bollard::Docker;
use bollard::models::{
    ContainerCreateBody, ContainerInspectResponse, EndpointSettings, NetworkConnectRequest,
    NetworkingConfig,
};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, InspectContainerOptions, ListContainersOptions,
    RemoveContainerOptions, RemoveImageOptions, StopContainerOptions,
};
use futures::StreamExt;
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::time::Duration;
use tokio::net::UnixStream;

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn map_image_pull_error(e: bollard::errors::Error, image_name: &str) -> ImageError {
    ImageError::PullFailed(format!("{}: {}", image_name, e))
}

fn map_image_remove_error(e: bollard::errors::Error, image: &str) -> ImageError {
    match &e {
        bollard::errors::Error::DockerResponseServerError { status_code, .. }
            if *status_code == 404 =>
        {
            ImageError::NotFound(image.to_string())
        }
        bollard::errors::Error::DockerResponseServerError { status_code, .. }
            if *status_code == 409 =>
        {
            ImageError::InUse(image.to_string())
        }
        _ => ImageError::Runtime(format!("failed to remove {}: {}", image, e)),
    }
}

fn map_container_create_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::ImageNotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 409 => ContainerError::AlreadyExists(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_start_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 304 => ContainerError::AlreadyRunning(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_stop_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 304 => ContainerError::NotRunning(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_not_found_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

// =============================================================================
// Inspect Helpers
// =============================================================================

/// Extract the linked container name from a link entry such as `/db:/web/db`.
pub(crate) fn link_target(link: &str) -> Option<&str> {
    let target = link.split(':').next()?.trim_start_matches('/');
    (!target.is_empty()).then_some(target)
}

/// Network modes that share another namespace and take no endpoint settings.
fn shares_namespace(mode: &str) -> bool {
    mode == "host" || mode == "none" || mode.starts_with("container:")
}

/// Keep only the user-chosen parts of an endpoint: aliases, links, static IPs.
fn reusable_endpoint(endpoint: &EndpointSettings, id: &str) -> EndpointSettings {
    // The daemon adds the short container ID as an alias; the replacement
    // gets its own.
    let aliases: Vec<String> = endpoint
        .aliases
        .iter()
        .flatten()
        .filter(|alias| !id.starts_with(alias.as_str()))
        .cloned()
        .collect();

    EndpointSettings {
        aliases: (!aliases.is_empty()).then_some(aliases),
        links: endpoint.links.clone(),
        ipam_config: endpoint.ipam_config.clone(),
        ..Default::default()
    }
}

/// Capture the settings needed to recreate `details` with another image.
fn capture_spec(details: &ContainerInspectResponse, id: &str) -> ContainerSpec {
    let config = details.config.clone().unwrap_or_default();
    let host_config = details.host_config.clone().unwrap_or_default();

    // An auto-assigned hostname is the old short ID; let the daemon assign a new one.
    let hostname = config
        .hostname
        .filter(|h| !h.is_empty() && !id.starts_with(h.as_str()));

    let mode = host_config.network_mode.clone().unwrap_or_default();
    let mut primary: HashMap<String, EndpointSettings> = HashMap::new();
    let mut extra_networks = Vec::new();
    if !shares_namespace(&mode) {
        let networks = details
            .network_settings
            .as_ref()
            .and_then(|s| s.networks.clone())
            .unwrap_or_default();
        for (name, endpoint) in networks {
            let endpoint = reusable_endpoint(&endpoint, id);
            if name == mode || (primary.is_empty() && (mode.is_empty() || mode == "default")) {
                primary.insert(name, endpoint);
            } else {
                extra_networks.push((name, endpoint));
            }
        }
    }
    extra_networks.sort_by(|a, b| a.0.cmp(&b.0));

    let body = ContainerCreateBody {
        hostname,
        domainname: config.domainname,
        user: config.user,
        attach_stdin: config.attach_stdin,
        attach_stdout: config.attach_stdout,
        attach_stderr: config.attach_stderr,
        tty: config.tty,
        open_stdin: config.open_stdin,
        stdin_once: config.stdin_once,
        env: config.env,
        cmd: config.cmd,
        healthcheck: config.healthcheck,
        entrypoint: config.entrypoint,
        working_dir: config.working_dir,
        labels: config.labels,
        stop_signal: config.stop_signal,
        stop_timeout: config.stop_timeout,
        host_config: Some(host_config),
        networking_config: (!primary.is_empty()).then(|| NetworkingConfig {
            endpoints_config: Some(primary),
        }),
        ..Default::default()
    };

    ContainerSpec {
        body,
        extra_networks,
    }
}

fn parse_state(details: &ContainerInspectResponse) -> ContainerState {
    use bollard::models::ContainerStateStatusEnum as Status;

    details
        .state
        .as_ref()
        .and_then(|s| s.status)
        .map(|s| match s {
            Status::CREATED => ContainerState::Created,
            Status::RUNNING => ContainerState::Running,
            Status::PAUSED => ContainerState::Paused,
            Status::RESTARTING => ContainerState::Restarting,
            Status::REMOVING => ContainerState::Removing,
            Status::DEAD => ContainerState::Dead,
            _ => ContainerState::Exited,
        })
        .unwrap_or(ContainerState::Exited)
}

/// Whether `reference` lives on one of the `insecure` registries.
fn is_insecure(insecure: &[String], reference: &ImageRef) -> bool {
    reference
        .registry()
        .is_some_and(|registry| insecure.iter().any(|r| r == registry))
}

// =============================================================================
// BollardRuntime
// =============================================================================

/// Container runtime implementation using bollard.
///
/// Supports both Docker and Podman via Docker-compatible API.
/// For Podman, uses native libpod API for pulls from registries listed as
/// insecure; everything else goes through the verified Docker pull.
pub struct BollardRuntime {
    client: Docker,
    runtime_type: RuntimeType,
    socket_path: Option<String>,
    insecure_registries: Vec<String>,
}

impl BollardRuntime {
    /// Create a new BollardRuntime from a Docker client.
    pub fn new(client: Docker, runtime_type: RuntimeType) -> Self {
        Self {
            client,
            runtime_type,
            socket_path: None,
            insecure_registries: Vec::new(),
        }
    }

    /// Connect to a container runtime using detected runtime info.
    pub fn connect(info: &super::types::RuntimeInfo) -> Result<Self, RuntimeInfoError> {
        let client =
            Docker::connect_with_unix(&info.socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(Self {
            client,
            runtime_type: info.runtime_type,
            socket_path: Some(info.socket_path.clone()),
            insecure_registries: Vec::new(),
        })
    }

    /// Registries to pull from without TLS verification.
    pub fn with_insecure_registries(mut self, registries: Vec<String>) -> Self {
        self.insecure_registries = registries;
        self
    }

    /// Get the runtime type (Docker or Podman).
    pub fn runtime_type(&self) -> RuntimeType {
        self.runtime_type
    }

    fn pulls_insecurely(&self, reference: &ImageRef) -> bool {
        self.runtime_type == RuntimeType::Podman
            && self.socket_path.is_some()
            && is_insecure(&self.insecure_registries, reference)
    }

    /// Pull image using Podman's native libpod API with tlsVerify=false.
    async fn pull_image_libpod(&self, image_name: &str) -> Result<(), ImageError> {
        let socket_path = self.socket_path.as_ref().ok_or_else(|| {
            ImageError::PullFailed("socket path not available for libpod API".to_string())
        })?;

        let stream = UnixStream::connect(socket_path)
            .await
            .map_err(|e| ImageError::PullFailed(format!("failed to connect to socket: {}", e)))?;

        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| ImageError::PullFailed(format!("HTTP handshake failed: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::warn!("libpod connection error: {}", e);
            }
        });

        let uri = format!(
            "/v4.0.0/libpod/images/pull?reference={}&tlsVerify=false",
            urlencoding::encode(image_name)
        );

        let req = hyper::Request::builder()
            .method("POST")
            .uri(&uri)
            .header("Host", "localhost")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
            .map_err(|e| ImageError::PullFailed(format!("failed to build request: {}", e)))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| ImageError::PullFailed(format!("request failed: {}", e)))?;

        use http_body_util::BodyExt;

        let ok = resp.status().is_success();
        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| ImageError::PullFailed(format!("failed to read response: {}", e)))?
            .to_bytes();
        let body_text = String::from_utf8_lossy(&body);

        // Progress is streamed as JSON; a failure may still arrive with 200.
        if !ok || (body_text.contains("\"error\"") && !body_text.contains("\"error\":null")) {
            return Err(ImageError::PullFailed(format!(
                "{}: libpod API error: {}",
                image_name, body_text
            )));
        }

        Ok(())
    }
}

impl Sealed for BollardRuntime {}

#[async_trait]
impl RuntimeInfo for BollardRuntime {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        let info = self
            .client
            .info()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;

        let name = match self.runtime_type {
            RuntimeType::Docker => "Docker".to_string(),
            RuntimeType::Podman => "Podman".to_string(),
        };

        Ok(RuntimeMetadata {
            name,
            version: info.server_version.unwrap_or_default(),
            api_version: bollard::API_DEFAULT_VERSION.to_string(),
            os: info.operating_system.unwrap_or_default(),
            arch: info.architecture.unwrap_or_default(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        self.client
            .ping()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ImageOps for BollardRuntime {
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError> {
        let image_name = reference.to_string();

        if self.pulls_insecurely(reference) {
            tracing::debug!(image = %image_name, "pulling without TLS verification");
            return self.pull_image_libpod(&image_name).await;
        }

        let opts = CreateImageOptions {
            from_image: Some(image_name.clone()),
            ..Default::default()
        };

        // Pull progress arrives as a stream; drain it to completion.
        let mut stream = self.client.create_image(Some(opts), None, None);
        while let Some(result) = stream.next().await {
            result.map_err(|e| map_image_pull_error(e, &image_name))?;
        }

        Ok(())
    }

    async fn image_id(&self, reference: &ImageRef) -> Result<Option<ImageId>, ImageError> {
        let image_name = reference.to_string();

        match self.client.inspect_image(&image_name).await {
            Ok(image) => Ok(image.id.map(ImageId::new)),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(None),
            Err(e) => Err(ImageError::Runtime(format!(
                "failed to inspect {}: {}",
                image_name, e
            ))),
        }
    }

    async fn remove_image(&self, id: &ImageId, force: bool) -> Result<(), ImageError> {
        let opts = RemoveImageOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_image(id.as_str(), Some(opts), None)
            .await
            .map_err(|e| map_image_remove_error(e, id.short()))?;

        Ok(())
    }
}

#[async_trait]
impl ContainerOps for BollardRuntime {
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, ContainerError> {
        let opts = ListContainersOptions {
            filters: Some(HashMap::from([(
                "status".to_string(),
                vec!["running".to_string()],
            )])),
            ..Default::default()
        };

        // Podman reports "stopping" during shutdown, which bollard fails to
        // deserialize. The state is transient, so retry after a short delay.
        let mut last_error = None;
        for attempt in 0..3 {
            match self.client.list_containers(Some(opts.clone())).await {
                Ok(containers) => {
                    return Ok(containers
                        .into_iter()
                        .map(|c| ContainerSummary {
                            id: ContainerId::new(c.id.unwrap_or_default()),
                            name: c
                                .names
                                .unwrap_or_default()
                                .first()
                                .map(|n| n.trim_start_matches('/').to_string())
                                .unwrap_or_default(),
                        })
                        .collect());
                }
                Err(e) => {
                    let err_str = e.to_string();
                    if (err_str.contains("unknown variant `stopping`")
                        || err_str.contains("unknown variant `stopped`"))
                        && attempt < 2
                    {
                        tokio::time::sleep(Duration::from_millis(500)).await;
                        last_error = Some(err_str);
                        continue;
                    }
                    return Err(ContainerError::Runtime(err_str));
                }
            }
        }

        Err(ContainerError::Runtime(
            last_error.unwrap_or_else(|| "list_containers failed".to_string()),
        ))
    }

    async fn inspect_container(
        &self,
        id: &ContainerId,
    ) -> Result<ContainerDetails, ContainerError> {
        let details = self
            .client
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(map_container_not_found_error)?;

        let full_id = details.id.clone().unwrap_or_else(|| id.to_string());
        let host_config = details.host_config.as_ref();

        let links = host_config
            .and_then(|h| h.links.as_ref())
            .map(|links| {
                links
                    .iter()
                    .filter_map(|l| link_target(l))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(ContainerDetails {
            id: ContainerId::new(full_id.clone()),
            name: details.name.clone().unwrap_or_default(),
            image: details
                .config
                .as_ref()
                .and_then(|c| c.image.clone())
                .unwrap_or_default(),
            image_id: ImageId::new(details.image.clone().unwrap_or_default()),
            state: parse_state(&details),
            labels: details
                .config
                .as_ref()
                .and_then(|c| c.labels.clone())
                .unwrap_or_default(),
            links,
            network_mode: host_config.and_then(|h| h.network_mode.clone()),
            spec: capture_spec(&details, &full_id),
        })
    }

    async fn create_container(
        &self,
        name: &str,
        spec: &ContainerSpec,
        image: &ImageRef,
    ) -> Result<ContainerId, ContainerError> {
        let body = ContainerCreateBody {
            image: Some(image.to_string()),
            ..spec.body.clone()
        };

        let opts = CreateContainerOptions {
            name: Some(name.trim_start_matches('/').to_string()),
            ..Default::default()
        };

        let response = self
            .client
            .create_container(Some(opts), body)
            .await
            .map_err(map_container_create_error)?;
        Ok(ContainerId::new(response.id))
    }

    async fn connect_network(
        &self,
        id: &ContainerId,
        network: &str,
        endpoint: &EndpointSettings,
    ) -> Result<(), ContainerError> {
        let request = NetworkConnectRequest {
            container: id.to_string(),
            endpoint_config: Some(endpoint.clone()),
        };
        self.client
            .connect_network(network, request)
            .await
            .map_err(|e| ContainerError::Runtime(format!("failed to connect {}: {}", network, e)))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        self.client
            .start_container(
                id.as_str(),
                None::<bollard::query_parameters::StartContainerOptions>,
            )
            .await
            .map_err(map_container_start_error)
    }

    async fn stop_container(
        &self,
        id: &ContainerId,
        timeout: Duration,
    ) -> Result<(), ContainerError> {
        let opts = StopContainerOptions {
            t: Some(i32::try_from(timeout.as_secs()).unwrap_or(i32::MAX)),
            signal: None,
        };

        self.client
            .stop_container(id.as_str(), Some(opts))
            .await
            .map_err(map_container_stop_error)
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError> {
        let opts = RemoveContainerOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_container(id.as_str(), Some(opts))
            .await
            .map_err(map_container_not_found_error)
    }
}
