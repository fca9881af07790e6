// ABOUTME: Container runtime access for Docker and Podman.
// ABOUTME: Socket detection, connection, and the capability traits the updater drives.

mod bollard;
mod detection;
mod error;
pub mod traits;
mod types;

pub use self::bollard::BollardRuntime;
pub use detection::{DetectionError, detect};
pub use error::RuntimeError;
pub use traits::{
    ContainerDetails, ContainerError, ContainerOps, ContainerSpec, ContainerState,
    ContainerSummary, ImageError, ImageOps, RuntimeInfo as RuntimeInfoTrait, RuntimeInfoError,
    RuntimeMetadata,
};
pub use types::{RuntimeConfig, RuntimeInfo, RuntimeType};

/// Detect the local runtime (honoring explicit overrides) and connect to it.
pub fn connect(config: &RuntimeConfig) -> Result<BollardRuntime, RuntimeError> {
    let info = detect(config)?;
    tracing::debug!(runtime = %info.runtime_type, socket = %info.socket_path, "runtime detected");
    if info.runtime_type == RuntimeType::Docker && !config.insecure_registries.is_empty() {
        tracing::warn!("insecure_registries only applies to podman, configure the docker daemon");
    }
    Ok(BollardRuntime::connect(&info)?
        .with_insecure_registries(config.insecure_registries.clone()))
}
