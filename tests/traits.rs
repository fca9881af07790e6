// ABOUTME: Tests for runtime trait definitions.
// ABOUTME: Verifies traits compose under generic bounds and their errors render usefully.

use lookout::runtime::traits::*;
use lookout::types::{ContainerId, ImageId, ImageRef};
use std::time::Duration;

/// Verify that function signatures work with trait bounds.
mod trait_bounds {
    use super::*;

    /// Function requiring only ImageOps.
    async fn latest_id(
        runtime: &impl ImageOps,
        image: &ImageRef,
    ) -> Result<Option<ImageId>, ImageError> {
        runtime.pull_image(image).await?;
        runtime.image_id(image).await
    }

    /// Function requiring only ContainerOps.
    async fn is_running(
        runtime: &impl ContainerOps,
        id: &ContainerId,
    ) -> Result<bool, ContainerError> {
        let details = runtime.inspect_container(id).await?;
        Ok(details.state == ContainerState::Running)
    }

    /// Function requiring both capabilities, as a recreate does.
    async fn recreate<R>(runtime: &R, id: &ContainerId, image: &ImageRef) -> Result<ContainerId, String>
    where
        R: ContainerOps + ImageOps,
    {
        let details = runtime
            .inspect_container(id)
            .await
            .map_err(|e| e.to_string())?;
        runtime
            .stop_container(id, Duration::from_secs(10))
            .await
            .map_err(|e| e.to_string())?;
        runtime
            .remove_container(id, false)
            .await
            .map_err(|e| e.to_string())?;
        runtime
            .create_container(details.name.trim_start_matches('/'), &details.spec, image)
            .await
            .map_err(|e| e.to_string())
    }

    #[test]
    fn trait_functions_compile() {
        // The functions above only need to type-check.
    }
}

mod trait_types {
    use super::*;

    #[test]
    fn container_state_equality() {
        assert_eq!(ContainerState::Running, ContainerState::Running);
        assert_ne!(ContainerState::Running, ContainerState::Exited);
    }

    #[test]
    fn default_spec_joins_no_extra_networks() {
        let spec = ContainerSpec::default();
        assert_eq!(spec.extra_network_count(), 0);
        assert_eq!(spec.namespace_owner(), None);
    }

    #[test]
    fn error_types_display() {
        let err = ImageError::NotFound("nginx:latest".to_string());
        assert!(err.to_string().contains("nginx:latest"));

        let err = ImageError::InUse("sha256:abc".to_string());
        assert!(err.to_string().contains("sha256:abc"));

        let err = ContainerError::AlreadyExists("mycontainer".to_string());
        assert!(err.to_string().contains("mycontainer"));

        let err = RuntimeInfoError::ConnectionFailed("timeout".to_string());
        assert!(err.to_string().contains("timeout"));
    }
}
