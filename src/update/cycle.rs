// ABOUTME: One update cycle: filter, check, order, propagate, restart.
// ABOUTME: Stops stale containers dependents-first, then starts them dependencies-first.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use super::client::UpdateClient;
use super::container::Container;
use super::error::UpdateError;
use super::filter::EligibilityFilter;
use super::propagate::propagate_staleness;
use super::report::{CycleReport, Failure};
use super::sort::by_dependencies;

/// Grace period a stopping container gets before it is killed.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for a single update cycle.
#[derive(Debug, Clone)]
pub struct UpdateParams {
    /// Container names that are never touched.
    pub excluded: Vec<String>,
    /// Remove the superseded image after restarting a container.
    pub cleanup: bool,
    pub stop_timeout: Duration,
}

impl Default for UpdateParams {
    fn default() -> Self {
        Self {
            excluded: Vec::new(),
            cleanup: false,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }
}

/// Run one update cycle against `client`.
///
/// Returns an error only when the cycle could not build a trustworthy
/// picture (listing, any staleness check, or dependency ordering failed);
/// in that case no container was touched. Failures to stop, start, or clean
/// up individual containers are logged and collected in the report.
///
/// The client's cache is cleared when the cycle ends, either way.
pub async fn run_update_cycle<C>(
    client: &C,
    params: &UpdateParams,
) -> Result<CycleReport, UpdateError>
where
    C: UpdateClient + ?Sized,
{
    let result = plan_and_restart(client, params).await;
    client.clear_cache();
    result
}

async fn plan_and_restart<C>(
    client: &C,
    params: &UpdateParams,
) -> Result<CycleReport, UpdateError>
where
    C: UpdateClient + ?Sized,
{
    info!("Checking containers for updated images");
    let mut report = CycleReport::new(Utc::now());

    let filter = EligibilityFilter::new(params.excluded.iter().cloned());
    let mut containers = client
        .list_containers(&filter)
        .await
        .map_err(UpdateError::List)?;
    report.scanned = containers.len();

    // Any failed check aborts: acting on a partial picture could restart a
    // dependent without its dependency.
    for container in &mut containers {
        let stale = client
            .is_stale(container)
            .await
            .map_err(|source| UpdateError::StalenessCheck {
                container: container.short_name().to_string(),
                source,
            })?;
        debug!(container = container.short_name(), stale, "image checked");
        if stale {
            container.mark_stale();
        }
    }

    let mut containers = by_dependencies(containers)?;
    report.propagated = propagate_staleness(&mut containers);
    report.stale = containers
        .iter()
        .filter(|c| c.is_stale())
        .map(|c| c.short_name().to_string())
        .collect();

    if report.stale.is_empty() {
        info!("All containers are up to date");
        return Ok(report);
    }
    info!(
        stale = report.stale.len(),
        propagated = report.propagated,
        "Restarting stale containers"
    );

    stop_phase(client, &containers, params.stop_timeout, &mut report).await;
    start_phase(client, &containers, params.cleanup, &mut report).await;

    Ok(report)
}

/// Back to front, so dependents go down before what they depend on.
async fn stop_phase<C>(
    client: &C,
    containers: &[Container],
    timeout: Duration,
    report: &mut CycleReport,
) where
    C: UpdateClient + ?Sized,
{
    for container in containers.iter().rev() {
        if container.is_self() {
            debug!(container = container.short_name(), "not stopping own container");
            continue;
        }
        if !container.is_stale() {
            continue;
        }

        let name = container.short_name();
        info!(container = name, "Stopping container");
        match client.stop(container, timeout).await {
            Ok(()) => report.stopped.push(name.to_string()),
            Err(e) => report.record_failure(Failure::stop(name, e)),
        }
    }
}

/// Front to back, so dependencies come up before their dependents.
async fn start_phase<C>(
    client: &C,
    containers: &[Container],
    cleanup: bool,
    report: &mut CycleReport,
) where
    C: UpdateClient + ?Sized,
{
    for container in containers.iter().filter(|c| c.is_stale()) {
        let name = container.short_name();
        info!(container = name, image = %container.image(), "Starting container");
        match client.start(container).await {
            Ok(()) => report.started.push(name.to_string()),
            Err(e) => report.record_failure(Failure::start(name, e)),
        }

        if cleanup {
            match client.remove_image(container).await {
                Ok(()) => report.images_removed.push(container.image_id().short().to_string()),
                Err(e) => report.record_failure(Failure::remove_image(name, e)),
            }
        }
    }
}
