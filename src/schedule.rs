// ABOUTME: Periodic scheduling of update cycles.
// ABOUTME: Runs one cycle at a time until the shutdown future resolves.

use crate::output::Output;
use crate::update::{CycleReport, UpdateClient, UpdateError, UpdateParams, run_update_cycle};
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};

/// Run one cycle and report its outcome.
pub async fn run_once<C>(
    client: &C,
    params: &UpdateParams,
    output: &mut Output,
) -> Result<CycleReport, UpdateError>
where
    C: UpdateClient + ?Sized,
{
    output.start_timer();
    match run_update_cycle(client, params).await {
        Ok(report) => {
            info!(summary = %report.summary(), "Update cycle finished");
            output.report(&report);
            Ok(report)
        }
        Err(e) => {
            error!(error = %e, kind = ?e.kind(), "Update cycle aborted");
            output.error(&e.to_string());
            Err(e)
        }
    }
}

/// Run a cycle now and then every `interval` until `shutdown` resolves.
///
/// A cycle is never interrupted: shutdown takes effect once the running
/// cycle is done. A cycle that overruns the interval delays the next one
/// instead of triggering a burst. Aborted cycles are logged and the next
/// tick tries again. Returns the number of cycles run.
pub async fn watch<C, S>(
    client: &C,
    params: &UpdateParams,
    interval: Duration,
    output: &mut Output,
    shutdown: S,
) -> u64
where
    C: UpdateClient + ?Sized,
    S: Future<Output = ()>,
{
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    info!(interval = ?interval, "Watching containers");
    let mut cycles = 0;
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!(cycles, "Shutting down");
                break;
            }
            _ = ticker.tick() => {
                // Already logged and reported.
                let _ = run_once(client, params, output).await;
                cycles += 1;
            }
        }
    }
    cycles
}

/// Resolves on Ctrl-C. If the handler cannot be installed, never resolves.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
