// ABOUTME: Update cycle core: decides which containers to restart and in what order.
// ABOUTME: Exports the cycle entry point, the client seam, and the container model.

mod client;
mod container;
mod cycle;
mod error;
mod filter;
mod propagate;
mod report;
mod sort;

pub use client::{ClientError, UpdateClient};
pub use container::{Container, DEPENDS_ON_LABEL, SELF_LABEL};
pub use cycle::{DEFAULT_STOP_TIMEOUT, UpdateParams, run_update_cycle};
pub use error::{UpdateError, UpdateErrorKind};
pub use filter::EligibilityFilter;
pub use propagate::propagate_staleness;
pub use report::{CycleReport, Failure, FailureKind};
pub use sort::{SortError, by_dependencies};
