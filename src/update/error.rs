// ABOUTME: Errors that abort a whole update cycle.
// ABOUTME: Per-container failures are reported separately and never land here.

use super::client::ClientError;
use super::sort::SortError;

/// A cycle-level failure: nothing was stopped, started, or removed.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("failed to list containers: {0}")]
    List(#[source] ClientError),

    #[error("failed to check {container} for a newer image: {source}")]
    StalenessCheck {
        container: String,
        #[source]
        source: ClientError,
    },

    #[error(transparent)]
    Sort(#[from] SortError),
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateErrorKind {
    Discovery,
    StalenessCheck,
    DependencyOrder,
}

impl UpdateError {
    pub fn kind(&self) -> UpdateErrorKind {
        match self {
            UpdateError::List(_) => UpdateErrorKind::Discovery,
            UpdateError::StalenessCheck { .. } => UpdateErrorKind::StalenessCheck,
            UpdateError::Sort(_) => UpdateErrorKind::DependencyOrder,
        }
    }
}
