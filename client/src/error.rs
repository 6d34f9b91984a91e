//! Client-side error types.

use thiserror::Error;

/// Errors surfaced by the sync service handle.
///
/// Remote and cache failures never reach this type: the engine absorbs them
/// into its own degraded-mode rules and reports them through snapshots. The
/// handle only fails when the service itself is gone.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The service task has stopped and can no longer accept commands.
    #[error("sync service is no longer running")]
    Closed,
}
