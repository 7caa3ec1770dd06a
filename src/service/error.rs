use thiserror::Error;

/// Failure taxonomy of the leave lifecycle. Every variant is recoverable at
/// the call boundary; a failed transition leaves the stored record unchanged.
#[derive(Debug, Error)]
pub enum LeaveError {
    /// Malformed input: weekend-only date range, blank rejection comment.
    #[error("{0}")]
    Validation(String),

    #[error("leave request not found")]
    NotFound,

    /// Actor lacks the required role or ownership.
    #[error("{0}")]
    Forbidden(String),

    /// Operation not permitted from the record's current status.
    #[error("{0}")]
    InvalidState(String),

    #[error("storage failure: {0}")]
    Store(#[from] anyhow::Error),
}

pub type LeaveResult<T> = Result<T, LeaveError>;
