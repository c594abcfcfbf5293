//! Availability error taxonomy.
//!
//! Read-path failures (timeout, transport, snapshot corruption) are absorbed
//! inside the reader and never reach the page-rendering caller; write-path
//! failures always propagate, because silently dropping a write would break
//! the authoritative-source invariant.

use std::time::Duration;

use thiserror::Error;

/// Failure of a primary data source call. Cloneable so a single in-flight
/// call's outcome can be shared between deduplicated waiters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("primary data source did not respond within {deadline:?}")]
    Timeout { deadline: Duration },
    #[error("primary data source unavailable: {reason}")]
    Unavailable { reason: String },
}

impl UpstreamError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Failure of a create/update/delete operation, surfaced to the caller.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("item not found at the primary data source")]
    NotFound,
    #[error("write conflict at the primary data source: {message}")]
    Conflict { message: String },
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl WriteError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }
}
