// SPDX-License-Identifier: MIT

//! The error taxonomy shared by every layer above storage. Each variant maps
//! to exactly one HTTP status at the edge (`hearth-daemon::http`), so callers
//! downstream of the core never need to inspect a message string to decide
//! how to react.

use thiserror::Error;

/// A core-level error. Crates that need additional context wrap this in a
/// crate-local error type rather than adding variants here.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(what: impl Into<String>) -> Self {
        Self::Conflict(what.into())
    }

    pub fn invalid_argument(what: impl Into<String>) -> Self {
        Self::InvalidArgument(what.into())
    }

    pub fn unauthorized(what: impl Into<String>) -> Self {
        Self::Unauthorized(what.into())
    }

    pub fn rate_limited(what: impl Into<String>) -> Self {
        Self::RateLimited(what.into())
    }

    pub fn backend_unavailable(what: impl Into<String>) -> Self {
        Self::BackendUnavailable(what.into())
    }

    pub fn internal(what: impl Into<String>) -> Self {
        Self::Internal(what.into())
    }

    /// Stable machine-readable kind, used in logs and wire error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Unauthorized(_) => "unauthorized",
            Self::RateLimited(_) => "rate_limited",
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether retrying the same operation in-band is reasonable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BackendUnavailable(_))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
