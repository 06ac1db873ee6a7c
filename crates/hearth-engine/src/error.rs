// SPDX-License-Identifier: MIT

//! Engine-local error type. Every public entry point on the registry,
//! processor, dispatcher, and orchestrator returns this; `hearth-daemon`
//! maps it onto HTTP status at the edge via `CoreError`.

use thiserror::Error;

use hearth_backends::BackendError;
use hearth_core::CoreError;
use hearth_sandbox::SandboxError;
use hearth_store::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
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

impl EngineError {
    pub fn kind(&self) -> &'static str {
        CoreError::from(self.clone_shape()).kind()
    }

    /// Project onto the same discriminant a `CoreError` would carry, without
    /// cloning the inner message (used only by `kind()`).
    fn clone_shape(&self) -> CoreError {
        match self {
            Self::NotFound(m) => CoreError::not_found(m.clone()),
            Self::Conflict(m) => CoreError::conflict(m.clone()),
            Self::InvalidArgument(m) => CoreError::invalid_argument(m.clone()),
            Self::Unauthorized(m) => CoreError::unauthorized(m.clone()),
            Self::RateLimited(m) => CoreError::rate_limited(m.clone()),
            Self::BackendUnavailable(m) => CoreError::backend_unavailable(m.clone()),
            Self::Internal(m) => CoreError::internal(m.clone()),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match CoreError::from(err) {
            CoreError::NotFound(m) => Self::NotFound(m),
            CoreError::Conflict(m) => Self::Conflict(m),
            CoreError::InvalidArgument(m) => Self::InvalidArgument(m),
            CoreError::Unauthorized(m) => Self::Unauthorized(m),
            CoreError::RateLimited(m) => Self::RateLimited(m),
            CoreError::BackendUnavailable(m) => Self::BackendUnavailable(m),
            CoreError::Internal(m) => Self::Internal(m),
        }
    }
}

impl From<BackendError> for EngineError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unavailable(m) => Self::BackendUnavailable(m),
            BackendError::SpawnRejected(m) => Self::BackendUnavailable(m),
            BackendError::NoSuchJob(m) => Self::NotFound(format!("backend job {m}")),
        }
    }
}

impl From<SandboxError> for EngineError {
    fn from(err: SandboxError) -> Self {
        Self::Internal(format!("sandbox: {err}"))
    }
}

impl From<EngineError> for CoreError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound(m) => Self::NotFound(m),
            EngineError::Conflict(m) => Self::Conflict(m),
            EngineError::InvalidArgument(m) => Self::InvalidArgument(m),
            EngineError::Unauthorized(m) => Self::Unauthorized(m),
            EngineError::RateLimited(m) => Self::RateLimited(m),
            EngineError::BackendUnavailable(m) => Self::BackendUnavailable(m),
            EngineError::Internal(m) => Self::Internal(m),
        }
    }
}
