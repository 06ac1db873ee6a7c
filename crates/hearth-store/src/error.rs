// SPDX-License-Identifier: MIT

//! Store-local error type. Converts into [`hearth_core::CoreError`] at the
//! crate boundary so callers above the store never match on WAL/IO details.

use hearth_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("transient store error: {0}")]
    Transient(String),

    #[error("wal io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wal serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Io(_))
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => CoreError::not_found(msg),
            StoreError::Conflict(msg) => CoreError::conflict(msg),
            StoreError::InvalidArgument(msg) => CoreError::invalid_argument(msg),
            StoreError::Transient(msg) => CoreError::internal(format!("store retries exhausted: {msg}")),
            StoreError::Io(err) => CoreError::internal(format!("store retries exhausted: {err}")),
            StoreError::Serde(err) => CoreError::internal(format!("store corruption: {err}")),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
