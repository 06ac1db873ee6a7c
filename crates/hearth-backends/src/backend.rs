// SPDX-License-Identifier: MIT

//! The `WorkerBackend` abstraction: `{spawn, status, cancel, logs}` against
//! either a local container runtime or a cluster scheduler (§2, §4.7). The
//! orchestrator only ever talks to this trait — it does not know or care
//! which concrete backend is wired in.

use async_trait::async_trait;
use thiserror::Error;

/// What the orchestrator asks a backend to run.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub task_id: String,
    pub model: String,
    pub task_description: String,
    pub context_files: Vec<String>,
    pub timeout_minutes: u32,
    /// URL the spawned work should POST its completion webhook to, already
    /// encoding `task_id`.
    pub callback_url: String,
    pub callback_token: String,
}

/// Backend-observed lifecycle state of a spawned job, independent of the
/// store's own `WorkerTaskStatus` — the orchestrator translates between
/// the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    Running,
    Succeeded,
    Failed,
    /// The backend has no record of this job name at all (§4.9: "Backend
    /// returns unknown job" -> mark task failed).
    Unknown,
}

#[derive(Debug, Clone)]
pub struct BackendStatus {
    pub state: BackendState,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend rejected spawn request: {0}")]
    SpawnRejected(String),

    #[error("no such job: {0}")]
    NoSuchJob(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// A handle to a spawned job, returned by `spawn`, that the orchestrator
/// persists as `WorkerTask::job_name`.
pub type JobName = String;

#[async_trait]
pub trait WorkerBackend: Send + Sync {
    async fn spawn(&self, request: SpawnRequest) -> BackendResult<JobName>;
    async fn status(&self, job_name: &str) -> BackendResult<BackendStatus>;
    async fn cancel(&self, job_name: &str) -> BackendResult<()>;
    async fn logs(&self, job_name: &str) -> BackendResult<String>;
}
