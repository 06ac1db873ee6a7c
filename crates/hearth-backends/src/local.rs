// SPDX-License-Identifier: MIT

//! Local container runtime backend: shells out to the `docker` CLI, the
//! same way the teacher's `DockerAdapter` drives `docker run`/`rm`/`port`
//! rather than talking to the daemon socket directly (§4.7 "local container
//! runtime").

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::backend::{BackendError, BackendResult, BackendState, BackendStatus, JobName, SpawnRequest, WorkerBackend};

/// Container name prefix, so `docker ps` output is visibly ours.
const CONTAINER_PREFIX: &str = "hearth-task-";

#[derive(Debug, Clone)]
pub struct LocalBackendConfig {
    pub image: String,
    /// Directory on the host mounted read-only as each task's workspace.
    pub workspace_root: Option<std::path::PathBuf>,
}

impl Default for LocalBackendConfig {
    fn default() -> Self {
        Self {
            image: std::env::var("HEARTH_WORKER_IMAGE").unwrap_or_else(|_| "hearth-worker:latest".into()),
            workspace_root: std::env::var("HEARTH_WORKER_WORKSPACE_ROOT").ok().map(Into::into),
        }
    }
}

/// Backend that spawns each task as a detached `docker run` container,
/// named deterministically from `task_id` so `status`/`cancel`/`logs` never
/// need to persist their own side table beyond the container name itself.
#[derive(Clone)]
pub struct LocalContainerBackend {
    config: LocalBackendConfig,
    /// `task_id -> container_name`, kept only so `spawn` can be called more
    /// than once defensively without recomputing the name; the name itself
    /// is a pure function of `task_id` so this is a cache, not state of
    /// record.
    containers: Arc<Mutex<HashMap<String, String>>>,
}

impl LocalContainerBackend {
    pub fn new(config: LocalBackendConfig) -> Self {
        Self {
            config,
            containers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn container_name(task_id: &str) -> String {
        format!("{CONTAINER_PREFIX}{task_id}")
    }

    async fn run_docker(args: &[&str]) -> Result<String, String> {
        let output = tokio::process::Command::new("docker")
            .args(args)
            .output()
            .await
            .map_err(|err| format!("failed to exec docker: {err}"))?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(format!("docker {} failed: {}", args.first().unwrap_or(&""), stderr.trim()))
        }
    }
}

#[async_trait]
impl WorkerBackend for LocalContainerBackend {
    async fn spawn(&self, request: SpawnRequest) -> BackendResult<JobName> {
        let container_name = Self::container_name(&request.task_id);

        let timeout_arg = format!("{}m", request.timeout_minutes);
        let callback_url_env = format!("HEARTH_CALLBACK_URL={}", request.callback_url);
        let callback_token_env = format!("HEARTH_CALLBACK_TOKEN={}", request.callback_token);
        let model_env = format!("HEARTH_MODEL={}", request.model);
        let task_env = format!("HEARTH_TASK_DESCRIPTION={}", request.task_description);

        let mut args: Vec<&str> = vec![
            "run",
            "-d",
            "--name",
            &container_name,
            "--stop-timeout",
            &timeout_arg,
            "-e",
            &callback_url_env,
            "-e",
            &callback_token_env,
            "-e",
            &model_env,
            "-e",
            &task_env,
        ];

        let workspace_mount;
        if let Some(root) = &self.config.workspace_root {
            workspace_mount = format!("{}:/workspace:ro", root.display());
            args.extend_from_slice(&["-v", &workspace_mount]);
        }

        args.push(&self.config.image);

        tracing::info!(task_id = %request.task_id, %container_name, "spawning local container");

        Self::run_docker(&args)
            .await
            .map_err(BackendError::SpawnRejected)?;

        self.containers
            .lock()
            .insert(request.task_id.clone(), container_name.clone());
        Ok(container_name)
    }

    async fn status(&self, job_name: &str) -> BackendResult<BackendStatus> {
        let inspect = Self::run_docker(&[
            "inspect",
            "--format",
            "{{.State.Status}}|{{.State.ExitCode}}",
            job_name,
        ])
        .await;

        let output = match inspect {
            Ok(output) => output,
            Err(_) => return Ok(BackendStatus { state: BackendState::Unknown, exit_code: None }),
        };

        let mut parts = output.splitn(2, '|');
        let status = parts.next().unwrap_or_default();
        let exit_code: Option<i32> = parts.next().and_then(|s| s.parse().ok());

        let state = match status {
            "running" | "created" | "restarting" => BackendState::Running,
            "exited" => {
                if exit_code == Some(0) {
                    BackendState::Succeeded
                } else {
                    BackendState::Failed
                }
            }
            "dead" => BackendState::Failed,
            _ => BackendState::Unknown,
        };
        Ok(BackendStatus { state, exit_code })
    }

    async fn cancel(&self, job_name: &str) -> BackendResult<()> {
        Self::run_docker(&["stop", job_name])
            .await
            .map(|_| ())
            .map_err(|err| {
                if err.contains("No such container") {
                    BackendError::NoSuchJob(job_name.to_string())
                } else {
                    BackendError::Unavailable(err)
                }
            })
    }

    async fn logs(&self, job_name: &str) -> BackendResult<String> {
        Self::run_docker(&["logs", "--tail", "500", job_name])
            .await
            .map_err(|err| {
                if err.contains("No such container") {
                    BackendError::NoSuchJob(job_name.to_string())
                } else {
                    BackendError::Unavailable(err)
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_name_is_deterministic_from_task_id() {
        assert_eq!(
            LocalContainerBackend::container_name("abc123"),
            "hearth-task-abc123"
        );
    }
}
