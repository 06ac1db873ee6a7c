// SPDX-License-Identifier: MIT

//! Worker Task Lifecycle (§4.7): spawn, completion webhook, reconciler,
//! stale marker, cancel, and retention cleanup, all mediated through the
//! store's validated state transitions so a task can never be observed
//! skipping or regressing states (§8 invariant 3).

use std::sync::Arc;

use chrono::Utc;
use hearth_backends::{BackendState, SpawnRequest, WorkerBackend};
use hearth_core::{CallbackToken, ConversationId, Effect, WorkerTask, WorkerTaskId, WorkerTaskStatus};
use hearth_store::Store;

use crate::config::EngineConfig;
use crate::effect_log::log_effect;
use crate::error::{EngineError, EngineResult};

/// Parameters accepted by [`WorkerOrchestrator::spawn`] (§4.7 "spawn").
#[derive(Debug, Clone)]
pub struct SpawnWorkerTask {
    pub conversation_id: ConversationId,
    pub interface_type: String,
    pub task_description: String,
    pub model: Option<String>,
    pub context_files: Vec<String>,
    pub timeout_minutes: Option<u32>,
    pub user_name: Option<String>,
}

/// Fields reported by the completion webhook (§6 "worker completion
/// webhook").
#[derive(Debug, Clone)]
pub struct CompletionReport {
    pub task_id: WorkerTaskId,
    pub token: String,
    pub exit_code: i32,
    pub duration_seconds: f64,
    pub summary: Option<String>,
    pub error_message: Option<String>,
    pub output_files: Vec<String>,
}

pub struct WorkerOrchestrator {
    store: Arc<Store>,
    backend: Arc<dyn WorkerBackend>,
    config: EngineConfig,
    callback_base_url: String,
}

impl WorkerOrchestrator {
    pub fn new(
        store: Arc<Store>,
        backend: Arc<dyn WorkerBackend>,
        config: EngineConfig,
        callback_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            backend,
            config,
            callback_base_url: callback_base_url.into(),
        }
    }

    /// §4.7 spawn steps 1-5, plus the concurrency cap check ahead of step 2.
    pub async fn spawn(&self, request: SpawnWorkerTask) -> EngineResult<WorkerTask> {
        if self.store.running_worker_task_count() >= self.config.max_concurrent_workers as usize {
            return Err(EngineError::RateLimited(
                "max_concurrent_workers reached".into(),
            ));
        }

        let task_id = WorkerTaskId::new();
        let callback_token = CallbackToken::generate();
        let now = Utc::now();

        let task = WorkerTask {
            task_id,
            conversation_id: request.conversation_id,
            interface_type: request.interface_type,
            model: request.model.unwrap_or_else(|| WorkerTask::DEFAULT_MODEL.to_string()),
            task_description: request.task_description.clone(),
            context_files: request.context_files.clone(),
            user_name: request.user_name,
            timeout_minutes: request.timeout_minutes.unwrap_or(WorkerTask::DEFAULT_TIMEOUT_MINUTES),
            status: WorkerTaskStatus::Pending,
            job_name: None,
            started_at: None,
            completed_at: None,
            duration_seconds: None,
            exit_code: None,
            output_files: Vec::new(),
            summary: None,
            error_message: None,
            callback_token: callback_token.clone(),
            created_at: now,
            updated_at: None,
        };
        let task = self.store.create_worker_task(task)?;
        log_effect(&Effect::SpawnWorker {
            task_id: task.task_id,
            conversation_id: task.conversation_id.clone(),
            model: task.model.clone(),
        });

        let spawn_request = SpawnRequest {
            task_id: task_id.to_string(),
            model: task.model.clone(),
            task_description: task.task_description.clone(),
            context_files: task.context_files.clone(),
            timeout_minutes: task.timeout_minutes,
            callback_url: format!("{}/workers/{}/complete", self.callback_base_url, task_id),
            callback_token: callback_token.as_str().to_string(),
        };

        match self.backend.spawn(spawn_request).await {
            Ok(job_name) => Ok(self.store.transition_worker_task(
                task_id,
                WorkerTaskStatus::Submitted,
                Utc::now(),
                |row| row.job_name = Some(job_name),
            )?),
            Err(err) => Ok(self.store.transition_worker_task(
                task_id,
                WorkerTaskStatus::Failed,
                Utc::now(),
                |row| row.error_message = Some(err.to_string()),
            )?),
        }
    }

    /// §4.7 "Status": a pure read of the reconciled DB state.
    pub fn get_status(&self, task_id: WorkerTaskId) -> EngineResult<WorkerTask> {
        Ok(self.store.get_worker_task(task_id)?)
    }

    /// §2 worker backend abstraction's `logs` operation, proxied through to
    /// whichever job the task is currently bound to. A task with no
    /// `job_name` yet (still `pending`) has nothing to fetch.
    pub async fn logs(&self, task_id: WorkerTaskId) -> EngineResult<String> {
        let task = self.store.get_worker_task(task_id)?;
        let Some(job_name) = &task.job_name else {
            return Err(EngineError::InvalidArgument(format!(
                "worker task {task_id} has not been submitted to a backend yet"
            )));
        };
        Ok(self.backend.logs(job_name).await?)
    }

    /// §6 "worker completion webhook": token mismatch is unauthorized,
    /// unknown task is not-found, an already-terminal task is a silent
    /// no-op (idempotent duplicate delivery).
    pub fn complete(&self, report: CompletionReport) -> EngineResult<()> {
        let task = self.store.get_worker_task(report.task_id)?;
        if !task.callback_token.matches(&report.token) {
            return Err(EngineError::Unauthorized("callback token mismatch".into()));
        }
        if task.status.is_terminal() {
            return Ok(());
        }

        let next = if report.exit_code == 0 {
            WorkerTaskStatus::Success
        } else {
            WorkerTaskStatus::Failed
        };
        self.store.transition_worker_task(report.task_id, next, Utc::now(), |row| {
            row.exit_code = Some(report.exit_code);
            row.duration_seconds = Some(report.duration_seconds);
            row.summary = report.summary;
            row.error_message = report.error_message;
            row.output_files = report.output_files;
        })?;
        Ok(())
    }

    /// §4.7 "Cancel": terminal tasks reject; otherwise the backend is asked
    /// to cancel before the row is marked `cancelled`.
    pub async fn cancel(&self, task_id: WorkerTaskId) -> EngineResult<WorkerTask> {
        let task = self.store.get_worker_task(task_id)?;
        if task.status.is_terminal() {
            return Err(EngineError::Conflict(format!(
                "worker task {task_id} is already terminal"
            )));
        }
        log_effect(&Effect::CancelWorker { task_id });
        if let Some(job_name) = &task.job_name {
            self.backend.cancel(job_name).await?;
        }
        Ok(self.store.transition_worker_task(
            task_id,
            WorkerTaskStatus::Cancelled,
            Utc::now(),
            |_| {},
        )?)
    }

    /// §4.7 "Reconciler": for each active task, resolve its backend-observed
    /// state and bring the DB row in line. Per-task errors are logged and
    /// skipped rather than aborting the sweep.
    pub async fn reconcile(&self) -> usize {
        let now = Utc::now();
        let mut reconciled = 0;
        for task in self.store.active_worker_tasks() {
            match self.reconcile_one(&task, now).await {
                Ok(true) => reconciled += 1,
                Ok(false) => {}
                Err(err) => tracing::warn!(task_id = %task.task_id, error = %err, "reconcile failed"),
            }
        }
        reconciled
    }

    async fn reconcile_one(&self, task: &WorkerTask, now: chrono::DateTime<Utc>) -> EngineResult<bool> {
        let Some(job_name) = &task.job_name else {
            if now - task.created_at < self.config.orphan_grace() {
                return Ok(false);
            }
            self.store.transition_worker_task(task.task_id, WorkerTaskStatus::Failed, now, |row| {
                row.error_message = Some("no job_name assigned before grace period elapsed".into());
            })?;
            return Ok(true);
        };

        match self.backend.status(job_name).await {
            Ok(status) => match status.state {
                BackendState::Succeeded => {
                    self.store.transition_worker_task(task.task_id, WorkerTaskStatus::Success, now, |row| {
                        row.exit_code = status.exit_code;
                    })?;
                    Ok(true)
                }
                BackendState::Failed => {
                    self.store.transition_worker_task(task.task_id, WorkerTaskStatus::Failed, now, |row| {
                        row.exit_code = status.exit_code;
                        row.error_message = Some("backend reported failure".into());
                    })?;
                    Ok(true)
                }
                BackendState::Unknown => {
                    self.store.transition_worker_task(task.task_id, WorkerTaskStatus::Failed, now, |row| {
                        row.error_message = Some("ghost job: backend has no record of job_name".into());
                    })?;
                    Ok(true)
                }
                BackendState::Running => {
                    if task.status == WorkerTaskStatus::Submitted {
                        self.store.transition_worker_task(task.task_id, WorkerTaskStatus::Running, now, |row| {
                            row.started_at = Some(now);
                        })?;
                        Ok(true)
                    } else {
                        Ok(false)
                    }
                }
            },
            Err(hearth_backends::BackendError::NoSuchJob(_)) => {
                self.store.transition_worker_task(task.task_id, WorkerTaskStatus::Failed, now, |row| {
                    row.error_message = Some("ghost job: backend has no record of job_name".into());
                })?;
                Ok(true)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// §4.7 "Stale marker": `submitted` rows stuck past `submitted_timeout`,
    /// and `running` rows past `timeout_minutes + running_buffer`, fail.
    pub async fn mark_stale(&self) -> usize {
        let now = Utc::now();
        let mut marked = 0;
        for task in self.store.active_worker_tasks() {
            let stale = match task.status {
                WorkerTaskStatus::Submitted => {
                    now - task.created_at > chrono::Duration::from_std(self.config.submitted_timeout()).unwrap_or_default()
                }
                WorkerTaskStatus::Running => {
                    let allowance = chrono::Duration::minutes(task.timeout_minutes as i64)
                        + chrono::Duration::from_std(self.config.running_buffer()).unwrap_or_default();
                    task.started_at.is_some_and(|started| now - started > allowance)
                }
                _ => false,
            };
            if !stale {
                continue;
            }
            let result = self.store.transition_worker_task(task.task_id, WorkerTaskStatus::Failed, now, |row| {
                row.error_message = Some("exceeded timeout".into());
            });
            match result {
                Ok(_) => marked += 1,
                Err(err) => tracing::warn!(task_id = %task.task_id, error = %err, "stale marker failed"),
            }
        }
        marked
    }

    /// §4.7 "Cleanup": delete terminal rows older than `task_retention`.
    /// Active rows are never touched here regardless of age (invariant 5).
    pub fn cleanup(&self) -> EngineResult<usize> {
        let cutoff = Utc::now() - chrono::Duration::from_std(self.config.task_retention()).unwrap_or_default();
        Ok(self.store.cleanup_terminal_worker_tasks(cutoff)?)
    }
}

#[cfg(test)]
mod tests {
    use hearth_backends::test_support::FakeBackend;
    use hearth_core::SystemClock;

    use super::*;

    fn orchestrator(backend: Arc<dyn WorkerBackend>) -> (Arc<Store>, WorkerOrchestrator) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path(), Arc::new(SystemClock)).unwrap());
        let orchestrator = WorkerOrchestrator::new(
            store.clone(),
            backend,
            EngineConfig::default(),
            "http://localhost:8080",
        );
        (store, orchestrator)
    }

    fn spawn_request() -> SpawnWorkerTask {
        SpawnWorkerTask {
            conversation_id: ConversationId::new("conv_a"),
            interface_type: "chat".into(),
            task_description: "summarize the repo".into(),
            model: None,
            context_files: Vec::new(),
            timeout_minutes: None,
            user_name: None,
        }
    }

    #[tokio::test]
    async fn spawn_transitions_to_submitted_on_backend_success() {
        let (_store, orchestrator) = orchestrator(Arc::new(FakeBackend::default()));
        let task = orchestrator.spawn(spawn_request()).await.unwrap();
        assert_eq!(task.status, WorkerTaskStatus::Submitted);
        assert!(task.job_name.is_some());
    }

    #[tokio::test]
    async fn spawn_rejects_when_concurrency_cap_reached() {
        let (store, orchestrator) = orchestrator(Arc::new(FakeBackend::default()));
        let mut config = EngineConfig::default();
        config.max_concurrent_workers = 0;
        let orchestrator = WorkerOrchestrator::new(
            store,
            Arc::new(FakeBackend::default()),
            config,
            "http://localhost:8080",
        );
        let err = orchestrator.spawn(spawn_request()).await.unwrap_err();
        assert!(matches!(err, EngineError::RateLimited(_)));
    }

    #[tokio::test]
    async fn completion_webhook_rejects_token_mismatch() {
        let (_store, orchestrator) = orchestrator(Arc::new(FakeBackend::default()));
        let task = orchestrator.spawn(spawn_request()).await.unwrap();
        let err = orchestrator
            .complete(CompletionReport {
                task_id: task.task_id,
                token: "wrong-token".into(),
                exit_code: 0,
                duration_seconds: 1.0,
                summary: None,
                error_message: None,
                output_files: Vec::new(),
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn completion_webhook_after_terminal_state_is_a_no_op() {
        let backend = Arc::new(FakeBackend::default());
        let (store, orchestrator) = orchestrator(backend.clone());
        let task = orchestrator.spawn(spawn_request()).await.unwrap();
        store
            .transition_worker_task(task.task_id, WorkerTaskStatus::Running, Utc::now(), |row| {
                row.started_at = Some(Utc::now())
            })
            .unwrap();
        store
            .transition_worker_task(task.task_id, WorkerTaskStatus::Success, Utc::now(), |_| {})
            .unwrap();

        let token = store.get_worker_task(task.task_id).unwrap().callback_token;
        orchestrator
            .complete(CompletionReport {
                task_id: task.task_id,
                token: token.as_str().to_string(),
                exit_code: 1,
                duration_seconds: 1.0,
                summary: None,
                error_message: Some("should be ignored".into()),
                output_files: Vec::new(),
            })
            .unwrap();

        let reloaded = store.get_worker_task(task.task_id).unwrap();
        assert_eq!(reloaded.status, WorkerTaskStatus::Success);
        assert_ne!(reloaded.error_message.as_deref(), Some("should be ignored"));
    }

    #[tokio::test]
    async fn reconcile_promotes_submitted_task_to_running_once_backend_reports_running() {
        let (store, orchestrator) = orchestrator(Arc::new(FakeBackend::default()));
        let task = orchestrator.spawn(spawn_request()).await.unwrap();
        assert_eq!(task.status, WorkerTaskStatus::Submitted);

        orchestrator.reconcile().await;

        let reloaded = store.get_worker_task(task.task_id).unwrap();
        assert_eq!(reloaded.status, WorkerTaskStatus::Running);
        assert!(reloaded.started_at.is_some());
    }

    #[tokio::test]
    async fn s4_reconciler_fails_orphaned_submitted_task_with_null_job_name() {
        let (store, orchestrator) = orchestrator(Arc::new(FakeBackend::default()));
        let mut task = hearth_core::WorkerTask::builder()
            .status(WorkerTaskStatus::Submitted)
            .created_at(Utc::now() - chrono::Duration::minutes(10))
            .build();
        task.job_name = None;
        let task_id = task.task_id;
        store.create_worker_task(task).unwrap();

        orchestrator.reconcile().await;

        let reloaded = store.get_worker_task(task_id).unwrap();
        assert_eq!(reloaded.status, WorkerTaskStatus::Failed);
        assert!(reloaded.error_message.unwrap().contains("no job_name"));
    }

    #[tokio::test]
    async fn s5_cleanup_deletes_only_old_terminal_tasks() {
        let (store, orchestrator) = orchestrator(Arc::new(FakeBackend::default()));
        let running = hearth_core::WorkerTask::builder()
            .status(WorkerTaskStatus::Running)
            .created_at(Utc::now() - chrono::Duration::hours(72))
            .build();
        let succeeded = hearth_core::WorkerTask::builder()
            .status(WorkerTaskStatus::Success)
            .created_at(Utc::now() - chrono::Duration::hours(72))
            .build();
        let running_id = running.task_id;
        store.create_worker_task(running).unwrap();
        store.create_worker_task(succeeded).unwrap();

        let mut config = EngineConfig::default();
        config.task_retention_hours = 48;
        let orchestrator = WorkerOrchestrator::new(
            Arc::clone(&store),
            Arc::new(FakeBackend::default()),
            config,
            "http://localhost:8080",
        );

        let deleted = orchestrator.cleanup().unwrap();
        assert_eq!(deleted, 1);
        assert!(store.get_worker_task(running_id).is_ok());
    }

    #[tokio::test]
    async fn spawn_transitions_straight_to_failed_on_backend_rejection() {
        let backend = Arc::new(FakeBackend::default());
        backend.fail_next_spawn("quota exceeded");
        let (_store, orchestrator) = orchestrator(backend);
        let task = orchestrator.spawn(spawn_request()).await.unwrap();
        assert_eq!(task.status, WorkerTaskStatus::Failed);
        assert_eq!(task.error_message.as_deref(), Some("quota exceeded"));
    }

    #[tokio::test]
    async fn reconcile_promotes_running_task_to_success_once_backend_reports_it() {
        let backend = Arc::new(FakeBackend::default());
        let (store, orchestrator) = orchestrator(backend.clone());
        let task = orchestrator.spawn(spawn_request()).await.unwrap();
        let job_name = task.job_name.clone().unwrap();

        backend.set_state(&job_name, BackendState::Succeeded, Some(0));
        orchestrator.reconcile().await;

        let reloaded = store.get_worker_task(task.task_id).unwrap();
        assert_eq!(reloaded.status, WorkerTaskStatus::Success);
        assert_eq!(reloaded.exit_code, Some(0));
    }

    #[tokio::test]
    async fn logs_proxies_through_to_the_backend_for_a_submitted_task() {
        let backend = Arc::new(FakeBackend::default());
        let (_store, orchestrator) = orchestrator(backend.clone());
        let task = orchestrator.spawn(spawn_request()).await.unwrap();
        let job_name = task.job_name.clone().unwrap();
        backend.set_logs(&job_name, "hello from the sandbox\n");

        let logs = orchestrator.logs(task.task_id).await.unwrap();
        assert_eq!(logs, "hello from the sandbox\n");
    }

    #[tokio::test]
    async fn logs_rejects_a_task_that_has_not_been_submitted_yet() {
        let (store, orchestrator) = orchestrator(Arc::new(FakeBackend::default()));
        let task = hearth_core::WorkerTask::builder().status(WorkerTaskStatus::Pending).build();
        let task_id = task.task_id;
        store.create_worker_task(task).unwrap();

        let err = orchestrator.logs(task_id).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn reconcile_fails_a_task_whose_job_the_backend_has_forgotten() {
        let backend = Arc::new(FakeBackend::default());
        let (store, orchestrator) = orchestrator(backend.clone());
        let task = orchestrator.spawn(spawn_request()).await.unwrap();
        let job_name = task.job_name.clone().unwrap();

        backend.forget(&job_name);
        orchestrator.reconcile().await;

        let reloaded = store.get_worker_task(task.task_id).unwrap();
        assert_eq!(reloaded.status, WorkerTaskStatus::Failed);
        assert!(reloaded.error_message.unwrap().contains("ghost job"));
    }
}
