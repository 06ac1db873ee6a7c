// SPDX-License-Identifier: MIT

//! Worker task persistence: creation, status transitions, and the queries
//! the reconciler/stale-marker/cleanup sweeps need (§4.7). Grounded in the
//! original service's `WorkerTasksRepository` (`create_task`,
//! `get_running_tasks_count`, `cleanup_old_tasks`).

use chrono::{DateTime, Utc};
use hearth_core::{ConversationId, WorkerTask, WorkerTaskId, WorkerTaskStatus};

use crate::error::{StoreError, StoreResult};
use crate::store::Store;
use crate::wal::WalEntry;

impl Store {
    pub fn create_worker_task(&self, task: WorkerTask) -> StoreResult<WorkerTask> {
        self.with_state(|state, wal| {
            wal.append(&WalEntry::UpsertWorkerTask(task.clone()))?;
            state.worker_tasks.insert(task.task_id, task.clone());
            Ok(task)
        })
    }

    pub fn get_worker_task(&self, task_id: WorkerTaskId) -> StoreResult<WorkerTask> {
        self.with_state_ref(|state| state.worker_tasks.get(&task_id).cloned())
            .ok_or_else(|| StoreError::NotFound(format!("worker task {task_id}")))
    }

    pub fn worker_tasks_for_conversation(&self, conversation_id: &ConversationId) -> Vec<WorkerTask> {
        self.with_state_ref(|state| {
            let mut tasks: Vec<_> = state
                .worker_tasks
                .values()
                .filter(|t| &t.conversation_id == conversation_id)
                .cloned()
                .collect();
            tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            tasks
        })
    }

    /// All rows currently in an active state, for the reconciler and
    /// stale-marker sweeps.
    pub fn active_worker_tasks(&self) -> Vec<WorkerTask> {
        self.with_state_ref(|state| {
            state
                .worker_tasks
                .values()
                .filter(|t| t.status.is_active())
                .cloned()
                .collect()
        })
    }

    pub fn running_worker_task_count(&self) -> usize {
        self.with_state_ref(|state| {
            state
                .worker_tasks
                .values()
                .filter(|t| t.status.is_active())
                .count()
        })
    }

    /// Apply a validated status transition and persist it. Rejects moves
    /// the state machine disallows (§4.8) rather than silently clamping.
    pub fn transition_worker_task(
        &self,
        task_id: WorkerTaskId,
        next: WorkerTaskStatus,
        now: DateTime<Utc>,
        apply_fields: impl FnOnce(&mut WorkerTask),
    ) -> StoreResult<WorkerTask> {
        self.with_state(|state, wal| {
            let task = state
                .worker_tasks
                .get_mut(&task_id)
                .ok_or_else(|| StoreError::NotFound(format!("worker task {task_id}")))?;
            if !task.can_transition_to(next) {
                return Err(StoreError::Conflict(format!(
                    "worker task {task_id} cannot move from {} to {next}",
                    task.status
                )));
            }
            apply_fields(task);
            task.transition(next, now);
            let updated = task.clone();
            wal.append(&WalEntry::UpsertWorkerTask(updated.clone()))?;
            Ok(updated)
        })
    }

    /// Delete terminal rows older than `created_before`. Active rows are
    /// never touched here, regardless of age (§4.7, invariant 5) — that's
    /// the reconciler's job.
    pub fn cleanup_terminal_worker_tasks(&self, created_before: DateTime<Utc>) -> StoreResult<usize> {
        self.with_state(|state, wal| {
            let doomed: Vec<WorkerTaskId> = state
                .worker_tasks
                .values()
                .filter(|t| t.status.is_terminal() && t.created_at < created_before)
                .map(|t| t.task_id)
                .collect();
            for id in &doomed {
                state.worker_tasks.remove(id);
                wal.append(&WalEntry::DeleteWorkerTask(*id))?;
            }
            Ok(doomed.len())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hearth_core::SystemClock;

    use super::*;

    fn store() -> Store {
        let dir = tempfile::tempdir().unwrap();
        Store::open(dir.path(), Arc::new(SystemClock)).unwrap()
    }

    #[test]
    fn cleanup_preserves_active_tasks_regardless_of_age() {
        let store = store();
        let old_cutoff = Utc::now() + chrono::Duration::hours(1);

        let running = WorkerTask::builder()
            .status(WorkerTaskStatus::Running)
            .created_at(Utc::now() - chrono::Duration::hours(72))
            .build();
        let succeeded = WorkerTask::builder()
            .status(WorkerTaskStatus::Success)
            .created_at(Utc::now() - chrono::Duration::hours(72))
            .build();
        let running_id = running.task_id;
        store.create_worker_task(running).unwrap();
        store.create_worker_task(succeeded).unwrap();

        let deleted = store.cleanup_terminal_worker_tasks(old_cutoff).unwrap();
        assert_eq!(deleted, 1);
        assert!(store.get_worker_task(running_id).is_ok());
    }

    #[test]
    fn transition_rejects_illegal_moves() {
        let store = store();
        let task = WorkerTask::builder().status(WorkerTaskStatus::Pending).build();
        let id = task.task_id;
        store.create_worker_task(task).unwrap();

        let err = store
            .transition_worker_task(id, WorkerTaskStatus::Running, Utc::now(), |_| {})
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        store
            .transition_worker_task(id, WorkerTaskStatus::Submitted, Utc::now(), |_| {})
            .unwrap();
        let after = store.get_worker_task(id).unwrap();
        assert_eq!(after.status, WorkerTaskStatus::Submitted);
    }
}
