// SPDX-License-Identifier: MIT

//! Worker backend abstraction and its two concrete adapters (§4.7).

pub mod backend;
pub mod kubernetes;
pub mod local;

pub use backend::{BackendError, BackendResult, BackendState, BackendStatus, JobName, SpawnRequest, WorkerBackend};
pub use kubernetes::{KubernetesBackend, KubernetesBackendConfig};
pub use local::{LocalBackendConfig, LocalContainerBackend};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    //! An in-memory `WorkerBackend` for engine/daemon tests, grounded in the
    //! teacher's own test doubles for its `AgentAdapter` trait.

    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::backend::{BackendError, BackendResult, BackendState, BackendStatus, JobName, SpawnRequest, WorkerBackend};

    #[derive(Debug, Clone)]
    struct FakeJob {
        state: BackendState,
        exit_code: Option<i32>,
        logs: String,
    }

    #[derive(Clone, Default)]
    pub struct FakeBackend {
        jobs: Arc<Mutex<HashMap<String, FakeJob>>>,
        next_id: Arc<Mutex<u64>>,
        spawn_error: Arc<Mutex<Option<String>>>,
    }

    impl FakeBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make the next `spawn` call fail, to exercise §4.9's spawn-failure path.
        pub fn fail_next_spawn(&self, message: impl Into<String>) {
            *self.spawn_error.lock() = Some(message.into());
        }

        pub fn set_state(&self, job_name: &str, state: BackendState, exit_code: Option<i32>) {
            if let Some(job) = self.jobs.lock().get_mut(job_name) {
                job.state = state;
                job.exit_code = exit_code;
            }
        }

        pub fn set_logs(&self, job_name: &str, logs: impl Into<String>) {
            if let Some(job) = self.jobs.lock().get_mut(job_name) {
                job.logs = logs.into();
            }
        }

        pub fn forget(&self, job_name: &str) {
            self.jobs.lock().remove(job_name);
        }
    }

    #[async_trait]
    impl WorkerBackend for FakeBackend {
        async fn spawn(&self, _request: SpawnRequest) -> BackendResult<JobName> {
            if let Some(message) = self.spawn_error.lock().take() {
                return Err(BackendError::SpawnRejected(message));
            }
            let mut next_id = self.next_id.lock();
            *next_id += 1;
            let job_name = format!("fake-job-{}", *next_id);
            self.jobs.lock().insert(
                job_name.clone(),
                FakeJob { state: BackendState::Running, exit_code: None, logs: String::new() },
            );
            Ok(job_name)
        }

        async fn status(&self, job_name: &str) -> BackendResult<BackendStatus> {
            match self.jobs.lock().get(job_name) {
                Some(job) => Ok(BackendStatus { state: job.state, exit_code: job.exit_code }),
                None => Ok(BackendStatus { state: BackendState::Unknown, exit_code: None }),
            }
        }

        async fn cancel(&self, job_name: &str) -> BackendResult<()> {
            let mut jobs = self.jobs.lock();
            match jobs.get_mut(job_name) {
                Some(job) => {
                    job.state = BackendState::Failed;
                    Ok(())
                }
                None => Err(BackendError::NoSuchJob(job_name.to_string())),
            }
        }

        async fn logs(&self, job_name: &str) -> BackendResult<String> {
            self.jobs
                .lock()
                .get(job_name)
                .map(|job| job.logs.clone())
                .ok_or_else(|| BackendError::NoSuchJob(job_name.to_string()))
        }
    }
}
