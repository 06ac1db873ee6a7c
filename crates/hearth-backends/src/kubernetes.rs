// SPDX-License-Identifier: MIT

//! Cluster scheduler backend: each task becomes a Kubernetes `Job`, mirroring
//! the teacher's `KubernetesAdapter` (§4.7 "cluster scheduler backend").

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Container, EnvVar, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, ListParams, LogParams, PostParams};
use kube::Client;

use crate::backend::{BackendError, BackendResult, BackendState, BackendStatus, JobName, SpawnRequest, WorkerBackend};

const TASK_LABEL: &str = "hearth.dev/task-id";
const JOB_PREFIX: &str = "hearth-task-";

#[derive(Debug, Clone)]
pub struct KubernetesBackendConfig {
    pub namespace: String,
    pub image: String,
}

impl Default for KubernetesBackendConfig {
    fn default() -> Self {
        Self {
            namespace: std::env::var("HEARTH_WORKER_NAMESPACE").unwrap_or_else(|_| "default".into()),
            image: std::env::var("HEARTH_WORKER_IMAGE").unwrap_or_else(|_| "hearth-worker:latest".into()),
        }
    }
}

/// Backend that schedules each task as a Kubernetes `Job` named
/// deterministically from `task_id`, the same one-job-per-task shape the
/// local container backend uses for its container name.
#[derive(Clone)]
pub struct KubernetesBackend {
    client: Client,
    config: KubernetesBackendConfig,
}

impl KubernetesBackend {
    pub fn new(client: Client, config: KubernetesBackendConfig) -> Self {
        Self { client, config }
    }

    fn job_name(task_id: &str) -> String {
        format!("{JOB_PREFIX}{task_id}")
    }

    fn jobs_api(&self) -> Api<Job> {
        Api::namespaced(self.client.clone(), &self.config.namespace)
    }
}

#[async_trait]
impl WorkerBackend for KubernetesBackend {
    async fn spawn(&self, request: SpawnRequest) -> BackendResult<JobName> {
        let job_name = Self::job_name(&request.task_id);

        let env = vec![
            EnvVar { name: "HEARTH_CALLBACK_URL".into(), value: Some(request.callback_url.clone()), ..Default::default() },
            EnvVar { name: "HEARTH_CALLBACK_TOKEN".into(), value: Some(request.callback_token.clone()), ..Default::default() },
            EnvVar { name: "HEARTH_MODEL".into(), value: Some(request.model.clone()), ..Default::default() },
            EnvVar { name: "HEARTH_TASK_DESCRIPTION".into(), value: Some(request.task_description.clone()), ..Default::default() },
        ];

        let mut labels = BTreeMap::new();
        labels.insert(TASK_LABEL.to_string(), request.task_id.clone());

        let active_deadline_seconds = i64::from(request.timeout_minutes) * 60;

        let job = Job {
            metadata: ObjectMeta {
                name: Some(job_name.clone()),
                namespace: Some(self.config.namespace.clone()),
                labels: Some(labels.clone()),
                ..Default::default()
            },
            spec: Some(k8s_openapi::api::batch::v1::JobSpec {
                backoff_limit: Some(0),
                active_deadline_seconds: Some(active_deadline_seconds),
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta { labels: Some(labels), ..Default::default() }),
                    spec: Some(PodSpec {
                        restart_policy: Some("Never".into()),
                        containers: vec![Container {
                            name: "worker".into(),
                            image: Some(self.config.image.clone()),
                            env: Some(env),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        };

        tracing::info!(task_id = %request.task_id, %job_name, namespace = %self.config.namespace, "submitting kubernetes job");

        self.jobs_api()
            .create(&PostParams::default(), &job)
            .await
            .map_err(|err| BackendError::SpawnRejected(err.to_string()))?;

        Ok(job_name)
    }

    async fn status(&self, job_name: &str) -> BackendResult<BackendStatus> {
        let job = match self.jobs_api().get(job_name).await {
            Ok(job) => job,
            Err(kube::Error::Api(resp)) if resp.code == 404 => {
                return Ok(BackendStatus { state: BackendState::Unknown, exit_code: None });
            }
            Err(err) => return Err(BackendError::Unavailable(err.to_string())),
        };

        let status = job.status.unwrap_or_default();
        let state = if status.succeeded.unwrap_or(0) > 0 {
            BackendState::Succeeded
        } else if status.failed.unwrap_or(0) > 0 {
            BackendState::Failed
        } else if status.active.unwrap_or(0) > 0 {
            BackendState::Running
        } else {
            BackendState::Unknown
        };

        // Kubernetes Jobs don't surface a pod exit code at the Job level;
        // the orchestrator falls back to `logs` when it needs detail beyond
        // success/failure.
        Ok(BackendStatus { state, exit_code: None })
    }

    async fn cancel(&self, job_name: &str) -> BackendResult<()> {
        match self
            .jobs_api()
            .delete(job_name, &DeleteParams::background())
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(resp)) if resp.code == 404 => {
                Err(BackendError::NoSuchJob(job_name.to_string()))
            }
            Err(err) => Err(BackendError::Unavailable(err.to_string())),
        }
    }

    async fn logs(&self, job_name: &str) -> BackendResult<String> {
        let pods: Api<k8s_openapi::api::core::v1::Pod> =
            Api::namespaced(self.client.clone(), &self.config.namespace);

        let selector = format!("job-name={job_name}");
        let list = pods
            .list(&ListParams::default().labels(&selector))
            .await
            .map_err(|err| BackendError::Unavailable(err.to_string()))?;

        let pod = list
            .items
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::NoSuchJob(job_name.to_string()))?;
        let pod_name = pod
            .metadata
            .name
            .ok_or_else(|| BackendError::NoSuchJob(job_name.to_string()))?;

        pods.logs(&pod_name, &LogParams { tail_lines: Some(500), ..Default::default() })
            .await
            .map_err(|err| BackendError::Unavailable(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_name_is_deterministic_from_task_id() {
        assert_eq!(KubernetesBackend::job_name("abc123"), "hearth-task-abc123");
    }
}
