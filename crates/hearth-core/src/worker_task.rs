// SPDX-License-Identifier: MIT

//! Worker task rows: long-running work delegated to an external backend
//! (container runtime or cluster scheduler), tracked through a small state
//! machine that never regresses once it reaches a terminal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::automation::ConversationId;
use crate::simple_display;

/// Caller-chosen task identifier. Unlike the registry's generated ids, the
/// caller supplies this at spawn time so it can be embedded in the webhook
/// URL handed to the backend before the row exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerTaskId(Uuid);

impl WorkerTaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for WorkerTaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WorkerTaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// HMAC secret minted at spawn time and required on the completion webhook.
/// Deliberately opaque: never logged, compared only in constant time.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackToken(String);

impl CallbackToken {
    pub fn generate() -> Self {
        Self(nanoid::nanoid!(32))
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison, so a webhook caller can't time its way to a
    /// valid token.
    pub fn matches(&self, candidate: &str) -> bool {
        use subtle::ConstantTimeEq;
        let a = self.0.as_bytes();
        let b = candidate.as_bytes();
        a.len() == b.len() && a.ct_eq(b).into()
    }
}

impl std::fmt::Debug for CallbackToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CallbackToken(..)")
    }
}

/// Lifecycle state. The active set `{Pending, Submitted, Running}` may only
/// move forward into the terminal set `{Success, Failed, Timeout, Cancelled}`;
/// once terminal a row never re-enters any other state (invariant 3, §8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerTaskStatus {
    Pending,
    Submitted,
    Running,
    Success,
    Failed,
    Timeout,
    Cancelled,
}

simple_display!(WorkerTaskStatus {
    Pending => "pending",
    Submitted => "submitted",
    Running => "running",
    Success => "success",
    Failed => "failed",
    Timeout => "timeout",
    Cancelled => "cancelled",
});

impl WorkerTaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Success | Self::Failed | Self::Timeout | Self::Cancelled
        )
    }

    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }
}

/// A delegated unit of long-running work and its backend-observed status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerTask {
    pub task_id: WorkerTaskId,
    pub conversation_id: ConversationId,
    pub interface_type: String,
    /// Model identifier passed through to the backend. Defaults to `"claude"`
    /// when the caller doesn't specify one, matching the original service.
    pub model: String,
    pub task_description: String,
    pub context_files: Vec<String>,
    /// Display name of the requesting user, when known. Not used for
    /// authorization — purely for surfacing in status/summary views.
    pub user_name: Option<String>,
    pub timeout_minutes: u32,
    pub status: WorkerTaskStatus,
    /// Backend-assigned handle (container id / job name). Absent until the
    /// backend accepts the spawn.
    pub job_name: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<f64>,
    pub exit_code: Option<i32>,
    pub output_files: Vec<String>,
    pub summary: Option<String>,
    pub error_message: Option<String>,
    pub callback_token: CallbackToken,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl WorkerTask {
    pub const DEFAULT_MODEL: &'static str = "claude";
    pub const DEFAULT_TIMEOUT_MINUTES: u32 = 30;

    /// Move to `status`, stamping `updated_at` and, if the new status is
    /// terminal, `completed_at`. Callers must check `can_transition_to`
    /// first — this does not itself enforce the state machine.
    pub fn transition(&mut self, status: WorkerTaskStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = Some(now);
        if status.is_terminal() {
            self.completed_at = Some(now);
            if let Some(started) = self.started_at {
                self.duration_seconds = Some((now - started).num_milliseconds() as f64 / 1000.0);
            }
        }
    }

    /// Whether this row may legally move to `next`. Terminal states never
    /// transition again; forward-only otherwise.
    pub fn can_transition_to(&self, next: WorkerTaskStatus) -> bool {
        use WorkerTaskStatus::*;
        if self.status.is_terminal() {
            return false;
        }
        matches!(
            (self.status, next),
            (Pending, Submitted)
                | (Pending, Failed)
                | (Submitted, Running)
                | (Submitted, Failed)
                | (Submitted, Cancelled)
                | (Running, Success)
                | (Running, Failed)
                | (Running, Timeout)
                | (Running, Cancelled)
        )
    }
}

#[cfg(any(test, feature = "test-support"))]
pub struct WorkerTaskBuilder {
    task_id: WorkerTaskId,
    conversation_id: ConversationId,
    interface_type: String,
    model: String,
    task_description: String,
    context_files: Vec<String>,
    user_name: Option<String>,
    timeout_minutes: u32,
    status: WorkerTaskStatus,
    job_name: Option<String>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    duration_seconds: Option<f64>,
    exit_code: Option<i32>,
    output_files: Vec<String>,
    summary: Option<String>,
    error_message: Option<String>,
    callback_token: CallbackToken,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for WorkerTaskBuilder {
    fn default() -> Self {
        Self {
            task_id: WorkerTaskId::new(),
            conversation_id: ConversationId::new("conv_test"),
            interface_type: "test".into(),
            model: WorkerTask::DEFAULT_MODEL.into(),
            task_description: "do the thing".into(),
            context_files: Vec::new(),
            user_name: None,
            timeout_minutes: WorkerTask::DEFAULT_TIMEOUT_MINUTES,
            status: WorkerTaskStatus::Pending,
            job_name: None,
            started_at: None,
            completed_at: None,
            duration_seconds: None,
            exit_code: None,
            output_files: Vec::new(),
            summary: None,
            error_message: None,
            callback_token: CallbackToken::generate(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl WorkerTaskBuilder {
    pub fn status(mut self, v: WorkerTaskStatus) -> Self {
        self.status = v;
        self
    }

    pub fn job_name(mut self, v: impl Into<String>) -> Self {
        self.job_name = Some(v.into());
        self
    }

    pub fn created_at(mut self, v: DateTime<Utc>) -> Self {
        self.created_at = v;
        self
    }

    pub fn started_at(mut self, v: DateTime<Utc>) -> Self {
        self.started_at = Some(v);
        self
    }

    pub fn timeout_minutes(mut self, v: u32) -> Self {
        self.timeout_minutes = v;
        self
    }

    pub fn callback_token(mut self, v: CallbackToken) -> Self {
        self.callback_token = v;
        self
    }

    pub fn build(self) -> WorkerTask {
        WorkerTask {
            task_id: self.task_id,
            conversation_id: self.conversation_id,
            interface_type: self.interface_type,
            model: self.model,
            task_description: self.task_description,
            context_files: self.context_files,
            user_name: self.user_name,
            timeout_minutes: self.timeout_minutes,
            status: self.status,
            job_name: self.job_name,
            started_at: self.started_at,
            completed_at: self.completed_at,
            duration_seconds: self.duration_seconds,
            exit_code: self.exit_code,
            output_files: self.output_files,
            summary: self.summary,
            error_message: self.error_message,
            callback_token: self.callback_token,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl WorkerTask {
    pub fn builder() -> WorkerTaskBuilder {
        WorkerTaskBuilder::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_never_accept_further_transitions() {
        let mut task = WorkerTask::builder().status(WorkerTaskStatus::Success).build();
        assert!(!task.can_transition_to(WorkerTaskStatus::Failed));
        task.transition(WorkerTaskStatus::Failed, Utc::now());
        assert_eq!(task.status, WorkerTaskStatus::Failed);
    }

    #[test]
    fn callback_token_matches_is_constant_time_and_correct() {
        let token = CallbackToken::from_string("secret-value");
        assert!(token.matches("secret-value"));
        assert!(!token.matches("not-the-secret"));
    }
}
