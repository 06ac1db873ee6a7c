// SPDX-License-Identifier: MIT

//! Request shapes for the Worker Task API and its completion webhook (§6
//! "Worker completion webhook"). `WorkerTask` itself (from `hearth-core`) is
//! reused as the response body for spawn/status endpoints.

use hearth_core::ConversationId;
use serde::Deserialize;

/// Body accepted by the worker spawn endpoint (ambient — not named
/// explicitly in §6 but required to exercise §4.7 "spawn" over HTTP).
#[derive(Debug, Clone, Deserialize)]
pub struct SpawnWorkerTaskRequest {
    pub conversation_id: ConversationId,
    #[serde(default = "default_interface_type")]
    pub interface_type: String,
    pub task_description: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub context_files: Vec<String>,
    #[serde(default)]
    pub timeout_minutes: Option<u32>,
    #[serde(default)]
    pub user_name: Option<String>,
}

fn default_interface_type() -> String {
    "chat".to_string()
}

/// `POST /workers/{task_id}/complete` body.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionWebhookRequest {
    pub token: String,
    pub exit_code: i32,
    pub duration_seconds: f64,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub output_files: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_request_defaults_interface_type() {
        let body = serde_json::json!({
            "conversation_id": "conv_a",
            "task_description": "summarize the repo",
        });
        let request: SpawnWorkerTaskRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.interface_type, "chat");
        assert!(request.model.is_none());
    }
}
