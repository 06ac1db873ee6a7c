// SPDX-License-Identifier: MIT

//! Request/response shapes for the Automation HTTP API (§6 "Automation HTTP
//! API"). `Automation` itself (from `hearth-core`) is reused verbatim as the
//! "full automation row" the spec's `create`/`get` endpoints return — there
//! is no separate wire-level automation type to keep in sync.

use hearth_core::{Automation, AutomationKind, ConversationId, EventSource};
use serde::{Deserialize, Serialize};

/// `POST /automations/event` body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventAutomationRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub conversation_id: ConversationId,
    #[serde(default = "default_interface_type")]
    pub interface_type: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub action_type: hearth_core::automation::ActionType,
    #[serde(default)]
    pub action_config: serde_json::Value,
    pub source_id: EventSource,
    pub match_conditions: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub condition_script: Option<String>,
    #[serde(default)]
    pub one_time: bool,
}

/// `POST /automations/schedule` body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateScheduleAutomationRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub conversation_id: ConversationId,
    #[serde(default = "default_interface_type")]
    pub interface_type: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub action_type: hearth_core::automation::ActionType,
    pub action_config: serde_json::Value,
    pub recurrence_rule: String,
    pub timezone: String,
}

/// `PATCH /automations/{kind}/{id}` body. Every field absent from the
/// request body preserves its prior value (§6 "missing fields preserve
/// prior values") — the double-`Option` on `description`/`condition_script`
/// distinguishes "not sent" from "sent as null".
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateAutomationRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub action_config: Option<serde_json::Value>,
    #[serde(default)]
    pub match_conditions: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub condition_script: Option<Option<String>>,
    #[serde(default)]
    pub recurrence_rule: Option<String>,
}

/// Query parameters accepted by `GET /automations`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ListAutomationsQuery {
    pub conversation_id: Option<ConversationId>,
    pub automation_type: Option<AutomationKind>,
    pub enabled: Option<bool>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

/// `GET /automations` response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ListAutomationsResponse {
    pub automations: Vec<Automation>,
    pub total_count: usize,
    pub page: u32,
    pub page_size: u32,
}

/// `GET /automations/{kind}/{id}/stats` response.
#[derive(Debug, Clone, Serialize)]
pub struct AutomationStatsResponse {
    pub daily_executions: u32,
    pub last_execution_at: Option<chrono::DateTime<chrono::Utc>>,
    pub next_scheduled_at: Option<chrono::DateTime<chrono::Utc>>,
    pub execution_count: Option<u32>,
}

fn default_true() -> bool {
    true
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

fn default_interface_type() -> String {
    "chat".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_event_request_defaults_enabled_and_page_fields() {
        let body = serde_json::json!({
            "name": "Arrived",
            "conversation_id": "conv_a",
            "action_type": "wake_agent",
            "source_id": "home",
            "match_conditions": {"entity_id": "person.alex"},
        });
        let request: CreateEventAutomationRequest = serde_json::from_value(body).unwrap();
        assert!(request.enabled);
        assert_eq!(request.interface_type, "chat");
        assert!(!request.one_time);
    }

    #[test]
    fn list_query_defaults_to_page_one() {
        let query: ListAutomationsQuery = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, 20);
    }

    #[test]
    fn update_request_distinguishes_absent_from_explicit_null() {
        let absent: UpdateAutomationRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(absent.description.is_none());

        let explicit_null: UpdateAutomationRequest =
            serde_json::from_value(serde_json::json!({"description": null})).unwrap();
        assert_eq!(explicit_null.description, Some(None));
    }
}
