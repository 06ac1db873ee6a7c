// SPDX-License-Identifier: MIT

//! The `WakeAgent` collaborator (§1 "the core treats the agent as a
//! callable `WakeAgent(conversation_id, trigger_context) -> turn_id`"). The
//! conversational agent itself is out of scope (§1 Non-goals); this is just
//! the HTTP adapter that schedules a turn on whatever process owns the
//! agent and reports the `turn_id` it hands back.

use hearth_engine::{EngineError, EngineResult, TriggerContext, TurnId, WakeAgent};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct WakeAgentResponse {
    turn_id: String,
}

/// Posts the trigger context to a configured agent endpoint and reports the
/// `turn_id` it returns. A missing `wake_url` is a deliberate deployment
/// choice (no agent front-end wired up) rather than a misconfiguration, so
/// it fails every wake with `BackendUnavailable` instead of panicking at
/// startup.
pub struct HttpWakeAgent {
    client: reqwest::Client,
    wake_url: Option<String>,
}

impl HttpWakeAgent {
    pub fn new(wake_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            wake_url,
        }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var("HEARTH_AGENT_WAKE_URL").ok())
    }
}

#[async_trait::async_trait]
impl WakeAgent for HttpWakeAgent {
    async fn wake(&self, context: TriggerContext) -> EngineResult<TurnId> {
        let Some(url) = &self.wake_url else {
            return Err(EngineError::BackendUnavailable("no agent wake endpoint configured".into()));
        };
        let response = self
            .client
            .post(url)
            .json(&context)
            .send()
            .await
            .map_err(|err| EngineError::BackendUnavailable(format!("agent wake request failed: {err}")))?;

        if !response.status().is_success() {
            return Err(EngineError::BackendUnavailable(format!(
                "agent wake endpoint returned {}",
                response.status()
            )));
        }

        let body: WakeAgentResponse = response
            .json()
            .await
            .map_err(|err| EngineError::Internal(format!("agent wake response malformed: {err}")))?;
        Ok(TurnId(body.turn_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wake_without_configured_url_fails_fast() {
        let agent = HttpWakeAgent::new(None);
        let context = TriggerContext {
            conversation_id: hearth_core::ConversationId::new("conv_a"),
            interface_type: "chat".into(),
            triggering_event: serde_json::json!({}),
            description: None,
            optional_prompt_override: None,
        };
        let err = agent.wake(context).await.unwrap_err();
        assert!(matches!(err, EngineError::BackendUnavailable(_)));
    }
}
