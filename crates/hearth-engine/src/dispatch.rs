// SPDX-License-Identifier: MIT

//! Action Dispatch (§4.4): the two closed action kinds, `wake_agent` and
//! `script`, dispatched by match rather than runtime reflection (§9
//! "Dynamic dispatch").

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use hearth_core::{Attachment, AttachmentId, AttachmentSource, Automation, ConfirmationKey, ConversationId, Effect};
use hearth_sandbox::{Script, ToolPolicy, ToolRegistry, Value};
use serde::{Deserialize, Serialize};

use crate::effect_log::log_effect;
use crate::error::{EngineError, EngineResult};
use crate::mediator::ConfirmationMediator;

/// The context an action is evaluated against — the incoming event plus
/// static identity of the firing automation.
#[derive(Debug, Clone, Serialize)]
pub struct TriggerContext {
    pub conversation_id: ConversationId,
    pub interface_type: String,
    pub triggering_event: serde_json::Value,
    pub description: Option<String>,
    pub optional_prompt_override: Option<String>,
}

/// What the agent collaborator returns for a successfully dispatched turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnId(pub String);

/// External collaborator: the conversational agent. The core only ever
/// calls this one method and never touches the agent's internals (§1).
#[async_trait::async_trait]
pub trait WakeAgent: Send + Sync {
    async fn wake(&self, context: TriggerContext) -> EngineResult<TurnId>;
}

/// What an action dispatch produced, for the processor's accounting step.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub succeeded: bool,
    pub turn_id: Option<TurnId>,
    pub attachment: Option<Attachment>,
    pub error: Option<String>,
}

impl DispatchOutcome {
    fn ok(turn_id: Option<TurnId>, attachment: Option<Attachment>) -> Self {
        Self { succeeded: true, turn_id, attachment, error: None }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self { succeeded: false, turn_id: None, attachment: None, error: Some(error.into()) }
    }
}

/// Per-automation configuration read out of `action_config` for dispatch
/// (the script body for `script` actions, the wake-agent budget/prompt
/// override for `wake_agent` actions).
#[derive(Debug, Clone, Deserialize, Default)]
struct ActionConfig {
    script_code: Option<String>,
    #[serde(default)]
    prompt_override: Option<String>,
    #[serde(default)]
    wake_budget_ms: Option<u64>,
    #[serde(default)]
    allowed_tools: Option<Vec<String>>,
}

pub struct ActionDispatcher {
    wake_agent: Arc<dyn WakeAgent>,
    tool_registry: ToolRegistry,
    mediator: Arc<ConfirmationMediator>,
}

impl ActionDispatcher {
    /// `mediator` gates confirmation-required actions (§4.4); pass one
    /// backed by `NullPromptSink` (auto-denying on its configured timeout)
    /// for deployments that never configure `requires_confirmation`.
    pub fn new(wake_agent: Arc<dyn WakeAgent>, tool_registry: ToolRegistry, mediator: Arc<ConfirmationMediator>) -> Self {
        Self { wake_agent, tool_registry, mediator }
    }

    pub async fn dispatch(
        &self,
        automation: &Automation,
        event: &serde_json::Value,
    ) -> DispatchOutcome {
        let config: ActionConfig = serde_json::from_value(automation.action_config.clone()).unwrap_or_default();

        if requires_confirmation(automation) {
            log_effect(&Effect::RequestConfirmation {
                conversation_id: automation.conversation_id.clone(),
                tool_name: automation.action_type.to_string(),
                timeout: self.mediator.default_timeout(),
            });
            let key = ConfirmationKey::new(
                automation.conversation_id.clone(),
                automation.id.to_string(),
                automation.action_type.to_string(),
            );
            match self.mediator.request_confirmation(key, confirmation_description(automation), None).await {
                hearth_core::ConfirmationOutcome::Approved => {}
                hearth_core::ConfirmationOutcome::Denied { timed_out } => {
                    let reason = if timed_out { "denied (timeout)" } else { "denied" };
                    return DispatchOutcome::failed(reason);
                }
            }
        }

        match automation.action_type {
            hearth_core::automation::ActionType::WakeAgent => self.dispatch_wake_agent(automation, event, &config).await,
            hearth_core::automation::ActionType::Script => self.dispatch_script(automation, event, &config),
        }
    }

    async fn dispatch_wake_agent(
        &self,
        automation: &Automation,
        event: &serde_json::Value,
        config: &ActionConfig,
    ) -> DispatchOutcome {
        log_effect(&Effect::WakeAgent {
            automation_id: automation.id,
            conversation_id: automation.conversation_id.clone(),
            interface_type: automation.interface_type.clone(),
            budget: wake_budget(automation),
        });
        let context = TriggerContext {
            conversation_id: automation.conversation_id.clone(),
            interface_type: automation.interface_type.clone(),
            triggering_event: event.clone(),
            description: automation.description.clone(),
            optional_prompt_override: config.prompt_override.clone(),
        };
        match self.wake_agent.wake(context).await {
            Ok(turn_id) => DispatchOutcome::ok(Some(turn_id), None),
            Err(err) => DispatchOutcome::failed(err.to_string()),
        }
    }

    fn dispatch_script(
        &self,
        automation: &Automation,
        event: &serde_json::Value,
        config: &ActionConfig,
    ) -> DispatchOutcome {
        let Some(script_source) = &config.script_code else {
            return DispatchOutcome::failed("script action_config missing script_code");
        };
        log_effect(&Effect::RunScript { automation_id: automation.id, script_len: script_source.len() });
        let script = match Script::parse(script_source) {
            Ok(script) => script,
            Err(err) => return DispatchOutcome::failed(format!("script parse error: {err}")),
        };
        let policy = match &config.allowed_tools {
            Some(names) => ToolPolicy::AllowSet(names.iter().cloned().collect()),
            None => ToolPolicy::DenyAll,
        };
        match script.eval_action(event, Utc::now(), &self.tool_registry, &policy) {
            Ok(Value::Attachment { mime_type, storage_path }) => {
                let attachment = Attachment {
                    attachment_id: AttachmentId::new(),
                    conversation_id: automation.conversation_id.clone(),
                    mime_type,
                    size: 0,
                    storage_path,
                    source: AttachmentSource::Tool,
                };
                DispatchOutcome::ok(None, Some(attachment))
            }
            Ok(_) => DispatchOutcome::ok(None, None),
            Err(err) => DispatchOutcome::failed(format!("script action error: {err}")),
        }
    }
}

/// Whether `automation`'s action is confirmation-gated, per its
/// `action_config` (§4.4: "a subset of actions is confirmation-gated").
pub fn requires_confirmation(automation: &Automation) -> bool {
    automation
        .action_config
        .get("requires_confirmation")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
}

/// Render the confirmation prompt description for `automation`, matching
/// §4.4's "rendered, escaped description of what will be done".
pub fn confirmation_description(automation: &Automation) -> String {
    format!("Run automation {:?}?", automation.name)
}

/// `wake_budget_ms`, defaulting to a conservative value when unset, used to
/// build [`hearth_core::Effect::WakeAgent`] for logging before dispatch.
pub fn wake_budget(automation: &Automation) -> Duration {
    let config: ActionConfig = serde_json::from_value(automation.action_config.clone()).unwrap_or_default();
    Duration::from_millis(config.wake_budget_ms.unwrap_or(30_000))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeWakeAgent {
        should_fail: bool,
    }

    #[async_trait::async_trait]
    impl WakeAgent for FakeWakeAgent {
        async fn wake(&self, _context: TriggerContext) -> EngineResult<TurnId> {
            if self.should_fail {
                Err(EngineError::Internal("agent unavailable".into()))
            } else {
                Ok(TurnId("turn_1".into()))
            }
        }
    }

    fn automation() -> Automation {
        Automation::builder().action_type(hearth_core::automation::ActionType::WakeAgent).build()
    }

    fn test_mediator() -> Arc<ConfirmationMediator> {
        Arc::new(ConfirmationMediator::new(Arc::new(crate::mediator::NullPromptSink), Duration::from_millis(50)))
    }

    #[tokio::test]
    async fn wake_agent_dispatch_success_carries_turn_id() {
        let dispatcher = ActionDispatcher::new(Arc::new(FakeWakeAgent { should_fail: false }), ToolRegistry::new(), test_mediator());
        let outcome = dispatcher.dispatch(&automation(), &serde_json::json!({})).await;
        assert!(outcome.succeeded);
        assert_eq!(outcome.turn_id.unwrap().0, "turn_1");
    }

    #[tokio::test]
    async fn wake_agent_failure_is_recorded_not_propagated_as_panic() {
        let dispatcher = ActionDispatcher::new(Arc::new(FakeWakeAgent { should_fail: true }), ToolRegistry::new(), test_mediator());
        let outcome = dispatcher.dispatch(&automation(), &serde_json::json!({})).await;
        assert!(!outcome.succeeded);
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn script_dispatch_without_script_code_fails_cleanly() {
        let mut automation = automation();
        automation.action_type = hearth_core::automation::ActionType::Script;
        let dispatcher = ActionDispatcher::new(Arc::new(FakeWakeAgent { should_fail: false }), ToolRegistry::new(), test_mediator());
        let outcome = dispatcher.dispatch(&automation, &serde_json::json!({})).await;
        assert!(!outcome.succeeded);
    }

    #[tokio::test]
    async fn confirmation_gated_action_is_denied_without_a_reply() {
        let mut automation = automation();
        automation.action_config = serde_json::json!({"requires_confirmation": true});
        let dispatcher = ActionDispatcher::new(Arc::new(FakeWakeAgent { should_fail: false }), ToolRegistry::new(), test_mediator());
        let outcome = dispatcher.dispatch(&automation, &serde_json::json!({})).await;
        assert!(!outcome.succeeded);
        assert!(outcome.turn_id.is_none());
    }
}
