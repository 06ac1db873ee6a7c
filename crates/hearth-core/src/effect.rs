// SPDX-License-Identifier: MIT

//! Side-effecting operations the action dispatcher hands to its collaborators,
//! modeled as data so they can be logged uniformly before being carried out.

use serde::{Deserialize, Serialize};

use crate::automation::{AutomationId, ConversationId};
use crate::worker_task::WorkerTaskId;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "effect")]
pub enum Effect {
    WakeAgent {
        automation_id: AutomationId,
        conversation_id: ConversationId,
        interface_type: String,
        #[serde(with = "duration_ms")]
        budget: std::time::Duration,
    },
    RunScript {
        automation_id: AutomationId,
        script_len: usize,
    },
    RequestConfirmation {
        conversation_id: ConversationId,
        tool_name: String,
        #[serde(with = "duration_ms")]
        timeout: std::time::Duration,
    },
    SpawnWorker {
        task_id: WorkerTaskId,
        conversation_id: ConversationId,
        model: String,
    },
    CancelWorker {
        task_id: WorkerTaskId,
    },
}

impl Effect {
    /// Stable name for tracing spans and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::WakeAgent { .. } => "wake_agent",
            Self::RunScript { .. } => "run_script",
            Self::RequestConfirmation { .. } => "request_confirmation",
            Self::SpawnWorker { .. } => "spawn_worker",
            Self::CancelWorker { .. } => "cancel_worker",
        }
    }

    /// Key/value pairs suitable for a tracing event, excluding anything with
    /// meaningful byte size (scripts) or secrets (none here, but future
    /// variants should keep to this pattern).
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::WakeAgent {
                automation_id,
                conversation_id,
                interface_type,
                ..
            } => vec![
                ("automation_id", automation_id.to_string()),
                ("conversation_id", conversation_id.to_string()),
                ("interface_type", interface_type.clone()),
            ],
            Self::RunScript {
                automation_id,
                script_len,
            } => vec![
                ("automation_id", automation_id.to_string()),
                ("script_len", script_len.to_string()),
            ],
            Self::RequestConfirmation {
                conversation_id,
                tool_name,
                ..
            } => vec![
                ("conversation_id", conversation_id.to_string()),
                ("tool_name", tool_name.clone()),
            ],
            Self::SpawnWorker {
                task_id,
                conversation_id,
                model,
            } => vec![
                ("task_id", task_id.to_string()),
                ("conversation_id", conversation_id.to_string()),
                ("model", model.clone()),
            ],
            Self::CancelWorker { task_id } => vec![("task_id", task_id.to_string())],
        }
    }

    /// Whether this effect's full field set is worth logging at `debug`
    /// (true) versus only its name at `info` (false, for high-volume ones).
    pub fn verbose(&self) -> bool {
        !matches!(self, Self::RunScript { .. })
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wake_agent_fields_exclude_budget() {
        let effect = Effect::WakeAgent {
            automation_id: AutomationId::new(),
            conversation_id: ConversationId::new("conv_a"),
            interface_type: "chat".into(),
            budget: std::time::Duration::from_secs(5),
        };
        let keys: Vec<_> = effect.fields().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["automation_id", "conversation_id", "interface_type"]);
    }

    #[test]
    fn run_script_is_not_verbose() {
        let effect = Effect::RunScript {
            automation_id: AutomationId::new(),
            script_len: 42,
        };
        assert!(!effect.verbose());
    }
}
