// SPDX-License-Identifier: MIT

//! The internal system event bus: structured records of state transitions,
//! used for tracing and for components (e.g. the CLI's `tail` command) that
//! want to observe the daemon without polling the store directly.
//!
//! Unlike [`crate::incoming_event::IncomingEvent`] (an event a *source*
//! produced, subject to listener matching), a `SystemEvent` is something
//! *this process* decided, after the fact.

use serde::{Deserialize, Serialize};

use crate::automation::{AutomationId, AutomationKind, ConversationId};
use crate::worker_task::{WorkerTaskId, WorkerTaskStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SystemEvent {
    #[serde(rename = "automation:created")]
    AutomationCreated {
        id: AutomationId,
        kind: AutomationKind,
        conversation_id: ConversationId,
    },
    #[serde(rename = "automation:updated")]
    AutomationUpdated {
        id: AutomationId,
        kind: AutomationKind,
    },
    #[serde(rename = "automation:deleted")]
    AutomationDeleted {
        id: AutomationId,
        kind: AutomationKind,
    },
    #[serde(rename = "automation:dispatched")]
    AutomationDispatched {
        id: AutomationId,
        conversation_id: ConversationId,
        succeeded: bool,
    },
    #[serde(rename = "automation:disabled_one_time")]
    AutomationDisabledOneTime { id: AutomationId },
    #[serde(rename = "schedule:fired")]
    ScheduleFired {
        id: AutomationId,
        next_scheduled_at: chrono::DateTime<chrono::Utc>,
    },
    #[serde(rename = "worker:spawned")]
    WorkerSpawned {
        task_id: WorkerTaskId,
        conversation_id: ConversationId,
    },
    #[serde(rename = "worker:status_changed")]
    WorkerStatusChanged {
        task_id: WorkerTaskId,
        from: WorkerTaskStatus,
        to: WorkerTaskStatus,
    },
    #[serde(rename = "worker:reconciled")]
    WorkerReconciled {
        task_id: WorkerTaskId,
        outcome: String,
    },
    #[serde(rename = "worker:cleaned_up")]
    WorkerCleanedUp { deleted_count: usize },
    #[serde(rename = "confirmation:requested")]
    ConfirmationRequested {
        conversation_id: ConversationId,
        tool_name: String,
    },
    #[serde(rename = "confirmation:resolved")]
    ConfirmationResolved {
        conversation_id: ConversationId,
        tool_name: String,
        approved: bool,
        timed_out: bool,
    },
    #[serde(rename = "source:connection_changed")]
    SourceConnectionChanged { source: String, state: String },
    /// Anything not named above round-trips through this catch-all rather
    /// than failing to deserialize — bus consumers should always tolerate
    /// events from a newer build.
    #[serde(other, skip_serializing)]
    Custom,
}

impl SystemEvent {
    /// Stable machine-readable name, matching the `type` tag used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AutomationCreated { .. } => "automation:created",
            Self::AutomationUpdated { .. } => "automation:updated",
            Self::AutomationDeleted { .. } => "automation:deleted",
            Self::AutomationDispatched { .. } => "automation:dispatched",
            Self::AutomationDisabledOneTime { .. } => "automation:disabled_one_time",
            Self::ScheduleFired { .. } => "schedule:fired",
            Self::WorkerSpawned { .. } => "worker:spawned",
            Self::WorkerStatusChanged { .. } => "worker:status_changed",
            Self::WorkerReconciled { .. } => "worker:reconciled",
            Self::WorkerCleanedUp { .. } => "worker:cleaned_up",
            Self::ConfirmationRequested { .. } => "confirmation:requested",
            Self::ConfirmationResolved { .. } => "confirmation:resolved",
            Self::SourceConnectionChanged { .. } => "source:connection_changed",
            Self::Custom => "custom",
        }
    }

    /// One-line human summary, suitable for a tracing `info!` field.
    pub fn log_summary(&self) -> String {
        match self {
            Self::AutomationCreated { id, kind, .. } => format!("{kind} automation {id} created"),
            Self::AutomationUpdated { id, .. } => format!("automation {id} updated"),
            Self::AutomationDeleted { id, .. } => format!("automation {id} deleted"),
            Self::AutomationDispatched { id, succeeded, .. } => {
                format!("automation {id} dispatched (succeeded={succeeded})")
            }
            Self::AutomationDisabledOneTime { id } => {
                format!("automation {id} disabled after one-time fire")
            }
            Self::ScheduleFired { id, next_scheduled_at } => {
                format!("schedule {id} fired, next at {next_scheduled_at}")
            }
            Self::WorkerSpawned { task_id, .. } => format!("worker task {task_id} spawned"),
            Self::WorkerStatusChanged { task_id, from, to } => {
                format!("worker task {task_id} {from} -> {to}")
            }
            Self::WorkerReconciled { task_id, outcome } => {
                format!("worker task {task_id} reconciled: {outcome}")
            }
            Self::WorkerCleanedUp { deleted_count } => {
                format!("worker cleanup deleted {deleted_count} rows")
            }
            Self::ConfirmationRequested { tool_name, .. } => {
                format!("confirmation requested for {tool_name}")
            }
            Self::ConfirmationResolved {
                tool_name,
                approved,
                timed_out,
                ..
            } => format!("confirmation for {tool_name} resolved: approved={approved} timed_out={timed_out}"),
            Self::SourceConnectionChanged { source, state } => {
                format!("source {source} connection -> {state}")
            }
            Self::Custom => "custom event".to_string(),
        }
    }

    /// The conversation this event pertains to, when it has one — used to
    /// scope CLI `tail --conversation` filtering.
    pub fn conversation_id(&self) -> Option<&ConversationId> {
        match self {
            Self::AutomationCreated { conversation_id, .. }
            | Self::AutomationDispatched { conversation_id, .. }
            | Self::WorkerSpawned { conversation_id, .. }
            | Self::ConfirmationRequested { conversation_id, .. }
            | Self::ConfirmationResolved { conversation_id, .. } => Some(conversation_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_wire_variant_deserializes_to_custom() {
        let json = serde_json::json!({"type": "future:event", "foo": "bar"});
        let event: SystemEvent = serde_json::from_value(json).unwrap();
        assert!(matches!(event, SystemEvent::Custom));
        assert_eq!(event.name(), "custom");
    }

    #[test]
    fn known_variant_round_trips_through_tag() {
        let event = SystemEvent::AutomationDisabledOneTime {
            id: AutomationId::new(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "automation:disabled_one_time");
    }
}
