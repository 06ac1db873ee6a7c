// SPDX-License-Identifier: MIT

//! Plain in-memory representation of every table described in the data
//! model. This is the thing the WAL replays into at startup and the thing
//! snapshots serialize wholesale.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use hearth_core::{Automation, AutomationId, IncomingEvent};
use hearth_core::{WorkerTask, WorkerTaskId};
use serde::{Deserialize, Serialize};

/// `(source_id, entity_key)` sampled row, capturing the last-stored snapshot
/// for that pair and the window it was stored in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentEvent {
    pub source_id: hearth_core::EventSource,
    pub entity_key: String,
    pub window_start: DateTime<Utc>,
    pub event_snapshot: serde_json::Value,
}

impl RecentEvent {
    pub fn from_incoming(event: &IncomingEvent, window_start: DateTime<Utc>) -> Self {
        Self {
            source_id: event.source,
            entity_key: event.entity_key.clone(),
            window_start,
            event_snapshot: event.payload.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub automations: HashMap<AutomationId, Automation>,
    pub recent_events: HashMap<(hearth_core::EventSource, String), RecentEvent>,
    pub worker_tasks: HashMap<WorkerTaskId, WorkerTask>,
}

impl StoreState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Flat, serde-friendly projection of [`StoreState`] used by the WAL
/// snapshot. `HashMap` keys here are tuples, which `serde_json` cannot
/// represent as object keys, so the snapshot carries plain vectors instead
/// and [`StoreState`] is rebuilt by re-indexing on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub automations: Vec<Automation>,
    pub recent_events: Vec<RecentEvent>,
    pub worker_tasks: Vec<WorkerTask>,
}

impl From<&StoreState> for StateSnapshot {
    fn from(state: &StoreState) -> Self {
        Self {
            automations: state.automations.values().cloned().collect(),
            recent_events: state.recent_events.values().cloned().collect(),
            worker_tasks: state.worker_tasks.values().cloned().collect(),
        }
    }
}

impl From<StateSnapshot> for StoreState {
    fn from(snapshot: StateSnapshot) -> Self {
        let mut state = StoreState::new();
        for automation in snapshot.automations {
            state.automations.insert(automation.id, automation);
        }
        for event in snapshot.recent_events {
            state
                .recent_events
                .insert((event.source_id, event.entity_key.clone()), event);
        }
        for task in snapshot.worker_tasks {
            state.worker_tasks.insert(task.task_id, task);
        }
        state
    }
}
