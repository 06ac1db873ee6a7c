// SPDX-License-Identifier: MIT

//! The normalized shape every event source produces, regardless of origin.
//! The processor only ever sees this type — sources are responsible for
//! flattening their upstream's representation into it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::automation::EventSource;

/// An event as it enters the fan-in queue. `entity_key` is the per-source
/// dedup key used by the sampler (`entity_id` for home, `source + event_type`
/// for webhook, document id for indexing).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingEvent {
    pub event_id: Uuid,
    pub source: EventSource,
    pub entity_key: String,
    pub received_at: DateTime<Utc>,
    /// The event tree matched against `match_conditions` and bound as
    /// `event` in sandboxed condition scripts.
    pub payload: serde_json::Value,
}

impl IncomingEvent {
    pub fn new(source: EventSource, entity_key: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            source,
            entity_key: entity_key.into(),
            received_at: Utc::now(),
            payload,
        }
    }

    /// Resolve a dotted path (`"new_state.state"`) against the payload.
    /// Traverses nested objects only: a missing segment or an array in the
    /// path yields `None` — arrays are opaque to structured matching.
    pub fn get_path(&self, path: &str) -> Option<&serde_json::Value> {
        let mut current = &self.payload;
        for segment in path.split('.') {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_path_traverses_nested_objects() {
        let event = IncomingEvent::new(
            EventSource::Home,
            "person.alex",
            serde_json::json!({"new_state": {"state": "Home"}}),
        );
        assert_eq!(
            event.get_path("new_state.state"),
            Some(&serde_json::json!("Home"))
        );
    }

    #[test]
    fn get_path_stops_at_arrays() {
        let event = IncomingEvent::new(
            EventSource::Indexing,
            "doc_1",
            serde_json::json!({"tags": ["a", "b"]}),
        );
        assert_eq!(event.get_path("tags.0"), None);
    }

    #[test]
    fn get_path_missing_segment_is_none() {
        let event = IncomingEvent::new(EventSource::Webhook, "k", serde_json::json!({"a": 1}));
        assert_eq!(event.get_path("b"), None);
    }
}
