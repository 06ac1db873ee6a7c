// SPDX-License-Identifier: MIT

//! The listener cache: a denormalized, read-optimized projection of event
//! automations, keyed by source. Owned by the processor, published as an
//! immutable snapshot by the registry on every write (§9, "cyclic/shared
//! references" — readers never walk back to the registry).

use std::collections::HashMap;
use std::sync::Arc;

use crate::automation::{Automation, AutomationDetail, AutomationId, ConversationId, EventSource};

/// Denormalized copy of an event automation, cheap to match against an
/// incoming event without touching the store.
#[derive(Debug, Clone)]
pub struct ListenerEntry {
    pub id: AutomationId,
    pub name: String,
    pub conversation_id: ConversationId,
    pub interface_type: String,
    pub action_type: crate::automation::ActionType,
    pub action_config: serde_json::Value,
    pub source_id: EventSource,
    pub match_conditions: serde_json::Map<String, serde_json::Value>,
    pub condition_script: Option<String>,
    pub one_time: bool,
    pub enabled: bool,
}

impl ListenerEntry {
    /// Project from a registry row. Returns `None` for schedule-kind
    /// automations, which never enter the event-side cache.
    pub fn from_automation(automation: &Automation) -> Option<Self> {
        let AutomationDetail::Event {
            source_id,
            match_conditions,
            condition_script,
            one_time,
        } = &automation.detail
        else {
            return None;
        };
        Some(Self {
            id: automation.id,
            name: automation.name.clone(),
            conversation_id: automation.conversation_id.clone(),
            interface_type: automation.interface_type.clone(),
            action_type: automation.action_type,
            action_config: automation.action_config.clone(),
            source_id: *source_id,
            match_conditions: match_conditions.clone(),
            condition_script: condition_script.clone(),
            one_time: *one_time,
            enabled: automation.enabled,
        })
    }
}

/// Immutable snapshot of all enabled-or-disabled event listeners, grouped by
/// source so the processor only evaluates candidates relevant to an event.
#[derive(Debug, Clone, Default)]
pub struct ListenerSnapshot {
    by_source: HashMap<EventSource, Vec<ListenerEntry>>,
}

impl ListenerSnapshot {
    pub fn build(entries: impl IntoIterator<Item = ListenerEntry>) -> Self {
        let mut by_source: HashMap<EventSource, Vec<ListenerEntry>> = HashMap::new();
        for entry in entries {
            by_source.entry(entry.source_id).or_default().push(entry);
        }
        Self { by_source }
    }

    pub fn for_source(&self, source: EventSource) -> &[ListenerEntry] {
        self.by_source.get(&source).map_or(&[], |v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.by_source.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Single-writer, many-reader publication cell: the registry calls
/// [`ListenerCache::publish`] after every mutating write; processor workers
/// call [`ListenerCache::current`] to get the latest snapshot without ever
/// blocking the writer.
#[derive(Debug, Clone, Default)]
pub struct ListenerCache {
    inner: Arc<arc_swap::ArcSwap<ListenerSnapshot>>,
}

mod arc_swap {
    //! Minimal publish-by-swap cell: a `parking_lot::Mutex<Arc<T>>` gives the
    //! same semantics as a dedicated crate for our single-writer workload
    //! without adding another dependency.
    use std::sync::Arc;

    use parking_lot::Mutex;

    #[derive(Debug)]
    pub struct ArcSwap<T> {
        inner: Mutex<Arc<T>>,
    }

    impl<T: Default> Default for ArcSwap<T> {
        fn default() -> Self {
            Self {
                inner: Mutex::new(Arc::new(T::default())),
            }
        }
    }

    impl<T> ArcSwap<T> {
        pub fn load(&self) -> Arc<T> {
            self.inner.lock().clone()
        }

        pub fn store(&self, value: Arc<T>) {
            *self.inner.lock() = value;
        }
    }
}

impl ListenerCache {
    pub fn current(&self) -> Arc<ListenerSnapshot> {
        self.inner.load()
    }

    pub fn publish(&self, snapshot: ListenerSnapshot) {
        self.inner.store(Arc::new(snapshot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::Automation;

    #[test]
    fn snapshot_groups_entries_by_source() {
        let automation = Automation::builder().build();
        let entry = ListenerEntry::from_automation(&automation).expect("event automation");
        let snapshot = ListenerSnapshot::build(vec![entry]);
        assert_eq!(snapshot.for_source(EventSource::Home).len(), 1);
        assert!(snapshot.for_source(EventSource::Webhook).is_empty());
    }

    #[test]
    fn cache_publish_is_visible_to_subsequent_reads() {
        let cache = ListenerCache::default();
        assert!(cache.current().is_empty());
        let automation = Automation::builder().build();
        let entry = ListenerEntry::from_automation(&automation).unwrap();
        cache.publish(ListenerSnapshot::build(vec![entry]));
        assert_eq!(cache.current().len(), 1);
    }
}
