// SPDX-License-Identifier: MIT

//! The sampler: at most one stored `RecentEvent` per `(source_id,
//! entity_key)` per sampling window (§3, §4.2 step 1). Dropped-for-storage
//! events still dispatch to listeners — sampling only governs what's
//! persisted, never what's evaluated.

use chrono::{DateTime, Duration, Utc};
use hearth_core::IncomingEvent;

use crate::error::StoreResult;
use crate::state::RecentEvent;
use crate::store::Store;
use crate::wal::WalEntry;

/// Outcome of offering an event to the sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// No row existed for this window; a new one was stored.
    Stored,
    /// A row already covers this window; storage was skipped.
    Skipped,
}

impl Store {
    /// Sample `event` for storage. Returns [`SampleOutcome::Stored`] iff no
    /// row exists for `(source_id, entity_key)` with `window_start >= now -
    /// sample_interval`; otherwise the event is dropped for storage (but the
    /// caller still proceeds to listener dispatch regardless of this
    /// result).
    pub fn sample_event(
        &self,
        event: &IncomingEvent,
        sample_interval: Duration,
    ) -> StoreResult<SampleOutcome> {
        let now = self.clock().utc_now();
        self.with_state(|state, wal| {
            let key = (event.source, event.entity_key.clone());
            let fresh_enough = state
                .recent_events
                .get(&key)
                .is_some_and(|existing| existing.window_start >= now - sample_interval);
            if fresh_enough {
                return Ok(SampleOutcome::Skipped);
            }
            let row = RecentEvent::from_incoming(event, now);
            wal.append(&WalEntry::UpsertRecentEvent(row.clone()))?;
            state.recent_events.insert(key, row);
            Ok(SampleOutcome::Stored)
        })
    }

    pub fn recent_event_count(&self) -> usize {
        self.with_state_ref(|state| state.recent_events.len())
    }

    /// Drop sampled rows whose window started before `older_than` — the
    /// periodic purge the specification recommends but leaves unspecified
    /// in detail (§9 open questions).
    pub fn purge_recent_events_older_than(&self, older_than: DateTime<Utc>) -> StoreResult<usize> {
        self.with_state(|state, wal| {
            let before = state.recent_events.len();
            wal.append(&WalEntry::PurgeRecentEventsOlderThan(older_than))?;
            state.recent_events.retain(|_, row| row.window_start >= older_than);
            Ok(before - state.recent_events.len())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hearth_core::{EventSource, SystemClock};

    use super::*;

    fn store() -> Store {
        let dir = tempfile::tempdir().unwrap();
        Store::open(dir.path(), Arc::new(SystemClock)).unwrap()
    }

    #[test]
    fn second_event_within_window_is_skipped_for_storage() {
        let store = store();
        let event = IncomingEvent::new(EventSource::Home, "sensor.temp", serde_json::json!({"v": 1}));
        let first = store.sample_event(&event, Duration::hours(1)).unwrap();
        let second = store.sample_event(&event, Duration::hours(1)).unwrap();
        assert_eq!(first, SampleOutcome::Stored);
        assert_eq!(second, SampleOutcome::Skipped);
        assert_eq!(store.recent_event_count(), 1);
    }

    #[test]
    fn different_entities_sample_independently() {
        let store = store();
        let a = IncomingEvent::new(EventSource::Home, "sensor.a", serde_json::json!({}));
        let b = IncomingEvent::new(EventSource::Home, "sensor.b", serde_json::json!({}));
        store.sample_event(&a, Duration::hours(1)).unwrap();
        store.sample_event(&b, Duration::hours(1)).unwrap();
        assert_eq!(store.recent_event_count(), 2);
    }
}
