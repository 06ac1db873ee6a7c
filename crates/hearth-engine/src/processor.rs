// SPDX-License-Identifier: MIT

//! Event Processor (§4.2): the consumer loop's per-event logic. Sources
//! feed it normalized [`IncomingEvent`]s; this module owns sampling, match
//! evaluation, quota bookkeeping, and handing the matched automation to
//! [`crate::dispatch::ActionDispatcher`]. The number-of-workers pool that
//! calls `process` concurrently lives in `hearth-daemon`.

use std::sync::Arc;

use chrono::Utc;
use hearth_core::{IncomingEvent, ListenerCache, ListenerEntry};
use hearth_sandbox::{ToolPolicy, ToolRegistry};
use hearth_store::Store;

use crate::dispatch::ActionDispatcher;
use crate::error::EngineResult;

/// Per-listener outcome of processing one event, for logging/metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    NoMatch,
    Disabled,
    DailyCapExceeded,
    Dispatched { succeeded: bool },
}

pub struct EventProcessor {
    store: Arc<Store>,
    listener_cache: ListenerCache,
    dispatcher: Arc<ActionDispatcher>,
    tool_registry: ToolRegistry,
    sample_interval: chrono::Duration,
}

impl EventProcessor {
    pub fn new(
        store: Arc<Store>,
        listener_cache: ListenerCache,
        dispatcher: Arc<ActionDispatcher>,
        tool_registry: ToolRegistry,
        sample_interval: chrono::Duration,
    ) -> Self {
        Self {
            store,
            listener_cache,
            dispatcher,
            tool_registry,
            sample_interval,
        }
    }

    /// Run the full per-event pipeline (§4.2 steps 1-6). Never fails outward:
    /// a listener's own dispatch failure is recorded against that listener
    /// and does not stop evaluation of the rest (per-listener isolation,
    /// step 6), and a store write failure for one listener is logged and
    /// skipped rather than aborting the batch.
    pub async fn process(&self, event: IncomingEvent) -> Vec<MatchOutcome> {
        // Step 1: sample for storage. The outcome never gates dispatch.
        match self.store.sample_event(&event, self.sample_interval) {
            Ok(outcome) => tracing::debug!(?outcome, source = %event.source, "sampled event"),
            Err(err) => tracing::warn!(error = %err, "failed to sample event for storage"),
        }

        // Step 2: load listeners for this source from the published snapshot.
        let snapshot = self.listener_cache.current();
        let candidates: Vec<ListenerEntry> = snapshot.for_source(event.source).to_vec();

        let mut outcomes = Vec::with_capacity(candidates.len());
        for listener in candidates {
            let outcome = self.process_one(&listener, &event).await;
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn process_one(&self, listener: &ListenerEntry, event: &IncomingEvent) -> MatchOutcome {
        if !listener.enabled {
            return MatchOutcome::Disabled;
        }

        // Step 3: structured match, then (if present) the condition script.
        if !structured_match(&listener.match_conditions, event) {
            return MatchOutcome::NoMatch;
        }
        if let Some(script_source) = &listener.condition_script {
            match hearth_sandbox::evaluate_condition(
                script_source,
                &event.payload,
                Utc::now(),
                &self.tool_registry,
                &ToolPolicy::DenyAll,
            ) {
                Ok(true) => {}
                Ok(false) => return MatchOutcome::NoMatch,
                Err(err) => {
                    tracing::warn!(listener = %listener.id, error = %err, "condition script failed");
                    return MatchOutcome::NoMatch;
                }
            }
        }

        // Step 4: quota / one-time checks, then dispatch + accounting (step
        // 5-6) against the authoritative store row rather than the cached
        // listener, so concurrent updates to counters are serialized there.
        match self.dispatch_and_account(listener, event).await {
            Ok(Some(succeeded)) => MatchOutcome::Dispatched { succeeded },
            Ok(None) => MatchOutcome::DailyCapExceeded,
            Err(err) => {
                tracing::warn!(listener = %listener.id, error = %err, "listener accounting failed");
                MatchOutcome::Dispatched { succeeded: false }
            }
        }
    }

    async fn dispatch_and_account(
        &self,
        listener: &ListenerEntry,
        event: &IncomingEvent,
    ) -> EngineResult<Option<bool>> {
        let listener_id = listener.id;
        let conversation_id = listener.conversation_id.clone();
        let automation = self.store.get_automation(listener_id, &conversation_id)?;

        let now = Utc::now();
        let tz = automation
            .action_config
            .get("timezone")
            .and_then(serde_json::Value::as_str)
            .and_then(|s| s.parse::<chrono_tz::Tz>().ok())
            .unwrap_or(chrono_tz::UTC);

        if daily_cap_exceeded(&automation) {
            return Ok(None);
        }

        let outcome = self.dispatcher.dispatch(&automation, &event.payload).await;

        if outcome.succeeded {
            let at = now;
            hearth_store::with_retry(|| async {
                self.store.update_automation(listener_id, &conversation_id, |row| {
                    row.maybe_reset_daily_counter(at, tz);
                    row.record_successful_dispatch(at);
                    Ok(())
                })
            })
            .await?;
        }

        Ok(Some(outcome.succeeded))
    }
}

/// Dotted-path equality against the event tree (§4.2 match semantics):
/// missing path or non-scalar target is no-match; booleans/numbers compare
/// by value via `serde_json::Value`'s own equality, not stringification.
fn structured_match(
    conditions: &serde_json::Map<String, serde_json::Value>,
    event: &IncomingEvent,
) -> bool {
    conditions.iter().all(|(path, expected)| {
        event
            .get_path(path)
            .is_some_and(|actual| actual == expected)
    })
}

/// Shared with the schedule ticker (§4.5), which applies the same
/// `daily_cap` accounting to schedule-triggered fires.
pub fn daily_cap_exceeded(automation: &hearth_core::Automation) -> bool {
    automation
        .action_config
        .get("daily_cap")
        .and_then(serde_json::Value::as_u64)
        .is_some_and(|cap| u64::from(automation.daily_executions) >= cap)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use hearth_core::{Automation, AutomationDetail, ConversationId, EventSource, ListenerEntry, SystemClock};

    use super::*;
    use crate::dispatch::{ActionDispatcher, TriggerContext, TurnId, WakeAgent};
    use crate::error::EngineError;
    use crate::mediator::{ConfirmationMediator, NullPromptSink};

    struct CountingWakeAgent {
        calls: AtomicU32,
    }

    #[async_trait::async_trait]
    impl WakeAgent for CountingWakeAgent {
        async fn wake(&self, _context: TriggerContext) -> EngineResult<TurnId> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(TurnId("turn_1".into()))
        }
    }

    fn processor(store: Arc<Store>, calls: Arc<CountingWakeAgent>) -> EventProcessor {
        let mediator = Arc::new(ConfirmationMediator::new(Arc::new(NullPromptSink), std::time::Duration::from_millis(50)));
        let dispatcher = Arc::new(ActionDispatcher::new(calls, ToolRegistry::new(), mediator));
        EventProcessor::new(store, ListenerCache::default(), dispatcher, ToolRegistry::new(), chrono::Duration::hours(1))
    }

    fn arrived_automation(conversation: &str) -> Automation {
        let mut conditions = serde_json::Map::new();
        conditions.insert("entity_id".into(), serde_json::json!("person.alex"));
        conditions.insert("new_state.state".into(), serde_json::json!("Home"));
        Automation::builder()
            .name("Arrived")
            .conversation_id(ConversationId::new(conversation))
            .one_time(true)
            .detail(AutomationDetail::Event {
                source_id: EventSource::Home,
                match_conditions: conditions,
                condition_script: None,
                one_time: true,
            })
            .build()
    }

    #[tokio::test]
    async fn s1_one_time_listener_fires_once_and_disables() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path(), Arc::new(SystemClock)).unwrap());
        let automation = store.create_automation(arrived_automation("conv_a")).unwrap();

        let calls = Arc::new(CountingWakeAgent { calls: AtomicU32::new(0) });
        let processor = processor(store.clone(), calls.clone());
        let listener = ListenerEntry::from_automation(&automation).unwrap();
        processor.listener_cache.publish(hearth_core::ListenerSnapshot::build(vec![listener]));

        let event = IncomingEvent::new(
            EventSource::Home,
            "person.alex",
            serde_json::json!({
                "entity_id": "person.alex",
                "old_state": {"state": "Away"},
                "new_state": {"state": "Home"},
            }),
        );
        let outcomes = processor.process(event).await;
        assert_eq!(outcomes, vec![MatchOutcome::Dispatched { succeeded: true }]);
        assert_eq!(calls.calls.load(Ordering::SeqCst), 1);

        let reloaded = store.get_automation(automation.id, &ConversationId::new("conv_a")).unwrap();
        assert!(!reloaded.enabled);
        assert_eq!(reloaded.daily_executions, 1);
    }

    #[tokio::test]
    async fn s2_sampling_drops_duplicates_but_dispatch_does_not() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path(), Arc::new(SystemClock)).unwrap());
        let mut automation_row = arrived_automation("conv_a");
        automation_row.name = "Temp watcher".into();
        if let AutomationDetail::Event { one_time, .. } = &mut automation_row.detail {
            *one_time = false;
        }
        let automation = store.create_automation(automation_row).unwrap();

        let calls = Arc::new(CountingWakeAgent { calls: AtomicU32::new(0) });
        let processor = processor(store.clone(), calls.clone());
        let listener = ListenerEntry::from_automation(&automation).unwrap();
        processor.listener_cache.publish(hearth_core::ListenerSnapshot::build(vec![listener]));

        let make_event = || {
            IncomingEvent::new(
                EventSource::Home,
                "sensor.temp",
                serde_json::json!({"entity_id": "person.alex", "new_state": {"state": "Home"}}),
            )
        };
        processor.process(make_event()).await;
        processor.process(make_event()).await;

        assert_eq!(store.recent_event_count(), 1);
        assert_eq!(calls.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn structured_match_rejects_missing_and_non_scalar_paths() {
        let mut conditions = serde_json::Map::new();
        conditions.insert("tags".into(), serde_json::json!("x"));
        let event = IncomingEvent::new(EventSource::Indexing, "doc_1", serde_json::json!({"tags": ["x"]}));
        assert!(!structured_match(&conditions, &event));
    }

    #[test]
    fn daily_cap_blocks_once_reached_but_not_before() {
        let mut automation = Automation::builder().action_config(serde_json::json!({"daily_cap": 2})).build();
        automation.daily_executions = 1;
        assert!(!daily_cap_exceeded(&automation));
        automation.daily_executions = 2;
        assert!(daily_cap_exceeded(&automation));
    }
}
