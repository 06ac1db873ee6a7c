// SPDX-License-Identifier: MIT

//! End-to-end scenarios wired through the public registry/processor/
//! dispatcher/orchestrator/mediator surface rather than any one crate's
//! internals — each corresponds to one of the invariant scenarios carried
//! in the automation spec (one-time listener firing, sampling vs. dispatch,
//! cross-kind name uniqueness, worker reconciliation, worker retention, and
//! confirmation timeout).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hearth_backends::test_support::FakeBackend;
use hearth_core::{
    ConfirmationKey, ConversationId, EventSource, IncomingEvent, ListenerCache, SystemClock,
};
use hearth_engine::registry::{CreateEventAutomation, CreateScheduleAutomation};
use hearth_engine::{
    ActionDispatcher, AutomationRegistry, ConfirmationMediator, EngineConfig, EngineError,
    EngineResult, EventProcessor, NullPromptSink, SpawnWorkerTask, TriggerContext, TurnId,
    WakeAgent, WorkerOrchestrator,
};
use hearth_store::Store;

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

fn open_store() -> (tempfile::TempDir, Arc<Store>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(Store::open(dir.path(), Arc::new(SystemClock)).expect("open store"));
    (dir, store)
}

fn registry_and_processor(store: Arc<Store>) -> (AutomationRegistry, EventProcessor, Arc<CountingWakeAgent>) {
    let registry = AutomationRegistry::new(store.clone(), ListenerCache::default());
    let calls = Arc::new(CountingWakeAgent { calls: AtomicU32::new(0) });
    let mediator = Arc::new(ConfirmationMediator::new(Arc::new(NullPromptSink), Duration::from_millis(50)));
    let dispatcher = Arc::new(ActionDispatcher::new(calls.clone(), hearth_sandbox::ToolRegistry::new(), mediator));
    let processor = EventProcessor::new(
        store,
        registry.listener_cache().clone(),
        dispatcher,
        hearth_sandbox::ToolRegistry::new(),
        chrono::Duration::hours(1),
    );
    (registry, processor, calls)
}

fn arrived_event() -> IncomingEvent {
    IncomingEvent::new(
        EventSource::Home,
        "person.alex",
        serde_json::json!({
            "entity_id": "person.alex",
            "old_state": {"state": "Away"},
            "new_state": {"state": "Home"},
        }),
    )
}

fn match_conditions() -> serde_json::Map<String, serde_json::Value> {
    let mut conditions = serde_json::Map::new();
    conditions.insert("entity_id".into(), serde_json::json!("person.alex"));
    conditions.insert("new_state.state".into(), serde_json::json!("Home"));
    conditions
}

/// S1: a one-time smart-home listener fires once, then disables itself.
#[tokio::test]
async fn s1_smart_home_listener_fires_once_and_disables() {
    let (_dir, store) = open_store();
    let (registry, processor, calls) = registry_and_processor(store);

    let automation = registry
        .create_event(CreateEventAutomation {
            name: "Arrived".into(),
            description: None,
            conversation_id: ConversationId::new("conv_a"),
            interface_type: "chat".into(),
            enabled: true,
            action_type: hearth_core::automation::ActionType::WakeAgent,
            action_config: serde_json::json!({}),
            source_id: EventSource::Home,
            match_conditions: match_conditions(),
            condition_script: None,
            one_time: true,
        })
        .expect("create event automation");

    let outcomes = processor.process(arrived_event()).await;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(calls.calls.load(Ordering::SeqCst), 1);

    let reloaded = registry.get(automation.id, &ConversationId::new("conv_a")).expect("reload");
    assert!(!reloaded.enabled);
    assert_eq!(reloaded.daily_executions, 1);
}

/// S2: the sampling window collapses duplicate storage rows, but it never
/// gates how many times a listener is dispatched.
#[tokio::test]
async fn s2_sampling_drops_duplicates_but_dispatch_does_not() {
    let (_dir, store) = open_store();
    let (registry, processor, calls) = registry_and_processor(store.clone());

    registry
        .create_event(CreateEventAutomation {
            name: "Temp watcher".into(),
            description: None,
            conversation_id: ConversationId::new("conv_a"),
            interface_type: "chat".into(),
            enabled: true,
            action_type: hearth_core::automation::ActionType::WakeAgent,
            action_config: serde_json::json!({}),
            source_id: EventSource::Home,
            match_conditions: match_conditions(),
            condition_script: None,
            one_time: false,
        })
        .expect("create event automation");

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

/// S3: automation names are unique per conversation across both kinds, but
/// the same name is free to reuse in a different conversation.
#[tokio::test]
async fn s3_cross_type_name_conflict_is_scoped_to_one_conversation() {
    let (_dir, store) = open_store();
    let registry = AutomationRegistry::new(store, ListenerCache::default());

    registry
        .create_event(CreateEventAutomation {
            name: "Dinner".into(),
            description: None,
            conversation_id: ConversationId::new("conv_c1"),
            interface_type: "chat".into(),
            enabled: true,
            action_type: hearth_core::automation::ActionType::WakeAgent,
            action_config: serde_json::json!({}),
            source_id: EventSource::Home,
            match_conditions: match_conditions(),
            condition_script: None,
            one_time: false,
        })
        .expect("create event automation in conv_c1");

    let conflict = registry.create_schedule(CreateScheduleAutomation {
        name: "Dinner".into(),
        description: None,
        conversation_id: ConversationId::new("conv_c1"),
        interface_type: "chat".into(),
        enabled: true,
        action_type: hearth_core::automation::ActionType::WakeAgent,
        action_config: serde_json::json!({}),
        recurrence_rule: "FREQ=DAILY".into(),
        timezone: "UTC".into(),
    });
    assert!(matches!(conflict.unwrap_err(), EngineError::Conflict(_)));

    let allowed = registry.create_schedule(CreateScheduleAutomation {
        name: "Dinner".into(),
        description: None,
        conversation_id: ConversationId::new("conv_c2"),
        interface_type: "chat".into(),
        enabled: true,
        action_type: hearth_core::automation::ActionType::WakeAgent,
        action_config: serde_json::json!({}),
        recurrence_rule: "FREQ=DAILY".into(),
        timezone: "UTC".into(),
    });
    assert!(allowed.is_ok());
}

/// S4: a worker task stuck in `submitted` with no assigned `job_name` past
/// the orphan grace period is failed by the reconciler, not left hanging.
#[tokio::test]
async fn s4_reconciler_fails_orphaned_submitted_task() {
    let (_dir, store) = open_store();
    let mut task = hearth_core::WorkerTask::builder()
        .status(hearth_core::WorkerTaskStatus::Submitted)
        .created_at(chrono::Utc::now() - chrono::Duration::minutes(10))
        .build();
    task.job_name = None;
    let task_id = task.task_id;
    store.create_worker_task(task).expect("insert orphan task");

    let orchestrator = WorkerOrchestrator::new(
        store.clone(),
        Arc::new(FakeBackend::default()),
        EngineConfig::default(),
        "http://localhost:8787",
    );
    let reconciled = orchestrator.reconcile().await;
    assert_eq!(reconciled, 1);

    let reloaded = store.get_worker_task(task_id).expect("reload");
    assert_eq!(reloaded.status, hearth_core::WorkerTaskStatus::Failed);
    assert!(reloaded.error_message.expect("error message").contains("no job_name"));
}

/// S5: retention cleanup only removes terminal rows past the cutoff; an
/// active `running` row survives regardless of age.
#[tokio::test]
async fn s5_cleanup_preserves_running_task_deletes_old_terminal_one() {
    let (_dir, store) = open_store();
    let running = hearth_core::WorkerTask::builder()
        .status(hearth_core::WorkerTaskStatus::Running)
        .created_at(chrono::Utc::now() - chrono::Duration::hours(72))
        .build();
    let succeeded = hearth_core::WorkerTask::builder()
        .status(hearth_core::WorkerTaskStatus::Success)
        .created_at(chrono::Utc::now() - chrono::Duration::hours(72))
        .build();
    let running_id = running.task_id;
    store.create_worker_task(running).expect("insert running");
    store.create_worker_task(succeeded).expect("insert succeeded");

    let mut config = EngineConfig::default();
    config.task_retention_hours = 48;
    let orchestrator = WorkerOrchestrator::new(
        store.clone(),
        Arc::new(FakeBackend::default()),
        config,
        "http://localhost:8787",
    );

    let deleted = orchestrator.cleanup().expect("cleanup");
    assert_eq!(deleted, 1);
    assert!(store.get_worker_task(running_id).is_ok());
}

/// S6: a confirmation-gated action that receives no reply before its
/// timeout resolves to a denial, never an approval-by-default.
#[tokio::test]
async fn s6_confirmation_denial_on_timeout() {
    let mediator = ConfirmationMediator::new(Arc::new(NullPromptSink), Duration::from_secs(5));
    let key = ConfirmationKey::new("conv_a", "turn_1", "send_email");

    let outcome = mediator
        .request_confirmation(key, "send an email?", Some(Duration::from_millis(100)))
        .await;

    assert_eq!(outcome, hearth_core::ConfirmationOutcome::Denied { timed_out: true });
}

/// Sanity check that a spawned worker task round-trips through the
/// orchestrator's submitted state before any reconciliation runs, so S4/S5
/// aren't exercising a lifecycle `spawn` itself never produces.
#[tokio::test]
async fn spawn_produces_a_submitted_task_with_a_backend_job_name() {
    let (_dir, store) = open_store();
    let orchestrator = WorkerOrchestrator::new(
        store,
        Arc::new(FakeBackend::default()),
        EngineConfig::default(),
        "http://localhost:8787",
    );
    let task = orchestrator
        .spawn(SpawnWorkerTask {
            conversation_id: ConversationId::new("conv_a"),
            interface_type: "chat".into(),
            task_description: "summarize the repo".into(),
            model: None,
            context_files: Vec::new(),
            timeout_minutes: None,
            user_name: None,
        })
        .await
        .expect("spawn");
    assert_eq!(task.status, hearth_core::WorkerTaskStatus::Submitted);
    assert!(task.job_name.is_some());
}
