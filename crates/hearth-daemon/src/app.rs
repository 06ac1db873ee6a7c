// SPDX-License-Identifier: MIT

//! Process-wide state (§9 "Global state"): the listener cache, store,
//! registry, dispatcher, orchestrator, and confirmation mediator are all
//! singletons initialized once at startup and handed to both the HTTP
//! router and the source tasks as `Arc`s. There is exactly one `AppState`
//! per process; shutdown tears it down via a single top-level cancellation
//! token (see `main.rs`).

use std::sync::Arc;

use hearth_core::{IncomingEvent, SystemEvent};
use hearth_engine::{ActionDispatcher, AutomationRegistry, ConfirmationMediator, EngineConfig, WorkerOrchestrator};
use hearth_store::Store;
use tokio::sync::mpsc;

use crate::config::DaemonConfig;

/// Emit a [`SystemEvent`] to the structured log, the way the teacher's
/// event-sourced core logs each applied `Event` — this process doesn't
/// persist `SystemEvent`s (the `Store`'s WAL already durably records the
/// state changes that produce them), it only narrates them.
pub fn publish(event: SystemEvent) {
    tracing::info!(event = event.name(), summary = %event.log_summary(), "system event");
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub registry: Arc<AutomationRegistry>,
    pub dispatcher: Arc<ActionDispatcher>,
    pub orchestrator: Arc<WorkerOrchestrator>,
    pub mediator: Arc<ConfirmationMediator>,
    pub engine_config: EngineConfig,
    pub daemon_config: Arc<DaemonConfig>,
    /// Fan-in sender every event source (and the webhook/indexing HTTP
    /// handlers) pushes normalized [`IncomingEvent`]s into. The processor
    /// pool in `main.rs` owns the receiving half.
    pub event_tx: mpsc::Sender<IncomingEvent>,
}
