// SPDX-License-Identifier: MIT

//! The processor worker pool (§5 "a processor worker pool of size N (default
//! 4) drains the merged source queue"). Every source and HTTP handler pushes
//! into one `mpsc::Sender<IncomingEvent>`; this module owns the receiving
//! half and fans it out to `processor_worker_count` tasks so one slow
//! `wake_agent` dispatch cannot starve the rest (§4.4).

use std::sync::Arc;

use hearth_core::{IncomingEvent, SystemEvent};
use hearth_engine::EventProcessor;
use tokio::sync::{mpsc, Mutex};

use crate::app::publish;

/// Spawn `worker_count` tasks draining `rx` concurrently. Returns their
/// join handles so the caller can await them during shutdown drain.
pub fn spawn(
    worker_count: usize,
    rx: mpsc::Receiver<IncomingEvent>,
    processor: Arc<EventProcessor>,
) -> Vec<tokio::task::JoinHandle<()>> {
    let rx = Arc::new(Mutex::new(rx));
    (0..worker_count.max(1))
        .map(|worker_id| {
            let rx = Arc::clone(&rx);
            let processor = Arc::clone(&processor);
            tokio::spawn(async move { run_worker(worker_id, rx, processor).await })
        })
        .collect()
}

async fn run_worker(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<IncomingEvent>>>,
    processor: Arc<EventProcessor>,
) {
    loop {
        let event = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(event) = event else {
            tracing::debug!(worker_id, "processor worker shutting down: fan-in channel closed");
            return;
        };
        let event_id = event.event_id;
        let source = event.source;
        let outcomes = processor.process(event).await;
        for outcome in &outcomes {
            if matches!(outcome, hearth_engine::MatchOutcome::Dispatched { succeeded: true }) {
                tracing::debug!(%event_id, %source, "listener dispatched");
            }
        }
        if outcomes.is_empty() {
            tracing::trace!(%event_id, %source, worker_id, "no listeners for event");
        }
    }
}

/// Build the bounded fan-in channel sources and HTTP handlers push into
/// (§5 "Webhook queue: bounded (default 1000)"). Shared by every source,
/// not just the webhook one — the spec's queue-size knob names the webhook
/// case but §5 applies the same bound to every source's queue.
pub fn fanin_channel(capacity: usize) -> (mpsc::Sender<IncomingEvent>, mpsc::Receiver<IncomingEvent>) {
    mpsc::channel(capacity.max(1))
}

/// Push `event` into the fan-in channel, logging and dropping on a full
/// queue rather than blocking the producer (§5 "Backpressure": "on full,
/// sources log and drop (preferred) or block briefly").
pub fn try_emit(tx: &mpsc::Sender<IncomingEvent>, event: IncomingEvent) {
    if let Err(err) = tx.try_send(event) {
        match err {
            mpsc::error::TrySendError::Full(event) => {
                tracing::warn!(source = %event.source, "fan-in queue full, dropping event");
                publish(SystemEvent::SourceConnectionChanged {
                    source: event.source.to_string(),
                    state: "queue_full".to_string(),
                });
            }
            mpsc::error::TrySendError::Closed(event) => {
                tracing::error!(source = %event.source, "fan-in queue closed, dropping event");
            }
        }
    }
}
