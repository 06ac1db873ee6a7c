// SPDX-License-Identifier: MIT

//! Indexing source (§4.1 "Indexing source"): in-process. Other subsystems
//! (document indexing, out of scope per §1) call [`emit`] directly; there is
//! no network surface or background task, just a normalization function
//! feeding the shared fan-in queue.

use async_trait::async_trait;
use hearth_core::{EventSource as Source, IncomingEvent};
use tokio::sync::mpsc;

use crate::processor_pool::try_emit;

/// Normalize a document-indexing signal into an [`IncomingEvent`] and push
/// it into the fan-in queue. `document_id` is the sampler's entity key for
/// this source (§3 "indexing: document id").
pub fn emit(event_tx: &mpsc::Sender<IncomingEvent>, document_id: impl Into<String>, payload: serde_json::Value) {
    let event = IncomingEvent::new(Source::Indexing, document_id, payload);
    try_emit(event_tx, event);
}

pub struct IndexingSource;

#[async_trait]
impl super::EventSource for IndexingSource {
    async fn start(&self) {}
    async fn stop(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_pushes_normalized_event_into_queue() {
        let (tx, mut rx) = mpsc::channel(8);
        emit(&tx, "doc_1", serde_json::json!({"title": "hello"}));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.source, Source::Indexing);
        assert_eq!(event.entity_key, "doc_1");
    }
}
