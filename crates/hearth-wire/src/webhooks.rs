// SPDX-License-Identifier: MIT

//! `POST /webhook/event` request/response shapes (§6 "Webhook ingress" and
//! §4.1 "webhook source").

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Query parameters accepted alongside the webhook body. Both fields are
/// optional here since §4.1 allows `source`/`event_type` to arrive via
/// header or body instead; the handler resolves the effective value with
/// `WebhookFields::resolve` (header > query > body).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEventQuery {
    pub source: Option<String>,
    pub event_type: Option<String>,
}

/// Returned on successful ingestion. §9 "at-least-once delivery": a caller
/// retrying the same request after a dropped response should treat a repeat
/// `202` as confirmation the event is (or will be) processed, not as a new
/// event — dedup itself happens server-side, keyed on the signature the
/// webhook source supplies.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAcceptedResponse {
    pub status: &'static str,
    pub event_id: Uuid,
}

impl WebhookAcceptedResponse {
    pub fn accepted(event_id: Uuid) -> Self {
        Self {
            status: "accepted",
            event_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_response_serializes_status_literal() {
        let body = WebhookAcceptedResponse::accepted(Uuid::nil());
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["status"], "accepted");
    }
}
