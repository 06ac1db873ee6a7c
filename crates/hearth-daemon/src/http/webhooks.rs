// SPDX-License-Identifier: MIT

//! `POST /webhook/event` (§6 "Webhook ingress"): verifies the optional
//! per-source signature, normalizes the body into an [`IncomingEvent`], and
//! pushes it onto the shared fan-in queue. Accepted (`202`) means "queued",
//! not "matched" — matching happens asynchronously in the processor pool.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use hearth_core::{EventSource, IncomingEvent};
use hearth_wire::{WebhookAcceptedResponse, WebhookEventQuery};

use super::ApiError;
use crate::app::AppState;
use crate::processor_pool::try_emit;
use crate::sources::webhook::{verify_signature, WebhookFields};

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

pub async fn receive(
    State(state): State<AppState>,
    Query(query): Query<WebhookEventQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<WebhookAcceptedResponse>), ApiError> {
    let mut payload: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|err| super::invalid_argument(format!("invalid JSON body: {err}")))?;
    let body_field = |key: &str| payload.as_object().and_then(|o| o.get(key)).and_then(|v| v.as_str()).map(str::to_owned);

    let source = WebhookFields {
        header: header_str(&headers, "X-Webhook-Source").map(str::to_owned),
        query: query.source.clone(),
        body: body_field("source"),
    }
    .resolve()
    .ok_or_else(|| super::invalid_argument("missing source (header/query/body)".to_string()))?;

    let event_type = WebhookFields {
        header: header_str(&headers, "X-Webhook-Event-Type").map(str::to_owned),
        query: query.event_type.clone(),
        body: body_field("event_type"),
    }
    .resolve()
    .ok_or_else(|| super::invalid_argument("missing event_type (header/query/body)".to_string()))?;

    let secret = state.daemon_config.webhook_secrets.get(&source.to_ascii_lowercase());
    let signature_header = header_str(&headers, "X-Webhook-Signature");
    verify_signature(secret.map(String::as_str), signature_header, &body)
        .map_err(|err| super::unauthorized(err.to_string()))?;

    // Resolved values win over whatever the body said, but `event_id` is
    // never taken from the payload at all (§4.1 "system-generated fields
    // cannot be overridden by payload") — `IncomingEvent::new` always mints
    // its own.
    if let Some(object) = payload.as_object_mut() {
        object.insert("source".to_string(), serde_json::json!(source));
        object.insert("event_type".to_string(), serde_json::json!(event_type));
    }

    let entity_key = format!("{source}:{event_type}");
    let event = IncomingEvent::new(EventSource::Webhook, entity_key, payload);
    let event_id = event.event_id;
    try_emit(&state.event_tx, event);

    Ok((StatusCode::ACCEPTED, Json(WebhookAcceptedResponse::accepted(event_id))))
}
