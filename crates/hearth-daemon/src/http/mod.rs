// SPDX-License-Identifier: MIT

//! HTTP surface (§6): automation CRUD, webhook ingress, worker task
//! lifecycle, and confirmation replies, all mounted on one `axum::Router`
//! sharing `AppState`. Route handlers stay thin — they extract, call into
//! `hearth-engine`, and map the result through `hearth-wire`'s DTOs; the
//! actual logic lives below this layer.

mod automations;
mod confirmations;
mod webhooks;
mod workers;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use hearth_engine::EngineError;
use hearth_wire::ErrorResponse;

use crate::app::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/automations/event", post(automations::create_event))
        .route("/automations/schedule", post(automations::create_schedule))
        .route("/automations", get(automations::list))
        .route(
            "/automations/{id}",
            get(automations::get).patch(automations::update).delete(automations::delete),
        )
        .route("/automations/{id}/stats", get(automations::stats))
        .route("/webhook/event", post(webhooks::receive))
        .route("/workers", post(workers::spawn))
        .route("/workers/{task_id}", get(workers::status))
        .route("/workers/{task_id}/cancel", post(workers::cancel))
        .route("/workers/{task_id}/complete", post(workers::complete))
        .route("/workers/{task_id}/logs", get(workers::logs))
        .route("/confirmations/{id}/reply", post(confirmations::reply))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

/// Wraps [`EngineError`] so handlers can use `?` and still produce the
/// kind/status mapping §6 specifies, via `hearth_wire::status_code_for_kind`.
pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl From<hearth_store::StoreError> for ApiError {
    fn from(err: hearth_store::StoreError) -> Self {
        Self(EngineError::from(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let core_err = hearth_core::CoreError::from(self.0);
        let body = ErrorResponse::from_core_error(&core_err);
        let status = StatusCode::from_u16(hearth_wire::status_code_for_kind(&body.error.kind))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}

#[allow(unused)] // reserved for handlers that reject malformed request bodies directly
pub fn invalid_argument(message: impl Into<String>) -> ApiError {
    ApiError(EngineError::InvalidArgument(message.into()))
}

#[allow(unused)]
pub fn unauthorized(message: impl Into<String>) -> ApiError {
    ApiError(EngineError::Unauthorized(message.into()))
}

#[allow(unused)]
pub fn not_found(message: impl Into<String>) -> ApiError {
    ApiError(EngineError::NotFound(message.into()))
}
