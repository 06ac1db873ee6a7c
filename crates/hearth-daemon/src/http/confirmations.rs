// SPDX-License-Identifier: MIT

//! `POST /confirmations/{id}/reply` (§4.4): the front-end's reply to a
//! pending confirmation prompt. A reply to an unknown or already-resolved
//! id is indistinguishable from one that raced the mediator's own timeout,
//! so both surface as `not_found` rather than leaking internal timing.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use hearth_core::ConfirmationId;
use hearth_wire::ConfirmationReplyRequest;

use super::ApiError;
use crate::app::AppState;

pub async fn reply(
    State(state): State<AppState>,
    Path(id): Path<ConfirmationId>,
    Json(body): Json<ConfirmationReplyRequest>,
) -> Result<StatusCode, ApiError> {
    let reply = body.into_reply(id);
    if state.mediator.reply(reply.id, reply.approved) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(super::not_found(format!("confirmation {id} not found or already resolved")))
    }
}
