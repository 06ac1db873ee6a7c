// SPDX-License-Identifier: MIT

//! `/workers/*` handlers (§4.7, §6 "worker completion webhook"). Spawn and
//! status/cancel map straight onto `WorkerOrchestrator`; the completion
//! webhook is the one route a backend (not a human client) calls, so its
//! token check happens inside `complete` rather than at the HTTP layer.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use hearth_core::{WorkerTask, WorkerTaskId};
use hearth_engine::{CompletionReport, SpawnWorkerTask};
use hearth_wire::{CompletionWebhookRequest, SpawnWorkerTaskRequest};

use super::ApiError;
use crate::app::AppState;

pub async fn spawn(
    State(state): State<AppState>,
    Json(body): Json<SpawnWorkerTaskRequest>,
) -> Result<(StatusCode, Json<WorkerTask>), ApiError> {
    let request = SpawnWorkerTask {
        conversation_id: body.conversation_id,
        interface_type: body.interface_type,
        task_description: body.task_description,
        model: body.model,
        context_files: body.context_files,
        timeout_minutes: body.timeout_minutes,
        user_name: body.user_name,
    };
    let task = state.orchestrator.spawn(request).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn status(
    State(state): State<AppState>,
    Path(task_id): Path<WorkerTaskId>,
) -> Result<Json<WorkerTask>, ApiError> {
    Ok(Json(state.orchestrator.get_status(task_id)?))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(task_id): Path<WorkerTaskId>,
) -> Result<Json<WorkerTask>, ApiError> {
    Ok(Json(state.orchestrator.cancel(task_id).await?))
}

pub async fn logs(
    State(state): State<AppState>,
    Path(task_id): Path<WorkerTaskId>,
) -> Result<String, ApiError> {
    Ok(state.orchestrator.logs(task_id).await?)
}

pub async fn complete(
    State(state): State<AppState>,
    Path(task_id): Path<WorkerTaskId>,
    Json(body): Json<CompletionWebhookRequest>,
) -> Result<StatusCode, ApiError> {
    let report = CompletionReport {
        task_id,
        token: body.token,
        exit_code: body.exit_code,
        duration_seconds: body.duration_seconds,
        summary: body.summary,
        error_message: body.error_message,
        output_files: body.output_files,
    };
    state.orchestrator.complete(report)?;
    Ok(StatusCode::NO_CONTENT)
}
