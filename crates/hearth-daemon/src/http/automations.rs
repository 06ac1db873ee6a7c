// SPDX-License-Identifier: MIT

//! `/automations/*` handlers (§6 "Automation HTTP API"). Thin translation
//! between `hearth-wire` request/response DTOs and `hearth-engine`'s
//! `AutomationRegistry`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use hearth_core::{Automation, AutomationId, ConversationId};
use hearth_engine::{CreateEventAutomation, CreateScheduleAutomation, UpdateAutomation};
use hearth_store::{AutomationFilter, Page};
use hearth_wire::{
    AutomationStatsResponse, CreateEventAutomationRequest, CreateScheduleAutomationRequest,
    ListAutomationsQuery, ListAutomationsResponse, UpdateAutomationRequest,
};
use serde::Deserialize;

use super::ApiError;
use crate::app::AppState;

/// `conversation_id` scopes every by-id lookup, since automation ids are
/// not otherwise namespaced per caller (§4.6 "lookups take a conversation
/// id, not just an automation id, so one conversation cannot read or
/// mutate another's rows").
#[derive(Debug, Deserialize)]
pub struct ConversationScope {
    pub conversation_id: ConversationId,
}

pub async fn create_event(
    State(state): State<AppState>,
    Json(body): Json<CreateEventAutomationRequest>,
) -> Result<(StatusCode, Json<Automation>), ApiError> {
    let payload = CreateEventAutomation {
        name: body.name,
        description: body.description,
        conversation_id: body.conversation_id,
        interface_type: body.interface_type,
        enabled: body.enabled,
        action_type: body.action_type,
        action_config: body.action_config,
        source_id: body.source_id,
        match_conditions: body.match_conditions,
        condition_script: body.condition_script,
        one_time: body.one_time,
    };
    let created = state.registry.create_event(payload)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn create_schedule(
    State(state): State<AppState>,
    Json(body): Json<CreateScheduleAutomationRequest>,
) -> Result<(StatusCode, Json<Automation>), ApiError> {
    let payload = CreateScheduleAutomation {
        name: body.name,
        description: body.description,
        conversation_id: body.conversation_id,
        interface_type: body.interface_type,
        enabled: body.enabled,
        action_type: body.action_type,
        action_config: body.action_config,
        recurrence_rule: body.recurrence_rule,
        timezone: body.timezone,
    };
    let created = state.registry.create_schedule(payload)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListAutomationsQuery>,
) -> Json<ListAutomationsResponse> {
    let filter = AutomationFilter {
        conversation_id: query.conversation_id,
        kind: query.automation_type,
        enabled: query.enabled,
    };
    let (automations, total_count) =
        state.registry.list(&filter, Page { page: query.page, page_size: query.page_size });
    Json(ListAutomationsResponse { automations, total_count, page: query.page, page_size: query.page_size })
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<AutomationId>,
    Query(scope): Query<ConversationScope>,
) -> Result<Json<Automation>, ApiError> {
    Ok(Json(state.registry.get(id, &scope.conversation_id)?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<AutomationId>,
    Query(scope): Query<ConversationScope>,
    Json(body): Json<UpdateAutomationRequest>,
) -> Result<Json<Automation>, ApiError> {
    let patch = UpdateAutomation {
        name: body.name,
        description: body.description,
        enabled: body.enabled,
        action_config: body.action_config,
        match_conditions: body.match_conditions,
        condition_script: body.condition_script,
        recurrence_rule: body.recurrence_rule,
    };
    Ok(Json(state.registry.update(id, &scope.conversation_id, patch)?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<AutomationId>,
    Query(scope): Query<ConversationScope>,
) -> Result<StatusCode, ApiError> {
    state.registry.delete(id, &scope.conversation_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn stats(
    State(state): State<AppState>,
    Path(id): Path<AutomationId>,
    Query(scope): Query<ConversationScope>,
) -> Result<Json<AutomationStatsResponse>, ApiError> {
    let stats = state.registry.stats(id, &scope.conversation_id)?;
    Ok(Json(AutomationStatsResponse {
        daily_executions: stats.daily_executions,
        last_execution_at: stats.last_execution_at,
        next_scheduled_at: stats.next_scheduled_at,
        execution_count: stats.execution_count,
    }))
}
