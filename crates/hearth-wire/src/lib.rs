// SPDX-License-Identifier: MIT

//! hearth-wire: the JSON request/response shapes for the HTTP surface
//! described in SPEC_FULL.md §6. Plain DTOs only — no axum, no engine
//! dependency, so this crate can be shared between `hearth-daemon` (which
//! fills these in from `hearth-engine` types) and any future HTTP client
//! without pulling in the whole server.

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

pub mod automations;
pub mod confirmations;
pub mod error;
pub mod webhooks;
pub mod workers;

pub use automations::{
    AutomationStatsResponse, CreateEventAutomationRequest, CreateScheduleAutomationRequest,
    ListAutomationsQuery, ListAutomationsResponse, UpdateAutomationRequest,
};
pub use confirmations::ConfirmationReplyRequest;
pub use error::{ErrorBody, ErrorResponse};
pub use webhooks::{WebhookAcceptedResponse, WebhookEventQuery};
pub use workers::{CompletionWebhookRequest, SpawnWorkerTaskRequest};
