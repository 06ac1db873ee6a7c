// SPDX-License-Identifier: MIT

//! Types shared between action dispatch and the confirmation mediator.
//! The mediator itself (the correlation table + await/timeout logic) lives
//! in `hearth-engine::mediator`, since it needs the async runtime; this
//! module holds the plain data it correlates on.

use serde::{Deserialize, Serialize};

use crate::automation::ConversationId;
use crate::define_id;

define_id!(ConfirmationId, "cnf_");

/// Correlates a prompt shown to a front-end with the reply it eventually
/// receives. `turn_id` is the agent turn during which the tool call was
/// made; `tool_name` disambiguates multiple pending confirmations within
/// the same turn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfirmationKey {
    pub conversation_id: ConversationId,
    pub turn_id: String,
    pub tool_name: String,
}

impl ConfirmationKey {
    pub fn new(
        conversation_id: impl Into<ConversationId>,
        turn_id: impl Into<String>,
        tool_name: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            turn_id: turn_id.into(),
            tool_name: tool_name.into(),
        }
    }
}

/// A rendered, already-escaped prompt awaiting a reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationPrompt {
    pub id: ConfirmationId,
    pub key: ConfirmationKey,
    pub description: String,
}

/// Outcome of a confirmation request as observed by the calling tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum ConfirmationOutcome {
    Approved,
    /// `timed_out` distinguishes an explicit user denial from the mediator's
    /// own timeout, though both deny execution identically to the caller.
    Denied { timed_out: bool },
}

impl ConfirmationOutcome {
    pub fn approved(self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// A reply arriving from the front-end, keyed the same way as the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationReply {
    pub id: ConfirmationId,
    pub approved: bool,
}
