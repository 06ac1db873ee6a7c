// SPDX-License-Identifier: MIT

//! `POST /confirmations/{id}/reply` body. Mirrors `hearth_core::ConfirmationReply`
//! field-for-field; kept as a separate wire type rather than reusing the core
//! struct directly so the HTTP surface doesn't change shape if the core type
//! grows fields the front-end has no business sending (e.g. a future replay
//! counter).

use hearth_core::ConfirmationId;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmationReplyRequest {
    pub approved: bool,
}

impl ConfirmationReplyRequest {
    pub fn into_reply(self, id: ConfirmationId) -> hearth_core::ConfirmationReply {
        hearth_core::ConfirmationReply {
            id,
            approved: self.approved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_round_trips_into_core_type() {
        let request: ConfirmationReplyRequest =
            serde_json::from_value(serde_json::json!({"approved": true})).unwrap();
        let reply = request.into_reply(ConfirmationId::new());
        assert!(reply.approved);
    }
}
