// SPDX-License-Identifier: MIT

//! Attachments: files referenced by tool or script-action results. Scoped to
//! a conversation; the store rejects cross-conversation reads as not-found.

use serde::{Deserialize, Serialize};

use crate::automation::ConversationId;
use crate::define_id;
use crate::simple_display;

define_id!(AttachmentId, "att_");

/// Who produced an attachment: a user upload or a tool/script's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentSource {
    User,
    Tool,
}

simple_display!(AttachmentSource {
    User => "user",
    Tool => "tool",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub attachment_id: AttachmentId,
    pub conversation_id: ConversationId,
    pub mime_type: String,
    pub size: u64,
    pub storage_path: String,
    pub source: AttachmentSource,
}

impl Attachment {
    /// `None` if `requested_conversation` doesn't own this attachment —
    /// callers should surface that as `not_found`, never `unauthorized`.
    pub fn visible_to<'a>(&'a self, requested_conversation: &ConversationId) -> Option<&'a Self> {
        (&self.conversation_id == requested_conversation).then_some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Attachment {
        Attachment {
            attachment_id: AttachmentId::new(),
            conversation_id: ConversationId::new("conv_a"),
            mime_type: "image/png".into(),
            size: 1024,
            storage_path: "/tmp/a.png".into(),
            source: AttachmentSource::Tool,
        }
    }

    #[test]
    fn cross_conversation_access_is_hidden() {
        let attachment = sample();
        assert!(attachment.visible_to(&ConversationId::new("conv_a")).is_some());
        assert!(attachment.visible_to(&ConversationId::new("conv_b")).is_none());
    }
}
