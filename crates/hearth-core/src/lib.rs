// SPDX-License-Identifier: MIT

//! hearth-core: the domain types, macros, and plain-data model shared by
//! every other `hearth-*` crate. Nothing here touches I/O — storage,
//! sandboxing, and backend adapters all build on top of these types.

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

#[macro_use]
pub mod macros;

pub mod attachment;
pub mod automation;
pub mod clock;
pub mod confirmation;
pub mod effect;
pub mod error;
pub mod id;
pub mod incoming_event;
pub mod listener;
pub mod system_event;
pub mod worker_task;

pub use attachment::{Attachment, AttachmentId, AttachmentSource};
pub use automation::{
    Automation, AutomationDetail, AutomationId, AutomationKind, ActionType, ConversationId,
    EventSource,
};
pub use clock::{Clock, FakeClock, SystemClock};
pub use confirmation::{ConfirmationId, ConfirmationKey, ConfirmationOutcome, ConfirmationPrompt, ConfirmationReply};
pub use effect::Effect;
pub use error::{CoreError, CoreResult};
pub use id::IdBuf;
pub use incoming_event::IncomingEvent;
pub use listener::{ListenerCache, ListenerEntry, ListenerSnapshot};
pub use system_event::SystemEvent;
pub use worker_task::{CallbackToken, WorkerTask, WorkerTaskId, WorkerTaskStatus};
