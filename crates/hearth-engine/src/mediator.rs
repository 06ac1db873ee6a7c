// SPDX-License-Identifier: MIT

//! Confirmation Mediator (§4.4): correlates a prompt sent to a front-end
//! with the reply it eventually receives, timing out to a denial. The data
//! shapes (`ConfirmationKey`, `ConfirmationPrompt`, `ConfirmationOutcome`)
//! live in `hearth-core`; this is the async correlation table itself, which
//! needs the runtime and so can't live below the engine.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use hearth_core::{ConfirmationId, ConfirmationKey, ConfirmationOutcome, ConfirmationPrompt};
use parking_lot::Mutex;
use tokio::sync::oneshot;

/// A prompt the mediator is waiting on a reply for, plus the channel its
/// `await_reply` call is blocked on.
struct Pending {
    reply_tx: Option<oneshot::Sender<bool>>,
}

/// Something that can deliver a rendered confirmation prompt to whatever
/// front-end owns the conversation. The mediator doesn't know or care how —
/// chat button, push notification, CLI prompt — only that it returns once
/// the prompt has been handed off.
#[async_trait::async_trait]
pub trait PromptSink: Send + Sync {
    async fn send_prompt(&self, prompt: &ConfirmationPrompt);
}

/// No-op sink for configurations that never gate actions on confirmation.
pub struct NullPromptSink;

#[async_trait::async_trait]
impl PromptSink for NullPromptSink {
    async fn send_prompt(&self, _prompt: &ConfirmationPrompt) {}
}

#[derive(Clone)]
pub struct ConfirmationMediator {
    pending: Arc<Mutex<HashMap<ConfirmationId, Pending>>>,
    sink: Arc<dyn PromptSink>,
    default_timeout: Duration,
}

impl ConfirmationMediator {
    pub fn new(sink: Arc<dyn PromptSink>, default_timeout: Duration) -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            sink,
            default_timeout,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Send `description` to the conversation's front-end and await a
    /// correlated reply, timing out after `timeout` (defaulting to the
    /// mediator's configured default) to a denial (§4.4).
    pub async fn request_confirmation(
        &self,
        key: ConfirmationKey,
        description: impl Into<String>,
        timeout: Option<Duration>,
    ) -> ConfirmationOutcome {
        let id = ConfirmationId::new();
        let prompt = ConfirmationPrompt { id, key: key.clone(), description: description.into() };

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, Pending { reply_tx: Some(tx) });

        self.sink.send_prompt(&prompt).await;

        let timeout = timeout.unwrap_or(self.default_timeout);
        let outcome = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(approved)) => {
                if approved {
                    ConfirmationOutcome::Approved
                } else {
                    ConfirmationOutcome::Denied { timed_out: false }
                }
            }
            // Sender dropped without a reply, or the wait itself elapsed:
            // both resolve to a timeout denial.
            Ok(Err(_)) | Err(_) => ConfirmationOutcome::Denied { timed_out: true },
        };

        // Idempotency (§4.4): drop the correlation entry regardless of how
        // we got here, so a reply arriving after this point is a no-op.
        self.pending.lock().remove(&id);
        outcome
    }

    /// Resolve a pending confirmation. Returns `false` if `id` is unknown or
    /// already resolved — a duplicate or late reply is silently discarded,
    /// matching the idempotence requirement in §4.4.
    pub fn reply(&self, id: ConfirmationId, approved: bool) -> bool {
        let pending = self.pending.lock().remove(&id);
        match pending {
            Some(mut entry) => {
                if let Some(tx) = entry.reply_tx.take() {
                    let _ = tx.send(approved);
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reply_before_timeout_resolves_to_the_replied_outcome() {
        let mediator = ConfirmationMediator::new(Arc::new(NullPromptSink), Duration::from_secs(5));
        let key = ConfirmationKey::new("conv_a", "turn_1", "send_email");

        let mediator_clone = mediator.clone();
        let waiter = tokio::spawn(async move {
            mediator_clone.request_confirmation(key, "send an email?", None).await
        });

        // Give the waiter a chance to register before replying.
        tokio::task::yield_now().await;
        let pending_id = *mediator.pending.lock().keys().next().unwrap();
        assert!(mediator.reply(pending_id, true));

        let outcome = waiter.await.unwrap();
        assert!(outcome.approved());
    }

    #[tokio::test]
    async fn no_reply_times_out_to_denial() {
        let mediator = ConfirmationMediator::new(Arc::new(NullPromptSink), Duration::from_millis(50));
        let key = ConfirmationKey::new("conv_a", "turn_1", "send_email");
        let outcome = mediator.request_confirmation(key, "send an email?", None).await;
        assert_eq!(outcome, ConfirmationOutcome::Denied { timed_out: true });
    }

    #[tokio::test]
    async fn duplicate_reply_after_resolution_is_a_no_op() {
        let mediator = ConfirmationMediator::new(Arc::new(NullPromptSink), Duration::from_millis(50));
        let key = ConfirmationKey::new("conv_a", "turn_1", "send_email");
        let _ = mediator.request_confirmation(key, "send an email?", Some(Duration::from_millis(10))).await;
        // The entry was already removed on timeout; a late reply with a
        // fabricated id finds nothing to resolve.
        assert!(!mediator.reply(ConfirmationId::new(), true));
    }
}
