// SPDX-License-Identifier: MIT

//! hearth-store: transactional persistence for automations, the sampled
//! event window, and worker task rows, backed by a write-ahead log and
//! periodic zstd snapshot rather than an external database — the
//! specification treats the store as "a transactional key/table store"
//! collaborator, and this is this process's implementation of that
//! collaborator.

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

mod automations;
mod error;
mod recent_events;
mod retry;
mod state;
mod store;
mod wal;
mod worker_tasks;

pub use automations::{AutomationFilter, AutomationStats, Page};
pub use error::{StoreError, StoreResult};
pub use recent_events::SampleOutcome;
pub use retry::with_retry;
pub use state::{RecentEvent, StateSnapshot, StoreState};
pub use store::Store;
pub use wal::{Wal, WalEntry};
