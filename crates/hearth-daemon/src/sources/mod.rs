// SPDX-License-Identifier: MIT

//! Event Sources (§4.1): pluggable producers into the processor's fan-in
//! queue. Each source implements [`EventSource`]'s `start`/`stop` lifecycle
//! and emits normalized [`hearth_core::IncomingEvent`]s; `main.rs` owns
//! starting all four and stopping them cooperatively on shutdown.

pub mod home;
pub mod indexing;
pub mod schedule;
pub mod webhook;

use async_trait::async_trait;

/// Lifecycle every source implements (§2 "Each has lifecycle {start,
/// stop}"). The webhook and indexing sources are HTTP/in-process call sites
/// rather than background tasks, so their `EventSource` impls are trivial;
/// the smart-home stream and schedule ticker are the two with real
/// long-lived background work.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn start(&self);
    async fn stop(&self);
}
