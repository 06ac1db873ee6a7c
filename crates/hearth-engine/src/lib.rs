// SPDX-License-Identifier: MIT

//! hearth-engine: the automation registry, event processor, action
//! dispatcher, schedule engine, confirmation mediator, and worker task
//! orchestrator — the core this workspace builds around. Event sources and
//! the HTTP edge live in `hearth-daemon`; this crate only assumes a clock,
//! a [`hearth_store::Store`], and a [`hearth_backends::WorkerBackend`].

pub mod config;
pub mod dispatch;
pub mod effect_log;
pub mod error;
pub mod mediator;
pub mod orchestrator;
pub mod processor;
pub mod registry;
pub mod schedule;

pub use config::EngineConfig;
pub use dispatch::{ActionDispatcher, DispatchOutcome, TriggerContext, TurnId, WakeAgent};
pub use error::{EngineError, EngineResult};
pub use mediator::{ConfirmationMediator, NullPromptSink, PromptSink};
pub use orchestrator::{CompletionReport, SpawnWorkerTask, WorkerOrchestrator};
pub use processor::{daily_cap_exceeded, EventProcessor, MatchOutcome};
pub use registry::{AutomationRegistry, CreateEventAutomation, CreateScheduleAutomation, UpdateAutomation};
pub use schedule::{advance_schedule, Frequency, RecurrenceRule, RecurrenceRuleError};
