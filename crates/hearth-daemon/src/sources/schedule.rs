// SPDX-License-Identifier: MIT

//! Schedule ticker source (§4.1 "Schedule ticker"): driven by the Schedule
//! Engine (`hearth_engine::schedule`), this is the one source that reads
//! and writes the `Store` directly and dispatches the fired automation
//! itself, rather than producing events for [`hearth_engine::EventProcessor`]
//! to match — a schedule automation has no `match_conditions`, so there is
//! nothing for the processor's listener match to do.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hearth_core::{Automation, AutomationDetail, AutomationKind};
use hearth_engine::{daily_cap_exceeded, ActionDispatcher, RecurrenceRule};
use hearth_store::{AutomationFilter, Page, Store};
use tokio_util::sync::CancellationToken;

/// Upper bound on how long the ticker ever sleeps in one go, so a schedule
/// registered after the current sleep started is still picked up within a
/// bounded window rather than only on the next registry mutation.
const MAX_SLEEP: Duration = Duration::from_secs(60);

pub struct ScheduleSource {
    store: Arc<Store>,
    dispatcher: Arc<ActionDispatcher>,
    cancel: CancellationToken,
}

impl ScheduleSource {
    pub fn new(store: Arc<Store>, dispatcher: Arc<ActionDispatcher>) -> Self {
        Self { store, dispatcher, cancel: CancellationToken::new() }
    }

    async fn run(&self) {
        loop {
            let sleep_for = self.sleep_duration();
            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = self.cancel.cancelled() => return,
            }
            self.fire_due_schedules().await;
        }
    }

    fn sleep_duration(&self) -> Duration {
        let earliest = self
            .enabled_schedules()
            .iter()
            .filter_map(next_scheduled_at)
            .min();
        match earliest {
            Some(at) => (at - Utc::now()).to_std().unwrap_or(Duration::ZERO).min(MAX_SLEEP),
            None => MAX_SLEEP,
        }
    }

    fn enabled_schedules(&self) -> Vec<Automation> {
        let (rows, _total) = self.store.list_automations(
            &AutomationFilter { kind: Some(AutomationKind::Schedule), enabled: Some(true), ..Default::default() },
            Page { page: 1, page_size: u32::MAX },
        );
        rows
    }

    async fn fire_due_schedules(&self) {
        let now = Utc::now();
        for automation in self.enabled_schedules() {
            let Some(next_at) = next_scheduled_at(&automation) else { continue };
            if next_at > now {
                continue;
            }
            self.fire_one(automation, now).await;
        }
    }

    async fn fire_one(&self, automation: Automation, now: DateTime<Utc>) {
        let AutomationDetail::Schedule { recurrence_rule, timezone, .. } = &automation.detail else {
            return;
        };
        let Ok(rule) = RecurrenceRule::parse(recurrence_rule) else {
            tracing::warn!(automation_id = %automation.id, "schedule automation has unparseable recurrence_rule");
            return;
        };
        let Ok(tz) = timezone.parse::<chrono_tz::Tz>() else {
            tracing::warn!(automation_id = %automation.id, "schedule automation has unparseable timezone");
            return;
        };

        let succeeded = if daily_cap_exceeded(&automation) {
            tracing::debug!(automation_id = %automation.id, "schedule fire suppressed by daily_cap");
            false
        } else {
            let payload = serde_json::json!({"automation_id": automation.id, "fired_at": now});
            let outcome = self.dispatcher.dispatch(&automation, &payload).await;
            if !outcome.succeeded {
                tracing::warn!(automation_id = %automation.id, error = ?outcome.error, "schedule dispatch failed");
            }
            outcome.succeeded
        };

        // next_scheduled_at always advances, independent of dispatch/cap
        // outcome — a blocked or failed fire must not wedge the ticker into
        // re-firing on every wake.
        let result = self.store.update_automation(automation.id, &automation.conversation_id, |row| {
            if succeeded {
                row.maybe_reset_daily_counter(now, tz);
                row.record_successful_dispatch(now);
            }
            if let AutomationDetail::Schedule { execution_count, next_scheduled_at, .. } = &mut row.detail {
                match compute_next(&rule, *next_scheduled_at, tz, now, *execution_count) {
                    Some(next) => *next_scheduled_at = next,
                    None => row.enabled = false,
                }
            }
            Ok(())
        });

        if let Err(err) = result {
            tracing::warn!(automation_id = %automation.id, error = %err, "failed to advance schedule");
        }
    }
}

fn next_scheduled_at(automation: &Automation) -> Option<DateTime<Utc>> {
    match &automation.detail {
        AutomationDetail::Schedule { next_scheduled_at, .. } => Some(*next_scheduled_at),
        AutomationDetail::Event { .. } => None,
    }
}

/// Advance `after` past `now`, firing at most once for any number of missed
/// instances (§4.1 "Missed fires ... fire at most once on resume, then the
/// schedule catches up to the next future instant") and honoring `COUNT`
/// exhaustion (§4.5 "when `count` is exhausted, the automation
/// auto-disables").
fn compute_next(
    rule: &RecurrenceRule,
    mut after: DateTime<Utc>,
    tz: chrono_tz::Tz,
    now: DateTime<Utc>,
    execution_count: u32,
) -> Option<DateTime<Utc>> {
    if let Some(count) = rule.count {
        if execution_count >= count {
            return None;
        }
    }
    loop {
        let candidate = rule.next_after(after, tz)?;
        if candidate > now {
            return Some(candidate);
        }
        after = candidate;
    }
}

#[async_trait]
impl super::EventSource for ScheduleSource {
    async fn start(&self) {
        self.run().await;
    }

    async fn stop(&self) {
        self.cancel.cancel();
    }
}

pub fn spawn(store: Arc<Store>, dispatcher: Arc<ActionDispatcher>) -> (tokio::task::JoinHandle<()>, CancellationToken) {
    let source = Arc::new(ScheduleSource::new(store, dispatcher));
    let cancel = source.cancel.clone();
    let handle = tokio::spawn(async move {
        use crate::sources::EventSource as _;
        source.start().await;
    });
    (handle, cancel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_next_catches_up_past_missed_instances_without_extra_fires() {
        let rule = RecurrenceRule::parse("FREQ=HOURLY").unwrap();
        let tz = chrono_tz::UTC;
        let after = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let now = DateTime::parse_from_rfc3339("2026-01-01T05:30:00Z").unwrap().with_timezone(&Utc);
        let next = compute_next(&rule, after, tz, now, 1).unwrap();
        assert!(next > now);
    }

    #[test]
    fn compute_next_returns_none_once_count_exhausted() {
        let rule = RecurrenceRule::parse("FREQ=DAILY;COUNT=3").unwrap();
        let tz = chrono_tz::UTC;
        let after = Utc::now();
        let next = compute_next(&rule, after, tz, after, 3);
        assert!(next.is_none());
    }
}
