// SPDX-License-Identifier: MIT

//! The automation data model: a unified view over event-triggered and
//! schedule-triggered rules, matching the two physical tables described by
//! the registry but modeled here as one tagged struct.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::define_id;
use crate::simple_display;

define_id!(AutomationId, "aut_");

/// Opaque conversation scope. Every automation, worker task, and attachment
/// is scoped to one; cross-conversation access is a `not_found`, never an
/// `unauthorized`, to avoid leaking existence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ConversationId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl std::borrow::Borrow<str> for ConversationId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ConversationId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Which physical table an automation belongs to. Names are unique across
/// both kinds within a conversation (see [`crate::automation::Automation::kind`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationKind {
    Event,
    Schedule,
}

simple_display!(AutomationKind {
    Event => "event",
    Schedule => "schedule",
});

/// Event sources an event-kind automation may subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Home,
    Webhook,
    Indexing,
}

simple_display!(EventSource {
    Home => "home",
    Webhook => "webhook",
    Indexing => "indexing",
});

/// What happens when an automation's conditions are satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    WakeAgent,
    Script,
}

simple_display!(ActionType {
    WakeAgent => "wake_agent",
    Script => "script",
});

/// Fields specific to one automation kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AutomationDetail {
    Event {
        source_id: EventSource,
        /// Dotted-path equality map, e.g. `{"new_state.state": "Home"}`.
        /// Never empty — enforced at registration (`AutomationRegistry::create`).
        match_conditions: serde_json::Map<String, serde_json::Value>,
        condition_script: Option<String>,
        one_time: bool,
    },
    Schedule {
        recurrence_rule: String,
        /// IANA timezone name. Required explicitly — see open question
        /// resolution in the schedule engine.
        timezone: String,
        next_scheduled_at: DateTime<Utc>,
        execution_count: u32,
    },
}

impl AutomationDetail {
    pub fn kind(&self) -> AutomationKind {
        match self {
            Self::Event { .. } => AutomationKind::Event,
            Self::Schedule { .. } => AutomationKind::Schedule,
        }
    }
}

/// A user-defined rule: trigger, condition, and action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Automation {
    pub id: AutomationId,
    pub name: String,
    pub description: Option<String>,
    pub conversation_id: ConversationId,
    pub interface_type: String,
    pub enabled: bool,
    pub action_type: ActionType,
    pub action_config: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub last_execution_at: Option<DateTime<Utc>>,
    pub daily_executions: u32,
    pub daily_reset_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub detail: AutomationDetail,
}

impl Automation {
    pub fn kind(&self) -> AutomationKind {
        self.detail.kind()
    }

    /// Apply the reported outcome of a single dispatch: bump counters, set
    /// `last_execution_at`, and disable one-time listeners. Mirrors the
    /// invariant that `one_time` automations never re-enable themselves.
    pub fn record_successful_dispatch(&mut self, at: DateTime<Utc>) {
        self.daily_executions += 1;
        self.last_execution_at = Some(at);
        if let AutomationDetail::Event { one_time: true, .. } = &self.detail {
            self.enabled = false;
        }
        if let AutomationDetail::Schedule {
            execution_count, ..
        } = &mut self.detail
        {
            *execution_count += 1;
        }
    }

    /// Reset the daily counter if the reset boundary has passed, bumping
    /// `daily_reset_at` to the next local midnight for `tz`.
    pub fn maybe_reset_daily_counter(&mut self, now: DateTime<Utc>, tz: chrono_tz::Tz) {
        let due = match self.daily_reset_at {
            Some(at) => now >= at,
            None => true,
        };
        if due {
            self.daily_executions = 0;
            self.daily_reset_at = Some(next_local_midnight(now, tz));
        }
    }
}

fn next_local_midnight(now: DateTime<Utc>, tz: chrono_tz::Tz) -> DateTime<Utc> {
    use chrono::{Duration, TimeZone};

    let local = now.with_timezone(&tz);
    let next_date = local.date_naive() + Duration::days(1);
    let midnight_naive = next_date.and_hms_opt(0, 0, 0).unwrap_or(local.naive_local());
    tz.from_local_datetime(&midnight_naive)
        .single()
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight_naive))
        .with_timezone(&Utc)
}

#[cfg(any(test, feature = "test-support"))]
pub struct AutomationBuilder {
    id: AutomationId,
    name: String,
    description: Option<String>,
    conversation_id: ConversationId,
    interface_type: String,
    enabled: bool,
    action_type: ActionType,
    action_config: serde_json::Value,
    created_at: DateTime<Utc>,
    last_execution_at: Option<DateTime<Utc>>,
    daily_executions: u32,
    daily_reset_at: Option<DateTime<Utc>>,
    detail: AutomationDetail,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for AutomationBuilder {
    fn default() -> Self {
        Self {
            id: AutomationId::new(),
            name: "test-automation".into(),
            description: None,
            conversation_id: ConversationId::new("conv_test"),
            interface_type: "test".into(),
            enabled: true,
            action_type: ActionType::WakeAgent,
            action_config: serde_json::json!({}),
            created_at: Utc::now(),
            last_execution_at: None,
            daily_executions: 0,
            daily_reset_at: None,
            detail: AutomationDetail::Event {
                source_id: EventSource::Home,
                match_conditions: {
                    let mut m = serde_json::Map::new();
                    m.insert("entity_id".into(), serde_json::json!("person.alex"));
                    m
                },
                condition_script: None,
                one_time: false,
            },
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl AutomationBuilder {
    pub fn name(mut self, v: impl Into<String>) -> Self {
        self.name = v.into();
        self
    }

    pub fn conversation_id(mut self, v: impl Into<ConversationId>) -> Self {
        self.conversation_id = v.into();
        self
    }

    pub fn enabled(mut self, v: bool) -> Self {
        self.enabled = v;
        self
    }

    pub fn action_type(mut self, v: ActionType) -> Self {
        self.action_type = v;
        self
    }

    pub fn action_config(mut self, v: serde_json::Value) -> Self {
        self.action_config = v;
        self
    }

    pub fn detail(mut self, v: AutomationDetail) -> Self {
        self.detail = v;
        self
    }

    pub fn one_time(mut self, v: bool) -> Self {
        if let AutomationDetail::Event { one_time, .. } = &mut self.detail {
            *one_time = v;
        }
        self
    }

    pub fn daily_executions(mut self, v: u32) -> Self {
        self.daily_executions = v;
        self
    }

    pub fn build(self) -> Automation {
        Automation {
            id: self.id,
            name: self.name,
            description: self.description,
            conversation_id: self.conversation_id,
            interface_type: self.interface_type,
            enabled: self.enabled,
            action_type: self.action_type,
            action_config: self.action_config,
            created_at: self.created_at,
            last_execution_at: self.last_execution_at,
            daily_executions: self.daily_executions,
            daily_reset_at: self.daily_reset_at,
            detail: self.detail,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Automation {
    pub fn builder() -> AutomationBuilder {
        AutomationBuilder::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_time_event_automation_disables_after_successful_dispatch() {
        let mut automation = Automation::builder().one_time(true).build();
        assert!(automation.enabled);
        automation.record_successful_dispatch(Utc::now());
        assert!(!automation.enabled);
        assert_eq!(automation.daily_executions, 1);
    }

    #[test]
    fn schedule_detail_increments_execution_count_on_dispatch() {
        let mut automation = Automation::builder()
            .detail(AutomationDetail::Schedule {
                recurrence_rule: "FREQ=DAILY".into(),
                timezone: "America/Los_Angeles".into(),
                next_scheduled_at: Utc::now(),
                execution_count: 0,
            })
            .build();
        automation.record_successful_dispatch(Utc::now());
        match automation.detail {
            AutomationDetail::Schedule {
                execution_count, ..
            } => assert_eq!(execution_count, 1),
            _ => panic!("expected schedule detail"),
        }
    }
}
