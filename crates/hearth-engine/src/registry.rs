// SPDX-License-Identifier: MIT

//! Automation Registry (§4.6): unified CRUD over event + schedule
//! automations, enforcing cross-kind name uniqueness, and owning the
//! listener cache's publication so every mutating write is immediately
//! visible to the processor's next event.

use std::sync::Arc;

use chrono::Utc;
use hearth_core::{
    Automation, AutomationDetail, AutomationId, AutomationKind, ConversationId, ListenerCache,
    ListenerEntry, ListenerSnapshot,
};
use hearth_store::{AutomationFilter, AutomationStats, Page, Store};

use crate::error::{EngineError, EngineResult};

/// Payload accepted by `create` for an event-kind automation.
#[derive(Debug, Clone)]
pub struct CreateEventAutomation {
    pub name: String,
    pub description: Option<String>,
    pub conversation_id: ConversationId,
    pub interface_type: String,
    pub enabled: bool,
    pub action_type: hearth_core::automation::ActionType,
    pub action_config: serde_json::Value,
    pub source_id: hearth_core::EventSource,
    pub match_conditions: serde_json::Map<String, serde_json::Value>,
    pub condition_script: Option<String>,
    pub one_time: bool,
}

/// Payload accepted by `create` for a schedule-kind automation. `timezone`
/// is mandatory — this spec resolves the open question of a missing
/// schedule timezone by requiring it explicitly rather than falling back to
/// the server's local zone (SPEC_FULL.md §9).
#[derive(Debug, Clone)]
pub struct CreateScheduleAutomation {
    pub name: String,
    pub description: Option<String>,
    pub conversation_id: ConversationId,
    pub interface_type: String,
    pub enabled: bool,
    pub action_type: hearth_core::automation::ActionType,
    pub action_config: serde_json::Value,
    pub recurrence_rule: String,
    pub timezone: String,
}

/// Partial update: `None` fields preserve the prior value (§4.6 `update`,
/// §6 `PATCH` semantics).
#[derive(Debug, Clone, Default)]
pub struct UpdateAutomation {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub enabled: Option<bool>,
    pub action_config: Option<serde_json::Value>,
    pub match_conditions: Option<serde_json::Map<String, serde_json::Value>>,
    pub condition_script: Option<Option<String>>,
    pub recurrence_rule: Option<String>,
}

pub struct AutomationRegistry {
    store: Arc<Store>,
    listener_cache: ListenerCache,
}

impl AutomationRegistry {
    pub fn new(store: Arc<Store>, listener_cache: ListenerCache) -> Self {
        let registry = Self { store, listener_cache };
        registry.refresh_listener_cache();
        registry
    }

    pub fn listener_cache(&self) -> &ListenerCache {
        &self.listener_cache
    }

    /// Rebuild and publish the listener snapshot from the store's current
    /// event automations. Called after every mutating write and available
    /// for the periodic refresh task named in §6's knob list. Disabled
    /// automations stay in the snapshot (§4.2 step 4 skips them explicitly
    /// at match time) rather than being filtered out here, so re-enabling
    /// one doesn't require a cache rebuild to take effect.
    pub fn refresh_listener_cache(&self) {
        let (rows, _total) = self.store.list_automations(
            &AutomationFilter { kind: Some(AutomationKind::Event), ..Default::default() },
            Page { page: 1, page_size: u32::MAX },
        );
        let entries: Vec<ListenerEntry> = rows.iter().filter_map(ListenerEntry::from_automation).collect();
        self.listener_cache.publish(ListenerSnapshot::build(entries));
    }

    pub fn create_event(&self, payload: CreateEventAutomation) -> EngineResult<Automation> {
        if payload.match_conditions.is_empty() {
            return Err(EngineError::InvalidArgument(
                "match_conditions must not be empty".into(),
            ));
        }
        let automation = Automation {
            id: AutomationId::new(),
            name: payload.name,
            description: payload.description,
            conversation_id: payload.conversation_id,
            interface_type: payload.interface_type,
            enabled: payload.enabled,
            action_type: payload.action_type,
            action_config: payload.action_config,
            created_at: Utc::now(),
            last_execution_at: None,
            daily_executions: 0,
            daily_reset_at: None,
            detail: AutomationDetail::Event {
                source_id: payload.source_id,
                match_conditions: payload.match_conditions,
                condition_script: payload.condition_script,
                one_time: payload.one_time,
            },
        };
        let created = self.store.create_automation(automation)?;
        self.refresh_listener_cache();
        Ok(created)
    }

    pub fn create_schedule(&self, payload: CreateScheduleAutomation) -> EngineResult<Automation> {
        if payload.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(EngineError::InvalidArgument(format!(
                "unknown timezone {:?}",
                payload.timezone
            )));
        }
        let rule = crate::schedule::RecurrenceRule::parse(&payload.recurrence_rule)
            .map_err(|err| EngineError::InvalidArgument(format!("invalid recurrence_rule: {err}")))?;
        let tz: chrono_tz::Tz = payload.timezone.parse().expect("validated above");
        let next_scheduled_at = rule
            .next_after(Utc::now(), tz)
            .ok_or_else(|| EngineError::InvalidArgument("recurrence_rule never fires".into()))?;

        let automation = Automation {
            id: AutomationId::new(),
            name: payload.name,
            description: payload.description,
            conversation_id: payload.conversation_id,
            interface_type: payload.interface_type,
            enabled: payload.enabled,
            action_type: payload.action_type,
            action_config: payload.action_config,
            created_at: Utc::now(),
            last_execution_at: None,
            daily_executions: 0,
            daily_reset_at: None,
            detail: AutomationDetail::Schedule {
                recurrence_rule: payload.recurrence_rule,
                timezone: payload.timezone,
                next_scheduled_at,
                execution_count: 0,
            },
        };
        let created = self.store.create_automation(automation)?;
        self.refresh_listener_cache();
        Ok(created)
    }

    pub fn get(&self, id: AutomationId, conversation_id: &ConversationId) -> EngineResult<Automation> {
        Ok(self.store.get_automation(id, conversation_id)?)
    }

    pub fn list(
        &self,
        filter: &AutomationFilter,
        page: Page,
    ) -> (Vec<Automation>, usize) {
        self.store.list_automations(filter, page)
    }

    pub fn update_enabled(
        &self,
        id: AutomationId,
        conversation_id: &ConversationId,
        enabled: bool,
    ) -> EngineResult<Automation> {
        let updated = self.store.update_enabled(id, conversation_id, enabled)?;
        self.refresh_listener_cache();
        Ok(updated)
    }

    pub fn update(
        &self,
        id: AutomationId,
        conversation_id: &ConversationId,
        patch: UpdateAutomation,
    ) -> EngineResult<Automation> {
        if let Some(name) = &patch.name {
            if !self.store.check_name_available(name, conversation_id, Some(id)) {
                return Err(EngineError::Conflict(format!(
                    "automation named {name:?} already exists in this conversation"
                )));
            }
        }
        let updated = self.store.update_automation(id, conversation_id, |automation| {
            if let Some(name) = patch.name {
                automation.name = name;
            }
            if let Some(description) = patch.description {
                automation.description = description;
            }
            if let Some(enabled) = patch.enabled {
                automation.enabled = enabled;
            }
            if let Some(action_config) = patch.action_config {
                automation.action_config = action_config;
            }
            match &mut automation.detail {
                AutomationDetail::Event { match_conditions, condition_script, .. } => {
                    if let Some(conditions) = patch.match_conditions {
                        if conditions.is_empty() {
                            return Err(hearth_store::StoreError::InvalidArgument(
                                "match_conditions must not be empty".into(),
                            ));
                        }
                        *match_conditions = conditions;
                    }
                    if let Some(script) = patch.condition_script {
                        *condition_script = script;
                    }
                }
                AutomationDetail::Schedule { recurrence_rule, .. } => {
                    if let Some(rule) = patch.recurrence_rule {
                        crate::schedule::RecurrenceRule::parse(&rule).map_err(|err| {
                            hearth_store::StoreError::InvalidArgument(format!(
                                "invalid recurrence_rule: {err}"
                            ))
                        })?;
                        *recurrence_rule = rule;
                    }
                }
            }
            Ok(())
        })?;
        self.refresh_listener_cache();
        Ok(updated)
    }

    pub fn delete(&self, id: AutomationId, conversation_id: &ConversationId) -> EngineResult<()> {
        self.store.delete_automation(id, conversation_id)?;
        self.refresh_listener_cache();
        Ok(())
    }

    pub fn stats(&self, id: AutomationId, conversation_id: &ConversationId) -> EngineResult<AutomationStats> {
        Ok(self.store.automation_stats(id, conversation_id)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hearth_core::SystemClock;

    use super::*;

    fn registry() -> AutomationRegistry {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path(), Arc::new(SystemClock)).unwrap());
        AutomationRegistry::new(store, ListenerCache::default())
    }

    fn event_payload(name: &str, conversation: &str) -> CreateEventAutomation {
        let mut conditions = serde_json::Map::new();
        conditions.insert("entity_id".into(), serde_json::json!("person.alex"));
        CreateEventAutomation {
            name: name.into(),
            description: None,
            conversation_id: ConversationId::new(conversation),
            interface_type: "chat".into(),
            enabled: true,
            action_type: hearth_core::automation::ActionType::WakeAgent,
            action_config: serde_json::json!({}),
            source_id: hearth_core::EventSource::Home,
            match_conditions: conditions,
            condition_script: None,
            one_time: true,
        }
    }

    #[test]
    fn empty_match_conditions_rejected_at_registration() {
        let registry = registry();
        let mut payload = event_payload("Arrived", "conv_a");
        payload.match_conditions.clear();
        let err = registry.create_event(payload).unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
    }

    #[test]
    fn create_publishes_listener_cache() {
        let registry = registry();
        assert!(registry.listener_cache().current().is_empty());
        registry.create_event(event_payload("Arrived", "conv_a")).unwrap();
        assert_eq!(registry.listener_cache().current().len(), 1);
    }

    #[test]
    fn cross_type_name_conflict_blocks_second_create() {
        let registry = registry();
        registry.create_event(event_payload("Dinner", "conv_a")).unwrap();
        let err = registry
            .create_schedule(CreateScheduleAutomation {
                name: "Dinner".into(),
                description: None,
                conversation_id: ConversationId::new("conv_a"),
                interface_type: "chat".into(),
                enabled: true,
                action_type: hearth_core::automation::ActionType::WakeAgent,
                action_config: serde_json::json!({}),
                recurrence_rule: "FREQ=DAILY".into(),
                timezone: "UTC".into(),
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[test]
    fn disabling_automation_marks_cached_entry_disabled_without_removing_it() {
        let registry = registry();
        let created = registry.create_event(event_payload("Arrived", "conv_a")).unwrap();
        registry
            .update_enabled(created.id, &ConversationId::new("conv_a"), false)
            .unwrap();
        let snapshot = registry.listener_cache().current();
        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot.for_source(hearth_core::EventSource::Home)[0].enabled);
    }
}
