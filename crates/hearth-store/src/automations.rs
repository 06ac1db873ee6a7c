// SPDX-License-Identifier: MIT

//! Automation persistence: unified CRUD over both physical kinds, enforcing
//! name uniqueness across kinds within a conversation (§3 invariant 1, §4.6).
//! Grounded in the original service's `AutomationsRepository`, whose
//! `list_all` unions the event and schedule tables and whose
//! `check_name_available` excludes the row being updated.

use chrono::{DateTime, Utc};
use hearth_core::{Automation, AutomationId, AutomationKind, ConversationId};

use crate::error::{StoreError, StoreResult};
use crate::store::Store;
use crate::wal::WalEntry;

#[derive(Debug, Clone, Default)]
pub struct AutomationFilter {
    pub conversation_id: Option<ConversationId>,
    pub kind: Option<AutomationKind>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub page: u32,
    pub page_size: u32,
}

impl Page {
    fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.page_size as usize
    }
}

#[derive(Debug, Clone)]
pub struct AutomationStats {
    pub daily_executions: u32,
    pub last_execution_at: Option<DateTime<Utc>>,
    pub next_scheduled_at: Option<DateTime<Utc>>,
    pub execution_count: Option<u32>,
}

impl Store {
    /// Insert a new automation. Rejects a duplicate `name` within
    /// `conversation_id`, case-sensitive, across both kinds.
    pub fn create_automation(&self, automation: Automation) -> StoreResult<Automation> {
        self.with_state(|state, wal| {
            let conflict = state.automations.values().any(|existing| {
                existing.conversation_id == automation.conversation_id
                    && existing.name == automation.name
            });
            if conflict {
                return Err(StoreError::Conflict(format!(
                    "automation named {:?} already exists in this conversation",
                    automation.name
                )));
            }
            wal.append(&WalEntry::UpsertAutomation(automation.clone()))?;
            state.automations.insert(automation.id, automation.clone());
            Ok(automation)
        })
    }

    /// Cross-conversation access is reported as not-found, never
    /// unauthorized, to avoid confirming a resource's existence (§4.6).
    pub fn get_automation(
        &self,
        id: AutomationId,
        conversation_id: &ConversationId,
    ) -> StoreResult<Automation> {
        self.with_state_ref(|state| {
            state
                .automations
                .get(&id)
                .filter(|a| &a.conversation_id == conversation_id)
                .cloned()
        })
        .ok_or_else(|| StoreError::NotFound(format!("automation {id}")))
    }

    pub fn check_name_available(
        &self,
        name: &str,
        conversation_id: &ConversationId,
        exclude_id: Option<AutomationId>,
    ) -> bool {
        self.with_state_ref(|state| {
            !state.automations.values().any(|a| {
                a.conversation_id == *conversation_id
                    && a.name == name
                    && Some(a.id) != exclude_id
            })
        })
    }

    /// Newest-first, paginated, optionally filtered. Returns the page plus
    /// the total match count for pagination metadata.
    pub fn list_automations(&self, filter: &AutomationFilter, page: Page) -> (Vec<Automation>, usize) {
        self.with_state_ref(|state| {
            let mut matches: Vec<Automation> = state
                .automations
                .values()
                .filter(|a| {
                    filter
                        .conversation_id
                        .as_ref()
                        .is_none_or(|c| &a.conversation_id == c)
                        && filter.kind.is_none_or(|k| a.kind() == k)
                        && filter.enabled.is_none_or(|e| a.enabled == e)
                })
                .cloned()
                .collect();
            matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            let total = matches.len();
            let page_items = matches
                .into_iter()
                .skip(page.offset())
                .take(page.page_size as usize)
                .collect();
            (page_items, total)
        })
    }

    pub fn update_enabled(
        &self,
        id: AutomationId,
        conversation_id: &ConversationId,
        enabled: bool,
    ) -> StoreResult<Automation> {
        self.update_automation(id, conversation_id, |automation| {
            automation.enabled = enabled;
            Ok(())
        })
    }

    /// Apply `mutate` to the row in place, persisting and WAL-logging the
    /// result. The closure runs under the store lock, so two concurrent
    /// updates to the same hot counters (`daily_executions`,
    /// `execution_count`) never race.
    pub fn update_automation(
        &self,
        id: AutomationId,
        conversation_id: &ConversationId,
        mutate: impl FnOnce(&mut Automation) -> StoreResult<()>,
    ) -> StoreResult<Automation> {
        self.with_state(|state, wal| {
            let automation = state
                .automations
                .get_mut(&id)
                .filter(|a| &a.conversation_id == conversation_id)
                .ok_or_else(|| StoreError::NotFound(format!("automation {id}")))?;
            mutate(automation)?;
            let updated = automation.clone();
            wal.append(&WalEntry::UpsertAutomation(updated.clone()))?;
            Ok(updated)
        })
    }

    pub fn delete_automation(
        &self,
        id: AutomationId,
        conversation_id: &ConversationId,
    ) -> StoreResult<()> {
        self.with_state(|state, wal| {
            let exists = state
                .automations
                .get(&id)
                .is_some_and(|a| &a.conversation_id == conversation_id);
            if !exists {
                return Err(StoreError::NotFound(format!("automation {id}")));
            }
            state.automations.remove(&id);
            wal.append(&WalEntry::DeleteAutomation(id))?;
            Ok(())
        })
    }

    pub fn automation_stats(
        &self,
        id: AutomationId,
        conversation_id: &ConversationId,
    ) -> StoreResult<AutomationStats> {
        let automation = self.get_automation(id, conversation_id)?;
        Ok(match &automation.detail {
            hearth_core::AutomationDetail::Event { .. } => AutomationStats {
                daily_executions: automation.daily_executions,
                last_execution_at: automation.last_execution_at,
                next_scheduled_at: None,
                execution_count: None,
            },
            hearth_core::AutomationDetail::Schedule {
                next_scheduled_at,
                execution_count,
                ..
            } => AutomationStats {
                daily_executions: automation.daily_executions,
                last_execution_at: automation.last_execution_at,
                next_scheduled_at: Some(*next_scheduled_at),
                execution_count: Some(*execution_count),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hearth_core::SystemClock;

    use super::*;

    fn store() -> Store {
        let dir = tempfile::tempdir().unwrap();
        Store::open(dir.path(), Arc::new(SystemClock)).unwrap()
    }

    #[test]
    fn duplicate_name_within_conversation_conflicts_across_kinds() {
        let store = store();
        let conversation = ConversationId::new("conv_a");
        let event = Automation::builder()
            .name("Dinner")
            .conversation_id(conversation.clone())
            .build();
        store.create_automation(event).unwrap();

        let schedule = Automation::builder()
            .name("Dinner")
            .conversation_id(conversation.clone())
            .detail(hearth_core::AutomationDetail::Schedule {
                recurrence_rule: "FREQ=DAILY".into(),
                timezone: "UTC".into(),
                next_scheduled_at: Utc::now(),
                execution_count: 0,
            })
            .build();
        let err = store.create_automation(schedule).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn same_name_in_different_conversation_is_allowed() {
        let store = store();
        let a = Automation::builder()
            .name("Dinner")
            .conversation_id(ConversationId::new("conv_a"))
            .build();
        let b = Automation::builder()
            .name("Dinner")
            .conversation_id(ConversationId::new("conv_b"))
            .build();
        store.create_automation(a).unwrap();
        store.create_automation(b).unwrap();
    }

    #[test]
    fn cross_conversation_get_is_not_found() {
        let store = store();
        let automation = Automation::builder()
            .conversation_id(ConversationId::new("conv_a"))
            .build();
        let id = automation.id;
        store.create_automation(automation).unwrap();

        let err = store
            .get_automation(id, &ConversationId::new("conv_b"))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn list_is_newest_first_and_paginated() {
        let store = store();
        let conversation = ConversationId::new("conv_a");
        for name in ["one", "two", "three"] {
            store
                .create_automation(
                    Automation::builder()
                        .name(name)
                        .conversation_id(conversation.clone())
                        .build(),
                )
                .unwrap();
        }
        let (page, total) = store.list_automations(
            &AutomationFilter {
                conversation_id: Some(conversation),
                ..Default::default()
            },
            Page { page: 1, page_size: 2 },
        );
        assert_eq!(total, 3);
        assert_eq!(page.len(), 2);
    }
}
