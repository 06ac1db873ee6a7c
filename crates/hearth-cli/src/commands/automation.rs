// SPDX-License-Identifier: MIT

//! `hearth automation` - direct CRUD over the automation registry (§4.6).

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use hearth_core::automation::{ActionType, EventSource};
use hearth_core::{Automation, AutomationId, ConversationId};
use hearth_engine::registry::{CreateEventAutomation, CreateScheduleAutomation, UpdateAutomation};
use hearth_engine::AutomationRegistry;
use hearth_store::{AutomationFilter, Page};

use crate::output::{emit, OutputFormat};

#[derive(Args)]
pub struct AutomationArgs {
    #[command(subcommand)]
    pub command: AutomationCommand,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    Event,
    Schedule,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ActionTypeArg {
    WakeAgent,
    Script,
}

impl From<ActionTypeArg> for ActionType {
    fn from(v: ActionTypeArg) -> Self {
        match v {
            ActionTypeArg::WakeAgent => ActionType::WakeAgent,
            ActionTypeArg::Script => ActionType::Script,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum EventSourceArg {
    Home,
    Webhook,
    Indexing,
}

impl From<EventSourceArg> for EventSource {
    fn from(v: EventSourceArg) -> Self {
        match v {
            EventSourceArg::Home => EventSource::Home,
            EventSourceArg::Webhook => EventSource::Webhook,
            EventSourceArg::Indexing => EventSource::Indexing,
        }
    }
}

#[derive(Subcommand)]
pub enum AutomationCommand {
    /// Create an event-triggered automation
    CreateEvent {
        #[arg(long)]
        conversation: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "interface-type", default_value = "chat")]
        interface_type: String,
        #[arg(long, value_enum)]
        source: EventSourceArg,
        /// Dotted-path match condition, repeatable (--match new_state.state=Home)
        #[arg(long = "match", value_parser = parse_key_value, required = true)]
        conditions: Vec<(String, serde_json::Value)>,
        #[arg(long = "condition-script")]
        condition_script: Option<String>,
        #[arg(long, value_enum, default_value = "wake-agent")]
        action_type: ActionTypeArg,
        /// Action config entry, repeatable (--action-config key=value)
        #[arg(long = "action-config", value_parser = parse_key_value)]
        action_config: Vec<(String, serde_json::Value)>,
        #[arg(long)]
        one_time: bool,
        #[arg(long)]
        disabled: bool,
    },
    /// Create a schedule-triggered automation
    CreateSchedule {
        #[arg(long)]
        conversation: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "interface-type", default_value = "chat")]
        interface_type: String,
        /// RFC 5545-style recurrence rule, e.g. "FREQ=DAILY;BYHOUR=7"
        #[arg(long = "recurrence-rule")]
        recurrence_rule: String,
        /// IANA timezone, e.g. "America/Los_Angeles". Required; there is no
        /// implicit server-local fallback (SPEC_FULL.md §9).
        #[arg(long)]
        timezone: String,
        #[arg(long, value_enum, default_value = "wake-agent")]
        action_type: ActionTypeArg,
        #[arg(long = "action-config", value_parser = parse_key_value)]
        action_config: Vec<(String, serde_json::Value)>,
        #[arg(long)]
        disabled: bool,
    },
    /// List automations in a conversation
    List {
        #[arg(long)]
        conversation: String,
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
        #[arg(long = "enabled-only")]
        enabled_only: bool,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long = "page-size", default_value_t = 50)]
        page_size: u32,
    },
    /// Show one automation
    Get {
        #[arg(long)]
        conversation: String,
        id: String,
    },
    /// Show execution stats for one automation
    Stats {
        #[arg(long)]
        conversation: String,
        id: String,
    },
    /// Enable an automation
    Enable {
        #[arg(long)]
        conversation: String,
        id: String,
    },
    /// Disable an automation
    Disable {
        #[arg(long)]
        conversation: String,
        id: String,
    },
    /// Patch fields of an existing automation
    Update {
        #[arg(long)]
        conversation: String,
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "action-config", value_parser = parse_key_value)]
        action_config: Vec<(String, serde_json::Value)>,
        #[arg(long = "match", value_parser = parse_key_value)]
        conditions: Vec<(String, serde_json::Value)>,
        #[arg(long = "condition-script")]
        condition_script: Option<String>,
        #[arg(long = "recurrence-rule")]
        recurrence_rule: Option<String>,
    },
    /// Delete an automation
    Delete {
        #[arg(long)]
        conversation: String,
        id: String,
    },
}

pub fn run(registry: &AutomationRegistry, args: AutomationArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        AutomationCommand::CreateEvent {
            conversation,
            name,
            description,
            interface_type,
            source,
            conditions,
            condition_script,
            action_type,
            action_config,
            one_time,
            disabled,
        } => {
            let created = registry.create_event(CreateEventAutomation {
                name,
                description,
                conversation_id: ConversationId::new(conversation),
                interface_type,
                enabled: !disabled,
                action_type: action_type.into(),
                action_config: to_json_object(action_config),
                source_id: source.into(),
                match_conditions: to_map(conditions),
                condition_script,
                one_time,
            })?;
            print_automation(format, &created)
        }
        AutomationCommand::CreateSchedule {
            conversation,
            name,
            description,
            interface_type,
            recurrence_rule,
            timezone,
            action_type,
            action_config,
            disabled,
        } => {
            let created = registry.create_schedule(CreateScheduleAutomation {
                name,
                description,
                conversation_id: ConversationId::new(conversation),
                interface_type,
                enabled: !disabled,
                action_type: action_type.into(),
                action_config: to_json_object(action_config),
                recurrence_rule,
                timezone,
            })?;
            print_automation(format, &created)
        }
        AutomationCommand::List { conversation, kind, enabled_only, page, page_size } => {
            let filter = AutomationFilter {
                conversation_id: Some(ConversationId::new(conversation)),
                kind: kind.map(|k| match k {
                    KindArg::Event => hearth_core::AutomationKind::Event,
                    KindArg::Schedule => hearth_core::AutomationKind::Schedule,
                }),
                enabled: enabled_only.then_some(true),
            };
            let (rows, total) = registry.list(&filter, Page { page, page_size });
            emit(format, &serde_json::json!({ "total": total, "automations": &rows }), |_| {
                if rows.is_empty() {
                    println!("No automations found.");
                    return;
                }
                for row in &rows {
                    print_automation_line(row);
                }
                println!("\n{} of {} total", rows.len(), total);
            })
        }
        AutomationCommand::Get { conversation, id } => {
            let automation = registry.get(parse_id(&id)?, &ConversationId::new(conversation))?;
            print_automation(format, &automation)
        }
        AutomationCommand::Stats { conversation, id } => {
            let stats = registry.stats(parse_id(&id)?, &ConversationId::new(conversation))?;
            emit(format, &serde_json::json!({
                "daily_executions": stats.daily_executions,
                "last_execution_at": stats.last_execution_at,
                "next_scheduled_at": stats.next_scheduled_at,
                "execution_count": stats.execution_count,
            }), |value| {
                println!("daily executions: {}", value["daily_executions"]);
                if let Some(at) = value["last_execution_at"].as_str() {
                    println!("last execution:   {at}");
                }
                if let Some(at) = value["next_scheduled_at"].as_str() {
                    println!("next scheduled:   {at}");
                }
                if let Some(count) = value["execution_count"].as_u64() {
                    println!("execution count:  {count}");
                }
            })
        }
        AutomationCommand::Enable { conversation, id } => {
            let updated = registry.update_enabled(parse_id(&id)?, &ConversationId::new(conversation), true)?;
            print_automation(format, &updated)
        }
        AutomationCommand::Disable { conversation, id } => {
            let updated = registry.update_enabled(parse_id(&id)?, &ConversationId::new(conversation), false)?;
            print_automation(format, &updated)
        }
        AutomationCommand::Update {
            conversation,
            id,
            name,
            description,
            action_config,
            conditions,
            condition_script,
            recurrence_rule,
        } => {
            let patch = UpdateAutomation {
                name,
                description: description.map(Some),
                enabled: None,
                action_config: (!action_config.is_empty()).then(|| to_json_object(action_config)),
                match_conditions: (!conditions.is_empty()).then(|| to_map(conditions)),
                condition_script: condition_script.map(Some),
                recurrence_rule,
            };
            let updated = registry.update(parse_id(&id)?, &ConversationId::new(conversation), patch)?;
            print_automation(format, &updated)
        }
        AutomationCommand::Delete { conversation, id } => {
            registry.delete(parse_id(&id)?, &ConversationId::new(conversation))?;
            emit(format, &serde_json::json!({ "deleted": &id }), |_| println!("deleted {id}"))
        }
    }
}

fn parse_id(raw: &str) -> Result<AutomationId> {
    Ok(AutomationId::from_string(raw))
}

fn to_map(pairs: Vec<(String, serde_json::Value)>) -> serde_json::Map<String, serde_json::Value> {
    pairs.into_iter().collect()
}

fn to_json_object(pairs: Vec<(String, serde_json::Value)>) -> serde_json::Value {
    serde_json::Value::Object(to_map(pairs))
}

fn print_automation(format: OutputFormat, automation: &Automation) -> Result<()> {
    emit(format, automation, |a| print_automation_line(a))
}

fn print_automation_line(automation: &Automation) {
    println!(
        "{}  {:<8}  {:<20}  {}",
        automation.id,
        automation.kind(),
        automation.name,
        if automation.enabled { "enabled" } else { "disabled" },
    );
}

/// Parse a `key=value` CLI argument into `(key, json value)`, attempting a
/// JSON parse of the value first (so `--match count=3` yields a number) and
/// falling back to a plain string.
fn parse_key_value(s: &str) -> Result<(String, serde_json::Value), String> {
    let pos = s.find('=').ok_or_else(|| format!("invalid input {s:?}: expected key=value"))?;
    let (key, value) = (s[..pos].to_string(), &s[pos + 1..]);
    let parsed = serde_json::from_str(value).unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key, parsed))
}
