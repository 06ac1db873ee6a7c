// SPDX-License-Identifier: MIT

//! hearth-sandbox: the restricted expression/statement language condition
//! scripts and script-actions run in (§4.3). No file, socket, or process
//! I/O is reachable from script code; the only ambient input is an
//! injected, immutable `now` and the triggering `event`.

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

pub mod ast;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod tools;
pub mod value;

use std::time::Duration;

use chrono::{DateTime, Utc};

pub use error::{SandboxError, SandboxResult};
pub use eval::{EvalConfig, DEFAULT_DEADLINE, DEFAULT_STEP_BUDGET};
pub use tools::{ToolFunction, ToolPolicy, ToolRegistry};
pub use value::Value;

use ast::Program;

/// A parsed, ready-to-run script. Parsing happens once at registration time
/// (or lazily on first use); evaluation happens per-event.
pub struct Script {
    program: Program,
}

impl Script {
    pub fn parse(source: &str) -> SandboxResult<Self> {
        Ok(Self {
            program: parser::Parser::parse(source)?,
        })
    }

    /// Evaluate as a condition script: must return a bool.
    pub fn eval_condition(
        &self,
        event: &serde_json::Value,
        now: DateTime<Utc>,
        registry: &ToolRegistry,
        policy: &ToolPolicy,
    ) -> SandboxResult<bool> {
        eval::eval_condition(
            &self.program,
            Value::from_json(event),
            now_value(now),
            registry,
            policy,
            EvalConfig::default(),
        )
    }

    /// Evaluate as an action script: any value is accepted, attachments are
    /// carried through to the caller, everything else is ignored.
    pub fn eval_action(
        &self,
        event: &serde_json::Value,
        now: DateTime<Utc>,
        registry: &ToolRegistry,
        policy: &ToolPolicy,
    ) -> SandboxResult<Value> {
        eval::eval_program(
            &self.program,
            Value::from_json(event),
            now_value(now),
            registry,
            policy,
            EvalConfig::default(),
        )
    }
}

fn now_value(now: DateTime<Utc>) -> Value {
    Value::Number(now.timestamp_millis() as f64)
}

/// Evaluate `source` as a condition script in one shot, without keeping a
/// parsed [`Script`] around. Used by the processor when conditions aren't
/// cached.
pub fn evaluate_condition(
    source: &str,
    event: &serde_json::Value,
    now: DateTime<Utc>,
    registry: &ToolRegistry,
    policy: &ToolPolicy,
) -> SandboxResult<bool> {
    Script::parse(source)?.eval_condition(event, now, registry, policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_condition_script_matches_event() {
        let script = Script::parse(r#"event.entity_id == "person.alex" && event.new_state.state == "Home""#).unwrap();
        let event = serde_json::json!({"entity_id": "person.alex", "new_state": {"state": "Home"}});
        let registry = ToolRegistry::new();
        let matched = script
            .eval_condition(&event, Utc::now(), &registry, &ToolPolicy::DenyAll)
            .unwrap();
        assert!(matched);
    }

    #[test]
    fn sandbox_timeout_is_a_distinct_error_not_a_panic() {
        let script = Script::parse("1 + 1").unwrap();
        let registry = ToolRegistry::new();
        let result = eval::eval_program(
            &script.program,
            Value::Null,
            Value::Null,
            &registry,
            &ToolPolicy::DenyAll,
            EvalConfig {
                step_budget: 0,
                deadline: Duration::from_millis(100),
            },
        );
        assert!(result.is_err());
    }
}
