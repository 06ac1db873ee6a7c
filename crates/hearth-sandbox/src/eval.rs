// SPDX-License-Identifier: MIT

//! Bounded tree-walking evaluator. Every recursive call consults a shared
//! step counter and wall-clock deadline (§4.3); exceeding either aborts
//! evaluation uniformly rather than letting a pathological script spin a
//! processor worker.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::ast::{BinaryOp, Expr, Program, Stmt, UnaryOp};
use crate::error::{SandboxError, SandboxResult};
use crate::tools::{ToolPolicy, ToolRegistry};
use crate::value::Value;

pub const DEFAULT_STEP_BUDGET: usize = 100_000;
pub const DEFAULT_DEADLINE: Duration = Duration::from_millis(100);
const MAX_RECURSION_DEPTH: usize = 64;

pub struct EvalConfig {
    pub step_budget: usize,
    pub deadline: Duration,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            step_budget: DEFAULT_STEP_BUDGET,
            deadline: DEFAULT_DEADLINE,
        }
    }
}

struct Evaluator<'a> {
    vars: HashMap<String, Value>,
    registry: &'a ToolRegistry,
    policy: &'a ToolPolicy,
    config: EvalConfig,
    steps: usize,
    deadline_at: Instant,
    depth: usize,
}

/// Run `program` with `event` bound as the variable `event` and `now` bound
/// to the injected immutable clock reading, returning the value of the
/// final statement.
pub fn eval_program(
    program: &Program,
    event: Value,
    now: Value,
    registry: &ToolRegistry,
    policy: &ToolPolicy,
    config: EvalConfig,
) -> SandboxResult<Value> {
    let mut evaluator = Evaluator {
        vars: HashMap::from([("event".to_string(), event), ("now".to_string(), now)]),
        registry,
        policy,
        deadline_at: Instant::now() + config.deadline,
        config,
        steps: 0,
        depth: 0,
    };
    let mut result = Value::Null;
    for stmt in &program.statements {
        result = evaluator.eval_stmt(stmt)?;
    }
    Ok(result)
}

/// Convenience wrapper for condition scripts: evaluates and requires the
/// final value to be a bool. Any sandbox error collapses to `false` at the
/// caller per §4.3 — this function still surfaces the error so the caller
/// can log it before discarding it.
pub fn eval_condition(
    program: &Program,
    event: Value,
    now: Value,
    registry: &ToolRegistry,
    policy: &ToolPolicy,
    config: EvalConfig,
) -> SandboxResult<bool> {
    match eval_program(program, event, now, registry, policy, config)? {
        Value::Bool(b) => Ok(b),
        other => Err(SandboxError::NotABool(other.type_name())),
    }
}

impl<'a> Evaluator<'a> {
    fn tick(&mut self) -> SandboxResult<()> {
        self.steps += 1;
        if self.steps > self.config.step_budget {
            return Err(SandboxError::StepBudgetExceeded(self.config.step_budget));
        }
        if Instant::now() >= self.deadline_at {
            return Err(SandboxError::DeadlineExceeded(self.config.deadline));
        }
        Ok(())
    }

    fn eval_stmt(&mut self, stmt: &Stmt) -> SandboxResult<Value> {
        self.tick()?;
        match stmt {
            Stmt::Let(name, expr) => {
                let value = self.eval_expr(expr)?;
                self.vars.insert(name.clone(), value);
                Ok(Value::Null)
            }
            Stmt::Expr(expr) => self.eval_expr(expr),
        }
    }

    fn eval_expr(&mut self, expr: &Expr) -> SandboxResult<Value> {
        self.tick()?;
        self.depth += 1;
        if self.depth > MAX_RECURSION_DEPTH {
            self.depth -= 1;
            return Err(SandboxError::RecursionLimitExceeded(MAX_RECURSION_DEPTH));
        }
        let result = self.eval_expr_inner(expr);
        self.depth -= 1;
        result
    }

    fn eval_expr_inner(&mut self, expr: &Expr) -> SandboxResult<Value> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Ident(name) => self
                .vars
                .get(name)
                .cloned()
                .ok_or_else(|| SandboxError::UndefinedVariable(name.clone())),
            Expr::Field(base, name) => {
                let base = self.eval_expr(base)?;
                Ok(base.get_field(name).cloned().unwrap_or(Value::Null))
            }
            Expr::Call(name, args) => {
                let values = args
                    .iter()
                    .map(|a| self.eval_expr(a))
                    .collect::<SandboxResult<Vec<_>>>()?;
                self.registry.call(self.policy, name, &values)
            }
            Expr::Unary(op, inner) => {
                let value = self.eval_expr(inner)?;
                match (op, &value) {
                    (UnaryOp::Not, _) => Ok(Value::Bool(!value.is_truthy())),
                    (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
                    (UnaryOp::Neg, other) => {
                        Err(SandboxError::Type(format!("cannot negate {}", other.type_name())))
                    }
                }
            }
            Expr::Binary(op, lhs, rhs) => self.eval_binary(*op, lhs, rhs),
            Expr::If(cond, then_branch, else_branch) => {
                if self.eval_expr(cond)?.is_truthy() {
                    self.eval_expr(then_branch)
                } else {
                    self.eval_expr(else_branch)
                }
            }
        }
    }

    fn eval_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> SandboxResult<Value> {
        // Short-circuit logical operators without evaluating the other side.
        if op == BinaryOp::And {
            return Ok(Value::Bool(
                self.eval_expr(lhs)?.is_truthy() && self.eval_expr(rhs)?.is_truthy(),
            ));
        }
        if op == BinaryOp::Or {
            return Ok(Value::Bool(
                self.eval_expr(lhs)?.is_truthy() || self.eval_expr(rhs)?.is_truthy(),
            ));
        }

        let lhs = self.eval_expr(lhs)?;
        let rhs = self.eval_expr(rhs)?;
        match op {
            BinaryOp::Eq => Ok(Value::Bool(values_equal(&lhs, &rhs))),
            BinaryOp::NotEq => Ok(Value::Bool(!values_equal(&lhs, &rhs))),
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                let (a, b) = (as_number(&lhs)?, as_number(&rhs)?);
                Ok(Value::Bool(match op {
                    BinaryOp::Lt => a < b,
                    BinaryOp::LtEq => a <= b,
                    BinaryOp::Gt => a > b,
                    BinaryOp::GtEq => a >= b,
                    _ => unreachable!(),
                }))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                let (a, b) = (as_number(&lhs)?, as_number(&rhs)?);
                Ok(Value::Number(match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    _ => unreachable!(),
                }))
            }
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }
}

/// Booleans and numbers compare by value, not by their string forms (§4.2).
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Null, Value::Null) => true,
        _ => a == b,
    }
}

fn as_number(value: &Value) -> SandboxResult<f64> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(SandboxError::Type(format!(
            "expected number, found {}",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn run(src: &str, event: Value) -> SandboxResult<Value> {
        let program = Parser::parse(src).unwrap();
        let registry = ToolRegistry::new();
        eval_program(
            &program,
            event,
            Value::Number(0.0),
            &registry,
            &ToolPolicy::DenyAll,
            EvalConfig::default(),
        )
    }

    #[test]
    fn dotted_path_equality_matches_nested_field() {
        let event = Value::from_json(&serde_json::json!({"new_state": {"state": "Home"}}));
        let result = run(r#"event.new_state.state == "Home""#, event).unwrap();
        assert_eq!(result, Value::Bool(true));
    }

    #[test]
    fn numeric_comparison_is_by_value_not_string() {
        let event = Value::from_json(&serde_json::json!({"count": 10}));
        let result = run("event.count > 9", event).unwrap();
        assert_eq!(result, Value::Bool(true));
    }

    #[test]
    fn missing_field_access_yields_null_not_error() {
        let event = Value::from_json(&serde_json::json!({"a": 1}));
        let result = run("event.missing == null", event).unwrap();
        assert_eq!(result, Value::Bool(true));
    }

    #[test]
    fn step_budget_is_enforced() {
        let program = Parser::parse("1 + 1").unwrap();
        let registry = ToolRegistry::new();
        let err = eval_program(
            &program,
            Value::Null,
            Value::Null,
            &registry,
            &ToolPolicy::DenyAll,
            EvalConfig {
                step_budget: 0,
                deadline: DEFAULT_DEADLINE,
            },
        )
        .unwrap_err();
        assert!(matches!(err, SandboxError::StepBudgetExceeded(_)));
    }

    #[test]
    fn deadline_is_enforced() {
        let program = Parser::parse("1 + 1").unwrap();
        let registry = ToolRegistry::new();
        let err = eval_program(
            &program,
            Value::Null,
            Value::Null,
            &registry,
            &ToolPolicy::DenyAll,
            EvalConfig {
                step_budget: DEFAULT_STEP_BUDGET,
                deadline: Duration::from_nanos(1),
            },
        );
        // Either the deadline check or the step budget check may fire
        // first depending on timing; both are uniform sandbox errors.
        assert!(err.is_err());
    }

    #[test]
    fn non_bool_condition_is_rejected() {
        let program = Parser::parse("1 + 1").unwrap();
        let registry = ToolRegistry::new();
        let err = eval_condition(
            &program,
            Value::Null,
            Value::Null,
            &registry,
            &ToolPolicy::DenyAll,
            EvalConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SandboxError::NotABool(_)));
    }
}
