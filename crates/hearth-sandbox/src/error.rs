// SPDX-License-Identifier: MIT

//! Every failure mode in the sandbox collapses to a single uniform "script
//! error" at the caller's boundary (§4.3) — condition scripts then evaluate
//! to `false`. The variants below exist for logging, not for callers to
//! branch on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("lex error at byte {pos}: {message}")]
    Lex { pos: usize, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("undefined variable: {0}")]
    UndefinedVariable(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("tool {0} is not permitted for this automation")]
    ToolNotPermitted(String),

    #[error("unknown tool function: {0}")]
    UnknownTool(String),

    #[error("tool call failed: {0}")]
    ToolFailed(String),

    #[error("exceeded step budget of {0} evaluation steps")]
    StepBudgetExceeded(usize),

    #[error("exceeded recursion depth of {0}")]
    RecursionLimitExceeded(usize),

    #[error("exceeded wall-clock deadline of {0:?}")]
    DeadlineExceeded(std::time::Duration),

    #[error("condition script returned {0}, expected bool")]
    NotABool(&'static str),
}

pub type SandboxResult<T> = Result<T, SandboxError>;
