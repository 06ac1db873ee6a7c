// SPDX-License-Identifier: MIT

//! The curated set of host-provided callables a script may invoke, each the
//! host's own capability-checked wrapper (§4.3). A deny-all policy disables
//! every tool function; an allow-set further restricts a specific
//! automation to a subset of an otherwise-permitted host.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{SandboxError, SandboxResult};
use crate::value::Value;

/// A single host-provided callable. Implementations must not perform file,
/// socket, or process I/O directly from sandbox-reachable code — anything
/// resembling that belongs behind a capability-checked host boundary the
/// tool function merely forwards to.
pub trait ToolFunction: Send + Sync {
    fn name(&self) -> &str;
    fn call(&self, args: &[Value]) -> SandboxResult<Value>;
}

/// Which tool functions an evaluation is permitted to call.
#[derive(Debug, Clone)]
pub enum ToolPolicy {
    /// No tool functions may be called at all.
    DenyAll,
    /// Only the named tools may be called; calling anything else is a
    /// `ToolNotPermitted` error even if the host registry defines it.
    AllowSet(HashSet<String>),
}

impl ToolPolicy {
    pub fn allows(&self, name: &str) -> bool {
        match self {
            Self::DenyAll => false,
            Self::AllowSet(set) => set.contains(name),
        }
    }
}

/// The full set of callables the host exposes, independent of any one
/// automation's policy. `ToolRegistry` is process-wide; `ToolPolicy` is
/// per-evaluation.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: std::collections::HashMap<String, Arc<dyn ToolFunction>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn ToolFunction>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn call(&self, policy: &ToolPolicy, name: &str, args: &[Value]) -> SandboxResult<Value> {
        if !policy.allows(name) {
            return Err(SandboxError::ToolNotPermitted(name.to_string()));
        }
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| SandboxError::UnknownTool(name.to_string()))?;
        tool.call(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;
    impl ToolFunction for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn call(&self, args: &[Value]) -> SandboxResult<Value> {
            Ok(args.first().cloned().unwrap_or(Value::Null))
        }
    }

    #[test]
    fn deny_all_rejects_every_call() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo));
        let err = registry.call(&ToolPolicy::DenyAll, "echo", &[]).unwrap_err();
        assert!(matches!(err, SandboxError::ToolNotPermitted(_)));
    }

    #[test]
    fn allow_set_permits_only_named_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo));
        let policy = ToolPolicy::AllowSet(["echo".to_string()].into_iter().collect());
        let result = registry.call(&policy, "echo", &[Value::Number(1.0)]).unwrap();
        assert_eq!(result, Value::Number(1.0));

        let err = registry.call(&policy, "not_registered", &[]).unwrap_err();
        assert!(matches!(err, SandboxError::ToolNotPermitted(_)));
    }
}
