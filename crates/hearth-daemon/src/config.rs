// SPDX-License-Identifier: MIT

//! Daemon-level environment knobs: transport, state directory, and backend
//! selection. Mirrors `hearth_engine::EngineConfig`'s one-function-per-knob
//! convention and the teacher's `oj-daemon::env` centralization — every
//! `HEARTH_*` variable is read in exactly one place.

use std::path::PathBuf;

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string())
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Which `WorkerBackend` the orchestrator talks to (§4.7 "backend
/// selection is a startup config knob").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Local,
    Kubernetes,
}

impl BackendKind {
    fn from_env() -> Self {
        match std::env::var("HEARTH_WORKER_BACKEND").as_deref() {
            Ok("kubernetes") | Ok("k8s") => Self::Kubernetes,
            _ => Self::Local,
        }
    }
}

/// State directory resolution: `HEARTH_STATE_DIR` > `XDG_STATE_HOME/hearth`
/// > `~/.local/state/hearth`, matching the teacher's `oj-daemon::env::state_dir`
/// precedence order.
fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("HEARTH_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("hearth");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".local/state/hearth")
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub bind_addr: String,
    pub state_dir: PathBuf,
    pub backend: BackendKind,
    /// Base URL this daemon is reachable at, embedded in worker callback
    /// URLs (§4.7 spawn step 3).
    pub callback_base_url: String,
    /// §6 `WEBHOOK_QUEUE_SIZE`.
    pub webhook_queue_size: usize,
    /// Per-source shared secrets for webhook signature verification (§4.1
    /// "if a per-source shared secret is configured"), keyed by the
    /// `source` query/header/body value. Loaded from `HEARTH_WEBHOOK_SECRET_<SOURCE>`
    /// environment variables at startup.
    pub webhook_secrets: std::collections::HashMap<String, String>,
    pub fanin_queue_size: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind_addr: env_string("HEARTH_BIND_ADDR", "0.0.0.0:8787"),
            state_dir: state_dir(),
            backend: BackendKind::from_env(),
            callback_base_url: env_string("HEARTH_CALLBACK_BASE_URL", "http://localhost:8787"),
            webhook_queue_size: env_usize("WEBHOOK_QUEUE_SIZE", 1000),
            webhook_secrets: webhook_secrets_from_env(),
            fanin_queue_size: env_usize("HEARTH_FANIN_QUEUE_SIZE", 1000),
        }
    }
}

/// Scan the environment for `HEARTH_WEBHOOK_SECRET_<SOURCE>` variables.
/// There is no fixed list of sources to scan — webhook sources are
/// caller-named strings — so this walks `std::env::vars()` once at startup
/// rather than probing a known set of keys.
fn webhook_secrets_from_env() -> std::collections::HashMap<String, String> {
    const PREFIX: &str = "HEARTH_WEBHOOK_SECRET_";
    std::env::vars()
        .filter_map(|(key, value)| {
            key.strip_prefix(PREFIX).map(|source| (source.to_ascii_lowercase(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_kind_defaults_to_local() {
        std::env::remove_var("HEARTH_WORKER_BACKEND");
        assert_eq!(BackendKind::from_env(), BackendKind::Local);
    }
}
