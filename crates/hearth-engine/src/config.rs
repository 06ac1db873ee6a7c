// SPDX-License-Identifier: MIT

//! Environment-variable knobs (§6), parsed once at startup, mirroring the
//! teacher's `oj-daemon::env` convention of one function per `OJ_*` variable
//! with a typed default rather than a single giant `envy`/`config` blob.

use std::time::Duration;

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Engine-level runtime configuration. `hearth-daemon` extends this with its
/// own transport knobs (bind address, webhook queue size) but everything the
/// engine itself reads lives here.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// §4.7 "configurable cap on simultaneously active tasks".
    pub max_concurrent_workers: u32,
    /// §4.7 cleanup: terminal rows older than this are deleted.
    pub task_retention_hours: u64,
    /// §4.7 stale marker: `submitted` rows older than this fail.
    pub submitted_timeout_hours: u64,
    /// §4.7 stale marker: `running` allowance beyond `timeout_minutes`.
    pub running_buffer_minutes: u64,
    /// §4.7 reconciler cadence.
    pub reconcile_interval_seconds: u64,
    /// §4.2 step 1 sampling window.
    pub event_sample_interval_hours: u64,
    /// §4.6 "refreshed ... periodically" cache refresh cadence.
    pub listener_cache_refresh_seconds: u64,
    /// §4.4 confirmation mediator default timeout.
    pub confirmation_timeout_seconds: u64,
    /// §5 processor worker pool size.
    pub processor_worker_count: usize,
    /// §4.7 reconciler "short grace period" before a null `job_name` is
    /// treated as a crash between insert and spawn.
    pub orphan_grace_seconds: u64,
    /// §9 open question: "retention of `recent_events` beyond the sampling
    /// window is unspecified; a separate periodic purge is recommended" —
    /// rows older than this are eligible for the purge sweep.
    pub recent_event_retention_hours: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_workers: env_u32("MAX_CONCURRENT_WORKERS", 10),
            task_retention_hours: env_u64("TASK_RETENTION_HOURS", 48),
            submitted_timeout_hours: env_u64("SUBMITTED_TIMEOUT_HOURS", 1),
            running_buffer_minutes: env_u64("RUNNING_BUFFER_MINUTES", 30),
            reconcile_interval_seconds: env_u64("RECONCILE_INTERVAL_SECONDS", 60),
            event_sample_interval_hours: env_u64("EVENT_SAMPLE_INTERVAL_HOURS", 1),
            listener_cache_refresh_seconds: env_u64("LISTENER_CACHE_REFRESH_SECONDS", 300),
            confirmation_timeout_seconds: env_u64("CONFIRMATION_TIMEOUT_SECONDS", 60),
            processor_worker_count: env_usize("PROCESSOR_WORKER_COUNT", 4),
            orphan_grace_seconds: env_u64("ORPHAN_GRACE_SECONDS", 120),
            recent_event_retention_hours: env_u64("RECENT_EVENT_RETENTION_HOURS", 168),
        }
    }
}

impl EngineConfig {
    pub fn submitted_timeout(&self) -> Duration {
        Duration::from_secs(self.submitted_timeout_hours * 3600)
    }

    pub fn running_buffer(&self) -> Duration {
        Duration::from_secs(self.running_buffer_minutes * 60)
    }

    pub fn task_retention(&self) -> Duration {
        Duration::from_secs(self.task_retention_hours * 3600)
    }

    pub fn event_sample_interval(&self) -> chrono::Duration {
        chrono::Duration::hours(self.event_sample_interval_hours as i64)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_seconds)
    }

    pub fn orphan_grace(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.orphan_grace_seconds as i64)
    }

    pub fn recent_event_retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.recent_event_retention_hours as i64)
    }
}
