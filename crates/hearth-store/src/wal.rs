// SPDX-License-Identifier: MIT

//! Durability for the in-process store: a write-ahead log of individual
//! mutations, periodically checkpointed into a zstd-compressed snapshot so
//! the log doesn't grow without bound and startup replay stays fast.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use hearth_core::{Automation, AutomationId, WorkerTask, WorkerTaskId};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::state::{RecentEvent, StateSnapshot, StoreState};

const SNAPSHOT_FILE: &str = "snapshot.zst";
const WAL_FILE: &str = "wal.jsonl";
const SNAPSHOT_COMPRESSION_LEVEL: i32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WalEntry {
    UpsertAutomation(Automation),
    DeleteAutomation(AutomationId),
    UpsertRecentEvent(RecentEvent),
    PurgeRecentEventsOlderThan(chrono::DateTime<chrono::Utc>),
    UpsertWorkerTask(WorkerTask),
    DeleteWorkerTask(WorkerTaskId),
}

impl WalEntry {
    fn apply(self, state: &mut StoreState) {
        match self {
            Self::UpsertAutomation(automation) => {
                state.automations.insert(automation.id, automation);
            }
            Self::DeleteAutomation(id) => {
                state.automations.remove(&id);
            }
            Self::UpsertRecentEvent(event) => {
                state
                    .recent_events
                    .insert((event.source_id, event.entity_key.clone()), event);
            }
            Self::PurgeRecentEventsOlderThan(cutoff) => {
                state.recent_events.retain(|_, row| row.window_start >= cutoff);
            }
            Self::UpsertWorkerTask(task) => {
                state.worker_tasks.insert(task.task_id, task);
            }
            Self::DeleteWorkerTask(id) => {
                state.worker_tasks.remove(&id);
            }
        }
    }
}

/// Append-only log plus checkpoint snapshot, rooted at a directory.
pub struct Wal {
    dir: PathBuf,
    file: File,
    entries_since_checkpoint: usize,
}

impl Wal {
    /// Open (creating if absent) the WAL directory, replaying any existing
    /// snapshot and log into a fresh [`StoreState`].
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<(Self, StoreState)> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let mut state = Self::load_snapshot(&dir)?;
        let wal_path = dir.join(WAL_FILE);
        let mut entries_since_checkpoint = 0;

        if wal_path.exists() {
            let file = File::open(&wal_path)?;
            for line in BufReader::new(file).lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let entry: WalEntry = serde_json::from_str(&line)?;
                entry.apply(&mut state);
                entries_since_checkpoint += 1;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&wal_path)?;

        Ok((
            Self {
                dir,
                file,
                entries_since_checkpoint,
            },
            state,
        ))
    }

    fn load_snapshot(dir: &Path) -> StoreResult<StoreState> {
        let path = dir.join(SNAPSHOT_FILE);
        if !path.exists() {
            return Ok(StoreState::new());
        }
        let compressed = std::fs::read(&path)?;
        let raw = zstd::decode_all(compressed.as_slice())
            .map_err(|err| StoreError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err)))?;
        let snapshot: StateSnapshot = serde_json::from_slice(&raw)?;
        Ok(snapshot.into())
    }

    /// Append a mutation to the log and flush. Each call is one fsync-worthy
    /// write; callers batch only at the level of one store operation.
    pub fn append(&mut self, entry: &WalEntry) -> StoreResult<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.file.flush()?;
        self.entries_since_checkpoint += 1;
        Ok(())
    }

    pub fn entries_since_checkpoint(&self) -> usize {
        self.entries_since_checkpoint
    }

    /// Write a fresh snapshot of `state` and truncate the log. Idempotent:
    /// if the process dies mid-checkpoint, the old snapshot plus the
    /// (not-yet-truncated) log still replays correctly on next open.
    pub fn checkpoint(&mut self, state: &StoreState) -> StoreResult<()> {
        let snapshot = StateSnapshot::from(state);
        let raw = serde_json::to_vec(&snapshot)?;
        let compressed = zstd::encode_all(raw.as_slice(), SNAPSHOT_COMPRESSION_LEVEL)
            .map_err(|err| StoreError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err)))?;

        let tmp_path = self.dir.join(format!("{SNAPSHOT_FILE}.tmp"));
        std::fs::write(&tmp_path, &compressed)?;
        std::fs::rename(&tmp_path, self.dir.join(SNAPSHOT_FILE))?;

        self.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.dir.join(WAL_FILE))?;
        self.entries_since_checkpoint = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::EventSource;

    #[test]
    fn replays_appended_entries_on_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let (mut wal, state) = Wal::open(dir.path()).unwrap();
        assert!(state.automations.is_empty());

        let automation = Automation::builder().build();
        wal.append(&WalEntry::UpsertAutomation(automation.clone())).unwrap();
        drop(wal);

        let (_wal, state) = Wal::open(dir.path()).unwrap();
        assert_eq!(state.automations.len(), 1);
        assert!(state.automations.contains_key(&automation.id));
    }

    #[test]
    fn checkpoint_truncates_log_but_preserves_state() {
        let dir = tempfile::tempdir().unwrap();
        let (mut wal, mut state) = Wal::open(dir.path()).unwrap();

        let automation = Automation::builder().build();
        state.automations.insert(automation.id, automation.clone());
        wal.append(&WalEntry::UpsertAutomation(automation.clone())).unwrap();
        wal.checkpoint(&state).unwrap();
        assert_eq!(wal.entries_since_checkpoint(), 0);

        let (_wal, reloaded) = Wal::open(dir.path()).unwrap();
        assert_eq!(reloaded.automations.len(), 1);
    }

    #[test]
    fn recent_event_round_trips_through_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let (mut wal, mut state) = Wal::open(dir.path()).unwrap();
        let event = RecentEvent {
            source_id: EventSource::Home,
            entity_key: "person.alex".into(),
            window_start: chrono::Utc::now(),
            event_snapshot: serde_json::json!({"state": "Home"}),
        };
        state
            .recent_events
            .insert((event.source_id, event.entity_key.clone()), event.clone());
        wal.checkpoint(&state).unwrap();

        let (_wal, reloaded) = Wal::open(dir.path()).unwrap();
        assert!(reloaded
            .recent_events
            .contains_key(&(EventSource::Home, "person.alex".to_string())));
    }
}
