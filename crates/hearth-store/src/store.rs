// SPDX-License-Identifier: MIT

//! The `Store`: the one place every mutation to automations, recent-events,
//! and worker tasks goes through. A single lock over an in-process state
//! plus WAL stands in for the "transactional key/table store" the
//! specification's core treats as an external collaborator — row-level
//! locking and compare-and-set on hot counters (§5) reduce to "the lock is
//! the row lock" here, since there is exactly one writer process.

use std::path::Path;
use std::sync::Arc;

use hearth_core::Clock;
use parking_lot::Mutex;

use crate::error::StoreResult;
use crate::state::StoreState;
use crate::wal::Wal;

/// Checkpoint after this many WAL entries, bounding replay time on restart.
const CHECKPOINT_THRESHOLD: usize = 500;

pub struct Store {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
}

struct Inner {
    state: StoreState,
    wal: Wal,
}

impl Store {
    pub fn open(dir: impl AsRef<Path>, clock: Arc<dyn Clock>) -> StoreResult<Self> {
        let (wal, state) = Wal::open(dir)?;
        Ok(Self {
            inner: Mutex::new(Inner { state, wal }),
            clock,
        })
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Run a synchronous mutation against the state + WAL under the single
    /// store lock, checkpointing opportunistically once the log grows past
    /// [`CHECKPOINT_THRESHOLD`]. `f` is expected to be cheap (in-memory) and
    /// must append its own WAL entries for any mutation it makes.
    pub(crate) fn with_state<T>(
        &self,
        f: impl FnOnce(&mut StoreState, &mut Wal) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut inner = self.inner.lock();
        let result = f(&mut inner.state, &mut inner.wal)?;
        if inner.wal.entries_since_checkpoint() >= CHECKPOINT_THRESHOLD {
            let snapshot_state = inner.state.clone();
            inner.wal.checkpoint(&snapshot_state)?;
        }
        Ok(result)
    }

    /// Read-only access; reads never need to go through retry or the WAL.
    pub(crate) fn with_state_ref<T>(&self, f: impl FnOnce(&StoreState) -> T) -> T {
        let inner = self.inner.lock();
        f(&inner.state)
    }

    /// Force an immediate checkpoint, regardless of threshold. Used by tests
    /// and graceful shutdown.
    pub fn checkpoint(&self) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        let snapshot_state = inner.state.clone();
        inner.wal.checkpoint(&snapshot_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::SystemClock;

    #[test]
    fn open_on_fresh_directory_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path(), Arc::new(SystemClock)).unwrap();
        assert_eq!(store.with_state_ref(|s| s.automations.len()), 0);
    }
}
