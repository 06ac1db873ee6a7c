// SPDX-License-Identifier: MIT

//! State directory resolution and store access. This binary talks to the
//! store directly rather than over HTTP — it has no `hearth-backends`
//! dependency, so it can inspect and edit automations and worker tasks but
//! never spawn or cancel a worker itself (that requires a `WorkerBackend`,
//! which only `hearthd` constructs). Running the CLI against a state
//! directory a live `hearthd` also has open is the caller's responsibility
//! to avoid — the store assumes exactly one writer process.

use std::path::PathBuf;
use std::sync::Arc;

use hearth_core::SystemClock;
use hearth_store::Store;

fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("HEARTH_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("hearth");
    }
    dirs_home().unwrap_or_else(|| PathBuf::from(".")).join(".local/state/hearth")
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

pub fn open_store() -> anyhow::Result<Arc<Store>> {
    let dir = state_dir();
    std::fs::create_dir_all(&dir)?;
    Ok(Arc::new(Store::open(&dir, Arc::new(SystemClock))?))
}
