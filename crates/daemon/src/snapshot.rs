// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! Persists the FMDM snapshot to `<state_dir>/fmdm-snapshot.json` on
//! every publish and replays it at boot, so folder cards survive a
//! daemon restart before their watchers re-attach.

use std::path::Path;

use fmcp_core::Fmdm;
use fmcp_engine::FmdmService;

/// Load a previously persisted snapshot, if any. A missing or corrupt
/// file is not fatal — the daemon just starts from an empty FMDM, the
/// same as a first run.
pub fn load(path: &Path) -> Option<Fmdm> {
    let bytes = std::fs::read(path).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(snapshot) => Some(snapshot),
        Err(error) => {
            tracing::warn!(%error, path = %path.display(), "ignoring unreadable FMDM snapshot");
            None
        }
    }
}

pub fn persist(path: &Path, snapshot: &Fmdm) {
    if let Some(parent) = path.parent() {
        if let Err(error) = std::fs::create_dir_all(parent) {
            tracing::warn!(%error, "failed to create snapshot directory");
            return;
        }
    }
    match serde_json::to_vec_pretty(snapshot) {
        Ok(bytes) => {
            let tmp = path.with_extension("json.tmp");
            if let Err(error) = std::fs::write(&tmp, &bytes).and_then(|_| std::fs::rename(&tmp, path)) {
                tracing::warn!(%error, path = %path.display(), "failed to persist FMDM snapshot");
            }
        }
        Err(error) => tracing::warn!(%error, "failed to serialize FMDM snapshot"),
    }
}

/// Spawn the background task that writes a fresh snapshot every time
/// `fmdm` publishes a new version, for the rest of the daemon's life.
pub fn spawn_persister(fmdm: std::sync::Arc<FmdmService>, path: std::path::PathBuf) {
    let mut rx = fmdm.subscribe();
    tokio::spawn(async move {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            persist(&path, &snapshot);
            if rx.changed().await.is_err() {
                break;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempdir().unwrap();
        assert!(load(&dir.path().join("nope.json")).is_none());
    }

    #[test]
    fn persist_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let mut snapshot = Fmdm::empty();
        snapshot.version = 3;
        persist(&path, &snapshot);
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.version, 3);
    }

    #[test]
    fn corrupt_file_loads_as_none_without_panicking() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(load(&path).is_none());
    }
}
