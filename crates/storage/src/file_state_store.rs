// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! Per-folder file-state store (C2): persists the fingerprint and
//! indexed state of every file the lifecycle manager has seen.

use crate::error::StorageError;
use crate::fingerprint::FileFingerprint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const MAX_BAK_FILES: u32 = 3;

/// Rotate `<path>.bak`, `<path>.bak.2`, `<path>.bak.3`, dropping the oldest.
fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }
    bak(1)
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(default)]
    fingerprints: HashMap<PathBuf, FileFingerprint>,
}

/// Trait boundary for the per-folder file-state store.
///
/// Owned exclusively by one folder's lifecycle manager (spec.md §3); no
/// other task may mutate it.
pub trait FileStateStore: Send {
    fn get(&self, relative_path: &Path) -> Option<&FileFingerprint>;
    fn all(&self) -> Box<dyn Iterator<Item = &FileFingerprint> + '_>;
    fn upsert(&mut self, fingerprint: FileFingerprint);
    fn remove(&mut self, relative_path: &Path) -> Option<FileFingerprint>;
    /// Persist the in-memory state to disk. A no-op for stores that don't
    /// need durability (e.g. tests).
    fn flush(&mut self) -> Result<(), StorageError>;
}

/// Default [`FileStateStore`] backed by a JSON file at
/// `<folder>/.folder-mcp/file_state.json`.
pub struct JsonFileStateStore {
    path: PathBuf,
    state: StateFile,
    dirty: bool,
}

impl JsonFileStateStore {
    /// Open (creating if absent) the file-state store for a folder's
    /// `.folder-mcp` directory.
    pub fn open(folder_mcp_dir: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(folder_mcp_dir)?;
        let path = folder_mcp_dir.join("file_state.json");
        let state = if path.exists() {
            let bytes = fs::read(&path)?;
            serde_json::from_slice(&bytes).unwrap_or_default()
        } else {
            StateFile::default()
        };
        Ok(Self { path, state, dirty: false })
    }

    pub fn len(&self) -> usize {
        self.state.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.fingerprints.is_empty()
    }
}

impl FileStateStore for JsonFileStateStore {
    fn get(&self, relative_path: &Path) -> Option<&FileFingerprint> {
        self.state.fingerprints.get(relative_path)
    }

    fn all(&self) -> Box<dyn Iterator<Item = &FileFingerprint> + '_> {
        Box::new(self.state.fingerprints.values())
    }

    fn upsert(&mut self, fingerprint: FileFingerprint) {
        self.state.fingerprints.insert(fingerprint.relative_path.clone(), fingerprint);
        self.dirty = true;
    }

    fn remove(&mut self, relative_path: &Path) -> Option<FileFingerprint> {
        let removed = self.state.fingerprints.remove(relative_path);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        if !self.dirty {
            return Ok(());
        }
        if self.path.exists() {
            let _ = fs::copy(&self.path, rotate_bak_path(&self.path));
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&self.state)?)?;
        fs::rename(&tmp, &self.path)?;
        self.dirty = false;
        Ok(())
    }
}
