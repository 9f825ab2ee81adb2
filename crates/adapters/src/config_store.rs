// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! The "Configuration collaborator" named in spec.md §6: persists the
//! set of monitored `(path, model)` pairs across daemon restarts.

use crate::error::AdapterError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A persisted folder entry: just enough to rehydrate `addFolder` at
/// startup. Everything else (status, progress, tasks) is runtime state
/// owned by the lifecycle manager and FMDM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfiguredFolder {
    pub path: PathBuf,
    pub model: String,
}

/// Recognized calls: `addFolder`, `removeFolder`, `getFolders`,
/// `getFolder` (spec.md §6). "Already exists" / "not found" are not
/// fatal — callers decide what to do with them.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn add_folder(&self, path: &Path, model: &str) -> Result<(), AdapterError>;
    async fn remove_folder(&self, path: &Path) -> Result<(), AdapterError>;
    async fn get_folders(&self) -> Result<Vec<ConfiguredFolder>, AdapterError>;
    async fn get_folder(&self, path: &Path) -> Result<Option<ConfiguredFolder>, AdapterError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    folders: HashMap<PathBuf, String>,
}

/// Default [`ConfigStore`] backed by a single JSON file.
pub struct FileConfigStore {
    path: PathBuf,
    state: parking_lot::Mutex<ConfigFile>,
}

impl FileConfigStore {
    pub fn open(path: PathBuf) -> Result<Self, AdapterError> {
        let state = if path.exists() {
            serde_json::from_slice(&std::fs::read(&path)?)?
        } else {
            ConfigFile::default()
        };
        Ok(Self { path, state: parking_lot::Mutex::new(state) })
    }

    fn persist(&self) -> Result<(), AdapterError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(&*self.state.lock())?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn add_folder(&self, path: &Path, model: &str) -> Result<(), AdapterError> {
        self.state.lock().folders.insert(path.to_path_buf(), model.to_string());
        self.persist()
    }

    async fn remove_folder(&self, path: &Path) -> Result<(), AdapterError> {
        self.state.lock().folders.remove(path);
        self.persist()
    }

    async fn get_folders(&self) -> Result<Vec<ConfiguredFolder>, AdapterError> {
        Ok(self
            .state
            .lock()
            .folders
            .iter()
            .map(|(path, model)| ConfiguredFolder { path: path.clone(), model: model.clone() })
            .collect())
    }

    async fn get_folder(&self, path: &Path) -> Result<Option<ConfiguredFolder>, AdapterError> {
        Ok(self
            .state
            .lock()
            .folders
            .get(path)
            .map(|model| ConfiguredFolder { path: path.to_path_buf(), model: model.clone() }))
    }
}
