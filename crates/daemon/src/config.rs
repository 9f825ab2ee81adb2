// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! Filesystem layout under the state directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fmcp_core::ResourceLimits;

#[derive(Debug, Clone)]
pub struct Config {
    pub state_dir: PathBuf,
    pub lock_path: PathBuf,
    pub version_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub folders_config_path: PathBuf,
    pub socket_path: PathBuf,
    pub model_registry_path: Option<PathBuf>,
    pub resource_limits: ResourceLimits,
    pub validator_interval: Duration,
    pub windows_grace_period: Duration,
    pub memory_monitor_enabled: bool,
}

impl Config {
    pub fn new(state_dir: PathBuf) -> Self {
        Self {
            lock_path: state_dir.join("fmcpd.lock"),
            version_path: state_dir.join("VERSION"),
            snapshot_path: state_dir.join("fmdm-snapshot.json"),
            folders_config_path: state_dir.join("folders.json"),
            socket_path: state_dir.join("fmcpd.sock"),
            model_registry_path: crate::env::model_registry_path(),
            resource_limits: ResourceLimits::default(),
            validator_interval: crate::env::validator_interval(),
            windows_grace_period: crate::env::windows_grace_period(),
            memory_monitor_enabled: crate::env::memory_monitor_enabled(),
            state_dir,
        }
    }

    pub fn from_env() -> Result<Self, crate::error::DaemonError> {
        Ok(Self::new(crate::env::state_dir()?))
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}
