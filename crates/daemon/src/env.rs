// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::DaemonError;

/// Resolve the state directory: `FMCP_STATE_DIR` > `XDG_STATE_HOME/folder-mcp`
/// > `~/.local/state/folder-mcp`.
pub fn state_dir() -> Result<PathBuf, DaemonError> {
    if let Ok(dir) = std::env::var("FMCP_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = dirs::state_dir() {
        return Ok(xdg.join("folder-mcp"));
    }
    let home = std::env::var("HOME").map_err(|_| DaemonError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/folder-mcp"))
}

/// Optional override for the curated model registry file. Falls back to
/// the built-in table when unset or when the file doesn't exist.
pub fn model_registry_path() -> Option<PathBuf> {
    std::env::var("FMCP_MODEL_REGISTRY").ok().map(PathBuf::from)
}

/// How often the periodic folder validator checks managed paths still
/// exist on disk (default ~30s).
pub fn validator_interval() -> Duration {
    std::env::var("FMCP_VALIDATOR_INTERVAL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(30))
}

/// Grace period before deleting `.folder-mcp/` on Windows, overridable
/// rather than hardcoded (see `OrchestratorConfig::windows_grace_period`).
pub fn windows_grace_period() -> Duration {
    std::env::var("FMCP_WINDOWS_GRACE_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(2000))
}

/// Shutdown drain timeout: how long `stop_all` is given before the
/// process exits anyway (default 5s, configurable).
pub fn shutdown_timeout() -> Duration {
    std::env::var("FMCP_SHUTDOWN_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Whether the optional memory-drift monitor is enabled
/// (`daemon.memoryMonitor.enabled`).
pub fn memory_monitor_enabled() -> bool {
    std::env::var("FMCP_MEMORY_MONITOR")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn state_dir_honors_the_explicit_override() {
        std::env::set_var("FMCP_STATE_DIR", "/tmp/fmcp-env-test-state");
        assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/fmcp-env-test-state"));
        std::env::remove_var("FMCP_STATE_DIR");
    }

    #[test]
    #[serial]
    fn validator_interval_falls_back_to_thirty_seconds_when_unset() {
        std::env::remove_var("FMCP_VALIDATOR_INTERVAL_MS");
        assert_eq!(validator_interval(), Duration::from_secs(30));
    }

    #[test]
    #[serial]
    fn validator_interval_honors_an_explicit_override() {
        std::env::set_var("FMCP_VALIDATOR_INTERVAL_MS", "250");
        assert_eq!(validator_interval(), Duration::from_millis(250));
        std::env::remove_var("FMCP_VALIDATOR_INTERVAL_MS");
    }

    #[test]
    #[serial]
    fn memory_monitor_enabled_accepts_one_and_true_case_insensitively() {
        std::env::set_var("FMCP_MEMORY_MONITOR", "TrUe");
        assert!(memory_monitor_enabled());
        std::env::set_var("FMCP_MEMORY_MONITOR", "0");
        assert!(!memory_monitor_enabled());
        std::env::remove_var("FMCP_MEMORY_MONITOR");
        assert!(!memory_monitor_enabled());
    }
}
