// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! Daemon startup and shutdown. Mirrors the corpus's lock-first,
//! bind-last boot sequence: acquire the single-instance lock before
//! touching anything else, validate every piece of persisted state, and
//! only bind the control socket once startup cannot fail anymore.

use std::io::Write as _;
use std::sync::Arc;

use fs2::FileExt;
use fmcp_adapters::{
    FakeEmbeddingBackendFactory, FakeModelDownloader, FakeModelLoader, FileConfigStore, ModelRegistry,
    NullFileProcessor,
};
use fmcp_core::{SupportedExtensions, SystemClock};
use fmcp_engine::{ActivityRing, FmdmService, MonitoredFoldersOrchestrator, OrchestratorConfig, PerfMonitor, PerfMonitorConfig};
use fmcp_storage::InMemoryVectorStoreFactory;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::DaemonError;

/// Everything a running daemon needs to shut down cleanly.
pub struct Daemon {
    pub config: Config,
    pub orchestrator: MonitoredFoldersOrchestrator,
    lock_file: std::fs::File,
    socket_cancel: CancellationToken,
    socket_task: Option<tokio::task::JoinHandle<()>>,
    perf_monitor_cancel: CancellationToken,
    perf_monitor_task: Option<tokio::task::JoinHandle<()>>,
}

/// Boot the daemon: acquire the lock, create directories, rehydrate the
/// FMDM snapshot and persisted folder set, start the orchestrator, and
/// bind the control socket last.
pub async fn startup(config: Config) -> Result<Daemon, DaemonError> {
    match startup_inner(&config).await {
        Ok(daemon) => Ok(daemon),
        Err(error) => {
            // Don't clean up on a lock conflict — those files belong to
            // the daemon instance that is already running.
            if !matches!(error, DaemonError::LockFailed(_)) {
                cleanup_on_failure(&config);
            }
            Err(error)
        }
    }
}

/// Build an orchestrator wired exactly the way the daemon wires one —
/// snapshot rehydration, persisted folder set, curated registry, the
/// shared unguarded defaults for the out-of-scope embedding/storage
/// collaborators — without the single-instance lock or control socket.
/// Used both by `startup_inner` below and by the CLI's in-process
/// fallback when no daemon is reachable.
pub async fn build_orchestrator(config: &Config) -> Result<MonitoredFoldersOrchestrator, DaemonError> {
    std::fs::create_dir_all(&config.state_dir)?;

    let previous = crate::snapshot::load(&config.snapshot_path);
    let fmdm = Arc::new(match previous {
        Some(snapshot) => {
            tracing::info!(folders = snapshot.folders.len(), "restored FMDM snapshot from previous run");
            FmdmService::restore(snapshot)
        }
        None => {
            tracing::info!("no FMDM snapshot found, starting empty");
            FmdmService::new()
        }
    });
    crate::snapshot::spawn_persister(fmdm.clone(), config.snapshot_path.clone());

    let registry = match &config.model_registry_path {
        Some(path) => ModelRegistry::load(path)?,
        None => ModelRegistry::builtin(),
    };

    let activity = Arc::new(ActivityRing::default());
    let config_store = Arc::new(FileConfigStore::open(config.folders_config_path.clone())?);

    // The concrete ONNX/Python embedding backends, the SQLite+vector
    // engine, and the model downloader are external collaborators out of
    // scope here; the in-memory vector store and the deterministic fakes
    // are the unguarded defaults until those land.
    let orchestrator = MonitoredFoldersOrchestrator::new(
        OrchestratorConfig {
            resource_limits: config.resource_limits,
            validator_interval: config.validator_interval,
            windows_grace_period: config.windows_grace_period,
            ..OrchestratorConfig::default()
        },
        fmdm,
        activity,
        config_store,
        registry,
        Arc::new(FakeModelDownloader::default()),
        Arc::new(FakeModelLoader::default()),
        Arc::new(InMemoryVectorStoreFactory),
        Arc::new(FakeEmbeddingBackendFactory),
        Arc::new(NullFileProcessor),
        SupportedExtensions::canonical(),
        Arc::new(SystemClock),
        fmcp_engine::default_sampler(),
    );

    Ok(orchestrator)
}

async fn startup_inner(config: &Config) -> Result<Daemon, DaemonError> {
    std::fs::create_dir_all(&config.state_dir)?;

    // Acquire the lock before writing anything else — an
    // already-running daemon owns every file under state_dir until it
    // releases this lock.
    let mut lock_file =
        std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(|_| DaemonError::LockFailed(config.lock_path.clone()))?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    std::fs::write(&config.version_path, env!("CARGO_PKG_VERSION"))?;

    let orchestrator = build_orchestrator(config).await?;
    orchestrator.start_all().await?;

    let socket_cancel = CancellationToken::new();
    let socket_task = bind_control_socket(config, orchestrator.clone(), socket_cancel.clone());

    let perf_monitor_cancel = CancellationToken::new();
    let perf_monitor_task = spawn_perf_monitor(config, &orchestrator, perf_monitor_cancel.clone());

    tracing::info!("Daemon started");

    Ok(Daemon {
        config: config.clone(),
        orchestrator,
        lock_file,
        socket_cancel,
        socket_task,
        perf_monitor_cancel,
        perf_monitor_task,
    })
}

/// Feed every resource-manager sample into the optional memory-drift
/// monitor when `daemon.memoryMonitor.enabled` is set. A no-op task
/// otherwise — the resource manager's own admission control never reads
/// this monitor back, so disabling it changes nothing else about
/// startup.
fn spawn_perf_monitor(
    config: &Config,
    orchestrator: &MonitoredFoldersOrchestrator,
    cancel: CancellationToken,
) -> Option<tokio::task::JoinHandle<()>> {
    if !config.memory_monitor_enabled {
        return None;
    }

    let monitor = PerfMonitor::new(PerfMonitorConfig { enabled: true, ..PerfMonitorConfig::default() });
    let mut stats = orchestrator.watch_resource_stats();

    Some(tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = stats.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let memory_mb = stats.borrow().memory_used_mb;
                    monitor.record(memory_mb);
                }
            }
        }
    }))
}

#[cfg(unix)]
fn bind_control_socket(
    config: &Config,
    orchestrator: MonitoredFoldersOrchestrator,
    cancel: CancellationToken,
) -> Option<tokio::task::JoinHandle<()>> {
    match crate::socket::bind(config.socket_path()) {
        Ok(listener) => Some(tokio::spawn(crate::socket::serve(listener, orchestrator, cancel))),
        Err(error) => {
            tracing::warn!(%error, "failed to bind control socket; running without one");
            None
        }
    }
}

#[cfg(not(unix))]
fn bind_control_socket(
    _config: &Config,
    _orchestrator: MonitoredFoldersOrchestrator,
    _cancel: CancellationToken,
) -> Option<tokio::task::JoinHandle<()>> {
    None
}

impl Daemon {
    /// Cancellation order mirrors `MonitoredFoldersOrchestrator::stop_all`'s
    /// own internal ordering: stop accepting new control connections
    /// first, then tear down the orchestrator, then release the lock.
    pub async fn shutdown(self) {
        self.socket_cancel.cancel();
        if let Some(task) = self.socket_task {
            let _ = tokio::time::timeout(crate::env::shutdown_timeout(), task).await;
        }
        self.perf_monitor_cancel.cancel();
        if let Some(task) = self.perf_monitor_task {
            let _ = tokio::time::timeout(crate::env::shutdown_timeout(), task).await;
        }
        self.orchestrator.stop_all().await;
        if self.config.socket_path.exists() {
            let _ = std::fs::remove_file(&self.config.socket_path);
        }
        let _ = self.lock_file.unlock();
        let _ = std::fs::remove_file(&self.config.lock_path);
    }
}

fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.version_path.exists() {
        let _ = std::fs::remove_file(&config.version_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn startup_then_shutdown_releases_the_lock_for_the_next_run() {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path().to_path_buf());

        let daemon = startup(config.clone()).await.unwrap();
        daemon.shutdown().await;

        // A second startup with the same config must succeed now that
        // the lock has been released.
        let daemon = startup(config).await.unwrap();
        daemon.shutdown().await;
    }

    #[tokio::test]
    async fn second_concurrent_startup_fails_to_acquire_the_lock() {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path().to_path_buf());

        let first = startup(config.clone()).await.unwrap();
        let second = startup(config).await;
        assert!(matches!(second, Err(DaemonError::LockFailed(_))));

        first.shutdown().await;
    }

    #[tokio::test]
    async fn snapshot_persists_across_a_restart() {
        let dir = tempdir().unwrap();
        let folder = tempdir().unwrap();
        std::fs::write(folder.path().join("a.md"), "hello").unwrap();
        let config = Config::new(dir.path().to_path_buf());

        let daemon = startup(config.clone()).await.unwrap();
        daemon.orchestrator.add_folder(folder.path().to_path_buf(), "mini-384".to_string()).await.unwrap();
        for _ in 0..100 {
            if daemon.orchestrator.fmdm().get_fmdm().folder(folder.path()).is_some() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        daemon.shutdown().await;

        let daemon = startup(config).await.unwrap();
        let mut found = false;
        for _ in 0..100 {
            if daemon.orchestrator.fmdm().get_fmdm().folder(folder.path()).is_some() {
                found = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert!(found);
        daemon.shutdown().await;
    }
}
