// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! End-to-end scenarios driven entirely through the public
//! `fmcp-engine` surface, wiring the same fake adapters used elsewhere
//! in this workspace.

use fmcp_adapters::{
    FakeEmbeddingBackendFactory, FakeModelDownloader, FakeModelLoader, FileConfigStore, NullFileProcessor, WatcherConfig,
};
use fmcp_core::{FolderStatus, SupportedExtensions, SystemClock};
use fmcp_engine::{ActivityRing, FmdmService, MonitoredFoldersOrchestrator, OrchestratorConfig};
use fmcp_storage::InMemoryVectorStoreFactory;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn build_orchestrator(state_dir: &Path, validator_interval: Duration) -> MonitoredFoldersOrchestrator {
    let fmdm = Arc::new(FmdmService::new());
    let activity = Arc::new(ActivityRing::default());
    let config_store = Arc::new(FileConfigStore::open(state_dir.join("config.json")).unwrap());
    let registry = fmcp_adapters::ModelRegistry::builtin();
    let downloader = Arc::new(FakeModelDownloader::default());
    let model_loader = Arc::new(FakeModelLoader::default());
    let vector_factory = Arc::new(InMemoryVectorStoreFactory);
    let backend_factory = Arc::new(FakeEmbeddingBackendFactory);
    let file_processor = Arc::new(NullFileProcessor);

    MonitoredFoldersOrchestrator::new(
        OrchestratorConfig {
            validator_interval,
            watcher: WatcherConfig { debounce_ms: 50, batch_size: 10, enable_batch_processing: true },
            ..OrchestratorConfig::default()
        },
        fmdm,
        activity,
        config_store,
        registry,
        downloader,
        model_loader,
        vector_factory,
        backend_factory,
        file_processor,
        SupportedExtensions::canonical(),
        Arc::new(SystemClock),
        fmcp_engine::default_sampler(),
    )
}

async fn wait_for<F: Fn() -> bool>(predicate: F) -> bool {
    for _ in 0..150 {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

/// A file dropped into an already-active folder triggers a watcher
/// event, which re-enters `scanning` and finishes back at `active` with
/// the new file accounted for.
#[tokio::test]
async fn watcher_driven_change_reindexes_an_active_folder() {
    let state = tempdir().unwrap();
    let folder = tempdir().unwrap();
    std::fs::write(folder.path().join("first.md"), "hello").unwrap();

    let orch = build_orchestrator(state.path(), Duration::from_secs(30));
    orch.add_folder(folder.path().to_path_buf(), "mini-384".to_string()).await.unwrap();

    assert!(wait_for(|| orch.fmdm().get_fmdm().folder(folder.path()).map(|f| f.status) == Some(FolderStatus::Active))
        .await);

    std::fs::write(folder.path().join("second.md"), "world").unwrap();

    // Give the watcher's debounce window time to fire, then wait for the
    // incremental reindex it triggers to report the one new file.
    assert!(
        wait_for(|| {
            orch.fmdm()
                .get_fmdm()
                .folder(folder.path())
                .and_then(|f| f.notification.as_ref())
                .map(|n| n.message.contains("1 files"))
                .unwrap_or(false)
        })
        .await,
        "expected the watcher-triggered reindex to report 1 file indexed"
    );
}

/// A folder that disappears from disk after being indexed is flagged
/// `error` by the periodic validator, but never dropped from the FMDM
/// snapshot.
#[tokio::test]
async fn vanished_folder_is_flagged_error_but_stays_visible() {
    let state = tempdir().unwrap();
    let folder = tempdir().unwrap();
    std::fs::write(folder.path().join("a.md"), "hello").unwrap();
    let folder_path = folder.path().to_path_buf();

    let orch = build_orchestrator(state.path(), Duration::from_millis(50));
    orch.add_folder(folder_path.clone(), "mini-384".to_string()).await.unwrap();
    assert!(wait_for(|| orch.fmdm().get_fmdm().folder(&folder_path).map(|f| f.status) == Some(FolderStatus::Active))
        .await);

    orch.start_all().await.unwrap();
    drop(folder); // removes the directory from disk entirely

    assert!(wait_for(|| orch.fmdm().get_fmdm().folder(&folder_path).map(|f| f.status) == Some(FolderStatus::Error))
        .await);
    assert!(orch.fmdm().get_fmdm().folder(&folder_path).is_some());
}

/// Adding two folders with different models never has both backends
/// resident at once — the sequential queue processes them one at a time
/// regardless of arrival order.
#[tokio::test]
async fn two_folders_with_different_models_are_processed_sequentially() {
    let state = tempdir().unwrap();
    let folder_a = tempdir().unwrap();
    let folder_b = tempdir().unwrap();
    std::fs::write(folder_a.path().join("a.md"), "hello").unwrap();
    std::fs::write(folder_b.path().join("b.md"), "world").unwrap();

    let orch = build_orchestrator(state.path(), Duration::from_secs(30));
    orch.add_folder(folder_a.path().to_path_buf(), "mini-384".to_string()).await.unwrap();
    orch.add_folder(folder_b.path().to_path_buf(), "bigger-768".to_string()).await.unwrap();

    assert!(
        wait_for(|| {
            let snap = orch.fmdm().get_fmdm();
            snap.folder(folder_a.path()).map(|f| f.status) == Some(FolderStatus::Active)
                && snap.folder(folder_b.path()).map(|f| f.status) == Some(FolderStatus::Active)
        })
        .await
    );
}
