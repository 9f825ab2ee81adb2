// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! The monitored-folders orchestrator (C10): the daemon's one singleton.
//! Owns `path -> lifecycle manager` and `path -> watcher`, wires every
//! manager's events into FMDM, runs the periodic folder validator, and
//! performs the cleanup protocol on failure (spec.md §4.1).
//!
//! Two admission-control open questions from spec.md §9 are resolved
//! here rather than guessed at silently — see DESIGN.md for the write-up:
//! `addFolder`'s resource-manager submission gates the one-time
//! scan+index pipeline, while file-watch driven reindexing is *also*
//! routed through the resource manager for its priority/rate gate, but
//! the actual scan+index work always runs through the sequential
//! indexing queue so invariant I1 (one model resident at a time) holds
//! regardless of which path triggered the work.

use fmcp_adapters::{
    ChangeSet, ConfigStore, EmbeddingBackendFactory, FileProcessor, FolderWatcher, ModelDownloader, ModelLoader,
    ModelRegistry, WatcherConfig,
};
use fmcp_core::{
    ClockSource, FolderRecord, FolderStatus, Notification, ResourceLimits, SupportedExtensions,
};
use fmcp_storage::VectorStoreFactory;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::activity_ring::ActivityRing;
use crate::error::EngineError;
use crate::fmdm_service::FmdmService;
use crate::indexing_queue::{QueueItem, SequentialIndexingQueue};
use crate::lifecycle_manager::{FolderLifecycleManager, LifecycleEvent, ScanScope};
use crate::resource_manager::{ResourceManager, ResourceSampler, ResourceStats, Submission, Thunk};

/// Tuning for the orchestrator's own timers and gates; everything folder
/// lifecycle-specific lives on [`FolderLifecycleManager`] instead.
#[derive(Clone)]
pub struct OrchestratorConfig {
    pub resource_limits: ResourceLimits,
    /// How often the folder validator checks that managed paths still
    /// exist on disk (spec.md §4.1, "~30s").
    pub validator_interval: Duration,
    /// Grace period before deleting `.folder-mcp/` on Windows, to let
    /// database handles release (spec.md §3). A no-op off Windows.
    /// spec.md §9 flags the correct value as unspecified upstream (500ms
    /// vs 2000ms in different paths) — this workspace picks one
    /// configurable default rather than reproducing both.
    pub windows_grace_period: Duration,
    pub watcher: WatcherConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            resource_limits: ResourceLimits::default(),
            validator_interval: Duration::from_secs(30),
            windows_grace_period: Duration::from_millis(2000),
            watcher: WatcherConfig::default(),
        }
    }
}

/// The canonical "environment error" classifier named in spec.md §7: a
/// missing-prerequisite failure signature (e.g. no Python interpreter)
/// is rewritten to a stable, human-readable message; anything else is
/// surfaced verbatim.
pub fn classify_environment_error(raw_message: &str, model_display_name: &str) -> String {
    let lower = raw_message.to_lowercase();
    let mentions_python = lower.contains("python");
    let mentions_prerequisite =
        lower.contains("not found") || lower.contains("required") || lower.contains("missing");
    if mentions_python && mentions_prerequisite {
        format!("Python 3.8+ required for {model_display_name}")
    } else {
        raw_message.to_string()
    }
}

struct Inner {
    config: OrchestratorConfig,
    fmdm: Arc<FmdmService>,
    activity: Arc<ActivityRing>,
    resource_manager: ResourceManager,
    queue: SequentialIndexingQueue,
    config_store: Arc<dyn ConfigStore>,
    registry: Mutex<ModelRegistry>,
    downloader: Arc<dyn ModelDownloader>,
    vector_factory: Arc<dyn VectorStoreFactory>,
    backend_factory: Arc<dyn EmbeddingBackendFactory>,
    file_processor: Arc<dyn FileProcessor>,
    extensions: SupportedExtensions,
    clock: Arc<dyn ClockSource>,
    managers: Mutex<HashMap<PathBuf, Arc<FolderLifecycleManager>>>,
    watchers: Mutex<HashMap<PathBuf, FolderWatcher>>,
    validator_cancel: CancellationToken,
}

/// Handle to the running orchestrator. Cloning shares the same state —
/// intended to be constructed once at daemon boot and handed down by
/// `Arc`/clone to every consumer (spec.md §9, "Global singletons").
#[derive(Clone)]
pub struct MonitoredFoldersOrchestrator {
    inner: Arc<Inner>,
}

impl MonitoredFoldersOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: OrchestratorConfig,
        fmdm: Arc<FmdmService>,
        activity: Arc<ActivityRing>,
        config_store: Arc<dyn ConfigStore>,
        registry: ModelRegistry,
        downloader: Arc<dyn ModelDownloader>,
        model_loader: Arc<dyn ModelLoader>,
        vector_factory: Arc<dyn VectorStoreFactory>,
        backend_factory: Arc<dyn EmbeddingBackendFactory>,
        file_processor: Arc<dyn FileProcessor>,
        extensions: SupportedExtensions,
        clock: Arc<dyn ClockSource>,
        sampler: Box<dyn ResourceSampler>,
    ) -> Self {
        let resource_manager = ResourceManager::start(config.resource_limits, sampler);
        let queue = SequentialIndexingQueue::start(model_loader);
        let inner = Arc::new(Inner {
            config,
            fmdm,
            activity,
            resource_manager,
            queue,
            config_store,
            registry: Mutex::new(registry),
            downloader,
            vector_factory,
            backend_factory,
            file_processor,
            extensions,
            clock,
            managers: Mutex::new(HashMap::new()),
            watchers: Mutex::new(HashMap::new()),
            validator_cancel: CancellationToken::new(),
        });
        Self { inner }
    }

    pub fn get_manager(&self, path: &Path) -> Option<Arc<FolderLifecycleManager>> {
        self.inner.managers.lock().get(path).cloned()
    }

    pub fn fmdm(&self) -> Arc<FmdmService> {
        self.inner.fmdm.clone()
    }

    /// Latest resource-manager sample (C4's `stats` event), for callers
    /// that just want a one-shot read.
    pub fn resource_stats(&self) -> ResourceStats {
        self.inner.resource_manager.stats()
    }

    /// Subscribe to every resource-manager sample as it's published.
    /// `fmcpd` feeds this into the optional memory-drift monitor (C5)
    /// when `daemon.memoryMonitor.enabled` is set; nothing in admission
    /// control depends on a subscriber existing.
    pub fn watch_resource_stats(&self) -> tokio::sync::watch::Receiver<ResourceStats> {
        self.inner.resource_manager.watch_stats()
    }

    /// `addFolder(path, model)` — spec.md §4.1.
    pub async fn add_folder(&self, path: PathBuf, model: String) -> Result<(), EngineError> {
        self.inner.add_folder(path, model, false).await
    }

    /// `removeFolder(path)` — spec.md §4.1's teardown protocol.
    pub async fn remove_folder(&self, path: &Path) -> Result<(), EngineError> {
        self.inner.remove_folder(path).await
    }

    /// Rehydrate every folder persisted in the configuration collaborator,
    /// then start the periodic validator.
    pub async fn start_all(&self) -> Result<(), EngineError> {
        let folders = self.inner.config_store.get_folders().await?;
        for folder in folders {
            if let Err(error) = self.inner.add_folder(folder.path.clone(), folder.model.clone(), true).await {
                tracing::warn!(path = %folder.path.display(), %error, "failed to rehydrate folder at startup");
            }
        }
        self.inner.clone().spawn_validator();
        Ok(())
    }

    /// Cancel in priority order: validator -> queue -> resource manager ->
    /// managers -> watchers (spec.md §5).
    pub async fn stop_all(&self) {
        self.inner.validator_cancel.cancel();
        self.inner.queue.stop().await;
        self.inner.resource_manager.shutdown().await;
        self.inner.managers.lock().clear();
        let mut watchers = self.inner.watchers.lock();
        for (_, watcher) in watchers.drain() {
            watcher.stop();
        }
    }
}

impl Inner {
    async fn add_folder(self: &Arc<Self>, path: PathBuf, model: String, rehydrate: bool) -> Result<(), EngineError> {
        if self.managers.lock().contains_key(&path) {
            tracing::warn!(path = %path.display(), "addFolder: folder is already managed");
            return Ok(());
        }

        if !path.exists() {
            self.fmdm.put_folder(FolderRecord::error(path.clone(), model.clone(), "Folder does not exist"));
            return Err(EngineError::FolderDoesNotExist(path));
        }

        let submission_id = format!("add-folder:{}", path.display());
        let this = self.clone();
        let thunk_path = path.clone();
        let thunk_model = model.clone();
        let thunk: Thunk = Box::new(move |cancel| {
            Box::pin(async move { this.run_add_folder(thunk_path, thunk_model, rehydrate, cancel).await })
        });

        let submission =
            Submission { id: submission_id, folder_path: path.clone(), priority: 1, estimated_memory_mb: 100, thunk };

        if let Err(error) = self.resource_manager.submit(submission).await {
            self.publish_error(&path, &model, error.to_string());
            self.cleanup_after_failure(&path).await;
            return Err(error);
        }

        self.activity.emit("folder:added", Some(path.clone()), format!("addFolder({model})"), self.clock.epoch_ms());
        Ok(())
    }

    async fn run_add_folder(
        self: Arc<Self>,
        path: PathBuf,
        model: String,
        rehydrate: bool,
        cancel: CancellationToken,
    ) -> Result<(), EngineError> {
        let descriptor = match self.registry.lock().resolve(&model) {
            Ok(descriptor) => descriptor,
            Err(error) => {
                self.publish_error(&path, &model, error.to_string());
                return Err(EngineError::Adapter(error));
            }
        };

        if !descriptor.installed {
            // The folder must exist in FMDM before any status update —
            // spec.md §4.1 step 4: "order matters".
            self.fmdm.put_folder(FolderRecord::pending(path.clone(), model.clone()));
            self.fmdm.update_folder_status(
                &path,
                FolderStatus::DownloadingModel,
                Some(Notification::info("Downloading model: 0%")),
            );

            let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<u8>();
            let progress_fmdm = self.fmdm.clone();
            let progress_path = path.clone();
            let progress_task = tokio::spawn(async move {
                while let Some(percentage) = progress_rx.recv().await {
                    progress_fmdm.update_folder_status(
                        &progress_path,
                        FolderStatus::DownloadingModel,
                        Some(Notification::info(format!("Downloading model: {percentage}%"))),
                    );
                }
            });

            let download_result = self.downloader.download(&model, progress_tx, cancel.clone()).await;
            let _ = progress_task.await;

            if let Err(error) = download_result {
                self.publish_error(&path, &model, error.to_string());
                return Err(EngineError::Adapter(error));
            }
            self.registry.lock().mark_installed(&model);
        }

        let descriptor = self.registry.lock().resolve(&model)?;
        self.fmdm.update_installed_models(self.registry.lock().installed_models());

        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let mcp_dir = path.join(".folder-mcp");
        if let Err(error) = std::fs::create_dir_all(&mcp_dir) {
            let error = fmcp_storage::StorageError::from(error);
            self.publish_error(&path, &model, error.to_string());
            return Err(EngineError::Storage(error));
        }

        let file_state_store = match fmcp_storage::JsonFileStateStore::open(&mcp_dir) {
            Ok(store) => Box::new(store),
            Err(error) => {
                self.publish_error(&path, &model, error.to_string());
                return Err(EngineError::Storage(error));
            }
        };

        let vector_store = match self.vector_factory.open(&path, &model, descriptor.dimensions).await {
            Ok(store) => Arc::<dyn fmcp_storage::VectorStore>::from(store),
            Err(error) => {
                self.publish_error(&path, &model, error.to_string());
                return Err(EngineError::Storage(error));
            }
        };

        let embedding_backend = match self.backend_factory.build(&descriptor).await {
            Ok(backend) => backend,
            Err(error) => {
                self.publish_error(&path, &model, error.to_string());
                return Err(EngineError::Adapter(error));
            }
        };

        let (manager, events_rx) = FolderLifecycleManager::new(
            path.clone(),
            model.clone(),
            file_state_store,
            vector_store,
            self.file_processor.clone(),
            embedding_backend,
            self.extensions.clone(),
            self.clock.clone(),
        );
        let manager = Arc::new(manager);
        self.managers.lock().insert(path.clone(), manager.clone());
        self.fmdm.put_folder(FolderRecord::pending(path.clone(), model.clone()));

        self.clone().spawn_event_pump(path.clone(), manager.clone(), events_rx);

        self.queue.enqueue(QueueItem {
            folder_path: path.clone(),
            model: model.clone(),
            manager: manager.clone(),
            scope: ScanScope::Full,
        });

        if !rehydrate {
            self.config_store.add_folder(&path, &model).await?;
        }

        Ok(())
    }

    /// Consume one manager's event stream for the rest of the daemon's
    /// life, projecting every event through `FmdmService` (spec.md §4.1
    /// "Event wiring").
    fn spawn_event_pump(
        self: Arc<Self>,
        path: PathBuf,
        manager: Arc<FolderLifecycleManager>,
        mut events_rx: mpsc::UnboundedReceiver<LifecycleEvent>,
    ) {
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                match event {
                    LifecycleEvent::StateChange { status } => {
                        self.fmdm.update_folder_status(&path, status, None);
                    }
                    LifecycleEvent::ScanningProgress(progress) => {
                        self.fmdm.update_folder_scanning_progress(&path, progress);
                    }
                    LifecycleEvent::ScanComplete { .. } => {
                        // The queue always calls start_scanning then
                        // start_indexing for one item; start_indexing
                        // itself routes straight to `active` when there
                        // are no tasks, so nothing further to project here.
                    }
                    LifecycleEvent::ProgressUpdate { percentage } => {
                        self.fmdm.update_folder_progress(&path, percentage);
                    }
                    LifecycleEvent::IndexComplete { stats } => {
                        let notification = Notification::info(format!(
                            "{} files indexed \u{2022} indexing time {:.1}s",
                            stats.file_count, stats.indexing_time_seconds
                        ));
                        self.fmdm.update_folder_status(&path, FolderStatus::Active, Some(notification));
                        self.activity.emit(
                            "folder:indexed",
                            Some(path.clone()),
                            format!("{} files indexed", stats.file_count),
                            self.clock.epoch_ms(),
                        );
                        self.clone().start_watching(path.clone(), manager.clone());
                    }
                    LifecycleEvent::Error { message } => {
                        let model = manager.snapshot().model;
                        self.publish_error(&path, &model, message);
                    }
                }
            }
        });
    }

    /// Start watching a newly-active folder and wire its debounced
    /// change sets back into the resource manager / sequential queue
    /// (spec.md §4.1 "changesDetected").
    fn start_watching(self: Arc<Self>, path: PathBuf, manager: Arc<FolderLifecycleManager>) {
        if self.watchers.lock().contains_key(&path) {
            return;
        }
        match FolderWatcher::spawn(path.clone(), self.extensions.clone(), self.config.watcher.clone()) {
            Ok((watcher, mut change_rx)) => {
                self.watchers.lock().insert(path.clone(), watcher);
                let this = self.clone();
                let watch_path = path.clone();
                tokio::spawn(async move {
                    while let Some(change_set) = change_rx.recv().await {
                        if change_set.is_empty() {
                            continue;
                        }
                        this.clone().handle_changes_detected(watch_path.clone(), manager.clone(), change_set).await;
                    }
                });
            }
            Err(error) => {
                tracing::warn!(%error, path = %path.display(), "failed to start file watcher");
            }
        }
    }

    /// `changesDetected -> submit "scan-changes:"+path to the resource
    /// manager (priority 2, est 50MB)` (spec.md §4.1). The resource
    /// manager only gates *admission*; the actual scan+index work is
    /// always handed to the sequential indexing queue so invariant I1
    /// holds no matter which path enqueued the folder (see module docs).
    async fn handle_changes_detected(
        self: Arc<Self>,
        path: PathBuf,
        manager: Arc<FolderLifecycleManager>,
        change_set: ChangeSet,
    ) {
        let model = manager.snapshot().model;
        let id = format!("scan-changes:{}", path.display());
        let queue = self.queue.clone();
        let thunk_path = path.clone();
        let thunk: Thunk = Box::new(move |_cancel| {
            let queue = queue.clone();
            let manager = manager.clone();
            let model = model.clone();
            let change_set = change_set.clone();
            Box::pin(async move {
                queue.enqueue(QueueItem {
                    folder_path: thunk_path.clone(),
                    model,
                    manager,
                    scope: ScanScope::Incremental(change_set),
                });
                Ok(())
            })
        });

        let submission =
            Submission { id, folder_path: path.clone(), priority: 2, estimated_memory_mb: 50, thunk };
        if let Err(error) = self.resource_manager.submit(submission).await {
            tracing::warn!(%error, path = %path.display(), "scan-changes submission rejected");
        }
    }

    /// Periodic existence check (spec.md §4.1 "Folder validator").
    fn spawn_validator(self: Arc<Self>) {
        let cancel = self.validator_cancel.clone();
        let interval = self.config.validator_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => self.validate_once(),
                }
            }
        });
    }

    /// One pass of the validator: vanished folders are marked `error`,
    /// not removed (spec.md §4.1).
    fn validate_once(&self) {
        let paths: Vec<PathBuf> = self.managers.lock().keys().cloned().collect();
        for path in paths {
            if path.exists() {
                continue;
            }
            tracing::warn!(path = %path.display(), "validator: managed folder no longer exists");
            self.queue.remove(&path);
            self.managers.lock().remove(&path);
            if let Some(watcher) = self.watchers.lock().remove(&path) {
                watcher.stop();
            }
            self.fmdm.update_folder_status(&path, FolderStatus::Error, Some(Notification::error("Folder no longer exists")));
        }
    }

    fn publish_error(&self, path: &Path, model: &str, raw_message: impl Into<String>) {
        let raw_message = raw_message.into();
        let classified = classify_environment_error(&raw_message, model);
        if self.fmdm.get_fmdm().folder(path).is_some() {
            self.fmdm.update_folder_status(path, FolderStatus::Error, Some(Notification::error(classified)));
        } else {
            self.fmdm.put_folder(FolderRecord::error(path.to_path_buf(), model, classified));
        }
    }

    /// Cleanup protocol after a failed `addFolder` (spec.md §4.1.3):
    /// cancel in-flight ops, stop the manager and watcher, delete
    /// `.folder-mcp/`, remove from config, request the folder be
    /// scrubbed from FMDM *unless* it is currently showing `error` —
    /// error entries must remain visible to the user.
    async fn cleanup_after_failure(&self, path: &Path) {
        self.resource_manager.cancel_operation(format!("add-folder:{}", path.display())).await;
        let manager = self.managers.lock().remove(path);
        if let Some(watcher) = self.watchers.lock().remove(path) {
            watcher.stop();
        }
        if let Some(manager) = manager {
            if let Err(error) = manager.close().await {
                tracing::warn!(%error, path = %path.display(), "cleanup: failed to close vector store");
            }
        }
        let mcp_dir = path.join(".folder-mcp");
        if mcp_dir.exists() {
            if let Err(error) = std::fs::remove_dir_all(&mcp_dir) {
                tracing::warn!(%error, path = %path.display(), "cleanup: failed to remove .folder-mcp");
            }
        }
        if let Err(error) = self.config_store.remove_folder(path).await {
            tracing::warn!(%error, path = %path.display(), "cleanup: failed to remove folder from config store");
        }

        let is_error = self.fmdm.get_fmdm().folder(path).map(|f| f.status == FolderStatus::Error).unwrap_or(false);
        if !is_error {
            self.fmdm.remove_folder(path);
        }
    }

    /// `removeFolder(path)` teardown protocol (spec.md §4.1): each step
    /// is best-effort and logs on failure.
    async fn remove_folder(&self, path: &Path) -> Result<(), EngineError> {
        self.queue.remove(path);
        let manager = self.managers.lock().remove(path);
        if let Some(manager) = &manager {
            if let Err(error) = manager.close().await {
                tracing::warn!(%error, path = %path.display(), "removeFolder: failed to close vector store");
            }
        }

        if cfg!(windows) {
            tokio::time::sleep(self.config.windows_grace_period).await;
        }

        if let Some(watcher) = self.watchers.lock().remove(path) {
            watcher.stop();
        }

        let mcp_dir = path.join(".folder-mcp");
        if mcp_dir.exists() {
            if let Err(error) = std::fs::remove_dir_all(&mcp_dir) {
                tracing::warn!(%error, path = %path.display(), "removeFolder: failed to delete .folder-mcp");
            }
        }

        if let Err(error) = self.config_store.remove_folder(path).await {
            tracing::warn!(%error, path = %path.display(), "removeFolder: failed to update config store");
        }

        self.fmdm.remove_folder(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmcp_adapters::{
        FakeEmbeddingBackendFactory, FakeModelDownloader, FakeModelLoader, FileConfigStore, NullFileProcessor,
    };
    use fmcp_core::SystemClock;
    use fmcp_storage::InMemoryVectorStoreFactory;
    use std::time::Duration as StdDuration;
    use tempfile::tempdir;

    fn build_orchestrator(state_dir: &Path) -> MonitoredFoldersOrchestrator {
        let fmdm = Arc::new(FmdmService::new());
        let activity = Arc::new(ActivityRing::default());
        let config_store = Arc::new(FileConfigStore::open(state_dir.join("config.json")).unwrap());
        let registry = ModelRegistry::builtin();
        let downloader = Arc::new(FakeModelDownloader::default());
        let model_loader = Arc::new(FakeModelLoader::default());
        let vector_factory = Arc::new(InMemoryVectorStoreFactory);
        let backend_factory = Arc::new(FakeEmbeddingBackendFactory);
        let file_processor = Arc::new(NullFileProcessor);

        MonitoredFoldersOrchestrator::new(
            OrchestratorConfig {
                validator_interval: StdDuration::from_millis(50),
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
            Box::new(crate::resource_manager::ZeroSampler),
        )
    }

    async fn wait_for_status(orch: &MonitoredFoldersOrchestrator, path: &Path, status: FolderStatus) -> bool {
        for _ in 0..100 {
            if let Some(record) = orch.fmdm().get_fmdm().folder(path) {
                if record.status == status {
                    return true;
                }
            }
            tokio::time::sleep(StdDuration::from_millis(20)).await;
        }
        false
    }

    #[tokio::test]
    async fn happy_path_installed_model_reaches_active() {
        let state = tempdir().unwrap();
        let folder = tempdir().unwrap();
        std::fs::write(folder.path().join("readme.md"), "hello world").unwrap();

        let orch = build_orchestrator(state.path());
        orch.add_folder(folder.path().to_path_buf(), "mini-384".to_string()).await.unwrap();

        assert!(wait_for_status(&orch, folder.path(), FolderStatus::Active).await);
        let record = orch.fmdm().get_fmdm().folder(folder.path()).cloned().unwrap();
        assert_eq!(record.progress, 100);
        assert!(record.notification.unwrap().mentions_files_indexed());
    }

    #[tokio::test]
    async fn missing_folder_publishes_error_and_fails() {
        let state = tempdir().unwrap();
        let orch = build_orchestrator(state.path());

        let result = orch.add_folder(PathBuf::from("/definitely/not/a/real/path"), "mini-384".to_string()).await;
        assert!(result.is_err());
        let record = orch.fmdm().get_fmdm().folder(Path::new("/definitely/not/a/real/path")).cloned().unwrap();
        assert_eq!(record.status, FolderStatus::Error);
        assert_eq!(record.notification.unwrap().message, "Folder does not exist");
    }

    #[tokio::test]
    async fn adding_the_same_folder_twice_is_a_no_op() {
        let state = tempdir().unwrap();
        let folder = tempdir().unwrap();
        let orch = build_orchestrator(state.path());

        orch.add_folder(folder.path().to_path_buf(), "mini-384".to_string()).await.unwrap();
        orch.add_folder(folder.path().to_path_buf(), "mini-384".to_string()).await.unwrap();

        assert!(wait_for_status(&orch, folder.path(), FolderStatus::Active).await);
        assert_eq!(orch.fmdm().get_fmdm().folders.iter().filter(|f| f.path == folder.path()).count(), 1);
    }

    #[tokio::test]
    async fn remove_folder_deletes_state_and_fmdm_entry() {
        let state = tempdir().unwrap();
        let folder = tempdir().unwrap();
        let orch = build_orchestrator(state.path());

        orch.add_folder(folder.path().to_path_buf(), "mini-384".to_string()).await.unwrap();
        assert!(wait_for_status(&orch, folder.path(), FolderStatus::Active).await);

        orch.remove_folder(folder.path()).await.unwrap();
        assert!(orch.fmdm().get_fmdm().folder(folder.path()).is_none());
        assert!(!folder.path().join(".folder-mcp").exists());
        assert!(orch.get_manager(folder.path()).is_none());
    }

    #[tokio::test]
    async fn model_requiring_download_transitions_through_downloading_model() {
        let state = tempdir().unwrap();
        let folder = tempdir().unwrap();
        let orch = build_orchestrator(state.path());

        orch.add_folder(folder.path().to_path_buf(), "bigger-768".to_string()).await.unwrap();
        assert!(wait_for_status(&orch, folder.path(), FolderStatus::Active).await);
    }

    #[tokio::test]
    async fn unknown_model_is_a_hard_error() {
        let state = tempdir().unwrap();
        let folder = tempdir().unwrap();
        let orch = build_orchestrator(state.path());

        orch.add_folder(folder.path().to_path_buf(), "no-such-model".to_string()).await.unwrap();
        assert!(wait_for_status(&orch, folder.path(), FolderStatus::Error).await);
    }
}
