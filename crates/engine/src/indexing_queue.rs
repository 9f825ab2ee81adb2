// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! Daemon-wide single-consumer queue: guarantees at most one embedding
//! model is resident and at most one folder is being scanned or indexed
//! at any instant.

use fmcp_adapters::ModelLoader;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::lifecycle_manager::{FolderLifecycleManager, ScanScope};

/// One folder's place in line: enough to drive it through scan+index
/// without the queue needing to know anything else about it.
pub struct QueueItem {
    pub folder_path: PathBuf,
    pub model: String,
    pub manager: Arc<FolderLifecycleManager>,
    pub scope: ScanScope,
}

/// Queue-level events; the orchestrator only needs these for the
/// `downloading-model`-style coarse status, not per-file progress —
/// granular `progressUpdate`s are wired directly from each manager's own
/// event channel.
#[derive(Debug, Clone)]
pub enum QueueEvent {
    Added { folder_path: PathBuf },
    Started { folder_path: PathBuf },
    ModelLoading { model: String, stage: &'static str },
    ModelLoaded { model: String },
    Completed { folder_path: PathBuf },
    Failed { folder_path: PathBuf, message: String },
    Empty,
}

enum Command {
    Enqueue(QueueItem),
    Remove(PathBuf),
    Stop,
}

/// Handle to the running queue. Cloning shares the same background
/// consumer task.
#[derive(Clone)]
pub struct SequentialIndexingQueue {
    cmd_tx: mpsc::UnboundedSender<Command>,
    events_tx: broadcast::Sender<QueueEvent>,
}

impl SequentialIndexingQueue {
    pub fn start(loader: Arc<dyn ModelLoader>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (events_tx, _rx) = broadcast::channel(256);
        tokio::spawn(run(loader, cmd_rx, events_tx.clone()));
        Self { cmd_tx, events_tx }
    }

    /// Append a folder to the back of the queue.
    pub fn enqueue(&self, item: QueueItem) {
        let folder_path = item.folder_path.clone();
        let _ = self.cmd_tx.send(Command::Enqueue(item));
        let _ = self.events_tx.send(QueueEvent::Added { folder_path });
    }

    /// Drop a folder from the queue; if it is the one currently being
    /// processed, cancels the in-flight scan/index and advances to the
    /// next folder.
    pub fn remove(&self, folder_path: &std::path::Path) {
        let _ = self.cmd_tx.send(Command::Remove(folder_path.to_path_buf()));
    }

    /// Stop accepting new work, cancel the current job, unload the
    /// resident model, and drain.
    pub async fn stop(&self) {
        let _ = self.cmd_tx.send(Command::Stop);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events_tx.subscribe()
    }
}

async fn run(
    loader: Arc<dyn ModelLoader>,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    events_tx: broadcast::Sender<QueueEvent>,
) {
    let mut queue: VecDeque<QueueItem> = VecDeque::new();
    let mut current_model: Option<String> = None;
    let mut stopping = false;

    loop {
        while let Ok(cmd) = cmd_rx.try_recv() {
            apply(cmd, &mut queue, &mut stopping);
        }

        let Some(item) = queue.pop_front() else {
            if stopping {
                break;
            }
            let _ = events_tx.send(QueueEvent::Empty);
            if let Some(model) = current_model.take() {
                let _ = loader.unload(&model).await;
            }
            match cmd_rx.recv().await {
                None => break,
                Some(cmd) => {
                    apply(cmd, &mut queue, &mut stopping);
                    continue;
                }
            }
        };

        let folder_path = item.folder_path.clone();
        let _ = events_tx.send(QueueEvent::Started { folder_path: folder_path.clone() });

        if current_model.as_deref() != Some(item.model.as_str()) {
            if let Some(old) = current_model.take() {
                let _ = events_tx.send(QueueEvent::ModelLoading { model: old.clone(), stage: "unloading" });
                let _ = loader.unload(&old).await;
            }
            let _ = events_tx.send(QueueEvent::ModelLoading { model: item.model.clone(), stage: "loading" });
            if let Err(error) = loader.load(&item.model).await {
                let _ = events_tx.send(QueueEvent::Failed { folder_path, message: error.to_string() });
                continue;
            }
            current_model = Some(item.model.clone());
            let _ = events_tx.send(QueueEvent::ModelLoaded { model: item.model.clone() });
        }

        let cancel = CancellationToken::new();
        let manager = item.manager.clone();
        let scope = item.scope.clone();
        let scan_cancel = cancel.clone();
        let process = Box::pin(async move {
            manager.start_scanning(scope, scan_cancel.clone()).await?;
            manager.start_indexing(scan_cancel).await?;
            Ok::<(), EngineError>(())
        });
        tokio::pin!(process);

        let result = loop {
            tokio::select! {
                res = &mut process => break res,
                cmd = cmd_rx.recv() => match cmd {
                    None => { cancel.cancel(); break Err(EngineError::Cancelled); }
                    Some(Command::Remove(path)) if path == folder_path => {
                        cancel.cancel();
                    }
                    Some(cmd) => apply(cmd, &mut queue, &mut stopping),
                }
            }
        };

        match result {
            Ok(()) => {
                let _ = events_tx.send(QueueEvent::Completed { folder_path });
            }
            Err(error) => {
                let _ = events_tx.send(QueueEvent::Failed { folder_path, message: error.to_string() });
            }
        }

        if stopping && queue.is_empty() {
            break;
        }
    }

    if let Some(model) = current_model {
        let _ = loader.unload(&model).await;
    }
}

fn apply(cmd: Command, queue: &mut VecDeque<QueueItem>, stopping: &mut bool) {
    match cmd {
        Command::Enqueue(item) => queue.push_back(item),
        Command::Remove(path) => queue.retain(|i| i.folder_path != path),
        Command::Stop => *stopping = true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmcp_adapters::{FakeEmbeddingBackend, FakeModelLoader, NullFileProcessor};
    use fmcp_core::SystemClock;
    use fmcp_storage::{InMemoryVectorStore, JsonFileStateStore};
    use std::time::Duration;
    use tempfile::tempdir;

    fn build_manager(folder: &std::path::Path, model: &str, dim: u32) -> Arc<FolderLifecycleManager> {
        let store = JsonFileStateStore::open(&folder.join(".folder-mcp")).unwrap();
        let (manager, _events) = FolderLifecycleManager::new(
            folder.to_path_buf(),
            model.to_string(),
            Box::new(store),
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(NullFileProcessor),
            Arc::new(FakeEmbeddingBackend::new(dim)),
            fmcp_core::SupportedExtensions::canonical(),
            Arc::new(SystemClock),
        );
        Arc::new(manager)
    }

    #[tokio::test]
    async fn processes_one_folder_to_completion_and_reports_events() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "hello").unwrap();
        let loader = Arc::new(FakeModelLoader::default());
        let queue = SequentialIndexingQueue::start(loader.clone());
        let mut events = queue.subscribe();

        let manager = build_manager(dir.path(), "mini-384", 8);
        queue.enqueue(QueueItem { folder_path: dir.path().to_path_buf(), model: "mini-384".into(), manager: manager.clone(), scope: ScanScope::Full });

        let mut saw_completed = false;
        for _ in 0..10 {
            match tokio::time::timeout(Duration::from_millis(500), events.recv()).await {
                Ok(Ok(QueueEvent::Completed { .. })) => {
                    saw_completed = true;
                    break;
                }
                Ok(Ok(_)) => continue,
                _ => break,
            }
        }
        assert!(saw_completed);
        assert_eq!(manager.snapshot().status, fmcp_core::FolderStatus::Active);
        assert_eq!(loader.history(), vec!["load:mini-384"]);
    }

    #[tokio::test]
    async fn switching_models_unloads_before_loading_the_next() {
        let dir_a = tempdir().unwrap();
        let dir_b = tempdir().unwrap();
        let loader = Arc::new(FakeModelLoader::default());
        let queue = SequentialIndexingQueue::start(loader.clone());
        let mut events = queue.subscribe();

        let manager_a = build_manager(dir_a.path(), "mini-384", 8);
        let manager_b = build_manager(dir_b.path(), "bigger-768", 16);
        queue.enqueue(QueueItem { folder_path: dir_a.path().to_path_buf(), model: "mini-384".into(), manager: manager_a, scope: ScanScope::Full });
        queue.enqueue(QueueItem { folder_path: dir_b.path().to_path_buf(), model: "bigger-768".into(), manager: manager_b, scope: ScanScope::Full });

        let mut completed = 0;
        for _ in 0..20 {
            match tokio::time::timeout(Duration::from_millis(500), events.recv()).await {
                Ok(Ok(QueueEvent::Completed { .. })) => {
                    completed += 1;
                    if completed == 2 {
                        break;
                    }
                }
                Ok(Ok(_)) => continue,
                _ => break,
            }
        }
        assert_eq!(completed, 2);
        assert_eq!(loader.history(), vec!["load:mini-384", "unload:mini-384", "load:bigger-768"]);
    }

    #[tokio::test]
    async fn removing_the_active_folder_cancels_it_and_advances() {
        let dir_a = tempdir().unwrap();
        let dir_b = tempdir().unwrap();
        std::fs::write(dir_b.path().join("b.md"), "hello").unwrap();
        let loader = Arc::new(FakeModelLoader::default());
        let queue = SequentialIndexingQueue::start(loader);
        let mut events = queue.subscribe();

        let manager_a = build_manager(dir_a.path(), "mini-384", 8);
        let manager_b = build_manager(dir_b.path(), "mini-384", 8);
        queue.enqueue(QueueItem { folder_path: dir_a.path().to_path_buf(), model: "mini-384".into(), manager: manager_a, scope: ScanScope::Full });
        queue.enqueue(QueueItem { folder_path: dir_b.path().to_path_buf(), model: "mini-384".into(), manager: manager_b.clone(), scope: ScanScope::Full });
        queue.remove(dir_a.path());

        let mut saw_b_completed = false;
        for _ in 0..20 {
            match tokio::time::timeout(Duration::from_millis(500), events.recv()).await {
                Ok(Ok(QueueEvent::Completed { folder_path })) if folder_path == dir_b.path() => {
                    saw_b_completed = true;
                    break;
                }
                Ok(Ok(_)) => continue,
                _ => break,
            }
        }
        assert!(saw_b_completed);
        assert_eq!(manager_b.snapshot().status, fmcp_core::FolderStatus::Active);
    }
}
