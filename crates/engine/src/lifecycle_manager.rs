// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! Per-folder lifecycle state machine (C7): scan → diff → index, emitting
//! typed events the orchestrator wires into FMDM updates. Owns that
//! folder's `FileStateStore` and `VectorStore` exclusively — no other
//! task ever touches them directly (spec.md §3).

use fmcp_adapters::{ChangeSet, EmbeddingBackend, FileProcessor};
use fmcp_core::{
    ClockSource, FileEmbeddingTask, FolderId, FolderStatus, IndexingStats, ScanningProgress, SupportedExtensions,
    TaskKind,
};
use fmcp_storage::{fingerprint_of, FileFingerprint, FileStateStore, VectorStore};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;

/// What a scan should cover: a full recursive walk (initial `addFolder`
/// scan and the periodic full rescan) or just the paths a watcher
/// debounce window reported (spec.md §4.5).
#[derive(Clone)]
pub enum ScanScope {
    Full,
    Incremental(ChangeSet),
}

/// Events emitted by a manager, consumed by the orchestrator's event
/// wiring (spec.md §4.1 "Event wiring").
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    StateChange { status: FolderStatus },
    ScanningProgress(ScanningProgress),
    ScanComplete { tasks: Vec<FileEmbeddingTask> },
    ProgressUpdate { percentage: u8 },
    IndexComplete { stats: IndexingStats },
    Error { message: String },
}

/// The lifecycle state owned by one manager (spec.md §3).
#[derive(Debug, Clone)]
pub struct LifecycleState {
    pub id: FolderId,
    pub path: PathBuf,
    pub model: String,
    pub status: FolderStatus,
    pub file_embedding_tasks: Vec<FileEmbeddingTask>,
    pub progress: u8,
    pub scanning_progress: Option<ScanningProgress>,
    pub indexing_stats: Option<IndexingStats>,
    pub error_message: Option<String>,
}

impl LifecycleState {
    fn new(path: PathBuf, model: String) -> Self {
        Self {
            id: FolderId::new(),
            path,
            model,
            status: FolderStatus::Pending,
            file_embedding_tasks: Vec::new(),
            progress: 0,
            scanning_progress: None,
            indexing_stats: None,
            error_message: None,
        }
    }
}

pub struct FolderLifecycleManager {
    state: Mutex<LifecycleState>,
    file_state_store: Mutex<Box<dyn FileStateStore>>,
    vector_store: Arc<dyn VectorStore>,
    file_processor: Arc<dyn FileProcessor>,
    embedding_backend: Arc<dyn EmbeddingBackend>,
    extensions: SupportedExtensions,
    clock: Arc<dyn ClockSource>,
    events_tx: mpsc::UnboundedSender<LifecycleEvent>,
    next_task_id: AtomicU64,
}

impl FolderLifecycleManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        path: PathBuf,
        model: String,
        file_state_store: Box<dyn FileStateStore>,
        vector_store: Arc<dyn VectorStore>,
        file_processor: Arc<dyn FileProcessor>,
        embedding_backend: Arc<dyn EmbeddingBackend>,
        extensions: SupportedExtensions,
        clock: Arc<dyn ClockSource>,
    ) -> (Self, mpsc::UnboundedReceiver<LifecycleEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let manager = Self {
            state: Mutex::new(LifecycleState::new(path, model)),
            file_state_store: Mutex::new(file_state_store),
            vector_store,
            file_processor,
            embedding_backend,
            extensions,
            clock,
            events_tx,
            next_task_id: AtomicU64::new(0),
        };
        (manager, events_rx)
    }

    pub fn snapshot(&self) -> LifecycleState {
        self.state.lock().clone()
    }

    pub fn path(&self) -> PathBuf {
        self.state.lock().path.clone()
    }

    /// Release the vector store's OS handles. The orchestrator calls this
    /// before deleting `.folder-mcp/` (spec.md §6: storage collaborator
    /// "close releasing all OS handles before C10 deletes the directory").
    pub async fn close(&self) -> Result<(), EngineError> {
        self.vector_store.close().await.map_err(EngineError::Storage)
    }

    fn set_status(&self, status: FolderStatus) {
        self.state.lock().status = status;
        let _ = self.events_tx.send(LifecycleEvent::StateChange { status });
    }

    fn fail(&self, message: impl Into<String>) -> EngineError {
        let message = message.into();
        {
            let mut state = self.state.lock();
            state.status = FolderStatus::Error;
            state.error_message = Some(message.clone());
        }
        let _ = self.events_tx.send(LifecycleEvent::Error { message: message.clone() });
        EngineError::AdmissionRejected(message)
    }

    /// Walk (or diff against a watcher-reported change set), classify
    /// each candidate as add/modify/delete against the stored
    /// fingerprints, and emit `ScanComplete` once done.
    pub async fn start_scanning(&self, scope: ScanScope, cancel: CancellationToken) -> Result<(), EngineError> {
        self.set_status(FolderStatus::Scanning);
        let folder_path = self.path();

        if !folder_path.exists() {
            return Err(self.fail("Folder does not exist"));
        }

        let (candidates, explicit_deletes): (Vec<PathBuf>, Vec<PathBuf>) = match &scope {
            ScanScope::Full => (walk_supported_files(&folder_path, &self.extensions), Vec::new()),
            ScanScope::Incremental(set) => (set.add_or_modify.clone(), set.delete.clone()),
        };

        let total = candidates.len() as u64;
        let mut tasks = Vec::new();
        let mut seen_relative = std::collections::HashSet::new();
        let mut last_emit = self.clock.now();

        for (processed, absolute) in candidates.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            let Ok(relative) = absolute.strip_prefix(&folder_path) else { continue };
            let relative = relative.to_path_buf();
            seen_relative.insert(relative.clone());

            match diff_one(&*self.file_state_store.lock(), &relative, absolute) {
                Ok(Some((kind, _fingerprint))) => {
                    tasks.push(self.new_task(absolute.clone(), kind));
                }
                Ok(None) => {}
                Err(_) => continue, // vanished mid-scan; treated as no-op, next scan will see the delete
            }

            if self.clock.now().duration_since(last_emit) >= Duration::from_millis(500) || processed as u64 + 1 == total {
                let _ = self.events_tx.send(LifecycleEvent::ScanningProgress(ScanningProgress {
                    phase: "scanning".into(),
                    processed_files: processed as u64 + 1,
                    total_files: total,
                    percentage: progress_percentage(processed as u64 + 1, total),
                }));
                last_emit = self.clock.now();
            }
        }

        match scope {
            ScanScope::Full => {
                let stale: Vec<PathBuf> = self
                    .file_state_store
                    .lock()
                    .all()
                    .map(|fp| fp.relative_path.clone())
                    .filter(|rel| !seen_relative.contains(rel))
                    .collect();
                for relative in stale {
                    tasks.push(self.new_task(folder_path.join(&relative), TaskKind::Delete));
                }
            }
            ScanScope::Incremental(_) => {
                for absolute in explicit_deletes {
                    tasks.push(self.new_task(absolute, TaskKind::Delete));
                }
            }
        }

        self.state.lock().file_embedding_tasks = tasks.clone();
        let _ = self.events_tx.send(LifecycleEvent::ScanComplete { tasks });
        Ok(())
    }

    fn new_task(&self, file_path: PathBuf, kind: TaskKind) -> FileEmbeddingTask {
        let id = self.next_task_id.fetch_add(1, Ordering::SeqCst);
        FileEmbeddingTask::new(id, file_path, kind)
    }

    /// Consume the pending tasks sequentially: parse → chunk → embed →
    /// upsert for add/modify, drop vectors+fingerprint for delete.
    /// Per-file failures are logged and do not move the folder to
    /// `error` (spec.md §4.2).
    pub async fn start_indexing(&self, cancel: CancellationToken) -> Result<(), EngineError> {
        let tasks = self.state.lock().file_embedding_tasks.clone();
        if tasks.is_empty() {
            // spec.md §4.1: `scanComplete -> (startIndexing if tasks else
            // active)`. A folder with nothing to embed must never be
            // observed as `indexing` (the data model ties
            // `file_embedding_tasks` nonempty to `status=indexing`), so
            // skip straight to `active` rather than transiting through it.
            let stats = IndexingStats { file_count: 0, indexing_time_seconds: 0.0 };
            {
                let mut state = self.state.lock();
                state.status = FolderStatus::Active;
                state.progress = 100;
                state.indexing_stats = Some(stats);
                state.error_message = None;
            }
            let _ = self.events_tx.send(LifecycleEvent::IndexComplete { stats });
            return Ok(());
        }

        if let Err(error) = self.embedding_backend.health_check().await {
            return Err(self.fail(error.to_string()));
        }

        self.set_status(FolderStatus::Indexing);
        let folder_path = self.path();
        let total = tasks.len() as u64;
        let start = self.clock.now();
        let mut file_count = 0u64;

        for (processed, task) in tasks.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            let relative = match task.file_path.strip_prefix(&folder_path) {
                Ok(r) => r.to_path_buf(),
                Err(_) => task.file_path.clone(),
            };

            match task.kind {
                TaskKind::Add | TaskKind::Modify => {
                    if let Err(error) = self.index_one_file(&task.file_path, &relative).await {
                        tracing::warn!(file = %task.file_path.display(), %error, "per-file indexing error");
                    } else {
                        file_count += 1;
                    }
                }
                TaskKind::Delete => {
                    let _ = self.vector_store.delete_chunks(&task.file_path).await;
                    self.file_state_store.lock().remove(&relative);
                }
            }

            let percentage = progress_percentage(processed as u64 + 1, total);
            self.state.lock().progress = percentage;
            let _ = self.events_tx.send(LifecycleEvent::ProgressUpdate { percentage });
        }

        self.file_state_store
            .lock()
            .flush()
            .map_err(|e| self.fail(format!("failed to persist file state: {e}")))?;

        let elapsed = self.clock.now().duration_since(start).as_secs_f64();
        let stats = IndexingStats { file_count, indexing_time_seconds: elapsed };

        {
            let mut state = self.state.lock();
            state.status = FolderStatus::Active;
            state.progress = 100;
            state.indexing_stats = Some(stats);
            state.file_embedding_tasks.clear();
            state.error_message = None;
        }
        let _ = self.events_tx.send(LifecycleEvent::IndexComplete { stats });
        Ok(())
    }

    async fn index_one_file(&self, absolute: &Path, relative: &Path) -> Result<(), EngineError> {
        let chunks = self.file_processor.parse_and_chunk(absolute).await?;
        let batch = self.embedding_backend.embed(chunks).await?;
        let embedded = batch
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| fmcp_storage::EmbeddedChunk { chunk_index: i, dimension: v.len() as u32 })
            .collect();
        self.vector_store.upsert_chunks(absolute, embedded).await?;

        let metadata = std::fs::metadata(absolute).map_err(fmcp_storage::StorageError::from)?;
        let mtime_ns = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let bytes = std::fs::read(absolute).map_err(fmcp_storage::StorageError::from)?;
        let fingerprint = fingerprint_of(relative, &bytes, metadata.len(), mtime_ns);
        self.file_state_store.lock().upsert(fingerprint);
        Ok(())
    }
}

/// Shared by `start_scanning` and `start_indexing` (I3): a non-decreasing
/// function of `processed` for a fixed `total`, always landing in `0..=100`
/// and hitting exactly 100 once `processed == total`.
fn progress_percentage(processed: u64, total: u64) -> u8 {
    if total == 0 {
        100
    } else {
        ((processed * 100) / total) as u8
    }
}

fn diff_one(
    store: &dyn FileStateStore,
    relative: &Path,
    absolute: &Path,
) -> std::io::Result<Option<(TaskKind, FileFingerprint)>> {
    let metadata = std::fs::metadata(absolute)?;
    let size = metadata.len();
    let mtime_ns = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    match store.get(relative) {
        None => {
            let bytes = std::fs::read(absolute)?;
            Ok(Some((TaskKind::Add, fingerprint_of(relative, &bytes, size, mtime_ns))))
        }
        Some(existing) => {
            let cheap = FileFingerprint::new(relative.to_path_buf(), size, mtime_ns, String::new());
            if existing.cheaply_equal(&cheap) {
                return Ok(None);
            }
            let bytes = std::fs::read(absolute)?;
            let fingerprint = fingerprint_of(relative, &bytes, size, mtime_ns);
            if fingerprint.content_hash == existing.content_hash {
                Ok(None)
            } else {
                Ok(Some((TaskKind::Modify, fingerprint)))
            }
        }
    }
}

fn walk_supported_files(root: &Path, extensions: &SupportedExtensions) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else { continue };
        for entry in entries.flatten() {
            let path = entry.path();
            let is_dotfile = path.file_name().and_then(|n| n.to_str()).map(|n| n.starts_with('.')).unwrap_or(false);
            if is_dotfile {
                continue;
            }
            if path.is_dir() {
                stack.push(path);
            } else if extensions.is_supported(&path) {
                out.push(path);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmcp_adapters::{FakeEmbeddingBackend, NullFileProcessor};
    use fmcp_core::SystemClock;
    use fmcp_storage::{InMemoryVectorStore, JsonFileStateStore};
    use tempfile::tempdir;

    fn build(
        folder: &Path,
    ) -> (FolderLifecycleManager, mpsc::UnboundedReceiver<LifecycleEvent>) {
        let store = JsonFileStateStore::open(&folder.join(".folder-mcp")).unwrap();
        FolderLifecycleManager::new(
            folder.to_path_buf(),
            "mini-384".to_string(),
            Box::new(store),
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(NullFileProcessor),
            Arc::new(FakeEmbeddingBackend::new(8)),
            SupportedExtensions::canonical(),
            Arc::new(SystemClock),
        )
    }

    #[tokio::test]
    async fn full_scan_then_index_reaches_active_with_one_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("readme.md"), "hello\n\nworld").unwrap();
        let (manager, mut events) = build(dir.path());

        manager.start_scanning(ScanScope::Full, CancellationToken::new()).await.unwrap();
        manager.start_indexing(CancellationToken::new()).await.unwrap();

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.status, FolderStatus::Active);
        assert_eq!(snapshot.progress, 100);
        assert_eq!(snapshot.indexing_stats.unwrap().file_count, 1);

        let mut saw_index_complete = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, LifecycleEvent::IndexComplete { .. }) {
                saw_index_complete = true;
            }
        }
        assert!(saw_index_complete);
    }

    #[tokio::test]
    async fn empty_folder_reaches_active_with_zero_files() {
        let dir = tempdir().unwrap();
        let (manager, mut events) = build(dir.path());

        manager.start_scanning(ScanScope::Full, CancellationToken::new()).await.unwrap();
        assert!(manager.snapshot().file_embedding_tasks.is_empty());
        manager.start_indexing(CancellationToken::new()).await.unwrap();
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.status, FolderStatus::Active);
        assert_eq!(snapshot.indexing_stats.unwrap().file_count, 0);

        // A folder with nothing to embed must never be observed in
        // `Indexing` — only a `StateChange` to `Active` (from scanning)
        // plus the terminal `IndexComplete`.
        let mut saw_indexing = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, LifecycleEvent::StateChange { status: FolderStatus::Indexing }) {
                saw_indexing = true;
            }
        }
        assert!(!saw_indexing);
    }

    #[tokio::test]
    async fn rescanning_unchanged_folder_produces_zero_tasks() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("readme.md"), "hello").unwrap();
        let (manager, _events) = build(dir.path());

        manager.start_scanning(ScanScope::Full, CancellationToken::new()).await.unwrap();
        manager.start_indexing(CancellationToken::new()).await.unwrap();

        manager.start_scanning(ScanScope::Full, CancellationToken::new()).await.unwrap();
        assert!(manager.snapshot().file_embedding_tasks.is_empty());
    }

    #[tokio::test]
    async fn missing_folder_fails_the_manager() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("gone");
        let (manager, _events) = build(&missing);

        let result = manager.start_scanning(ScanScope::Full, CancellationToken::new()).await;
        assert!(result.is_err());
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.status, FolderStatus::Error);
        assert_eq!(snapshot.error_message.as_deref(), Some("Folder does not exist"));
    }

    #[tokio::test]
    async fn deleted_file_produces_a_delete_task_on_next_full_scan() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("readme.md");
        std::fs::write(&file, "hello").unwrap();
        let (manager, _events) = build(dir.path());

        manager.start_scanning(ScanScope::Full, CancellationToken::new()).await.unwrap();
        manager.start_indexing(CancellationToken::new()).await.unwrap();

        std::fs::remove_file(&file).unwrap();
        manager.start_scanning(ScanScope::Full, CancellationToken::new()).await.unwrap();
        let tasks = manager.snapshot().file_embedding_tasks;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].kind, TaskKind::Delete);
    }

    proptest::proptest! {
        /// I3: progress never decreases within a run — for any fixed
        /// `total`, walking `processed` from 0 up to `total` one step at a
        /// time produces a non-decreasing sequence of percentages that
        /// lands on exactly 100 once every file has been processed.
        #[test]
        fn progress_percentage_is_monotonic_across_a_run(total in 1u64..5_000) {
            let mut last = 0u8;
            for processed in 0..=total {
                let percentage = progress_percentage(processed, total);
                proptest::prop_assert!(percentage >= last);
                proptest::prop_assert!(percentage <= 100);
                last = percentage;
            }
            proptest::prop_assert_eq!(last, 100);
        }

        #[test]
        fn progress_percentage_on_an_empty_run_is_always_complete(processed in 0u64..10) {
            proptest::prop_assert_eq!(progress_percentage(processed, 0), 100);
        }
    }
}
