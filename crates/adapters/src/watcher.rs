// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! Per-folder recursive file watcher (C6): debounces raw OS events into
//! batched change sets, filtered to the supported-extension set (C1).

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::AdapterError;
use fmcp_core::SupportedExtensions;

/// What a debounced event ultimately means for a path: the watcher only
/// tracks two intents because a file's *final* event in a debounce
/// window decides it (spec.md §4.5: "each group's final event determines
/// intent (`unlink` => delete, otherwise add/modify)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchIntent {
    AddOrModify,
    Delete,
}

/// A batch of changed paths, ready to be handed to the resource manager
/// as a scan-changes operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub add_or_modify: Vec<PathBuf>,
    pub delete: Vec<PathBuf>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.add_or_modify.is_empty() && self.delete.is_empty()
    }

    pub fn len(&self) -> usize {
        self.add_or_modify.len() + self.delete.len()
    }
}

/// Debounce/batch tuning, configurable per folder.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub debounce_ms: u64,
    pub batch_size: usize,
    pub enable_batch_processing: bool,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self { debounce_ms: 2000, batch_size: 10, enable_batch_processing: true }
    }
}

fn is_dotfile(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()).map(|n| n.starts_with('.')).unwrap_or(false)
}

fn is_relevant(path: &Path, extensions: &SupportedExtensions) -> bool {
    !is_dotfile(path) && extensions.is_supported(path)
}

fn batch(drained: Vec<(PathBuf, WatchIntent)>, cfg: &WatcherConfig) -> Vec<ChangeSet> {
    let chunk_size = if cfg.enable_batch_processing { cfg.batch_size.max(1) } else { 1 };
    drained
        .chunks(chunk_size)
        .map(|chunk| {
            let mut set = ChangeSet::default();
            for (path, intent) in chunk {
                match intent {
                    WatchIntent::AddOrModify => set.add_or_modify.push(path.clone()),
                    WatchIntent::Delete => set.delete.push(path.clone()),
                }
            }
            set
        })
        .collect()
}

/// A running watcher for one folder. Dropping or calling [`FolderWatcher::stop`]
/// tears down both the OS watch and the debounce task.
pub struct FolderWatcher {
    _watcher: RecommendedWatcher,
    cancel: CancellationToken,
}

impl FolderWatcher {
    /// Start watching `folder` recursively, filtered to `extensions`,
    /// debounced and batched per `config`. Returns a receiver of change
    /// sets — one per flushed debounce window (or per batch, when
    /// `enable_batch_processing` splits a large window).
    pub fn spawn(
        folder: PathBuf,
        extensions: SupportedExtensions,
        config: WatcherConfig,
    ) -> Result<(Self, mpsc::Receiver<ChangeSet>), AdapterError> {
        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<(PathBuf, WatchIntent)>();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let Ok(event) = res else { return };
            let intent = match event.kind {
                EventKind::Remove(_) => WatchIntent::Delete,
                EventKind::Create(_) | EventKind::Modify(_) => WatchIntent::AddOrModify,
                _ => return,
            };
            for path in event.paths {
                let _ = raw_tx.send((path, intent));
            }
        })?;
        watcher.watch(&folder, RecursiveMode::Recursive)?;

        let (out_tx, out_rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        tokio::spawn(async move {
            let mut pending: HashMap<PathBuf, WatchIntent> = HashMap::new();
            let debounce = Duration::from_millis(config.debounce_ms.max(1));

            loop {
                tokio::select! {
                    biased;
                    _ = task_cancel.cancelled() => break,
                    maybe_event = raw_rx.recv() => {
                        match maybe_event {
                            Some((path, intent)) if is_relevant(&path, &extensions) => {
                                pending.insert(path, intent);
                            }
                            Some(_) => {}
                            None => break,
                        }
                    }
                    _ = tokio::time::sleep(debounce), if !pending.is_empty() => {
                        let drained: Vec<(PathBuf, WatchIntent)> = pending.drain().collect();
                        for set in batch(drained, &config) {
                            if out_tx.send(set).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            }
        });

        Ok((Self { _watcher: watcher, cancel }, out_rx))
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for FolderWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotfiles_are_never_relevant() {
        let exts = SupportedExtensions::canonical();
        assert!(!is_relevant(Path::new("/a/.hidden.md"), &exts));
    }

    #[test]
    fn unsupported_extensions_are_not_relevant() {
        let exts = SupportedExtensions::canonical();
        assert!(!is_relevant(Path::new("/a/photo.png"), &exts));
        assert!(is_relevant(Path::new("/a/readme.md"), &exts));
    }

    #[test]
    fn batching_respects_batch_size_when_enabled() {
        let cfg = WatcherConfig { debounce_ms: 1, batch_size: 2, enable_batch_processing: true };
        let drained: Vec<(PathBuf, WatchIntent)> = (0..5)
            .map(|i| (PathBuf::from(format!("f{i}.md")), WatchIntent::AddOrModify))
            .collect();
        let sets = batch(drained, &cfg);
        assert_eq!(sets.len(), 3); // 2 + 2 + 1
        assert!(sets.iter().all(|s| s.len() <= 2));
    }

    #[test]
    fn batching_is_one_per_item_when_disabled() {
        let cfg = WatcherConfig { debounce_ms: 1, batch_size: 10, enable_batch_processing: false };
        let drained: Vec<(PathBuf, WatchIntent)> = (0..3)
            .map(|i| (PathBuf::from(format!("f{i}.md")), WatchIntent::AddOrModify))
            .collect();
        let sets = batch(drained, &cfg);
        assert_eq!(sets.len(), 3);
    }

    #[tokio::test]
    async fn spawn_and_stop_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let (watcher, _rx) =
            FolderWatcher::spawn(dir.path().to_path_buf(), SupportedExtensions::canonical(), WatcherConfig::default())
                .unwrap();
        watcher.stop();
    }
}
