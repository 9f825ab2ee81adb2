// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! The single authoritative FMDM projection. Every status, progress, and
//! notification mutation anywhere in this workspace routes through one
//! of the methods below — nothing else constructs or mutates a
//! `FolderRecord` in place.

use fmcp_core::{Fmdm, FolderRecord, FolderStatus, ModelDescriptor, Notification, ScanningProgress};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;

/// Holds one FMDM snapshot and publishes a new one on every change.
pub struct FmdmService {
    inner: Arc<Mutex<Fmdm>>,
    publish_tx: watch::Sender<Fmdm>,
}

impl FmdmService {
    pub fn new() -> Self {
        let initial = Fmdm::empty();
        let (publish_tx, _rx) = watch::channel(initial.clone());
        Self { inner: Arc::new(Mutex::new(initial)), publish_tx }
    }

    /// Rehydrate from a snapshot persisted at a previous daemon run,
    /// without bumping its version (no publish happens here — daemon
    /// startup publishes once rehydration finishes).
    pub fn restore(snapshot: Fmdm) -> Self {
        let (publish_tx, _rx) = watch::channel(snapshot.clone());
        Self { inner: Arc::new(Mutex::new(snapshot)), publish_tx }
    }

    pub fn get_fmdm(&self) -> Fmdm {
        self.inner.lock().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Fmdm> {
        self.publish_tx.subscribe()
    }

    /// Replace the whole folder list (used by `addFolder`/`removeFolder`
    /// and daemon-start rehydration).
    pub fn update_folders(&self, folders: Vec<FolderRecord>) {
        self.mutate(|fmdm| fmdm.folders = folders);
    }

    pub fn update_installed_models(&self, installed_models: Vec<ModelDescriptor>) {
        self.mutate(|fmdm| fmdm.installed_models = installed_models);
    }

    /// Insert or replace a single folder record wholesale — used for the
    /// initial `addFolder` insertion and for the error/cleanup paths
    /// where the whole record is being replaced at once.
    pub fn put_folder(&self, record: FolderRecord) {
        self.mutate(|fmdm| {
            if let Some(slot) = fmdm.folders.iter_mut().find(|f| f.path == record.path) {
                *slot = record;
            } else {
                fmdm.folders.push(record);
            }
        });
    }

    pub fn remove_folder(&self, path: &Path) {
        self.mutate(|fmdm| fmdm.folders.retain(|f| f.path != path));
    }

    /// `updateFolderStatus` — changes status (and notification, with the
    /// preservation policy below). Silently a no-op if the folder is
    /// unknown.
    pub fn update_folder_status(
        &self,
        path: &Path,
        status: FolderStatus,
        notification: Option<Notification>,
    ) {
        self.mutate(|fmdm| {
            let Some(record) = fmdm.folders.iter_mut().find(|f| f.path == path) else { return };
            let leaving_indexing = record.status == FolderStatus::Indexing && status != FolderStatus::Indexing;
            let leaving_scanning = record.status == FolderStatus::Scanning && status != FolderStatus::Scanning;
            record.status = status;
            if status == FolderStatus::Active {
                record.progress = 100;
            }
            if leaving_scanning {
                record.scanning_progress = None;
            }
            match notification {
                Some(n) => record.notification = Some(n),
                None => {
                    let preserve = match &record.notification {
                        Some(n) if n.is_error() => status == FolderStatus::Error,
                        Some(n) if status == FolderStatus::Active && n.mentions_files_indexed() => true,
                        _ => !leaving_indexing,
                    };
                    if !preserve {
                        record.notification = None;
                    }
                }
            }
        });
    }

    /// `updateFolderProgress`.
    pub fn update_folder_progress(&self, path: &Path, percentage: u8) {
        self.mutate(|fmdm| {
            if let Some(record) = fmdm.folders.iter_mut().find(|f| f.path == path) {
                record.progress = percentage.min(100);
            }
        });
    }

    /// Records the live `scanning` phase progress; cleared automatically
    /// once the folder leaves `scanning` via [`Self::update_folder_status`].
    pub fn update_folder_scanning_progress(&self, path: &Path, progress: ScanningProgress) {
        self.mutate(|fmdm| {
            if let Some(record) = fmdm.folders.iter_mut().find(|f| f.path == path) {
                record.scanning_progress = Some(progress);
            }
        });
    }

    /// `updateFolderNotification`.
    pub fn update_folder_notification(&self, path: &Path, notification: Notification) {
        self.mutate(|fmdm| {
            if let Some(record) = fmdm.folders.iter_mut().find(|f| f.path == path) {
                record.notification = Some(notification);
            }
        });
    }

    /// Apply `f` to a working copy, bump the version, and publish only
    /// if the content actually changed — a no-op mutation should not
    /// still tick the version since nothing observable changed.
    fn mutate(&self, f: impl FnOnce(&mut Fmdm)) {
        let mut guard = self.inner.lock();
        let mut next = guard.clone();
        f(&mut next);
        if guard.content_eq(&next) {
            return;
        }
        next.version = guard.version + 1;
        *guard = next.clone();
        drop(guard);
        let _ = self.publish_tx.send(next);
    }
}

impl Default for FmdmService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn put_then_update_status_bumps_version_once_per_change() {
        let service = FmdmService::new();
        let v0 = service.get_fmdm().version;
        service.put_folder(FolderRecord::pending(PathBuf::from("/data/a"), "mini-384"));
        let v1 = service.get_fmdm().version;
        assert!(v1 > v0);

        service.update_folder_status(Path::new("/data/a"), FolderStatus::Scanning, None);
        let v2 = service.get_fmdm().version;
        assert!(v2 > v1);
    }

    #[test]
    fn no_op_mutation_does_not_bump_version() {
        let service = FmdmService::new();
        service.put_folder(FolderRecord::pending(PathBuf::from("/data/a"), "mini-384"));
        let before = service.get_fmdm().version;
        service.update_folders(service.get_fmdm().folders);
        assert_eq!(service.get_fmdm().version, before);
    }

    #[test]
    fn error_notification_is_preserved_while_status_stays_error() {
        let service = FmdmService::new();
        service.put_folder(FolderRecord::error(PathBuf::from("/data/a"), "mini-384", "boom"));
        service.update_folder_status(Path::new("/data/a"), FolderStatus::Error, None);
        let record = service.get_fmdm().folder(Path::new("/data/a")).cloned().unwrap();
        assert!(record.notification.unwrap().is_error());
    }

    #[test]
    fn active_transition_sets_progress_to_100() {
        let service = FmdmService::new();
        service.put_folder(FolderRecord::pending(PathBuf::from("/data/a"), "mini-384"));
        service.update_folder_status(
            Path::new("/data/a"),
            FolderStatus::Active,
            Some(Notification::info("1 files indexed")),
        );
        let record = service.get_fmdm().folder(Path::new("/data/a")).cloned().unwrap();
        assert_eq!(record.progress, 100);
        assert!(record.notification.unwrap().mentions_files_indexed());
    }

    #[test]
    fn scanning_progress_clears_once_scan_finishes() {
        let service = FmdmService::new();
        service.put_folder(FolderRecord::pending(PathBuf::from("/data/a"), "mini-384"));
        service.update_folder_status(Path::new("/data/a"), FolderStatus::Scanning, None);
        service.update_folder_scanning_progress(
            Path::new("/data/a"),
            fmcp_core::ScanningProgress { phase: "scanning".into(), processed_files: 1, total_files: 4, percentage: 25 },
        );
        assert!(service.get_fmdm().folder(Path::new("/data/a")).unwrap().scanning_progress.is_some());

        service.update_folder_status(Path::new("/data/a"), FolderStatus::Indexing, None);
        assert!(service.get_fmdm().folder(Path::new("/data/a")).unwrap().scanning_progress.is_none());
    }

    #[test]
    fn progress_notification_clears_when_leaving_indexing() {
        let service = FmdmService::new();
        service.put_folder(FolderRecord::pending(PathBuf::from("/data/a"), "mini-384"));
        service.update_folder_status(Path::new("/data/a"), FolderStatus::Indexing, None);
        service.update_folder_notification(Path::new("/data/a"), Notification::info("scanning: 40%"));
        service.update_folder_status(Path::new("/data/a"), FolderStatus::Active, None);
        let record = service.get_fmdm().folder(Path::new("/data/a")).cloned().unwrap();
        assert!(record.notification.is_none());
    }

    proptest::proptest! {
        /// I6: replaying the same progress value never bumps the version
        /// (it's a no-op mutation), while a genuinely different value
        /// always bumps it by exactly one — regardless of how many
        /// repeats precede it.
        #[test]
        fn version_only_advances_on_an_actual_progress_change(
            progresses in proptest::collection::vec(0u8..=100, 1..20),
        ) {
            let service = FmdmService::new();
            service.put_folder(FolderRecord::pending(PathBuf::from("/data/a"), "mini-384"));
            let mut last_progress = 0u8;
            let mut last_version = service.get_fmdm().version;

            for progress in progresses {
                let before = service.get_fmdm().version;
                service.update_folder_progress(Path::new("/data/a"), progress);
                let after = service.get_fmdm().version;

                if progress == last_progress {
                    proptest::prop_assert_eq!(after, before);
                } else {
                    proptest::prop_assert_eq!(after, before + 1);
                }
                last_progress = progress;
                last_version = last_version.max(after);
                proptest::prop_assert_eq!(service.get_fmdm().version, last_version);
            }
        }
    }
}
