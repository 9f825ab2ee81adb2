// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! The folder record projected into the FMDM snapshot.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lifecycle status of a monitored folder, as observed externally.
///
/// `pending -> downloading-model -> scanning -> indexing -> active`, with
/// re-entry into `scanning` from file-watch events and a terminal `error`
/// reachable from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FolderStatus {
    Pending,
    DownloadingModel,
    Scanning,
    Indexing,
    Active,
    Error,
}

crate::simple_display! {
    FolderStatus {
        Pending => "pending",
        DownloadingModel => "downloading-model",
        Scanning => "scanning",
        Indexing => "indexing",
        Active => "active",
        Error => "error",
    }
}

/// Severity of a folder notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Info,
    Warning,
    Error,
}

/// A user-facing message attached to a folder record.
///
/// Error notifications are `{message, type: error}` and replace any
/// info/warning notification on the same folder; they persist until the
/// folder leaves the `error` status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self { message: message.into(), kind: NotificationType::Info }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { message: message.into(), kind: NotificationType::Warning }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { message: message.into(), kind: NotificationType::Error }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NotificationType::Error
    }

    /// Notifications for completed indexing runs contain this marker so
    /// `FmdmService` can preserve them across unrelated `active` updates.
    pub fn mentions_files_indexed(&self) -> bool {
        self.message.contains("files indexed")
    }
}

/// Progress of an in-flight directory scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanningProgress {
    pub phase: String,
    pub processed_files: u64,
    pub total_files: u64,
    pub percentage: u8,
}

/// A single monitored folder as projected into the FMDM snapshot.
///
/// `path` is the absolute, canonicalized folder path and is the folder's
/// identity — it is never re-derived from `status`/`progress`, which are
/// the only mutable fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRecord {
    pub path: PathBuf,
    pub model: String,
    pub status: FolderStatus,
    pub progress: u8,
    pub notification: Option<Notification>,
    pub scanning_progress: Option<ScanningProgress>,
}

impl FolderRecord {
    /// A freshly accepted folder, before any scanning has happened.
    pub fn pending(path: PathBuf, model: impl Into<String>) -> Self {
        Self {
            path,
            model: model.into(),
            status: FolderStatus::Pending,
            progress: 0,
            notification: None,
            scanning_progress: None,
        }
    }

    /// An error record for a folder that never got past admission, e.g.
    /// "Folder does not exist".
    pub fn error(path: PathBuf, model: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path,
            model: model.into(),
            status: FolderStatus::Error,
            progress: 0,
            notification: Some(Notification::error(message)),
            scanning_progress: None,
        }
    }

    /// Validate the cross-field invariants:
    /// `progress in [0,100]`; `status=active => progress=100`;
    /// `status=error => notification.type=error with non-empty message`.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.progress > 100 {
            return Err(CoreError::ProgressOutOfRange(self.progress));
        }
        if self.status == FolderStatus::Active && self.progress != 100 {
            return Err(CoreError::InvariantViolation {
                status: "active",
                requirement: "progress must be 100",
            });
        }
        if self.status == FolderStatus::Error {
            match &self.notification {
                Some(n) if n.is_error() && !n.message.is_empty() => {}
                _ => {
                    return Err(CoreError::InvariantViolation {
                        status: "error",
                        requirement: "notification must be a non-empty error notification",
                    })
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "folder_tests.rs"]
mod tests;
