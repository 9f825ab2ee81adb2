// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("folder already managed: {0}")]
    AlreadyExists(std::path::PathBuf),

    #[error("folder not found: {0}")]
    NotFound(std::path::PathBuf),

    #[error("download failed: {0}")]
    Download(String),

    #[error("embedding backend unavailable: {0}")]
    BackendUnavailable(String),
}
