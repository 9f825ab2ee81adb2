// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("folder does not exist: {0}")]
    FolderDoesNotExist(PathBuf),

    #[error("folder already managed: {0}")]
    AlreadyManaged(PathBuf),

    #[error("folder not managed: {0}")]
    NotManaged(PathBuf),

    #[error(transparent)]
    Adapter(#[from] fmcp_adapters::AdapterError),

    #[error(transparent)]
    Storage(#[from] fmcp_storage::StorageError),

    #[error(transparent)]
    Core(#[from] fmcp_core::CoreError),

    #[error("resource manager rejected admission: {0}")]
    AdmissionRejected(String),

    #[error("operation cancelled")]
    Cancelled,
}
