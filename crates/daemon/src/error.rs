// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Wire(#[from] fmcp_wire::ProtocolError),

    #[error(transparent)]
    Adapter(#[from] fmcp_adapters::AdapterError),

    #[error(transparent)]
    Engine(#[from] fmcp_engine::EngineError),

    #[error("could not determine a state directory: set FMCP_STATE_DIR or $HOME")]
    NoStateDir,

    #[error("another daemon instance already holds the lock at {0}")]
    LockFailed(PathBuf),
}
