// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! The control-socket protocol `fmcpd` speaks and `fmcp` (the CLI)
//! speaks back to it when a daemon is already running. Deliberately
//! narrow — add/remove/list/status plus a liveness ping — mirroring the
//! "thin operator commands" scope named in spec.md §2; this is not a
//! general-purpose RPC surface.

use fmcp_core::{Fmdm, FolderRecord};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    Ping,
    AddFolder { path: PathBuf, model: String },
    RemoveFolder { path: PathBuf },
    ListFolders,
    Status { path: PathBuf },
    Snapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Pong,
    Ok,
    Folders(Vec<FolderRecord>),
    Folder(Option<FolderRecord>),
    Snapshot(Fmdm),
    Error { message: String },
}
