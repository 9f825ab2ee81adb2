// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! The read-only boundary the out-of-scope RPC layer depends on
//! (spec.md §1, §6). Named here so the daemon has something concrete to
//! implement and the RPC layer something concrete to consume, without
//! this crate prescribing anything about `FolderMCP`'s wire shape.

use fmcp_core::Fmdm;
use tokio::sync::{broadcast, watch};

use crate::activity_ring::ActivityEvent;

/// `snapshot()` for a one-shot read, `subscribe()`/`activity()` for
/// readers that want to follow changes as they happen.
pub trait FolderMcpFeed: Send + Sync {
    fn snapshot(&self) -> Fmdm;
    fn subscribe(&self) -> watch::Receiver<Fmdm>;
    fn activity(&self) -> broadcast::Receiver<ActivityEvent>;
}
