// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! Strongly-typed identifiers used across the workspace.

crate::define_id! {
    /// Internal identity for a folder's lifecycle manager.
    ///
    /// The externally observed identity of a folder is always its
    /// canonical `path`; `FolderId` exists only so the orchestrator and
    /// the sequential queue can refer to "this manager instance" without
    /// cloning a `PathBuf` everywhere.
    pub struct FolderId("fld-");
}
