// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! File-embedding tasks produced by a folder scan diff.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What a file-embedding task should do to the vector store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Add,
    Modify,
    Delete,
}

crate::simple_display! {
    TaskKind {
        Add => "add",
        Modify => "modify",
        Delete => "delete",
    }
}

/// One unit of indexing work against a single file, with a per-folder
/// monotonic id used for ordering and dedup within a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEmbeddingTask {
    pub id: u64,
    pub file_path: PathBuf,
    pub kind: TaskKind,
    pub chunk_count: Option<usize>,
    pub attempt: u32,
}

impl FileEmbeddingTask {
    pub fn new(id: u64, file_path: PathBuf, kind: TaskKind) -> Self {
        Self { id, file_path, kind, chunk_count: None, attempt: 0 }
    }
}

/// Tallies produced after a completed indexing run, folded into
/// `indexComplete`'s notification (`"<N> files indexed - indexing time <T>s"`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexingStats {
    pub file_count: u64,
    pub indexing_time_seconds: f64,
}
