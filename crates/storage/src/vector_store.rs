// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! The narrow trait boundary for the embedded SQLite+vector storage
//! engine (C3). Its internals — schema, query planning, the actual
//! vector index — are explicitly out of scope (spec.md §1); this crate
//! only defines the contract the lifecycle manager drives it through,
//! plus an in-memory double used by every test in this workspace.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// A single embedded chunk as the lifecycle manager sees it. The actual
/// embedding vector lives behind the embedding backend; the store only
/// needs to know how many chunks a file produced to report them back
/// through `bulk_status`.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedChunk {
    pub chunk_index: usize,
    pub dimension: u32,
}

/// Per-file chunk counts, for the "bulk read for status" contract in
/// spec.md §6.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VectorStoreStatus {
    pub files: Vec<(PathBuf, usize)>,
    pub total_chunks: usize,
}

/// The per-folder vector store (C3).
///
/// Opened with `{folderPath, modelName, modelDimension}`; `close` must
/// release every OS handle before the orchestrator deletes
/// `<folder>/.folder-mcp/` (spec.md §3, Windows grace period note).
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert_chunks(
        &self,
        file_path: &Path,
        chunks: Vec<EmbeddedChunk>,
    ) -> Result<(), StorageError>;

    async fn delete_chunks(&self, file_path: &Path) -> Result<(), StorageError>;

    async fn bulk_status(&self) -> Result<VectorStoreStatus, StorageError>;

    /// Release all OS handles. Called exactly once, from the owning
    /// lifecycle manager's teardown path.
    async fn close(&self) -> Result<(), StorageError>;
}

/// Opens a [`VectorStore`] for a folder. Implemented by the concrete
/// SQLite+vector engine in production; tests use
/// [`InMemoryVectorStoreFactory`].
#[async_trait]
pub trait VectorStoreFactory: Send + Sync {
    async fn open(
        &self,
        folder_path: &Path,
        model_name: &str,
        model_dimension: u32,
    ) -> Result<Box<dyn VectorStore>, StorageError>;
}

/// In-memory [`VectorStore`] used by every engine-level test.
pub struct InMemoryVectorStore {
    chunks: parking_lot::Mutex<std::collections::HashMap<PathBuf, Vec<EmbeddedChunk>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self { chunks: parking_lot::Mutex::new(std::collections::HashMap::new()) }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert_chunks(
        &self,
        file_path: &Path,
        chunks: Vec<EmbeddedChunk>,
    ) -> Result<(), StorageError> {
        self.chunks.lock().insert(file_path.to_path_buf(), chunks);
        Ok(())
    }

    async fn delete_chunks(&self, file_path: &Path) -> Result<(), StorageError> {
        self.chunks.lock().remove(file_path);
        Ok(())
    }

    async fn bulk_status(&self) -> Result<VectorStoreStatus, StorageError> {
        let guard = self.chunks.lock();
        let files: Vec<(PathBuf, usize)> =
            guard.iter().map(|(path, chunks)| (path.clone(), chunks.len())).collect();
        let total_chunks = files.iter().map(|(_, n)| n).sum();
        Ok(VectorStoreStatus { files, total_chunks })
    }

    async fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Factory producing [`InMemoryVectorStore`]s, for tests.
#[derive(Default)]
pub struct InMemoryVectorStoreFactory;

#[async_trait]
impl VectorStoreFactory for InMemoryVectorStoreFactory {
    async fn open(
        &self,
        _folder_path: &Path,
        _model_name: &str,
        _model_dimension: u32,
    ) -> Result<Box<dyn VectorStore>, StorageError> {
        Ok(Box::new(InMemoryVectorStore::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_then_bulk_status_reports_chunk_counts() {
        let store = InMemoryVectorStore::new();
        store
            .upsert_chunks(
                Path::new("a.md"),
                vec![EmbeddedChunk { chunk_index: 0, dimension: 384 }],
            )
            .await
            .unwrap();
        let status = store.bulk_status().await.unwrap();
        assert_eq!(status.total_chunks, 1);
    }

    #[tokio::test]
    async fn delete_removes_the_file_entirely() {
        let store = InMemoryVectorStore::new();
        store
            .upsert_chunks(Path::new("a.md"), vec![EmbeddedChunk { chunk_index: 0, dimension: 384 }])
            .await
            .unwrap();
        store.delete_chunks(Path::new("a.md")).await.unwrap();
        let status = store.bulk_status().await.unwrap();
        assert_eq!(status.total_chunks, 0);
    }
}
