// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! Narrow trait boundaries for the embedding collaborators named in
//! spec.md §6: the ONNX downloader and the Python embedding subprocess.
//! Neither backend is implemented here — the core only depends on these
//! interfaces, wired up at daemon startup (spec.md §9, "Dynamic imports
//! and any-typed collaborators").

use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

use crate::error::AdapterError;

/// Progress callback signature for a model download: `(downloaded_pct)`.
pub type DownloadProgress = tokio::sync::mpsc::UnboundedSender<u8>;

/// Downloads and caches model artefacts (C9), reporting progress via
/// `on_progress`. Must honour `cancel` (spec.md §5: "Downloads honour
/// cancellation").
#[async_trait]
pub trait ModelDownloader: Send + Sync {
    async fn download(
        &self,
        model_id: &str,
        on_progress: DownloadProgress,
        cancel: CancellationToken,
    ) -> Result<(), AdapterError>;
}

/// A single file's content, ready to be embedded. The parser/chunker
/// pipeline that produces these is out of scope (spec.md §1); this type
/// exists only so `EmbeddingBackend` and `FileProcessor` have a concrete
/// seam to agree on.
#[derive(Debug, Clone)]
pub struct TextChunk {
    pub index: usize,
    pub text: String,
}

/// A batch of vectors produced for one file's chunks.
#[derive(Debug, Clone)]
pub struct EmbeddingBatch {
    pub vectors: Vec<Vec<f32>>,
}

/// Either the ONNX runtime or the Python sentence-transformer
/// subprocess, started and health-checked once per daemon run and
/// driven through this trait only.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn health_check(&self) -> Result<(), AdapterError>;
    async fn embed(&self, batch: Vec<TextChunk>) -> Result<EmbeddingBatch, AdapterError>;
}

/// Parses and chunks a single file. Named in spec.md §9's expansion as
/// the seam for "document parsers and chunkers" — out of scope in
/// concrete form, but the lifecycle manager needs something to call.
#[async_trait]
pub trait FileProcessor: Send + Sync {
    async fn parse_and_chunk(&self, path: &Path) -> Result<Vec<TextChunk>, AdapterError>;
}

/// Deterministic test double: chunks a file into one chunk per
/// non-empty line, embeds with a zero vector of the requested
/// dimension. Used across the engine test suite in place of the real
/// ONNX/Python backends.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeEmbeddingBackend {
    pub dimension: u32,
    pub healthy: std::sync::atomic::AtomicBool,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeEmbeddingBackend {
    pub fn new(dimension: u32) -> Self {
        Self { dimension, healthy: std::sync::atomic::AtomicBool::new(true) }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl EmbeddingBackend for FakeEmbeddingBackend {
    async fn health_check(&self) -> Result<(), AdapterError> {
        if self.healthy.load(std::sync::atomic::Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AdapterError::BackendUnavailable("fake backend marked unhealthy".into()))
        }
    }

    async fn embed(&self, batch: Vec<TextChunk>) -> Result<EmbeddingBatch, AdapterError> {
        Ok(EmbeddingBatch {
            vectors: batch.iter().map(|_| vec![0.0_f32; self.dimension as usize]).collect(),
        })
    }
}

/// Chunks a file by splitting on blank lines; good enough to exercise
/// `startIndexing` in tests without a real parser.
#[cfg(any(test, feature = "test-support"))]
pub struct NullFileProcessor;

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl FileProcessor for NullFileProcessor {
    async fn parse_and_chunk(&self, path: &Path) -> Result<Vec<TextChunk>, AdapterError> {
        let contents = tokio::fs::read_to_string(path).await.unwrap_or_default();
        let chunks: Vec<TextChunk> = contents
            .split("\n\n")
            .filter(|s| !s.trim().is_empty())
            .enumerate()
            .map(|(index, text)| TextChunk { index, text: text.to_string() })
            .collect();
        if chunks.is_empty() {
            Ok(vec![TextChunk { index: 0, text: String::new() }])
        } else {
            Ok(chunks)
        }
    }
}

/// A [`ModelDownloader`] that reports a fixed progress sequence and
/// succeeds immediately, for tests that exercise the
/// `downloading-model` transition (spec.md §8 scenario S2).
#[cfg(any(test, feature = "test-support"))]
pub struct FakeModelDownloader {
    pub steps: Vec<u8>,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeModelDownloader {
    fn default() -> Self {
        Self { steps: vec![0, 42, 100] }
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl ModelDownloader for FakeModelDownloader {
    async fn download(
        &self,
        _model_id: &str,
        on_progress: DownloadProgress,
        cancel: CancellationToken,
    ) -> Result<(), AdapterError> {
        for &pct in &self.steps {
            if cancel.is_cancelled() {
                return Err(AdapterError::Download("cancelled".into()));
            }
            let _ = on_progress.send(pct);
        }
        Ok(())
    }
}
