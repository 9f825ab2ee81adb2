// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! Two narrow seams the sequential indexing queue (C8) drives to keep
//! "exactly one embedding model loaded at a time" (spec.md I1) true:
//!
//! - [`ModelLoader`] makes an already-*installed* model resident (or
//!   evicts it), distinct from [`crate::ModelDownloader`], which only
//!   populates the on-disk cache the first time a model is used.
//! - [`EmbeddingBackendFactory`] builds the concrete `EmbeddingBackend`
//!   handle a folder's lifecycle manager embeds through, once its model
//!   is resolved.

use async_trait::async_trait;
use fmcp_core::ModelDescriptor;
use std::sync::Arc;

use crate::embedding::EmbeddingBackend;
use crate::error::AdapterError;

/// Makes a curated model resident in memory, or evicts it. The queue
/// calls `unload` for the previously-resident model before `load`ing a
/// different one (spec.md §4.3: "unload first, then load the new one").
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, model_id: &str) -> Result<(), AdapterError>;
    async fn unload(&self, model_id: &str) -> Result<(), AdapterError>;
}

/// Builds the concrete [`EmbeddingBackend`] a folder embeds through,
/// once its model descriptor is resolved from the registry.
#[async_trait]
pub trait EmbeddingBackendFactory: Send + Sync {
    async fn build(&self, model: &ModelDescriptor) -> Result<Arc<dyn EmbeddingBackend>, AdapterError>;
}

/// Records load/unload calls in arrival order; lets tests assert I1
/// ("exactly one model loaded at any instant") without a real runtime.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeModelLoader {
    pub calls: parking_lot::Mutex<Vec<String>>,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeModelLoader {
    fn default() -> Self {
        Self { calls: parking_lot::Mutex::new(Vec::new()) }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl FakeModelLoader {
    pub fn history(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl ModelLoader for FakeModelLoader {
    async fn load(&self, model_id: &str) -> Result<(), AdapterError> {
        self.calls.lock().push(format!("load:{model_id}"));
        Ok(())
    }

    async fn unload(&self, model_id: &str) -> Result<(), AdapterError> {
        self.calls.lock().push(format!("unload:{model_id}"));
        Ok(())
    }
}

/// Builds a [`crate::FakeEmbeddingBackend`] sized to the resolved
/// model's dimensions, for tests that exercise the orchestrator/queue
/// without a real ONNX or Python backend.
#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct FakeEmbeddingBackendFactory;

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl EmbeddingBackendFactory for FakeEmbeddingBackendFactory {
    async fn build(&self, model: &ModelDescriptor) -> Result<Arc<dyn EmbeddingBackend>, AdapterError> {
        Ok(Arc::new(crate::FakeEmbeddingBackend::new(model.dimensions)))
    }
}
