// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! External collaborators (C6, C9) behind narrow trait boundaries: config
//! persistence, the model registry, the embedding backends, and the file
//! watcher. `fmcp-engine` depends only on these traits, never on a
//! concrete downloader, backend, or watcher implementation.

mod config_store;
mod embedding;
mod error;
mod model_loader;
mod registry;
mod watcher;

pub use config_store::{ConfigStore, ConfiguredFolder, FileConfigStore};
pub use embedding::{DownloadProgress, EmbeddingBackend, EmbeddingBatch, FileProcessor, ModelDownloader, TextChunk};
#[cfg(any(test, feature = "test-support"))]
pub use embedding::{FakeEmbeddingBackend, FakeModelDownloader, NullFileProcessor};
pub use error::AdapterError;
pub use model_loader::{EmbeddingBackendFactory, ModelLoader};
#[cfg(any(test, feature = "test-support"))]
pub use model_loader::{FakeEmbeddingBackendFactory, FakeModelLoader};
pub use registry::ModelRegistry;
pub use watcher::{ChangeSet, FolderWatcher, WatcherConfig};
