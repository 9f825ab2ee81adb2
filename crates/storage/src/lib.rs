// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fmcp-storage: per-folder persistence.
//!
//! Owns the file-state store (C2, fingerprint persistence) and defines
//! the narrow trait boundary for the embedded SQLite+vector engine (C3),
//! whose internals are out of scope for this workspace.

pub mod error;
pub mod file_state_store;
pub mod fingerprint;
pub mod vector_store;

pub use error::StorageError;
pub use file_state_store::{FileStateStore, JsonFileStateStore};
pub use fingerprint::{content_hash, fingerprint_of, FileFingerprint};
pub use vector_store::{
    EmbeddedChunk, InMemoryVectorStore, InMemoryVectorStoreFactory, VectorStore,
    VectorStoreFactory, VectorStoreStatus,
};
