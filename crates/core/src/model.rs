// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! Model descriptors and resource limits.

use serde::{Deserialize, Serialize};

/// The family an embedding model belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Onnx,
    Python,
}

crate::simple_display! {
    ModelKind {
        Onnx => "onnx",
        Python => "python",
    }
}

/// A model entry from the curated registry.
///
/// `dimensions` is looked up from the registry at startup; a model id not
/// present in the registry is a hard error (see `fmcp-adapters::registry`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub kind: ModelKind,
    pub dimensions: u32,
    pub installed: bool,
}

/// Bounds for the resource manager.
///
/// Defaults match spec: 2 concurrent operations, 512MB, 60% CPU, a queue
/// of 20, a 2s sample interval, adaptive throttling on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub max_concurrent_operations: usize,
    pub max_memory_mb: u64,
    pub max_cpu_percent: f32,
    pub max_queue_size: usize,
    pub check_interval_ms: u64,
    pub adaptive_throttling: bool,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_concurrent_operations: 2,
            max_memory_mb: 512,
            max_cpu_percent: 60.0,
            max_queue_size: 20,
            check_interval_ms: 2000,
            adaptive_throttling: true,
        }
    }
}

impl ResourceLimits {
    crate::setters! {
        set {
            max_concurrent_operations: usize,
            max_memory_mb: u64,
            max_cpu_percent: f32,
            max_queue_size: usize,
            check_interval_ms: u64,
            adaptive_throttling: bool,
        }
    }
}
