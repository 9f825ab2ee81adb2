// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! Error types shared by every crate that depends on `fmcp-core`.

use thiserror::Error;

/// Errors raised by the domain types in this crate.
///
/// Kept deliberately small: `fmcp-core` is pure data plus invariant
/// checks, so almost everything here is a validation failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("progress must be in 0..=100, got {0}")]
    ProgressOutOfRange(u8),

    #[error("status {status} requires {requirement}")]
    InvariantViolation { status: &'static str, requirement: &'static str },

    #[error("unknown model: {0}")]
    UnknownModel(String),
}
