// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fmcpd: wires `fmcp-core`/`fmcp-storage`/`fmcp-adapters`/`fmcp-engine`
//! together into a runnable daemon, exposing `FolderMcpFeed` and a thin
//! control socket the `fmcp` CLI can attach to.

pub mod config;
pub mod env;
pub mod error;
pub mod snapshot;
pub mod startup;

#[cfg(unix)]
pub mod socket;

pub use config::Config;
pub use error::DaemonError;
pub use startup::{startup, Daemon};
