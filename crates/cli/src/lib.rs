// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! fmcp: the operator CLI. Thin by design (spec.md §2, §9) — it drives
//! `fmcpd` over its control socket when one is reachable, and an
//! in-process orchestrator built the same way `fmcpd` builds its own
//! otherwise, so `fmcp add`/`remove`/`list`/`status` work without a
//! daemon running.

pub mod client;
pub mod commands;

pub use commands::Command;

use clap::Parser;

#[derive(Parser)]
#[command(name = "fmcp", version, about = "Operator CLI for the folder-mcp fleet control plane")]
pub struct Cli {
    /// Emit machine-readable JSON instead of a human-readable summary
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    commands::run(cli.command, cli.json).await
}
