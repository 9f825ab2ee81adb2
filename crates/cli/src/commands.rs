// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! Subcommand implementations. Each one prefers the control socket when
//! `fmcpd` is already running and falls back to driving an orchestrator
//! in-process otherwise (spec.md's CLI is named as "thin operator
//! commands", not a general-purpose client — there is no daemon/RPC
//! layer guaranteed to exist).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Subcommand;
use fmcp_core::{Fmdm, FolderRecord, FolderStatus};
use fmcpd::Config;

#[cfg(unix)]
use crate::client::DaemonClient;

#[derive(Subcommand)]
pub enum Command {
    /// Start monitoring a folder with the given embedding model
    Add {
        path: PathBuf,
        #[arg(long, default_value = "mini-384")]
        model: String,
    },
    /// Stop monitoring a folder
    Remove { path: PathBuf },
    /// List every monitored folder
    List,
    /// Show one folder's current record
    Status { path: PathBuf },
    /// Check whether the daemon is reachable
    Ping,
}

pub async fn run(command: Command, json: bool) -> Result<()> {
    let config = Config::from_env()?;

    match command {
        Command::Add { path, model } => add(&config, path, model).await,
        Command::Remove { path } => remove(&config, path).await,
        Command::List => list(&config, json).await,
        Command::Status { path } => status(&config, path, json).await,
        Command::Ping => ping(&config).await,
    }
}

#[cfg(unix)]
async fn connect(config: &Config) -> Option<DaemonClient> {
    DaemonClient::connect(config.socket_path()).await.ok()
}

async fn ping(config: &Config) -> Result<()> {
    #[cfg(unix)]
    if let Some(client) = connect(config).await {
        client.ping().await?;
        println!("daemon reachable at {}", config.socket_path().display());
        return Ok(());
    }
    println!("daemon not running");
    Ok(())
}

async fn add(config: &Config, path: PathBuf, model: String) -> Result<()> {
    let path = std::fs::canonicalize(&path).map_err(|e| anyhow!("{}: {}", path.display(), e))?;

    #[cfg(unix)]
    if let Some(client) = connect(config).await {
        client.add_folder(path.clone(), model).await?;
        println!("added {} (daemon will index it in the background)", path.display());
        return Ok(());
    }

    let orchestrator = fmcpd::startup::build_orchestrator(config).await?;
    orchestrator.start_all().await?;
    orchestrator.add_folder(path.clone(), model).await?;

    // No daemon is running to keep indexing after this process exits, so
    // wait for the one-shot run to leave its transitional states before
    // tearing the orchestrator back down.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(60);
    loop {
        let record = orchestrator.fmdm().get_fmdm().folder(&path).cloned();
        match record {
            Some(FolderRecord { status: FolderStatus::Active, .. }) => {
                println!("{}: active", path.display());
                break;
            }
            Some(FolderRecord { status: FolderStatus::Error, notification, .. }) => {
                let message = notification.map(|n| n.message).unwrap_or_default();
                orchestrator.stop_all().await;
                return Err(anyhow!("{}: {}", path.display(), message));
            }
            _ if tokio::time::Instant::now() >= deadline => break,
            _ => tokio::time::sleep(Duration::from_millis(100)).await,
        }
    }
    orchestrator.stop_all().await;
    Ok(())
}

async fn remove(config: &Config, path: PathBuf) -> Result<()> {
    let path = std::fs::canonicalize(&path).map_err(|e| anyhow!("{}: {}", path.display(), e))?;

    #[cfg(unix)]
    if let Some(client) = connect(config).await {
        client.remove_folder(path.clone()).await?;
        println!("removed {}", path.display());
        return Ok(());
    }

    let orchestrator = fmcpd::startup::build_orchestrator(config).await?;
    orchestrator.start_all().await?;
    orchestrator.remove_folder(&path).await?;
    orchestrator.stop_all().await;
    println!("removed {}", path.display());
    Ok(())
}

async fn list(config: &Config, json: bool) -> Result<()> {
    let fmdm = snapshot(config).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&fmdm.folders)?);
        return Ok(());
    }
    if fmdm.folders.is_empty() {
        println!("no folders are monitored");
        return Ok(());
    }
    for folder in &fmdm.folders {
        print_folder_line(folder);
    }
    Ok(())
}

async fn status(config: &Config, path: PathBuf, json: bool) -> Result<()> {
    let path = std::fs::canonicalize(&path).map_err(|e| anyhow!("{}: {}", path.display(), e))?;
    let fmdm = snapshot(config).await?;
    let folder = fmdm.folder(&path);

    if json {
        println!("{}", serde_json::to_string_pretty(&folder)?);
        return Ok(());
    }

    match folder {
        Some(folder) => print_folder_line(folder),
        None => println!("{}: not monitored", path.display()),
    }
    Ok(())
}

async fn snapshot(config: &Config) -> Result<Fmdm> {
    #[cfg(unix)]
    if let Some(client) = connect(config).await {
        return Ok(client.snapshot().await?);
    }

    let orchestrator = fmcpd::startup::build_orchestrator(config).await?;
    orchestrator.start_all().await?;
    let fmdm = orchestrator.fmdm().get_fmdm();
    orchestrator.stop_all().await;
    Ok(fmdm)
}

fn print_folder_line(folder: &FolderRecord) {
    let notice = folder.notification.as_ref().map(|n| format!(" - {}", n.message)).unwrap_or_default();
    println!(
        "{}  [{}]  model={}  progress={}%{}",
        folder.path.display(),
        folder.status,
        folder.model,
        folder.progress,
        notice
    );
}
