// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! Entry point: set up logging, boot the daemon, run until signalled,
//! then shut down in the order `fmcpd::startup::Daemon::shutdown` owns.

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = fmcpd::Config::from_env()?;
    std::fs::create_dir_all(config.state_dir.join("logs"))?;

    let file_appender = tracing_appender::rolling::daily(config.state_dir.join("logs"), "fmcpd.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    tracing::info!(state_dir = %config.state_dir.display(), "starting fmcpd");
    let daemon = fmcpd::startup(config).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("received shutdown signal");
    daemon.shutdown().await;
    tracing::info!("fmcpd stopped");

    Ok(())
}
