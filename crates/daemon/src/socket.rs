// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! The minimal control socket the `fmcp` CLI attaches to when a daemon
//! is already running. Kept intentionally small rather than a
//! general-purpose RPC server.

#![cfg(unix)]

use std::path::Path;
use std::sync::Arc;

use fmcp_engine::MonitoredFoldersOrchestrator;
use fmcp_wire::{read_request, write_response, Request, Response};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;

/// Remove a stale socket file and bind a fresh one. Must run only after
/// every other startup validation has passed (lock acquired, state
/// loaded) — binding is the last thing that makes the daemon observable
/// to other processes.
pub fn bind(path: &Path) -> std::io::Result<UnixListener> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    UnixListener::bind(path)
}

/// Accept connections until `cancel` fires, handling each one on its own
/// task so a slow or misbehaving client never blocks the others.
pub async fn serve(listener: UnixListener, orchestrator: MonitoredFoldersOrchestrator, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let orchestrator = orchestrator.clone();
                        tokio::spawn(async move { handle_connection(stream, orchestrator).await });
                    }
                    Err(error) => tracing::warn!(%error, "control socket accept failed"),
                }
            }
        }
    }
}

async fn handle_connection(mut stream: UnixStream, orchestrator: MonitoredFoldersOrchestrator) {
    loop {
        let request: Request = match read_request(&mut stream).await {
            Ok(request) => request,
            Err(error) => {
                tracing::debug!(%error, "control connection closed");
                return;
            }
        };

        let response = handle_request(&orchestrator, request).await;
        if let Err(error) = write_response(&mut stream, &response).await {
            tracing::warn!(%error, "failed to write control response");
            return;
        }
    }
}

async fn handle_request(orchestrator: &MonitoredFoldersOrchestrator, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,
        Request::AddFolder { path, model } => match orchestrator.add_folder(path, model).await {
            Ok(()) => Response::Ok,
            Err(error) => Response::Error { message: error.to_string() },
        },
        Request::RemoveFolder { path } => match orchestrator.remove_folder(&path).await {
            Ok(()) => Response::Ok,
            Err(error) => Response::Error { message: error.to_string() },
        },
        Request::ListFolders => Response::Folders(orchestrator.fmdm().get_fmdm().folders),
        Request::Status { path } => Response::Folder(orchestrator.fmdm().get_fmdm().folder(&path).cloned()),
        Request::Snapshot => Response::Snapshot(orchestrator.fmdm().get_fmdm()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmcp_adapters::{
        FakeEmbeddingBackendFactory, FakeModelDownloader, FakeModelLoader, FileConfigStore, ModelRegistry,
        NullFileProcessor,
    };
    use fmcp_core::{SupportedExtensions, SystemClock};
    use fmcp_engine::{ActivityRing, FmdmService, OrchestratorConfig};
    use fmcp_storage::InMemoryVectorStoreFactory;
    use tempfile::tempdir;

    fn build_orchestrator(state_dir: &Path) -> MonitoredFoldersOrchestrator {
        MonitoredFoldersOrchestrator::new(
            OrchestratorConfig::default(),
            Arc::new(FmdmService::new()),
            Arc::new(ActivityRing::default()),
            Arc::new(FileConfigStore::open(state_dir.join("config.json")).unwrap()),
            ModelRegistry::builtin(),
            Arc::new(FakeModelDownloader::default()),
            Arc::new(FakeModelLoader::default()),
            Arc::new(InMemoryVectorStoreFactory),
            Arc::new(FakeEmbeddingBackendFactory),
            Arc::new(NullFileProcessor),
            SupportedExtensions::canonical(),
            Arc::new(SystemClock),
            fmcp_engine::default_sampler(),
        )
    }

    #[tokio::test]
    async fn ping_over_the_socket_gets_a_pong() {
        let state = tempdir().unwrap();
        let orchestrator = build_orchestrator(state.path());
        let socket_path = state.path().join("fmcpd.sock");
        let listener = bind(&socket_path).unwrap();
        let cancel = CancellationToken::new();
        let server = tokio::spawn(serve(listener, orchestrator, cancel.clone()));

        let mut client = UnixStream::connect(&socket_path).await.unwrap();
        write_response(&mut client, &Request::Ping).await.unwrap();
        let response: Response = read_request(&mut client).await.unwrap();
        assert!(matches!(response, Response::Pong));

        cancel.cancel();
        let _ = server.await;
    }

    #[tokio::test]
    async fn add_folder_over_the_socket_reaches_active() {
        let state = tempdir().unwrap();
        let folder = tempdir().unwrap();
        std::fs::write(folder.path().join("a.md"), "hello").unwrap();
        let orchestrator = build_orchestrator(state.path());
        let socket_path = state.path().join("fmcpd.sock");
        let listener = bind(&socket_path).unwrap();
        let cancel = CancellationToken::new();
        let server = tokio::spawn(serve(listener, orchestrator.clone(), cancel.clone()));

        let mut client = UnixStream::connect(&socket_path).await.unwrap();
        write_response(&mut client, &Request::AddFolder { path: folder.path().to_path_buf(), model: "mini-384".into() })
            .await
            .unwrap();
        let response: Response = read_request(&mut client).await.unwrap();
        assert!(matches!(response, Response::Ok));

        for _ in 0..100 {
            if orchestrator.fmdm().get_fmdm().folder(folder.path()).map(|f| f.status)
                == Some(fmcp_core::FolderStatus::Active)
            {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert_eq!(
            orchestrator.fmdm().get_fmdm().folder(folder.path()).map(|f| f.status),
            Some(fmcp_core::FolderStatus::Active)
        );

        cancel.cancel();
        let _ = server.await;
    }
}
