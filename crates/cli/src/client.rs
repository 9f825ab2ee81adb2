// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! Control-socket client. Connects to a running `fmcpd` over the same
//! length-prefixed JSON framing the daemon's socket module speaks;
//! nothing here interprets the protocol beyond matching the response
//! variant each request expects.

#![cfg(unix)]

use std::path::{Path, PathBuf};

use fmcp_core::{Fmdm, FolderRecord};
use fmcp_wire::{read_request, write_response, ProtocolError, Request, Response};
use thiserror::Error;
use tokio::net::UnixStream;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon not reachable: {0}")]
    NotRunning(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("daemon reported: {0}")]
    Daemon(String),

    #[error("daemon sent an unexpected response to this request")]
    UnexpectedResponse,
}

impl ClientError {
    pub fn is_not_running(&self) -> bool {
        matches!(self, ClientError::NotRunning(_))
    }
}

/// One connection to `fmcpd`'s control socket. Requests are serialized
/// through a mutex — this client is for a single CLI invocation, not a
/// long-lived multiplexed connection.
pub struct DaemonClient {
    stream: Mutex<UnixStream>,
}

impl DaemonClient {
    pub async fn connect(socket_path: &Path) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(socket_path).await?;
        Ok(Self { stream: Mutex::new(stream) })
    }

    async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let mut stream = self.stream.lock().await;
        write_response(&mut *stream, request).await?;
        let response: Response = read_request(&mut *stream).await?;
        if let Response::Error { message } = response {
            return Err(ClientError::Daemon(message));
        }
        Ok(response)
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        match self.send(&Request::Ping).await? {
            Response::Pong => Ok(()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn add_folder(&self, path: PathBuf, model: String) -> Result<(), ClientError> {
        match self.send(&Request::AddFolder { path, model }).await? {
            Response::Ok => Ok(()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn remove_folder(&self, path: PathBuf) -> Result<(), ClientError> {
        match self.send(&Request::RemoveFolder { path }).await? {
            Response::Ok => Ok(()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn list_folders(&self) -> Result<Vec<FolderRecord>, ClientError> {
        match self.send(&Request::ListFolders).await? {
            Response::Folders(folders) => Ok(folders),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn status(&self, path: PathBuf) -> Result<Option<FolderRecord>, ClientError> {
        match self.send(&Request::Status { path }).await? {
            Response::Folder(folder) => Ok(folder),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn snapshot(&self) -> Result<Fmdm, ClientError> {
        match self.send(&Request::Snapshot).await? {
            Response::Snapshot(fmdm) => Ok(fmdm),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}
