// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! Wire format: 4-byte length prefix (big-endian) + JSON payload, the
//! same framing the rest of the corpus uses for its control sockets.
//! `encode`/`decode` handle the JSON payload alone; `write_message`/
//! `read_message` add the length prefix over an async byte stream.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProtocolError;

/// Refuses to allocate more than this for a single incoming message —
/// a corrupt or hostile length prefix should fail fast, not OOM.
pub const MAX_MESSAGE_BYTES: usize = 64 * 1024 * 1024;

/// Serialize a value to its raw JSON payload, with no length prefix.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(value)?)
}

/// Deserialize a raw JSON payload produced by [`encode`].
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Prepend `payload`'s length as a 4-byte big-endian prefix and write
/// both to `writer`.
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> std::io::Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "message too large to frame"))?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await
}

/// Read a 4-byte big-endian length prefix followed by that many bytes.
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> std::io::Result<Vec<u8>> {
    let mut len_bytes = [0_u8; 4];
    reader.read_exact(&mut len_bytes).await?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > MAX_MESSAGE_BYTES {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("framed message of {len} bytes exceeds the {MAX_MESSAGE_BYTES}-byte limit"),
        ));
    }
    let mut buf = vec![0_u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Read one length-prefixed message and decode it as `T`.
pub async fn read_request<R: AsyncRead + Unpin, T: DeserializeOwned>(reader: &mut R) -> Result<T, ProtocolError> {
    let bytes = read_message(reader).await?;
    if bytes.len() > MAX_MESSAGE_BYTES {
        return Err(ProtocolError::MessageTooLarge { size: bytes.len(), max: MAX_MESSAGE_BYTES });
    }
    decode(&bytes)
}

/// Encode `value` and write it as one length-prefixed message.
pub async fn write_response<W: AsyncWrite + Unpin, T: Serialize>(writer: &mut W, value: &T) -> Result<(), ProtocolError> {
    let bytes = encode(value)?;
    write_message(writer, &bytes).await?;
    Ok(())
}
