// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fmcp-wire: the length-prefixed JSON framing shared by `fmcpd`'s
//! control socket and the `fmcp` CLI, plus the narrow request/response
//! protocol spoken over it.

pub mod error;
pub mod framing;
pub mod protocol;

pub use error::ProtocolError;
pub use framing::{decode, encode, read_message, read_request, write_message, write_response, MAX_MESSAGE_BYTES};
pub use protocol::{Request, Response};
