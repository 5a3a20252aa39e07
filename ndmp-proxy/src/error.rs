// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use std::fmt;

/// Errors raised while servicing one proxy connection. None of these are
/// wire-protocol violations the client needs to see; by the time one of
/// these is raised the connection (or a bound slot) is being torn down.
#[derive(Debug)]
pub enum Error {
    /// The wire codec rejected something on this channel.
    Protocol(ipc_binary::Error),

    /// The underlying stream failed.
    Io(std::io::Error),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Protocol(e) => Some(e),
            Self::Io(e) => Some(e),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol(e) => write!(f, "protocol error: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl From<ipc_binary::Error> for Error {
    fn from(e: ipc_binary::Error) -> Self {
        Self::Protocol(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
