// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! A length-prefixed, magic-tagged, command-and-argument binary message
//! protocol, used between cooperating local processes over sockets or
//! pipes.
//!
//! The layer offers two complementary APIs over a single parser/encoder: a
//! synchronous, file-descriptor-driven API ([`sync_io::read_message`],
//! [`sync_io::write_message`]) and an asynchronous, buffer-driven API
//! ([`Channel::feed`], [`codec::poll_message`], [`codec::queue_message`]).
//!
//! Two peers communicate by each independently constructing an identical
//! [`Protocol`] table; there is no schema/version negotiation on the wire.

mod buffer;
pub mod channel;
pub mod codec;
mod message;
pub mod protocol;
pub mod sync_io;

pub use channel::Channel;
pub use codec::Poll;
pub use message::Message;
pub use protocol::{Command, Protocol, OPTIONAL, STRING};

use std::fmt;

/// Errors raised by the wire codec and the synchronous I/O adapters.
///
/// "Not ready" (an incomplete message is not yet a full error) is modeled
/// separately, by [`Poll::NotReady`], so callers can't `?` past it by
/// accident.
#[derive(Debug)]
pub enum Error {
    /// The first two header bytes did not match the channel's protocol
    /// magic.
    InvalidMagic,

    /// The command id was zero, out of the protocol table, or not declared.
    InvalidCommand,

    /// An argument record's id was zero, out of range, not declared, or a
    /// duplicate of one already set on this message.
    InvalidOrDuplicateArg,

    /// A non-optional declared argument was missing from the message.
    MissingMandatoryArg,

    /// A length field would not fit in 32 bits.
    Overflow,

    /// The underlying stream failed, or hit EOF with unconsumed bytes still
    /// buffered.
    Io(std::io::Error),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMagic => write!(f, "invalid protocol magic"),
            Self::InvalidCommand => write!(f, "invalid or undeclared command id"),
            Self::InvalidOrDuplicateArg => write!(f, "invalid, undeclared, or duplicate argument"),
            Self::MissingMandatoryArg => write!(f, "missing mandatory argument"),
            Self::Overflow => write!(f, "message or argument length exceeds 32 bits"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
