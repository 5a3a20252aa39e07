// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Blocking read/write helpers that loop the codec against any
//! `std::io::Read`/`Write` stream (a TCP socket, a Unix pipe, ...).
//!
//! These exist for simple clients that are happy to block; embedding the
//! codec into a non-blocking event loop should use [`crate::channel::Channel::feed`]
//! and [`crate::codec::poll_message`]/[`crate::codec::queue_message`] directly instead.

use std::io::{self, Read, Write};

use crate::channel::Channel;
use crate::codec::{poll_message, queue_message, Poll};
use crate::message::Message;
use crate::Error;

/// Minimum chunk size requested from the stream on each underlying `read`.
const READ_QUANTUM: usize = 32 * 1024;

/// Block until one complete message has arrived on `stream`, or clean EOF.
///
/// Returns `Ok(None)` on EOF with no partially-received bytes left over.
/// Trailing, unparseable bytes at EOF are reported as `Error::Io`.
pub fn read_message<S: Read>(channel: &mut Channel, stream: &mut S) -> Result<Option<Message>, Error> {
    loop {
        if let Poll::Ready(msg) = poll_message(channel)? {
            return Ok(Some(msg));
        }

        let tail = channel.input.writable_tail(READ_QUANTUM);
        let n = stream.read(tail)?;

        if n == 0 {
            if !channel.input.is_empty() {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "EOF with unconsumed bytes still buffered on an ipc-binary channel",
                )));
            }
            return Ok(None);
        }

        channel.input.commit_write(n);
    }
}

/// Serialize `msg` and block until it has been completely written to
/// `stream`.
pub fn write_message<S: Write>(
    channel: &mut Channel,
    stream: &mut S,
    msg: Message,
) -> Result<(), Error> {
    queue_message(channel, msg)?;

    while channel.has_outgoing() {
        let n = stream.write(channel.outgoing())?;
        if n == 0 {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::WriteZero,
                "write returned 0 bytes draining an ipc-binary channel",
            )));
        }
        channel.transmitted(n);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Protocol, STRING};
    use std::io::Cursor;
    use std::sync::Arc;

    fn test_proto() -> Arc<Protocol> {
        let mut proto = Protocol::new(0xFACE);
        proto.add_cmd(1).add_arg(1, STRING);
        Arc::new(proto)
    }

    #[test]
    fn write_then_read_round_trips_over_a_cursor() {
        let proto = test_proto();
        let mut tx = Channel::new(Arc::clone(&proto));
        let mut msg = tx.new_message(1);
        msg.add_arg_str(1, "payload");

        let mut wire = Vec::new();
        write_message(&mut tx, &mut wire, msg).unwrap();

        let mut rx = Channel::new(proto);
        let mut cursor = Cursor::new(wire);
        let received = read_message(&mut rx, &mut cursor).unwrap().unwrap();
        assert_eq!(received.arg_str(1), Some("payload"));

        // a second read hits clean EOF
        assert!(read_message(&mut rx, &mut cursor).unwrap().is_none());
    }

    #[test]
    fn eof_with_partial_frame_is_an_io_error() {
        let proto = test_proto();
        let mut tx = Channel::new(Arc::clone(&proto));
        let mut msg = tx.new_message(1);
        msg.add_arg_str(1, "payload");

        let mut wire = Vec::new();
        write_message(&mut tx, &mut wire, msg).unwrap();
        wire.truncate(wire.len() - 1);

        let mut rx = Channel::new(proto);
        let mut cursor = Cursor::new(wire);
        let err = read_message(&mut rx, &mut cursor).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
