// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! The wire codec: decode a complete message out of a channel's input
//! buffer, or encode one onto its output buffer.
//!
//! ```text
//! message header (10 bytes, big-endian)
//!   magic: u16 | command id: u16 | total length: u32 | arg count: u16
//!
//! argument record (6-byte header + payload)
//!   length: u32 (excludes header, excludes string terminator) | arg id: u16 | payload
//! ```

use std::sync::Arc;

use log::{trace, warn};

use crate::channel::Channel;
use crate::message::Message;
use crate::protocol::Protocol;
use crate::Error;

const MSG_HDR_LEN: usize = 10;
const ARG_HDR_LEN: usize = 6;

/// The outcome of trying to decode one message out of a channel's input
/// buffer: either a complete message, or "not enough bytes yet" — which is
/// not an error.
#[derive(Debug, PartialEq)]
pub enum Poll {
    Ready(Message),
    NotReady,
}

/// Try to decode one complete message from `channel`'s input buffer.
///
/// Returns `Ok(Poll::NotReady)` if fewer than a full frame is buffered yet,
/// without consuming anything. Returns `Ok(Poll::Ready(msg))` and consumes
/// exactly that frame's bytes on success. Returns `Err` on any protocol
/// violation; the channel is poisoned first, since a decode error leaves no
/// well-defined resynchronization point on the stream.
pub fn poll_message(channel: &mut Channel) -> Result<Poll, Error> {
    let avail = channel.input.readable();
    if avail.len() < MSG_HDR_LEN {
        return Ok(Poll::NotReady);
    }

    let magic = u16::from_be_bytes([avail[0], avail[1]]);
    if magic != channel.proto.magic() {
        warn!("invalid magic {magic:#06x}, expected {:#06x}; poisoning channel", channel.proto.magic());
        channel.poison();
        return Err(Error::InvalidMagic);
    }

    let cmd_id = u16::from_be_bytes([avail[2], avail[3]]);
    let length = u32::from_be_bytes([avail[4], avail[5], avail[6], avail[7]]) as usize;
    let n_args = u16::from_be_bytes([avail[8], avail[9]]);

    // Clone the Arc rather than borrowing `channel.proto` directly, so the
    // `Command` reference below doesn't keep the whole channel borrowed
    // while we still need to call `channel.poison()` on error paths.
    let proto: Arc<Protocol> = Arc::clone(&channel.proto);
    let command = match proto.command(cmd_id) {
        Some(cmd) => cmd,
        None => {
            warn!("undeclared command id {cmd_id}; poisoning channel");
            channel.poison();
            return Err(Error::InvalidCommand);
        }
    };

    if length > avail.len() {
        trace!("have {} of {length} bytes for command {cmd_id}; not ready yet", avail.len());
        return Ok(Poll::NotReady);
    }

    // Own a copy of exactly this frame so later mutations of `channel`
    // don't have to fight the borrow checker over `avail`.
    let frame = avail[..length].to_vec();

    let mut message = Message::new(cmd_id, command);
    let mut pos = MSG_HDR_LEN;

    for _ in 0..n_args {
        if pos + ARG_HDR_LEN > frame.len() {
            channel.poison();
            return Err(Error::InvalidOrDuplicateArg);
        }

        let arg_len =
            u32::from_be_bytes([frame[pos], frame[pos + 1], frame[pos + 2], frame[pos + 3]])
                as usize;
        let arg_id = u16::from_be_bytes([frame[pos + 4], frame[pos + 5]]);
        pos += ARG_HDR_LEN;

        if arg_id == 0 || !command.arg_exists(arg_id) || message.arg_is_set(arg_id) {
            channel.poison();
            return Err(Error::InvalidOrDuplicateArg);
        }

        if pos + arg_len > frame.len() {
            channel.poison();
            return Err(Error::InvalidOrDuplicateArg);
        }

        let data = frame[pos..pos + arg_len].to_vec();
        message.set_decoded_arg(arg_id, arg_len, data);
        pos += arg_len;
    }

    if !message.is_complete() {
        warn!("command {cmd_id} is missing a mandatory argument; poisoning channel");
        channel.poison();
        return Err(Error::MissingMandatoryArg);
    }

    channel.input.consume_head(length);
    Ok(Poll::Ready(message))
}

/// The on-wire total length for a frame with `n_present_args` arguments of
/// the given byte lengths, or `Error::Overflow` if the arg count or any
/// length (or their sum) would not fit the wire format's u16/u32 fields.
fn compute_frame_total(
    n_present_args: usize,
    arg_lens: impl Iterator<Item = usize>,
) -> Result<u32, Error> {
    if n_present_args > u16::MAX as usize {
        return Err(Error::Overflow);
    }

    let mut total: u64 = MSG_HDR_LEN as u64;
    for len in arg_lens {
        if len as u64 > u32::MAX as u64 {
            return Err(Error::Overflow);
        }
        total += ARG_HDR_LEN as u64 + len as u64;
    }
    if total > u32::MAX as u64 {
        return Err(Error::Overflow);
    }
    Ok(total as u32)
}

/// Serialize `msg` onto `channel`'s output buffer, consuming it.
///
/// # Panics
/// Panics if `msg` is missing a non-optional declared argument — that is a
/// programmer error, not a condition that can arise from untrusted input,
/// since messages built for sending are always built by this process.
pub fn queue_message(channel: &mut Channel, msg: Message) -> Result<(), Error> {
    assert!(
        msg.is_complete(),
        "queue_message: message is missing a mandatory argument"
    );

    let present: Vec<u16> = msg.present_ids().collect();
    let arg_lens: Vec<usize> = present
        .iter()
        .map(|&id| msg.arg(id).expect("present_ids only yields set args").len())
        .collect();
    let total = compute_frame_total(present.len(), arg_lens.iter().copied())?;

    let mut frame = Vec::with_capacity(total as usize);
    frame.extend_from_slice(&channel.proto.magic().to_be_bytes());
    frame.extend_from_slice(&msg.cmd_id().to_be_bytes());
    frame.extend_from_slice(&total.to_be_bytes());
    frame.extend_from_slice(&(present.len() as u16).to_be_bytes());

    for id in present {
        let bytes = msg.arg(id).expect("present_ids only yields set args");
        frame.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        frame.extend_from_slice(&id.to_be_bytes());
        frame.extend_from_slice(bytes);
    }

    channel.output.append(&frame);
    Ok(())
}
