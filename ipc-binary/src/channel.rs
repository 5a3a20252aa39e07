// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! A per-connection pairing of an input buffer, an output buffer, and a
//! shared reference to a [`crate::protocol::Protocol`] table.

use std::sync::Arc;

use crate::buffer::Buffer;
use crate::message::Message;
use crate::protocol::Protocol;

/// Whether a channel has observed a protocol error. A [`Poisoned`] channel
/// must be discarded by the caller; the codec itself never recovers one.
///
/// [`Poisoned`]: ChannelState::Poisoned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Healthy,
    Poisoned,
}

/// One conversation's worth of buffered input and output, plus the protocol
/// table it's speaking. Not thread-safe: a `Channel` must not be touched by
/// two threads at once without external synchronization.
pub struct Channel {
    pub(crate) proto: Arc<Protocol>,
    pub(crate) input: Buffer,
    pub(crate) output: Buffer,
    state: ChannelState,
}

impl Channel {
    pub fn new(proto: Arc<Protocol>) -> Self {
        Self {
            proto,
            input: Buffer::new(),
            output: Buffer::new(),
            state: ChannelState::Healthy,
        }
    }

    pub fn protocol(&self) -> &Protocol {
        &self.proto
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub(crate) fn poison(&mut self) {
        self.state = ChannelState::Poisoned;
    }

    /// Append raw bytes to the input buffer. Used by the asynchronous API:
    /// callers feed data as it arrives, then drain complete messages with
    /// [`crate::codec::poll_message`].
    pub fn feed(&mut self, bytes: &[u8]) {
        self.input.append(bytes);
    }

    /// Drop `n` bytes from the head of the output buffer, once the caller
    /// has confirmed they were transmitted.
    pub fn transmitted(&mut self, n: usize) {
        self.output.consume_head(n);
    }

    /// Bytes queued for transmission but not yet consumed via
    /// [`Channel::transmitted`].
    pub fn outgoing(&self) -> &[u8] {
        self.output.readable()
    }

    pub fn has_outgoing(&self) -> bool {
        !self.output.is_empty()
    }

    /// Create a new, blank message for sending on this channel.
    ///
    /// # Panics
    /// Panics if `cmd_id` is not declared in this channel's protocol table.
    pub fn new_message(&self, cmd_id: u16) -> Message {
        let cmd = self
            .proto
            .command(cmd_id)
            .unwrap_or_else(|| panic!("command {cmd_id} is not declared in this channel's protocol"));
        Message::new(cmd_id, cmd)
    }
}
