// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Per-connection dispatch: the `INIT -> BOUND` handshake, then (for a
//! `DEVICE` slot) the tape command loop.

use std::sync::Arc;

use log::{debug, warn};

use ipc_binary::Channel;

use crate::backend::{MtioCommand, TapeBackend, TapeError};
use crate::error::Error;
use crate::proto::*;
use crate::session::{ServiceName, Session};

fn write_generic_reply<S: std::io::Read + std::io::Write>(
    channel: &mut Channel,
    stream: &mut S,
    err: Option<(&str, &str)>,
) -> Result<(), Error> {
    let mut msg = channel.new_message(CMD_REPLY_GENERIC);
    if let Some((code, text)) = err {
        msg.add_arg_str(ARG_ERRCODE, code);
        msg.add_arg_str(ARG_ERROR, text);
    }
    ipc_binary::sync_io::write_message(channel, stream, msg)?;
    Ok(())
}

/// Service one accepted connection end to end: the `SELECT_SERVICE`
/// handshake, and — for a bound `DEVICE` slot — the tape command loop.
///
/// `from_loopback` is decided by the caller (it owns the socket and knows
/// the peer address); a connection that isn't from the loopback interface is
/// closed here before any message is read.
pub fn handle_connection<S, F>(
    mut stream: S,
    from_loopback: bool,
    session: Arc<Session>,
    make_backend: F,
) -> Result<(), Error>
where
    S: std::io::Read + std::io::Write,
    F: FnOnce() -> Box<dyn TapeBackend>,
{
    if !from_loopback {
        debug!("rejecting proxy connection: not from the loopback interface");
        return Ok(());
    }

    let proto = Arc::new(get_ndmp_proxy_proto());
    let mut channel = Channel::new(proto);

    let msg = match ipc_binary::sync_io::read_message(&mut channel, &mut stream)? {
        Some(msg) => msg,
        None => {
            debug!("no message received before disconnect");
            return Ok(());
        }
    };

    if msg.cmd_id() != CMD_SELECT_SERVICE {
        debug!("expected SELECT_SERVICE, got command {}; disconnecting", msg.cmd_id());
        return Ok(());
    }

    let requested = msg.arg_str(ARG_SERVICE).unwrap_or("");
    let service = match ServiceName::parse(requested) {
        Some(service) => service,
        None => {
            warn!("SELECT_SERVICE named an unknown service '{requested}'");
            write_generic_reply(
                &mut channel,
                &mut stream,
                Some(("ILLEGAL_ARGS", "ILLEGAL_ARGS")),
            )?;
            return Ok(());
        }
    };

    if !session.try_bind(service) {
        debug!("service slot {requested} is already in use");
        write_generic_reply(
            &mut channel,
            &mut stream,
            Some(("DEVICE_BUSY", "DEVICE_BUSY")),
        )?;
        return Ok(());
    }

    write_generic_reply(&mut channel, &mut stream, None)?;

    let result = match service {
        ServiceName::Device => run_device_slot(&mut channel, &mut stream, make_backend()),
        ServiceName::Application | ServiceName::Changer => {
            run_stub_slot(&mut channel, &mut stream)
        }
    };

    session.release(service);
    result
}

/// The APPLICATION/CHANGER slots bind successfully but define no command
/// table in this core; any further message closes the slot.
fn run_stub_slot<S: std::io::Read + std::io::Write>(
    channel: &mut Channel,
    stream: &mut S,
) -> Result<(), Error> {
    match ipc_binary::sync_io::read_message(channel, stream)? {
        None => Ok(()),
        Some(msg) => {
            debug!("unexpected command {} on a stub slot; closing", msg.cmd_id());
            Ok(())
        }
    }
}

fn run_device_slot<S: std::io::Read + std::io::Write>(
    channel: &mut Channel,
    stream: &mut S,
    mut backend: Box<dyn TapeBackend>,
) -> Result<(), Error> {
    let mut device_open = false;

    let outcome = (|| -> Result<(), Error> {
        loop {
            let msg = match ipc_binary::sync_io::read_message(channel, stream)? {
                Some(msg) => msg,
                None => return Ok(()),
            };

            match msg.cmd_id() {
                CMD_TAPE_OPEN => {
                    let filename = msg.arg_str(ARG_FILENAME).unwrap_or_default();
                    let mode = msg.arg_str(ARG_MODE).unwrap_or_default();
                    let host = msg.arg_str(ARG_HOST).unwrap_or_default();
                    let username = msg.arg_str(ARG_USERNAME).unwrap_or_default();
                    let password = msg.arg_str(ARG_PASSWORD).unwrap_or_default();

                    match backend.open(filename, mode, host, username, password) {
                        Ok(()) => {
                            device_open = true;
                            write_generic_reply(channel, stream, None)?;
                        }
                        Err(e) => {
                            write_generic_reply(channel, stream, Some((e.code, &e.message)))?;
                        }
                    }
                }

                CMD_TAPE_CLOSE => {
                    if let Err(e) = backend.close() {
                        warn!("error closing tape device: {}", e.message);
                    }
                    device_open = false;
                    write_generic_reply(channel, stream, None)?;
                }

                CMD_TAPE_MTIO => {
                    let command = msg.arg_str(ARG_COMMAND).unwrap_or_default();
                    let count: u32 = msg.arg_str(ARG_COUNT).and_then(|s| s.parse().ok()).unwrap_or(0);

                    let result = match MtioCommand::parse(command) {
                        Some(cmd) => backend.mtio(cmd, count),
                        None => Err(TapeError::illegal_args(format!(
                            "unsupported MTIO command '{command}'"
                        ))),
                    };

                    match result {
                        Ok(()) => write_generic_reply(channel, stream, None)?,
                        Err(e) => write_generic_reply(channel, stream, Some((e.code, &e.message)))?,
                    }
                }

                CMD_TAPE_WRITE => {
                    let data = msg.arg(ARG_DATA).unwrap_or_default();
                    match backend.write(data) {
                        Ok(()) => write_generic_reply(channel, stream, None)?,
                        Err(e) => write_generic_reply(channel, stream, Some((e.code, &e.message)))?,
                    }
                }

                CMD_TAPE_READ => {
                    let count: usize =
                        msg.arg_str(ARG_COUNT).and_then(|s| s.parse().ok()).unwrap_or(0);

                    let mut reply = channel.new_message(CMD_REPLY_TAPE_READ);
                    match backend.read(count) {
                        Ok(data) => reply.add_arg_owned(ARG_DATA, data),
                        Err(e) => {
                            reply.add_arg_str(ARG_ERRCODE, e.code);
                            reply.add_arg_str(ARG_ERROR, &e.message);
                        }
                    }
                    ipc_binary::sync_io::write_message(channel, stream, reply)?;
                }

                other => {
                    warn!("ignoring undefined command {other} on a bound DEVICE slot");
                }
            }
        }
    })();

    if device_open {
        if let Err(e) = backend.close() {
            warn!("error closing tape device during teardown: {}", e.message);
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryTapeBackend;
    use std::io::Cursor;

    #[test]
    fn non_loopback_connections_are_closed_before_any_read() {
        let mut stream = Cursor::new(Vec::new());
        let session = Arc::new(Session::new());

        handle_connection(&mut stream, false, session, || {
            Box::new(MemoryTapeBackend::new())
        })
        .unwrap();

        // nothing was ever written back, since no message was read or replied to
        assert!(stream.into_inner().is_empty());
    }
}
