// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use std::net::{TcpListener, TcpStream};
use std::sync::Arc;

use ipc_binary::{sync_io, Channel};

use ndmp_proxy::proto::*;
use ndmp_proxy::{handle_connection, MemoryTapeBackend, Session};

/// Start a proxy listening on an OS-assigned loopback port, spawn one worker
/// thread per accepted connection (mirroring `src/bin/ndmp-proxy.rs`), and
/// return the address clients should connect to.
fn spawn_proxy() -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let session = Arc::new(Session::new());

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let stream = stream.unwrap();
            let session = Arc::clone(&session);
            std::thread::spawn(move || {
                let _ = handle_connection(stream, true, session, || {
                    Box::new(MemoryTapeBackend::new())
                });
            });
        }
    });

    addr
}

fn client_channel(addr: std::net::SocketAddr) -> (Channel, TcpStream) {
    let stream = TcpStream::connect(addr).unwrap();
    let channel = Channel::new(Arc::new(get_ndmp_proxy_proto()));
    (channel, stream)
}

fn select_service(chan: &mut Channel, stream: &mut TcpStream, service: &str) {
    let mut msg = chan.new_message(CMD_SELECT_SERVICE);
    msg.add_arg_str(ARG_SERVICE, service);
    sync_io::write_message(chan, stream, msg).unwrap();
}

fn expect_generic_reply(chan: &mut Channel, stream: &mut TcpStream) -> Option<(String, String)> {
    let reply = sync_io::read_message(chan, stream).unwrap().unwrap();
    assert_eq!(reply.cmd_id(), CMD_REPLY_GENERIC);
    match (reply.arg_str(ARG_ERRCODE), reply.arg_str(ARG_ERROR)) {
        (Some(code), Some(msg)) => Some((code.to_string(), msg.to_string())),
        (None, None) => None,
        other => panic!("errcode/error must be present or absent together: {other:?}"),
    }
}

#[test]
fn e5_happy_path_bind_and_one_tape_command() {
    let addr = spawn_proxy();
    let (mut chan, mut stream) = client_channel(addr);

    select_service(&mut chan, &mut stream, "DEVICE");
    assert_eq!(expect_generic_reply(&mut chan, &mut stream), None);

    let mut msg = chan.new_message(CMD_TAPE_MTIO);
    msg.add_arg_str(ARG_COMMAND, "REWIND");
    msg.add_arg_str(ARG_COUNT, "1");
    sync_io::write_message(&mut chan, &mut stream, msg).unwrap();

    assert_eq!(expect_generic_reply(&mut chan, &mut stream), None);
}

#[test]
fn e6_second_bind_to_the_same_service_is_busy() {
    let addr = spawn_proxy();

    let (mut chan1, mut stream1) = client_channel(addr);
    select_service(&mut chan1, &mut stream1, "DEVICE");
    assert_eq!(expect_generic_reply(&mut chan1, &mut stream1), None);

    let (mut chan2, mut stream2) = client_channel(addr);
    select_service(&mut chan2, &mut stream2, "DEVICE");
    let err = expect_generic_reply(&mut chan2, &mut stream2);
    assert_eq!(
        err,
        Some(("DEVICE_BUSY".to_string(), "DEVICE_BUSY".to_string()))
    );
}

#[test]
fn e8_tape_open_write_read_close_round_trips_through_the_memory_backend() {
    let addr = spawn_proxy();
    let (mut chan, mut stream) = client_channel(addr);

    select_service(&mut chan, &mut stream, "DEVICE");
    assert_eq!(expect_generic_reply(&mut chan, &mut stream), None);

    let mut open = chan.new_message(CMD_TAPE_OPEN);
    open.add_arg_str(ARG_FILENAME, "/dev/nst0");
    open.add_arg_str(ARG_MODE, "rw");
    open.add_arg_str(ARG_HOST, "tapehost");
    open.add_arg_str(ARG_USERNAME, "user");
    open.add_arg_str(ARG_PASSWORD, "pass");
    sync_io::write_message(&mut chan, &mut stream, open).unwrap();
    assert_eq!(expect_generic_reply(&mut chan, &mut stream), None);

    let mut write = chan.new_message(CMD_TAPE_WRITE);
    write.add_arg(ARG_DATA, b"some archive bytes");
    sync_io::write_message(&mut chan, &mut stream, write).unwrap();
    assert_eq!(expect_generic_reply(&mut chan, &mut stream), None);

    let mut read = chan.new_message(CMD_TAPE_READ);
    read.add_arg_str(ARG_COUNT, "100");
    sync_io::write_message(&mut chan, &mut stream, read).unwrap();

    let reply = sync_io::read_message(&mut chan, &mut stream).unwrap().unwrap();
    assert_eq!(reply.cmd_id(), CMD_REPLY_TAPE_READ);
    assert_eq!(reply.arg(ARG_DATA), Some(b"some archive bytes".as_slice()));
    assert_eq!(reply.arg_str(ARG_ERRCODE), None);

    let close = chan.new_message(CMD_TAPE_CLOSE);
    sync_io::write_message(&mut chan, &mut stream, close).unwrap();
    assert_eq!(expect_generic_reply(&mut chan, &mut stream), None);
}

#[test]
fn select_service_with_an_unknown_name_is_illegal_args() {
    let addr = spawn_proxy();
    let (mut chan, mut stream) = client_channel(addr);

    select_service(&mut chan, &mut stream, "TAPE_ROBOT");
    let err = expect_generic_reply(&mut chan, &mut stream);
    assert_eq!(
        err,
        Some(("ILLEGAL_ARGS".to_string(), "ILLEGAL_ARGS".to_string()))
    );
}

#[test]
fn mtio_with_an_unsupported_command_keeps_the_slot_open() {
    let addr = spawn_proxy();
    let (mut chan, mut stream) = client_channel(addr);

    select_service(&mut chan, &mut stream, "DEVICE");
    assert_eq!(expect_generic_reply(&mut chan, &mut stream), None);

    let mut bad = chan.new_message(CMD_TAPE_MTIO);
    bad.add_arg_str(ARG_COMMAND, "SPIN");
    bad.add_arg_str(ARG_COUNT, "1");
    sync_io::write_message(&mut chan, &mut stream, bad).unwrap();

    let err = expect_generic_reply(&mut chan, &mut stream);
    assert_eq!(err.as_ref().map(|(code, _)| code.as_str()), Some("ILLEGAL_ARGS"));

    // the slot is still open: a well-formed MTIO still gets a clean reply
    let mut good = chan.new_message(CMD_TAPE_MTIO);
    good.add_arg_str(ARG_COMMAND, "EOF");
    good.add_arg_str(ARG_COUNT, "1");
    sync_io::write_message(&mut chan, &mut stream, good).unwrap();
    assert_eq!(expect_generic_reply(&mut chan, &mut stream), None);
}

#[test]
fn application_slot_binds_but_closes_on_any_further_command() {
    let addr = spawn_proxy();
    let (mut chan, mut stream) = client_channel(addr);

    select_service(&mut chan, &mut stream, "APPLICATION");
    assert_eq!(expect_generic_reply(&mut chan, &mut stream), None);

    let msg = chan.new_message(CMD_TAPE_CLOSE);
    sync_io::write_message(&mut chan, &mut stream, msg).unwrap();

    // the proxy closes the slot silently; the next read hits EOF
    let res = sync_io::read_message(&mut chan, &mut stream);
    assert!(matches!(res, Ok(None)) || res.is_err());
}
