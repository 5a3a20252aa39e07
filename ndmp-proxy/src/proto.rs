// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! The wire protocol spoken between a client (driver/taper/dumper) and this
//! proxy: command and argument ids, and the [`ipc_binary::Protocol`] table
//! that declares them.

use ipc_binary::{Protocol, OPTIONAL, STRING};

pub const MAGIC: u16 = 0xC74F;

pub const CMD_SELECT_SERVICE: u16 = 1;
pub const CMD_REPLY_GENERIC: u16 = 2;
pub const CMD_TAPE_OPEN: u16 = 3;
pub const CMD_TAPE_CLOSE: u16 = 4;
pub const CMD_TAPE_MTIO: u16 = 5;
pub const CMD_TAPE_WRITE: u16 = 6;
pub const CMD_TAPE_READ: u16 = 7;
pub const CMD_REPLY_TAPE_READ: u16 = 8;

pub const ARG_FILENAME: u16 = 1;
pub const ARG_MODE: u16 = 2;
pub const ARG_HOST: u16 = 3;
pub const ARG_PORT: u16 = 4;
pub const ARG_ERRCODE: u16 = 5;
pub const ARG_ERROR: u16 = 6;
pub const ARG_COMMAND: u16 = 7;
pub const ARG_COUNT: u16 = 8;
pub const ARG_DATA: u16 = 9;
pub const ARG_SERVICE: u16 = 10;
pub const ARG_USERNAME: u16 = 11;
pub const ARG_PASSWORD: u16 = 12;

/// Build the protocol table both sides of a proxy connection agree on.
///
/// `SERVICE` is one of "DEVICE", "APPLICATION", or "CHANGER". `ERRCODE` is a
/// short error code (e.g. `DEVICE_BUSY`, `ILLEGAL_ARGS`); `ERROR` is a
/// free-form message. Where both are present in a reply, either both args
/// are present or both are absent.
pub fn get_ndmp_proxy_proto() -> Protocol {
    let mut proto = Protocol::new(MAGIC);

    proto.add_cmd(CMD_SELECT_SERVICE).add_arg(ARG_SERVICE, STRING);

    let cmd = proto.add_cmd(CMD_REPLY_GENERIC);
    cmd.add_arg(ARG_ERRCODE, STRING | OPTIONAL);
    cmd.add_arg(ARG_ERROR, STRING | OPTIONAL);

    let cmd = proto.add_cmd(CMD_TAPE_OPEN);
    cmd.add_arg(ARG_FILENAME, STRING);
    cmd.add_arg(ARG_MODE, STRING);
    cmd.add_arg(ARG_HOST, STRING);
    cmd.add_arg(ARG_USERNAME, STRING);
    cmd.add_arg(ARG_PASSWORD, STRING);
    // ndmp-proxy gives a generic reply

    proto.add_cmd(CMD_TAPE_CLOSE);
    // ndmp-proxy gives a generic reply

    let cmd = proto.add_cmd(CMD_TAPE_MTIO);
    // COMMAND is one of "REWIND" or "EOF"
    cmd.add_arg(ARG_COMMAND, STRING);
    cmd.add_arg(ARG_COUNT, STRING);
    // ndmp-proxy gives a generic reply

    proto.add_cmd(CMD_TAPE_WRITE).add_arg(ARG_DATA, 0);
    // ndmp-proxy gives a generic reply

    proto.add_cmd(CMD_TAPE_READ).add_arg(ARG_COUNT, STRING);

    let cmd = proto.add_cmd(CMD_REPLY_TAPE_READ);
    cmd.add_arg(ARG_DATA, OPTIONAL);
    cmd.add_arg(ARG_ERRCODE, STRING | OPTIONAL);
    cmd.add_arg(ARG_ERROR, STRING | OPTIONAL);

    proto
}
