// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! An in-memory message: a command id plus a sparse set of typed/optional
//! arguments, either assembled by a caller for sending or produced by
//! [`crate::codec::poll_message`] on receipt.

use crate::protocol::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Arg {
    /// Length on the wire (excludes any decoder-added NUL terminator).
    len: usize,
    /// Backing storage. For STRING arguments this is `len + 1` bytes long,
    /// with a trailing NUL appended for consumer convenience; `len` itself
    /// never counts that byte.
    data: Vec<u8>,
}

/// A command identifier plus its (possibly partial, while being built)
/// argument values.
#[derive(Debug, Clone)]
pub struct Message {
    cmd_id: u16,
    /// Cloned from the owning `Command` at creation time: flag byte per
    /// declared argument slot, indexed by argument id. Small and immutable,
    /// so cloning it out of the protocol table avoids tying a `Message`'s
    /// lifetime to the `Channel`/`Protocol` that created it.
    arg_flags: Vec<u8>,
    args: Vec<Option<Arg>>,
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.cmd_id == other.cmd_id && self.args == other.args
    }
}

impl Message {
    pub(crate) fn new(cmd_id: u16, cmd: &Command) -> Self {
        let n_args = cmd.declared_args().last().map(|id| id as usize + 1).unwrap_or(0);
        let mut flags = vec![0u8; n_args];
        for id in cmd.declared_args() {
            flags[id as usize] = cmd.arg_flags(id);
        }
        Message {
            cmd_id,
            args: vec![None; n_args],
            arg_flags: flags,
        }
    }

    pub fn cmd_id(&self) -> u16 {
        self.cmd_id
    }

    fn exists(&self, arg_id: u16) -> bool {
        let idx = arg_id as usize;
        arg_id != 0 && idx < self.arg_flags.len() && self.arg_flags[idx] & crate::protocol::EXISTS != 0
    }

    fn is_string(&self, arg_id: u16) -> bool {
        self.arg_flags[arg_id as usize] & crate::protocol::STRING != 0
    }

    fn is_optional(&self, arg_id: u16) -> bool {
        self.arg_flags[arg_id as usize] & crate::protocol::OPTIONAL != 0
    }

    /// Borrow-and-copy: add argument `arg_id` with the given bytes, copying
    /// them into the message's own storage.
    ///
    /// # Panics
    /// Panics if `arg_id` is not declared on this message's command, or if
    /// it has already been set.
    pub fn add_arg(&mut self, arg_id: u16, bytes: &[u8]) {
        self.add_arg_owned(arg_id, bytes.to_vec());
    }

    /// Convenience for `STRING`-flagged arguments: copies `s`'s UTF-8 bytes.
    pub fn add_arg_str(&mut self, arg_id: u16, s: &str) {
        self.add_arg(arg_id, s.as_bytes());
    }

    /// Move-in: add argument `arg_id`, taking ownership of `bytes` without
    /// copying.
    ///
    /// # Panics
    /// Panics if `arg_id` is not declared on this message's command, or if
    /// it has already been set.
    pub fn add_arg_owned(&mut self, arg_id: u16, mut bytes: Vec<u8>) {
        assert!(self.exists(arg_id), "argument {arg_id} not declared on this command");
        let idx = arg_id as usize;
        assert!(self.args[idx].is_none(), "argument {arg_id} already set");

        let len = bytes.len();
        if self.is_string(arg_id) {
            bytes.push(0);
        }
        self.args[idx] = Some(Arg { len, data: bytes });
    }

    /// The value of argument `arg_id`, excluding any decoder-added string
    /// terminator, or `None` if it wasn't present.
    pub fn arg(&self, arg_id: u16) -> Option<&[u8]> {
        let arg = self.args.get(arg_id as usize)?.as_ref()?;
        Some(&arg.data[..arg.len])
    }

    /// The value of argument `arg_id` as UTF-8 text, or `None` if it wasn't
    /// present or isn't valid UTF-8.
    pub fn arg_str(&self, arg_id: u16) -> Option<&str> {
        std::str::from_utf8(self.arg(arg_id)?).ok()
    }

    /// Internal accessor used by the codec's (de)serializer and by tests
    /// that need to observe the raw, possibly NUL-terminated storage.
    pub(crate) fn arg_raw(&self, arg_id: u16) -> Option<&[u8]> {
        Some(&self.args.get(arg_id as usize)?.as_ref()?.data)
    }

    pub(crate) fn declared_ids(&self) -> impl Iterator<Item = u16> + '_ {
        self.arg_flags
            .iter()
            .enumerate()
            .filter(|(_, flags)| **flags & crate::protocol::EXISTS != 0)
            .map(|(id, _)| id as u16)
    }

    pub(crate) fn present_ids(&self) -> impl Iterator<Item = u16> + '_ {
        self.args
            .iter()
            .enumerate()
            .filter(|(_, arg)| arg.is_some())
            .map(|(id, _)| id as u16)
    }

    /// Whether every declared non-optional argument has been set.
    pub fn is_complete(&self) -> bool {
        self.declared_ids().all(|id| self.is_optional(id) || self.args[id as usize].is_some())
    }

    /// Set an argument during decode without the "already declared, not
    /// already set" assertions used for hand-assembled outgoing messages —
    /// the codec enforces those as protocol errors instead of panics.
    pub(crate) fn set_decoded_arg(&mut self, arg_id: u16, len: usize, mut data: Vec<u8>) {
        if self.is_string(arg_id) {
            data.push(0);
        }
        self.args[arg_id as usize] = Some(Arg { len, data });
    }

    pub(crate) fn arg_is_set(&self, arg_id: u16) -> bool {
        self.args
            .get(arg_id as usize)
            .map(|a| a.is_some())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Protocol, OPTIONAL, STRING};

    fn sample_command() -> (Protocol, u16) {
        let mut proto = Protocol::new(0xFACE);
        let cmd = proto.add_cmd(1);
        cmd.add_arg(1, STRING);
        cmd.add_arg(2, OPTIONAL);
        (proto, 1)
    }

    #[test]
    fn complete_requires_only_mandatory_args() {
        let (proto, cmd_id) = sample_command();
        let mut msg = Message::new(cmd_id, proto.command(cmd_id).unwrap());
        assert!(!msg.is_complete());

        msg.add_arg_str(1, "hi");
        assert!(msg.is_complete());
    }

    #[test]
    fn string_arg_is_nul_terminated_internally_but_len_excludes_it() {
        let (proto, cmd_id) = sample_command();
        let mut msg = Message::new(cmd_id, proto.command(cmd_id).unwrap());
        msg.add_arg_str(1, "hi");

        assert_eq!(msg.arg(1), Some(b"hi".as_slice()));
        assert_eq!(msg.arg_raw(1), Some(b"hi\0".as_slice()));
    }

    #[test]
    #[should_panic]
    fn setting_undeclared_arg_panics() {
        let (proto, cmd_id) = sample_command();
        let mut msg = Message::new(cmd_id, proto.command(cmd_id).unwrap());
        msg.add_arg(99, b"x");
    }

    #[test]
    #[should_panic]
    fn setting_arg_twice_panics() {
        let (proto, cmd_id) = sample_command();
        let mut msg = Message::new(cmd_id, proto.command(cmd_id).unwrap());
        msg.add_arg_str(1, "a");
        msg.add_arg_str(1, "b");
    }
}
