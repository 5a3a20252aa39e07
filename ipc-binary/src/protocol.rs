// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! A protocol table: the sparse-by-id registry of commands and argument
//! slots that both peers of a [`crate::channel::Channel`] are assumed to
//! agree on ahead of time.

/// This argument contains printable text; the decoder appends a NUL byte to
/// the in-memory copy for consumer convenience (not counted in its `len`).
pub const STRING: u8 = 1 << 0;

/// This argument may be omitted from a message.
pub const OPTIONAL: u8 = 1 << 1;

/// Internal marker meaning "this slot has been declared". Never set by
/// callers directly; `Command::add_arg` sets it implicitly.
pub(crate) const EXISTS: u8 = 1 << 7;

/// A declared command: whether it exists, and the flag byte of each of its
/// argument slots (sparse, indexed by argument id; id `0` is unused).
#[derive(Debug, Default, Clone)]
pub struct Command {
    exists: bool,
    arg_flags: Vec<u8>,
}

impl Command {
    fn new() -> Self {
        Self::default()
    }

    /// Declare argument `id` on this command with the given `flags`
    /// (`STRING` and/or `OPTIONAL`; the `EXISTS` bit is set implicitly).
    ///
    /// # Panics
    /// Panics if `id == 0` or if `id` was already declared on this command.
    pub fn add_arg(&mut self, id: u16, flags: u8) {
        assert!(id != 0, "argument id 0 is reserved");
        let id = id as usize;

        if id >= self.arg_flags.len() {
            self.arg_flags.resize(id + 1, 0);
        }

        assert!(self.arg_flags[id] == 0, "argument {id} already defined");
        self.arg_flags[id] = flags | EXISTS;
    }

    pub(crate) fn arg_exists(&self, id: u16) -> bool {
        let id = id as usize;
        id != 0 && id < self.arg_flags.len() && self.arg_flags[id] & EXISTS != 0
    }

    pub(crate) fn arg_flags(&self, id: u16) -> u8 {
        self.arg_flags[id as usize]
    }

    pub(crate) fn is_string(&self, id: u16) -> bool {
        self.arg_flags(id) & STRING != 0
    }

    pub(crate) fn is_optional(&self, id: u16) -> bool {
        self.arg_flags(id) & OPTIONAL != 0
    }

    /// Argument ids declared on this command, in ascending order.
    pub(crate) fn declared_args(&self) -> impl Iterator<Item = u16> + '_ {
        self.arg_flags
            .iter()
            .enumerate()
            .filter(|(_, flags)| **flags & EXISTS != 0)
            .map(|(id, _)| id as u16)
    }
}

/// The immutable-after-construction registry of commands for one protocol
/// variant, identified on the wire by `magic`.
#[derive(Debug, Clone)]
pub struct Protocol {
    magic: u16,
    commands: Vec<Command>,
}

impl Protocol {
    /// Start an empty protocol table tagged with `magic`.
    pub fn new(magic: u16) -> Self {
        Self {
            magic,
            commands: Vec::new(),
        }
    }

    pub fn magic(&self) -> u16 {
        self.magic
    }

    /// Define command `id` and return a mutable reference to it so its
    /// arguments can be declared.
    ///
    /// # Panics
    /// Panics if `id == 0` or if `id` was already defined.
    pub fn add_cmd(&mut self, id: u16) -> &mut Command {
        assert!(id != 0, "command id 0 is reserved");
        let idx = id as usize;

        if idx >= self.commands.len() {
            self.commands.resize_with(idx + 1, Command::new);
        }

        assert!(!self.commands[idx].exists, "command {id} already defined");
        self.commands[idx].exists = true;
        &mut self.commands[idx]
    }

    pub(crate) fn command(&self, id: u16) -> Option<&Command> {
        let idx = id as usize;
        if id == 0 || idx >= self.commands.len() || !self.commands[idx].exists {
            return None;
        }
        Some(&self.commands[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undeclared_command_is_absent() {
        let proto = Protocol::new(0xFACE);
        assert!(proto.command(1).is_none());
    }

    #[test]
    fn sparse_ids_leave_holes() {
        let mut proto = Protocol::new(0xFACE);
        proto.add_cmd(5);
        assert!(proto.command(1).is_none());
        assert!(proto.command(5).is_some());
    }

    #[test]
    #[should_panic]
    fn redefining_a_command_panics() {
        let mut proto = Protocol::new(0xFACE);
        proto.add_cmd(1);
        proto.add_cmd(1);
    }

    #[test]
    #[should_panic]
    fn command_id_zero_panics() {
        let mut proto = Protocol::new(0xFACE);
        proto.add_cmd(0);
    }

    #[test]
    fn arg_flags_round_trip() {
        let mut proto = Protocol::new(0xFACE);
        let cmd = proto.add_cmd(1);
        cmd.add_arg(2, STRING | OPTIONAL);

        let cmd = proto.command(1).unwrap();
        assert!(cmd.arg_exists(2));
        assert!(cmd.is_string(2));
        assert!(cmd.is_optional(2));
        assert!(!cmd.arg_exists(3));
    }

    #[test]
    #[should_panic]
    fn redefining_an_argument_panics() {
        let mut proto = Protocol::new(0xFACE);
        let cmd = proto.add_cmd(1);
        cmd.add_arg(1, 0);
        cmd.add_arg(1, 0);
    }
}
