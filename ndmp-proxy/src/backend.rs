// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! The pluggable collaborator that stands in for the real NDMP data-agent
//! connection (`ndmca_connect_tape_agent`, `ndmca_tape_open`, ... in the
//! original dispatcher). Driving an actual tape drive over NDMP is outside
//! this crate's scope; callers that need that wire it up by implementing
//! [`TapeBackend`] themselves. [`MemoryTapeBackend`] is a simple in-memory
//! stand-in for standalone operation and tests.

/// A tape-style error, reported to the client as a short error code plus a
/// free-form message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapeError {
    pub code: &'static str,
    pub message: String,
}

impl TapeError {
    pub fn illegal_args(message: impl Into<String>) -> Self {
        Self {
            code: "ILLEGAL_ARGS",
            message: message.into(),
        }
    }

    pub fn device_error(message: impl Into<String>) -> Self {
        Self {
            code: "DEVICE_ERROR",
            message: message.into(),
        }
    }

    pub fn io_error(message: impl Into<String>) -> Self {
        Self {
            code: "IO_ERROR",
            message: message.into(),
        }
    }
}

/// One of the two commands `TAPE_MTIO` supports on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MtioCommand {
    Rewind,
    Eof,
}

impl MtioCommand {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "REWIND" => Some(Self::Rewind),
            "EOF" => Some(Self::Eof),
            _ => None,
        }
    }
}

/// Everything the `DEVICE` service slot needs from a real tape drive.
///
/// A `TapeBackend` is owned by exactly one bound `DEVICE` slot at a time; the
/// demux never shares one across slots.
pub trait TapeBackend: Send {
    /// Connect to the NDMP data agent for `host`/`username`/`password` and
    /// open `filename` in `mode` ("r"/"w"/"rw", matching the wire value Amanda
    /// sends). Corresponds to `ndmca_connect_tape_agent` + `ndmca_tape_open`.
    fn open(
        &mut self,
        filename: &str,
        mode: &str,
        host: &str,
        username: &str,
        password: &str,
    ) -> Result<(), TapeError>;

    /// Corresponds to `ndmca_tape_close`. Called both on an explicit
    /// `TAPE_CLOSE` and when tearing down a slot that still has the device
    /// open.
    fn close(&mut self) -> Result<(), TapeError>;

    /// Corresponds to `ndmca_media_mtio_tape`.
    fn mtio(&mut self, command: MtioCommand, count: u32) -> Result<(), TapeError>;

    /// Corresponds to `ndmca_tape_write`.
    fn write(&mut self, data: &[u8]) -> Result<(), TapeError>;

    /// Corresponds to `ndmca_tape_read_partial`: may return fewer bytes than
    /// `count` (e.g. at a tape mark or EOF) but never more.
    fn read(&mut self, count: usize) -> Result<Vec<u8>, TapeError>;
}

/// An in-memory stand-in for a tape device: `write` appends to a byte
/// buffer, `read` drains it from the front. Good enough for standalone
/// operation and tests; not a substitute for a real NDMP data connection.
#[derive(Debug, Default)]
pub struct MemoryTapeBackend {
    open: bool,
    data: Vec<u8>,
}

impl MemoryTapeBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TapeBackend for MemoryTapeBackend {
    fn open(
        &mut self,
        _filename: &str,
        _mode: &str,
        _host: &str,
        _username: &str,
        _password: &str,
    ) -> Result<(), TapeError> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), TapeError> {
        self.open = false;
        Ok(())
    }

    fn mtio(&mut self, _command: MtioCommand, _count: u32) -> Result<(), TapeError> {
        if !self.open {
            return Err(TapeError::device_error("no tape device open"));
        }
        self.data.clear();
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TapeError> {
        if !self.open {
            return Err(TapeError::device_error("no tape device open"));
        }
        self.data.extend_from_slice(data);
        Ok(())
    }

    fn read(&mut self, count: usize) -> Result<Vec<u8>, TapeError> {
        if !self.open {
            return Err(TapeError::device_error("no tape device open"));
        }
        let n = count.min(self.data.len());
        Ok(self.data.drain(..n).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips_exactly_what_was_written() {
        let mut tape = MemoryTapeBackend::new();
        tape.open("file", "rw", "host", "user", "pass").unwrap();
        tape.write(b"hello world").unwrap();
        assert_eq!(tape.read(5).unwrap(), b"hello");
        assert_eq!(tape.read(100).unwrap(), b" world");
        assert_eq!(tape.read(10).unwrap(), b"");
    }

    #[test]
    fn operations_before_open_fail() {
        let mut tape = MemoryTapeBackend::new();
        assert!(tape.write(b"x").is_err());
        assert!(tape.read(1).is_err());
        assert!(tape.mtio(MtioCommand::Rewind, 1).is_err());
    }

    #[test]
    fn mtio_parses_only_the_two_known_commands() {
        assert_eq!(MtioCommand::parse("REWIND"), Some(MtioCommand::Rewind));
        assert_eq!(MtioCommand::parse("EOF"), Some(MtioCommand::Eof));
        assert_eq!(MtioCommand::parse("NOPE"), None);
    }
}
