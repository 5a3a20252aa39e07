// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! The Amanda NDMP proxy service demultiplexer: accepts loopback-only
//! connections, binds each to one of three named service slots (`DEVICE`,
//! `APPLICATION`, `CHANGER`), and for a bound `DEVICE` slot, drives a tape
//! command loop against a pluggable [`backend::TapeBackend`].

pub mod backend;
mod dispatch;
mod error;
pub mod proto;
pub mod session;

pub use backend::{MemoryTapeBackend, MtioCommand, TapeBackend, TapeError};
pub use dispatch::handle_connection;
pub use error::Error;
pub use session::{ServiceName, Session};
