// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! The shared, mutex-protected table of the three named service slots a
//! proxy session offers. One [`Session`] is shared (via `Arc`) across the
//! listener and every per-connection worker thread.

use std::sync::Mutex;

/// One of the three named positions a connection may bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceName {
    Device,
    Application,
    Changer,
}

impl ServiceName {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DEVICE" => Some(Self::Device),
            "APPLICATION" => Some(Self::Application),
            "CHANGER" => Some(Self::Changer),
            _ => None,
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Device => 0,
            Self::Application => 1,
            Self::Changer => 2,
        }
    }
}

#[derive(Debug, Default)]
struct Slots {
    bound: [bool; 3],
}

/// The set of service slots live connections may occupy. Exactly one
/// connection may hold each named slot at a time.
#[derive(Debug, Default)]
pub struct Session {
    slots: Mutex<Slots>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to claim `name`. Returns `true` if this call claimed it,
    /// `false` if it was already bound by another connection.
    pub fn try_bind(&self, name: ServiceName) -> bool {
        let mut slots = self.slots.lock().unwrap();
        let idx = name.index();
        if slots.bound[idx] {
            false
        } else {
            slots.bound[idx] = true;
            true
        }
    }

    /// Release a previously claimed slot, freeing it for a future
    /// connection. Idempotent.
    pub fn release(&self, name: ServiceName) {
        let mut slots = self.slots.lock().unwrap();
        slots.bound[name.index()] = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_slot_can_only_be_bound_once_at_a_time() {
        let session = Session::new();
        assert!(session.try_bind(ServiceName::Device));
        assert!(!session.try_bind(ServiceName::Device));

        session.release(ServiceName::Device);
        assert!(session.try_bind(ServiceName::Device));
    }

    #[test]
    fn slots_are_independent() {
        let session = Session::new();
        assert!(session.try_bind(ServiceName::Device));
        assert!(session.try_bind(ServiceName::Application));
        assert!(session.try_bind(ServiceName::Changer));
    }

    #[test]
    fn unknown_service_name_does_not_parse() {
        assert!(ServiceName::parse("TAPE").is_none());
    }
}
