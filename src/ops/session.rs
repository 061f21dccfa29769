//! Rebuild session state.
//!
//! A watch-mode rebuild can start while an earlier resolution is still in
//! flight. Every resolution takes a [`Ticket`]; committing a result with a
//! ticket older than the newest one discards it whole.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Generation number of one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// State shared across the builds of one session.
#[derive(Debug, Default)]
pub struct BuildSession {
    generation: AtomicU64,
    cleared: AtomicBool,
}

impl BuildSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new resolution, superseding any in flight.
    pub fn begin(&self) -> Ticket {
        Ticket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `ticket` is still the newest resolution.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }

    /// Hand back `value` if `ticket` is still current, else drop it.
    pub fn commit<T>(&self, ticket: Ticket, value: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(value)
        } else {
            tracing::debug!("discarding stale result of generation {}", ticket.0);
            None
        }
    }

    /// Returns true exactly once per session: the first caller performs the
    /// output clear.
    pub fn take_clear(&self) -> bool {
        !self.cleared.swap(true, Ordering::SeqCst)
    }
}
