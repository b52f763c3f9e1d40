//! Pending-request correlation table.
//!
//! Each outstanding `send_and_wait` owns one registration keyed by its
//! normalized reply prefix. A received line fulfils, for every distinct
//! prefix it matches, the oldest registration with that prefix.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// Completion slot of a pending request.
pub(crate) type ReplySlot = oneshot::Receiver<Result<String>>;

struct Waiter {
    id: u64,
    prefix: String,
    reply: oneshot::Sender<Result<String>>,
}

#[derive(Default)]
struct TableState {
    next_id: u64,
    waiters: Vec<Waiter>,
    closed: bool,
}

/// Registrations awaiting a reply line.
#[derive(Default)]
pub(crate) struct PendingTable {
    state: Mutex<TableState>,
}

// ============================================================================
// PendingTable
// ============================================================================

impl PendingTable {
    /// Registers a waiter for `prefix` (already normalized).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] once the table is closed.
    pub(crate) fn register(&self, prefix: String) -> Result<(u64, ReplySlot)> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(Error::disposed("control"));
        }

        state.next_id += 1;
        let id = state.next_id;
        let (reply, slot) = oneshot::channel();
        state.waiters.push(Waiter { id, prefix, reply });

        Ok((id, slot))
    }

    /// Removes a registration. Returns `false` if it was already fulfilled.
    pub(crate) fn remove(&self, id: u64) -> bool {
        let mut state = self.state.lock();
        let before = state.waiters.len();
        state.waiters.retain(|waiter| waiter.id != id);
        state.waiters.len() != before
    }

    /// Fulfils the waiters `line` answers. Returns how many were fulfilled.
    pub(crate) fn dispatch(&self, line: &str) -> usize {
        let matched: Vec<Waiter> = {
            let mut state = self.state.lock();
            let mut matched: Vec<Waiter> = Vec::new();
            let mut index = 0;

            while index < state.waiters.len() {
                let waiter = &state.waiters[index];
                let first_for_prefix = answers(&waiter.prefix, line)
                    && !matched.iter().any(|taken| taken.prefix == waiter.prefix);

                if first_for_prefix {
                    matched.push(state.waiters.remove(index));
                } else {
                    index += 1;
                }
            }
            matched
        };

        let count = matched.len();
        for waiter in matched {
            // a cancelled caller may have dropped its slot already
            let _ = waiter.reply.send(Ok(line.to_string()));
        }
        count
    }

    /// Fails every waiter with [`Error::ConnectionClosed`] and refuses new
    /// registrations. Returns how many were failed.
    pub(crate) fn close(&self) -> usize {
        let waiters = {
            let mut state = self.state.lock();
            state.closed = true;
            std::mem::take(&mut state.waiters)
        };

        let count = waiters.len();
        for waiter in waiters {
            let _ = waiter.reply.send(Err(Error::ConnectionClosed));
        }
        count
    }

    /// Returns the number of outstanding registrations.
    pub(crate) fn len(&self) -> usize {
        self.state.lock().waiters.len()
    }
}

/// `true` if `line` is a reply for the normalized `prefix`.
///
/// A reply carrying no fields after the prefix matches too.
fn answers(prefix: &str, line: &str) -> bool {
    line.starts_with(prefix) || line == prefix.trim_end()
}

// ============================================================================
// Guard
// ============================================================================

/// Removes a registration when the waiting caller goes away.
pub(crate) struct PendingGuard<'a> {
    pub(crate) table: &'a PendingTable,
    pub(crate) id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.table.remove(self.id);
    }
}

// ============================================================================
// Tests
// ============================================================================
