//! Outstanding command responses
//!
//! A sender registers the opcode it is about to issue and blocks on the
//! returned slot; the event path fills the slot when the matching Command
//! Complete or Command Status arrives.

use crate::error::{HciError, HciResult};
use crate::hci::packet::Opcode;
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Single-use completion slot for one outstanding command
#[derive(Debug, Default)]
pub struct ResponseSlot {
    response: Mutex<Option<Vec<u8>>>,
    ready: Condvar,
}

impl ResponseSlot {
    fn fill(&self, response: Vec<u8>) {
        let mut slot = lock(&self.response);
        *slot = Some(response);
        self.ready.notify_all();
    }

    /// Block until the slot is filled, or until `timeout` elapses
    ///
    /// Returns `None` on timeout. `None` for `timeout` waits forever.
    pub fn wait(&self, timeout: Option<Duration>) -> Option<Vec<u8>> {
        let guard = lock(&self.response);
        match timeout {
            Some(timeout) => {
                let (mut guard, _) = self
                    .ready
                    .wait_timeout_while(guard, timeout, |r| r.is_none())
                    .unwrap_or_else(PoisonError::into_inner);
                guard.take()
            }
            None => {
                let mut guard = self
                    .ready
                    .wait_while(guard, |r| r.is_none())
                    .unwrap_or_else(PoisonError::into_inner);
                guard.take()
            }
        }
    }
}

/// Registry of outstanding commands keyed by opcode
#[derive(Debug, Default)]
pub struct ResponseRegistry {
    pending: Mutex<HashMap<Opcode, Arc<ResponseSlot>>>,
}

impl ResponseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an outstanding command
    ///
    /// Only one command per opcode may be outstanding at a time.
    pub fn register(&self, opcode: Opcode) -> HciResult<Arc<ResponseSlot>> {
        let mut pending = lock(&self.pending);
        if pending.contains_key(&opcode) {
            return Err(HciError::CommandPending(opcode));
        }
        let slot = Arc::new(ResponseSlot::default());
        pending.insert(opcode, Arc::clone(&slot));
        Ok(slot)
    }

    /// Drop the registration for `opcode` without completing it
    pub fn cancel(&self, opcode: Opcode) {
        lock(&self.pending).remove(&opcode);
    }

    /// Complete the command registered under `opcode`
    ///
    /// Returns `false` if nobody is waiting for that opcode.
    pub fn complete(&self, opcode: Opcode, response: Vec<u8>) -> bool {
        let slot = lock(&self.pending).remove(&opcode);
        match slot {
            Some(slot) => {
                slot.fill(response);
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, opcode: Opcode) -> bool {
        lock(&self.pending).contains_key(&opcode)
    }

    pub fn len(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
