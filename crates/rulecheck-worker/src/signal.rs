//! A 32-bit wait/notify cell shared between a caller and its worker.
//!
//! The cell never carries data. The worker bumps it after posting a reply and
//! the caller blocks until the value moves away from the one it expects.

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Outcome of [`SignalCell::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// Woken after the value changed.
    Ok,
    /// The value already differed from the expected one.
    NotEqual,
    TimedOut,
}

impl WaitStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WaitStatus::Ok => "ok",
            WaitStatus::NotEqual => "not-equal",
            WaitStatus::TimedOut => "timed-out",
        }
    }
}

#[derive(Debug, Default)]
pub struct SignalCell {
    value: Mutex<i32>,
    changed: Condvar,
}

impl SignalCell {
    pub fn new() -> SignalCell {
        SignalCell::default()
    }

    pub fn load(&self) -> i32 {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn store(&self, value: i32) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Add `delta` and wake every waiter. Returns the previous value.
    pub fn add(&self, delta: i32) -> i32 {
        let mut guard = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = *guard;
        *guard = previous.wrapping_add(delta);
        drop(guard);
        self.changed.notify_all();
        previous
    }

    /// Block while the cell holds `expected`, at most `timeout` when given.
    pub fn wait(&self, expected: i32, timeout: Option<Duration>) -> WaitStatus {
        let mut guard = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        if *guard != expected {
            return WaitStatus::NotEqual;
        }
        let deadline = timeout.map(|t| Instant::now() + t);
        while *guard == expected {
            match deadline {
                None => {
                    guard = self
                        .changed
                        .wait(guard)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return WaitStatus::TimedOut;
                    }
                    let (next, _) = self
                        .changed
                        .wait_timeout(guard, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner);
                    guard = next;
                }
            }
        }
        WaitStatus::Ok
    }
}

#[cfg(test)]
#[path = "tests/signal_tests.rs"]
mod tests;
