//! The network close-time oracle.

use std::sync::atomic::{AtomicU32, Ordering};

/// Source of the current network close time.
///
/// This is consensus time in seconds, not wall-clock time; the node's
/// operations layer derives it from the ledgers the network is agreeing
/// on. The collection only ever reads it.
pub trait CloseTimeSource: Send + Sync {
    /// The current network close time, seconds.
    fn now_close_time(&self) -> u32;
}

/// A manually steered close-time source.
///
/// Deterministic stand-in for the network clock in tests and simulations.
#[derive(Debug, Default)]
pub struct ManualCloseTime {
    now: AtomicU32,
}

impl ManualCloseTime {
    /// Create a clock reading `now`.
    pub fn new(now: u32) -> Self {
        ManualCloseTime {
            now: AtomicU32::new(now),
        }
    }

    /// Set the clock to an absolute close time.
    pub fn set(&self, now: u32) {
        self.now.store(now, Ordering::Relaxed);
    }

    /// Advance the clock by `secs`.
    pub fn advance(&self, secs: u32) {
        self.now.fetch_add(secs, Ordering::Relaxed);
    }
}

impl CloseTimeSource for ManualCloseTime {
    fn now_close_time(&self) -> u32 {
        self.now.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_set_and_advance() {
        let clock = ManualCloseTime::new(100);
        assert_eq!(clock.now_close_time(), 100);
        clock.advance(25);
        assert_eq!(clock.now_close_time(), 125);
        clock.set(10);
        assert_eq!(clock.now_close_time(), 10);
    }
}
