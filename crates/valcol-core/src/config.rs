//! Collection configuration.

/// Backdating tolerance applied on ingest, seconds.
///
/// A validation whose close time is up to this far ahead of network time is
/// still considered current. Fixed by the protocol.
pub const CLOSE_TIME_TOLERANCE: u32 = 4;

/// Default capacity of the dead-ledger ring.
pub const DEAD_LEDGER_CAPACITY: usize = 128;

/// Configuration for a [`ValidationCollection`](crate::ValidationCollection).
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Maximum plausible gap between ledger closes, seconds.
    ///
    /// Governs every currency window: ingest accepts validations closing
    /// within `(now - 4, now + ledger_max_interval)`, counting demotes
    /// trusted entries older than `2 * ledger_max_interval`, and the aging
    /// pass evicts generations more than `ledger_max_interval` past their
    /// close.
    pub ledger_max_interval: u32,
    /// Capacity of the dead-ledger ring.
    pub dead_ledger_capacity: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        ValidationConfig {
            ledger_max_interval: 20,
            dead_ledger_capacity: DEAD_LEDGER_CAPACITY,
        }
    }
}

impl ValidationConfig {
    /// Create a configuration with a specific ledger interval.
    pub fn with_ledger_max_interval(mut self, secs: u32) -> Self {
        self.ledger_max_interval = secs.max(1);
        self
    }

    /// Create a configuration with a specific dead-ledger ring capacity.
    pub fn with_dead_ledger_capacity(mut self, capacity: usize) -> Self {
        self.dead_ledger_capacity = capacity.max(1);
        self
    }
}
