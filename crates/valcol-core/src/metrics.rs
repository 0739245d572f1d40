//! Observability counters for the validation collection.
//!
//! Lightweight `AtomicU64` counters with relaxed ordering, suitable for the
//! hot ingest path. Counters only ever increase; exact cross-counter
//! ordering is not guaranteed.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters over ingest outcomes and the writer pipeline.
#[derive(Debug, Default)]
pub struct CollectionMetrics {
    /// Validations presented to `add_validation`.
    received_total: AtomicU64,
    /// Validations accepted as current and trusted.
    added_current_total: AtomicU64,
    /// Arrivals rejected because the (ledger, signer) pair already existed.
    duplicate_total: AtomicU64,
    /// Trusted arrivals outside the ingest currency window.
    stale_on_ingest_total: AtomicU64,
    /// Arrivals whose signer was not on the UNL.
    untrusted_total: AtomicU64,
    /// Validations displaced from the current index into the stale queue.
    evicted_total: AtomicU64,
    /// Rows successfully persisted by the writer.
    persisted_total: AtomicU64,
    /// Writer batches committed.
    write_batches_total: AtomicU64,
    /// Writer batches that failed and were re-queued.
    write_failures_total: AtomicU64,
}

impl CollectionMetrics {
    /// Create new metrics with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validations presented for ingest.
    pub fn received(&self) -> u64 {
        self.received_total.load(Ordering::Relaxed)
    }

    /// Validations accepted as current and trusted.
    pub fn added_current(&self) -> u64 {
        self.added_current_total.load(Ordering::Relaxed)
    }

    /// Duplicate (ledger, signer) rejections.
    pub fn duplicates(&self) -> u64 {
        self.duplicate_total.load(Ordering::Relaxed)
    }

    /// Trusted arrivals that were stale at ingest.
    pub fn stale_on_ingest(&self) -> u64 {
        self.stale_on_ingest_total.load(Ordering::Relaxed)
    }

    /// Arrivals from signers outside the UNL.
    pub fn untrusted(&self) -> u64 {
        self.untrusted_total.load(Ordering::Relaxed)
    }

    /// Validations moved to the stale queue.
    pub fn evicted(&self) -> u64 {
        self.evicted_total.load(Ordering::Relaxed)
    }

    /// Rows persisted.
    pub fn persisted(&self) -> u64 {
        self.persisted_total.load(Ordering::Relaxed)
    }

    /// Batches committed.
    pub fn write_batches(&self) -> u64 {
        self.write_batches_total.load(Ordering::Relaxed)
    }

    /// Batches that failed.
    pub fn write_failures(&self) -> u64 {
        self.write_failures_total.load(Ordering::Relaxed)
    }

    pub(crate) fn inc_received(&self) {
        self.received_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_added_current(&self) {
        self.added_current_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_duplicate(&self) {
        self.duplicate_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_stale_on_ingest(&self) {
        self.stale_on_ingest_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_untrusted(&self) {
        self.untrusted_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_evicted(&self, n: u64) {
        self.evicted_total.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn add_persisted(&self, n: u64) {
        self.persisted_total.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn inc_write_batches(&self) {
        self.write_batches_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_write_failures(&self) {
        self.write_failures_total.fetch_add(1, Ordering::Relaxed);
    }
}
