//! The validation collection: both indexes, ingest, queries, aging, and
//! the background writer pipeline.
//!
//! # Design Notes
//!
//! ## Locking
//!
//! One `parking_lot::Mutex` guards the whole mutable state: the per-ledger
//! index, the per-signer generation slots, the stale queue, the dead-ledger
//! ring, and the writer latch. Ingest and queries run on caller threads and
//! hold the lock only for map operations; no read API returns references
//! into the guarded state, snapshots are owned copies.
//!
//! ## Generations
//!
//! Each signer that produces current validations occupies one
//! [`ValidationPair`] slot. A strictly newer close time advances the pair:
//! the previous newest becomes oldest, and a displaced oldest moves to the
//! stale queue. Arrivals with an equal or older close time leave the pair
//! untouched; they stay reachable through the per-ledger index only. Both
//! generations are kept even when they attest to different ledgers.
//!
//! ## Writer
//!
//! The stale queue is drained by at most one detached writer thread,
//! spawned lazily when an eviction happens while no writer is running. The
//! writer swaps the queue out under the lock, releases the lock for the
//! store transaction, then re-acquires and drains again until the queue
//! stays empty, which closes the window where evictions race the writer's
//! exit. The `writing` latch is flipped on by the enqueuer and off by the
//! writer only, with the lock held and the queue empty; a condition
//! variable signals waiters in [`ValidationCollection::flush`] when the
//! writer goes idle.
//!
//! A failed store batch is logged, counted, and pushed back to the head of
//! the stale queue; the next eviction or flush respawns the writer and
//! retries it. Nothing is dropped.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, trace, warn};

use valcol_store::{ValidationRow, ValidationStore};
use valcol_types::{LedgerHash, NodeId};

use crate::clock::CloseTimeSource;
use crate::config::{ValidationConfig, CLOSE_TIME_TOLERANCE};
use crate::dead_ledgers::DeadLedgerRing;
use crate::metrics::CollectionMetrics;
use crate::unl::UnlMembership;
use crate::validation::{Validation, ValidationPair};

// ============================================================================
// Guarded state
// ============================================================================

/// Everything the collection mutex protects.
struct CollectionState {
    /// ledger hash → (signer → validation). One validation per
    /// (ledger, signer); the first arrival wins.
    by_ledger: HashMap<LedgerHash, HashMap<NodeId, Arc<Validation>>>,
    /// signer → newest/oldest generation slot. Only current validations
    /// ever enter this index.
    current: HashMap<NodeId, ValidationPair>,
    /// Validations displaced from `current`, awaiting persistence.
    stale: Vec<Arc<Validation>>,
    /// Ledgers known to be abandoned.
    dead_ledgers: DeadLedgerRing,
    /// Writer latch: true while a writer thread is draining the stale
    /// queue. Flipped on by the enqueuer, off by the writer.
    writing: bool,
}

struct Shared {
    state: Mutex<CollectionState>,
    /// Signaled by the writer when it clears `writing`.
    writer_idle: Condvar,
    store: Arc<dyn ValidationStore>,
    metrics: CollectionMetrics,
}

// ============================================================================
// ValidationCollection
// ============================================================================

/// In-memory registry of signed ledger validations with an asynchronous
/// archival pipeline.
///
/// Ingest ([`add_validation`](Self::add_validation)) and the query surface
/// are safe to call concurrently from any number of threads. Persistence
/// happens on a dedicated detached thread and never blocks ingest.
pub struct ValidationCollection {
    config: ValidationConfig,
    unl: Arc<dyn UnlMembership>,
    clock: Arc<dyn CloseTimeSource>,
    shared: Arc<Shared>,
}

impl ValidationCollection {
    /// Create an empty collection over the given oracles and store.
    pub fn new(
        config: ValidationConfig,
        unl: Arc<dyn UnlMembership>,
        clock: Arc<dyn CloseTimeSource>,
        store: Arc<dyn ValidationStore>,
    ) -> Self {
        let dead_capacity = config.dead_ledger_capacity;
        ValidationCollection {
            config,
            unl,
            clock,
            shared: Arc::new(Shared {
                state: Mutex::new(CollectionState {
                    by_ledger: HashMap::new(),
                    current: HashMap::new(),
                    stale: Vec::new(),
                    dead_ledgers: DeadLedgerRing::new(dead_capacity),
                    writing: false,
                }),
                writer_idle: Condvar::new(),
                store,
                metrics: CollectionMetrics::new(),
            }),
        }
    }

    /// The collection's configuration.
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Ingest and writer counters.
    pub fn metrics(&self) -> &CollectionMetrics {
        &self.shared.metrics
    }

    /// Number of validations waiting for the writer. Observability only;
    /// the value is stale the moment the lock is released.
    pub fn stale_queue_depth(&self) -> usize {
        self.shared.state.lock().stale.len()
    }

    // ========================================================================
    // Ingest
    // ========================================================================

    /// Ingest one validation.
    ///
    /// The validation is trust-tagged against the UNL, tested for currency
    /// against the network close time, inserted into the per-ledger index
    /// (first arrival per (ledger, signer) wins), and, when current,
    /// advanced into the signer's generation slot. A displaced oldest
    /// generation moves to the stale queue and pokes the writer.
    ///
    /// Returns true iff the validation is current, trusted, and newly
    /// retained; duplicates, untrusted signers, and stale arrivals return
    /// false.
    pub fn add_validation(&self, val: Arc<Validation>) -> bool {
        self.shared.metrics.inc_received();

        let node_id = val.node_id();
        let ledger = val.ledger_hash();
        let mut is_current = false;

        if self.unl.contains(&node_id) {
            val.set_trusted();
            let now = self.clock.now_close_time();
            let close = val.close_time();
            // Close-time arithmetic wraps with the u32 wire representation.
            if now > close.wrapping_sub(CLOSE_TIME_TOLERANCE)
                && now < close.wrapping_add(self.config.ledger_max_interval)
            {
                is_current = true;
            } else {
                warn!(now, close, "received stale validation");
                self.shared.metrics.inc_stale_on_ingest();
            }
        } else {
            info!(signer = %val.human_signer(), "signer not in UNL");
            self.shared.metrics.inc_untrusted();
        }

        {
            let mut guard = self.shared.state.lock();
            let state = &mut *guard;

            match state.by_ledger.entry(ledger).or_default().entry(node_id) {
                Entry::Occupied(_) => {
                    self.shared.metrics.inc_duplicate();
                    return false;
                }
                Entry::Vacant(slot) => {
                    slot.insert(Arc::clone(&val));
                }
            }

            if is_current {
                let mut evicted = false;
                match state.current.entry(node_id) {
                    Entry::Vacant(slot) => {
                        slot.insert(ValidationPair::new(Arc::clone(&val)));
                    }
                    Entry::Occupied(mut slot) => {
                        let pair = slot.get_mut();
                        let displaces = match &pair.newest {
                            Some(newest) => val.close_time() > newest.close_time(),
                            None => true,
                        };
                        if displaces {
                            if let Some(oldest) = pair.oldest.take() {
                                state.stale.push(oldest);
                                evicted = true;
                            }
                            pair.oldest = pair.newest.take();
                            pair.newest = Some(Arc::clone(&val));
                        }
                    }
                }
                if evicted {
                    self.shared.metrics.add_evicted(1);
                    self.cond_write(state);
                }
            }
        }

        info!(
            ledger = %ledger,
            signer = %val.human_signer(),
            trusted = val.is_trusted(),
            "validation added"
        );
        if is_current {
            self.shared.metrics.inc_added_current();
        }
        is_current
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Snapshot of every validation seen for `ledger`, keyed by signer.
    pub fn get_validations(&self, ledger: &LedgerHash) -> HashMap<NodeId, Arc<Validation>> {
        let guard = self.shared.state.lock();
        guard.by_ledger.get(ledger).cloned().unwrap_or_default()
    }

    /// Count `ledger`'s validations as `(trusted, untrusted)`.
    ///
    /// With `current_only`, trusted entries outside
    /// `close <= now <= close + 2 * ledger_max_interval` count as
    /// untrusted instead. This window is wider than the ingest window and
    /// deliberately asymmetric around the close time.
    pub fn get_validation_count(&self, ledger: &LedgerHash, current_only: bool) -> (usize, usize) {
        let now = self.clock.now_close_time();
        let mut trusted = 0;
        let mut untrusted = 0;

        let guard = self.shared.state.lock();
        if let Some(set) = guard.by_ledger.get(ledger) {
            for val in set.values() {
                let mut is_trusted = val.is_trusted();
                if is_trusted && current_only {
                    let close = val.close_time();
                    if now < close
                        || now > close.wrapping_add(2 * self.config.ledger_max_interval)
                    {
                        is_trusted = false;
                    }
                }
                if is_trusted {
                    trusted += 1;
                } else {
                    untrusted += 1;
                }
            }
        }
        (trusted, untrusted)
    }

    /// Count of trusted validations seen for `ledger`, regardless of
    /// currency.
    pub fn get_trusted_validation_count(&self, ledger: &LedgerHash) -> usize {
        let guard = self.shared.state.lock();
        guard
            .by_ledger
            .get(ledger)
            .map(|set| set.values().filter(|v| v.is_trusted()).count())
            .unwrap_or(0)
    }

    /// Count of signers whose newest generation is trusted and closed
    /// after `after_time`. Non-destructive.
    pub fn get_current_validation_count(&self, after_time: u32) -> usize {
        let guard = self.shared.state.lock();
        guard
            .current
            .values()
            .filter(|pair| match &pair.newest {
                Some(newest) => newest.is_trusted() && newest.close_time() > after_time,
                None => false,
            })
            .count()
    }

    /// Tally the current index per ledger hash, aging out expired
    /// generations on the way.
    ///
    /// This is the canonical aging pass: any generation more than
    /// `ledger_max_interval` past its close time is evicted to the stale
    /// queue, signers left with neither generation are removed, and the
    /// writer is poked if anything was evicted. Survivors are counted once
    /// per occupied slot under the slot's ledger hash.
    pub fn get_current_validations(&self) -> HashMap<LedgerHash, usize> {
        let now = self.clock.now_close_time();
        let interval = self.config.ledger_max_interval;
        let mut ret: HashMap<LedgerHash, usize> = HashMap::new();

        let mut guard = self.shared.state.lock();
        let mut evicted = 0u64;
        {
            let CollectionState { current, stale, .. } = &mut *guard;
            current.retain(|_, pair| {
                let oldest_expired = matches!(
                    &pair.oldest,
                    Some(v) if now > v.close_time().wrapping_add(interval)
                );
                if oldest_expired {
                    if let Some(oldest) = pair.oldest.take() {
                        stale.push(oldest);
                        evicted += 1;
                    }
                }
                let newest_expired = matches!(
                    &pair.newest,
                    Some(v) if now > v.close_time().wrapping_add(interval)
                );
                if newest_expired {
                    if let Some(newest) = pair.newest.take() {
                        stale.push(newest);
                        evicted += 1;
                    }
                }

                if pair.is_empty() {
                    return false;
                }
                if let Some(oldest) = &pair.oldest {
                    trace!(ledger = %oldest.ledger_hash(), close = oldest.close_time(), "old generation");
                    *ret.entry(oldest.ledger_hash()).or_insert(0) += 1;
                }
                if let Some(newest) = &pair.newest {
                    trace!(ledger = %newest.ledger_hash(), close = newest.close_time(), "new generation");
                    *ret.entry(newest.ledger_hash()).or_insert(0) += 1;
                }
                true
            });
        }
        if evicted > 0 {
            self.shared.metrics.add_evicted(evicted);
            self.cond_write(&mut guard);
        }
        ret
    }

    // ========================================================================
    // Dead ledgers
    // ========================================================================

    /// Whether `ledger` has been marked abandoned.
    pub fn is_dead_ledger(&self, ledger: &LedgerHash) -> bool {
        self.shared.state.lock().dead_ledgers.contains(ledger)
    }

    /// Mark `ledger` abandoned. Advisory: nothing is pruned from the
    /// per-ledger index.
    pub fn add_dead_ledger(&self, ledger: LedgerHash) {
        self.shared.state.lock().dead_ledgers.mark(ledger);
    }

    // ========================================================================
    // Flush
    // ========================================================================

    /// Push every held generation to the stale queue, clear the current
    /// index, and block until the writer has gone idle.
    ///
    /// Used at shutdown or an orderly checkpoint. If a store failure left
    /// the writer idle with work still queued, that work stays queued and
    /// this call still returns.
    pub fn flush(&self) {
        let mut guard = self.shared.state.lock();
        let drained = Self::drain_current(&mut guard);
        if drained > 0 {
            self.shared.metrics.add_evicted(drained);
            self.cond_write(&mut guard);
        }
        while guard.writing {
            self.shared.writer_idle.wait(&mut guard);
        }
    }

    /// Bounded [`flush`](Self::flush): gives up waiting after `timeout`.
    ///
    /// Returns true if the writer went idle in time.
    pub fn flush_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.shared.state.lock();
        let drained = Self::drain_current(&mut guard);
        if drained > 0 {
            self.shared.metrics.add_evicted(drained);
            self.cond_write(&mut guard);
        }
        while guard.writing {
            if self
                .shared
                .writer_idle
                .wait_until(&mut guard, deadline)
                .timed_out()
            {
                return !guard.writing;
            }
        }
        true
    }

    /// Move both generations of every signer to the stale queue and clear
    /// the current index. Caller holds the lock. Returns how many
    /// validations moved.
    fn drain_current(state: &mut CollectionState) -> u64 {
        let mut drained = 0u64;
        let CollectionState { current, stale, .. } = state;
        for (_, pair) in current.drain() {
            if let Some(oldest) = pair.oldest {
                stale.push(oldest);
                drained += 1;
            }
            if let Some(newest) = pair.newest {
                stale.push(newest);
                drained += 1;
            }
        }
        drained
    }

    // ========================================================================
    // Writer pipeline
    // ========================================================================

    /// Spawn the writer if none is running. Caller holds the lock.
    fn cond_write(&self, state: &mut CollectionState) {
        if state.writing {
            return;
        }
        state.writing = true;
        let shared = Arc::clone(&self.shared);
        thread::Builder::new()
            .name("validation-writer".to_string())
            .spawn(move || Self::write_loop(shared))
            .expect("failed to spawn validation writer thread");
    }

    /// Writer thread body: drain the stale queue in coalesced batches,
    /// one store transaction per batch, lock released across the
    /// transaction.
    fn write_loop(shared: Arc<Shared>) {
        let mut guard = shared.state.lock();
        debug_assert!(guard.writing);
        while !guard.stale.is_empty() {
            let batch = std::mem::take(&mut guard.stale);
            drop(guard);

            let rows: Vec<ValidationRow> = batch.iter().map(|v| v.to_row()).collect();
            let result = shared.store.write_batch(&rows);

            guard = shared.state.lock();
            match result {
                Ok(()) => {
                    debug!(rows = rows.len(), "stale validations persisted");
                    shared.metrics.add_persisted(rows.len() as u64);
                    shared.metrics.inc_write_batches();
                }
                Err(err) => {
                    error!(
                        error = %err,
                        rows = rows.len(),
                        "failed to persist stale validations, batch re-queued"
                    );
                    shared.metrics.inc_write_failures();
                    // Put the failed batch back ahead of anything that
                    // arrived while the lock was released.
                    let mut requeued = batch;
                    requeued.append(&mut guard.stale);
                    guard.stale = requeued;
                    break;
                }
            }
        }
        guard.writing = false;
        shared.writer_idle.notify_all();
    }
}
