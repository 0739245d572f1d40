//! The validation value object and the per-signer generation slot.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use valcol_store::ValidationRow;
use valcol_types::{node_id_from_public, LedgerHash, NodeId, NodePublicKey};

/// A signed statement that a node closed a specific ledger at a specific
/// time.
///
/// Validations arrive from the network already parsed and
/// signature-checked; this type carries the fields the collection indexes
/// on plus the raw signature for archival. Everything is immutable after
/// construction except the `trusted` marker, which is set at most once
/// during ingest when the signer is found in the UNL, and never cleared.
///
/// Validations are shared between the per-ledger index, the per-signer
/// generation slots, and the stale queue, so they are handled as
/// `Arc<Validation>` throughout.
pub struct Validation {
    signer_public: NodePublicKey,
    node_id: NodeId,
    ledger_hash: LedgerHash,
    close_time: u32,
    flags: u32,
    signature: Vec<u8>,
    trusted: AtomicBool,
}

impl Validation {
    /// Build a validation from its wire fields.
    ///
    /// The 160-bit node id is derived from the signer public key here so
    /// the two can never disagree.
    pub fn new(
        signer_public: NodePublicKey,
        ledger_hash: LedgerHash,
        close_time: u32,
        flags: u32,
        signature: Vec<u8>,
    ) -> Self {
        let node_id = node_id_from_public(&signer_public);
        Validation {
            signer_public,
            node_id,
            ledger_hash,
            close_time,
            flags,
            signature,
            trusted: AtomicBool::new(false),
        }
    }

    /// The signer's public key.
    pub fn signer_public(&self) -> &NodePublicKey {
        &self.signer_public
    }

    /// The signer's derived 160-bit identity.
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Hash of the ledger this validation attests to.
    pub fn ledger_hash(&self) -> LedgerHash {
        self.ledger_hash
    }

    /// Consensus close time, seconds.
    pub fn close_time(&self) -> u32 {
        self.close_time
    }

    /// Raw validation flags.
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Raw signature bytes.
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Whether the signer was in the UNL when this validation was ingested.
    pub fn is_trusted(&self) -> bool {
        self.trusted.load(Ordering::Relaxed)
    }

    /// Mark the signer as UNL-trusted. Set once during ingest; never
    /// cleared.
    pub fn set_trusted(&self) {
        self.trusted.store(true, Ordering::Relaxed);
    }

    /// Canonical human-readable rendering of the signer, for logs and the
    /// persisted `NodePubKey` column.
    pub fn human_signer(&self) -> String {
        self.signer_public.human()
    }

    /// The persisted shape of this validation.
    pub fn to_row(&self) -> ValidationRow {
        ValidationRow {
            ledger_hash: self.ledger_hash,
            node_public: self.signer_public.clone(),
            flags: self.flags,
            close_time: self.close_time,
            signature: self.signature.clone(),
        }
    }
}

impl fmt::Debug for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validation")
            .field("signer", &self.human_signer())
            .field("ledger_hash", &self.ledger_hash)
            .field("close_time", &self.close_time)
            .field("flags", &self.flags)
            .field("trusted", &self.is_trusted())
            .finish_non_exhaustive()
    }
}

/// The newest/oldest generation slot kept per signer in the current index.
///
/// When both slots are occupied, `newest.close_time > oldest.close_time`.
/// The two slots may attest to the same ledger or to different ones; a
/// signer validating two ledgers in quick succession is retained as-is.
#[derive(Debug, Default)]
pub struct ValidationPair {
    /// The most recent current validation from this signer.
    pub newest: Option<Arc<Validation>>,
    /// The previous current validation, displaced by `newest`.
    pub oldest: Option<Arc<Validation>>,
}

impl ValidationPair {
    /// A pair holding its first validation.
    pub fn new(newest: Arc<Validation>) -> Self {
        ValidationPair {
            newest: Some(newest),
            oldest: None,
        }
    }

    /// True when both slots are empty.
    pub fn is_empty(&self) -> bool {
        self.newest.is_none() && self.oldest.is_none()
    }
}
