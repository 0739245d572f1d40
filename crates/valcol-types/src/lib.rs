//! Identity and hash primitives for the validation collection.
//!
//! This crate provides the leaf types shared by the storage and core layers:
//! - `NodeId`: 160-bit signer identity, derived from a node public key
//! - `LedgerHash`: 256-bit ledger identifier
//! - `NodePublicKey`: opaque signer public key with a canonical rendering
//! - SHA3-256 helpers and node-id derivation

pub mod hash;
pub mod ids;

pub use hash::{node_id_from_public, sha3_256};
pub use ids::{LedgerHash, NodeId, NodePublicKey};
