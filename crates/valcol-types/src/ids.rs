//! Identity types for the validation layer.
//!
//! This module defines the canonical identity types used when tracking
//! "who signed this validation" and "which ledger does it attest to".

use std::fmt;

/// A 160-bit node identity, derived from the node's public key.
///
/// This is the compact key used to index validations per signer. It is
/// distinct from [`NodePublicKey`], which carries the full key material and
/// is what gets persisted and rendered in logs.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Default)]
pub struct NodeId(pub [u8; 20]);

impl NodeId {
    /// Create a `NodeId` from raw bytes.
    pub const fn new(bytes: [u8; 20]) -> Self {
        NodeId(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Parse a `NodeId` from 40 lowercase hex characters.
    ///
    /// Returns `None` if the input is not exactly 20 bytes of hex.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 20] = bytes.try_into().ok()?;
        Some(NodeId(arr))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl From<[u8; 20]> for NodeId {
    fn from(bytes: [u8; 20]) -> Self {
        NodeId(bytes)
    }
}

/// A 256-bit ledger identifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Default)]
pub struct LedgerHash(pub [u8; 32]);

impl LedgerHash {
    /// Create a `LedgerHash` from raw bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        LedgerHash(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering, as persisted in the `LedgerHash` column.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a `LedgerHash` from 64 lowercase hex characters.
    ///
    /// Returns `None` if the input is not exactly 32 bytes of hex.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(LedgerHash(arr))
    }
}

impl fmt::Display for LedgerHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 32]> for LedgerHash {
    fn from(bytes: [u8; 32]) -> Self {
        LedgerHash(bytes)
    }
}

/// A node's signing public key.
///
/// This type is intentionally opaque:
/// - No algorithm-specific semantics.
/// - No size guarantees.
/// - It's just "bytes representing a node public key".
///
/// The signature scheme and its verification live outside this workspace.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodePublicKey(pub Vec<u8>);

impl NodePublicKey {
    /// Create a `NodePublicKey` from raw key bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        NodePublicKey(bytes)
    }

    /// Get the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Canonical human-readable rendering: an `n` prefix followed by the
    /// lowercase hex of the key bytes. Used in logs and in the persisted
    /// `NodePubKey` column.
    pub fn human(&self) -> String {
        format!("n{}", hex::encode(&self.0))
    }
}

impl From<Vec<u8>> for NodePublicKey {
    fn from(bytes: Vec<u8>) -> Self {
        NodePublicKey(bytes)
    }
}
