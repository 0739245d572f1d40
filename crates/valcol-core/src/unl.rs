//! Unique Node List membership.
//!
//! The UNL is the set of signers this node trusts. The collection only
//! needs a membership test; how the list is assembled and refreshed lives
//! elsewhere.

use std::collections::HashSet;
use std::fmt;

use parking_lot::RwLock;

use valcol_types::NodeId;

/// Trait for testing whether a signer is on the local UNL.
///
/// Implementations may be backed by:
/// - A simple in-memory set ([`UnlRegistry`])
/// - A configuration-driven or dynamically fetched list
pub trait UnlMembership: Send + Sync + fmt::Debug {
    /// Whether `node` is on the UNL.
    fn contains(&self, node: &NodeId) -> bool;
}

/// A shared, mutable UNL backed by a hash set.
///
/// Membership changes take effect for subsequent ingests only; validations
/// already tagged keep their trust marker.
#[derive(Debug, Default)]
pub struct UnlRegistry {
    inner: RwLock<HashSet<NodeId>>,
}

impl UnlRegistry {
    /// Create an empty UNL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a UNL from an initial membership list.
    pub fn from_nodes<I: IntoIterator<Item = NodeId>>(nodes: I) -> Self {
        UnlRegistry {
            inner: RwLock::new(nodes.into_iter().collect()),
        }
    }

    /// Add a node. Returns false if it was already present.
    pub fn insert(&self, node: NodeId) -> bool {
        self.inner.write().insert(node)
    }

    /// Remove a node. Returns true if it was present.
    pub fn remove(&self, node: &NodeId) -> bool {
        self.inner.write().remove(node)
    }

    /// Number of nodes on the list.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns true if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl UnlMembership for UnlRegistry {
    fn contains(&self, node: &NodeId) -> bool {
        self.inner.read().contains(node)
    }
}
