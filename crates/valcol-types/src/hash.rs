use sha3::{Digest, Sha3_256};

use crate::ids::{NodeId, NodePublicKey};

/// Compute SHA3-256 over arbitrary bytes.
pub fn sha3_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}

/// Derive a node's 160-bit identity from its public key.
///
/// The id is the first 20 bytes of SHA3-256 over the raw key bytes.
pub fn node_id_from_public(public: &NodePublicKey) -> NodeId {
    let digest = sha3_256(public.as_bytes());
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[..20]);
    NodeId(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha3_is_deterministic() {
        assert_eq!(sha3_256(b"abc"), sha3_256(b"abc"));
        assert_ne!(sha3_256(b"abc"), sha3_256(b"abd"));
    }

    #[test]
    fn node_id_derivation_is_stable() {
        let pk = NodePublicKey::new(vec![1, 2, 3]);
        let id1 = node_id_from_public(&pk);
        let id2 = node_id_from_public(&pk);
        assert_eq!(id1, id2);

        let other = NodePublicKey::new(vec![1, 2, 4]);
        assert_ne!(node_id_from_public(&other), id1);
    }
}
