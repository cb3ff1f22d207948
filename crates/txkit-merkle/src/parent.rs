//! Merkle tree parent computation.

use txkit_codec::digest::sha256d;
use txkit_codec::Hash256;

/// Compute the parent of two Merkle tree nodes.
///
/// Both hashes are in internal (little-endian) byte order; they are
/// concatenated directly and double-SHA256'd.
pub fn merkle_parent(left: &Hash256, right: &Hash256) -> Hash256 {
    let mut concatenated = [0u8; 64];
    concatenated[..32].copy_from_slice(left.as_bytes());
    concatenated[32..].copy_from_slice(right.as_bytes());
    Hash256::new(sha256d(&concatenated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_parent() {
        let left =
            Hash256::from_hex("d6c79a6ef05572f0cb8e9a450c561fc40b0a8a7d48faad95e20d93ddeb08c231")
                .unwrap();
        let right =
            Hash256::from_hex("b1ed931b79056438b990d8981ba46fae97e5574b142445a74a44b978af284f98")
                .unwrap();
        let parent = merkle_parent(&left, &right);
        assert_eq!(
            parent.to_string(),
            "b0d537b3ee52e472507f453df3d69561720346118a5a8c4d85ca0de73bc792be"
        );
    }

    #[test]
    fn duplicate_sibling() {
        let node =
            Hash256::from_hex("d6c79a6ef05572f0cb8e9a450c561fc40b0a8a7d48faad95e20d93ddeb08c231")
                .unwrap();
        // Pairing a node with itself is how odd-width levels are closed.
        let parent = merkle_parent(&node, &node);
        assert_ne!(parent, node);
        assert_eq!(parent, merkle_parent(&node, &node));
    }
}
