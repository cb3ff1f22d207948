use proptest::prelude::*;

use txkit_codec::Hash256;
use txkit_merkle::{MerklePath, PathLeaf};

/// Strategy generating structurally valid paths that round-trip through
/// the BRC-74 codec.
fn arb_path() -> impl Strategy<Value = MerklePath> {
    let arb_hash = prop::array::uniform32(any::<u8>()).prop_map(Hash256::new);

    let arb_leaf = (0u64..128, arb_hash, any::<bool>()).prop_map(|(offset, hash, dup)| {
        if dup {
            // Duplicate markers are only legal at odd offsets.
            PathLeaf::dup(offset * 2 + 1)
        } else {
            PathLeaf::node(offset, hash)
        }
    });

    let arb_level = prop::collection::vec(arb_leaf, 1..4).prop_map(|mut level| {
        level.sort_by_key(|leaf| leaf.offset);
        level.dedup_by_key(|leaf| leaf.offset);
        level
    });

    (
        any::<u32>(),
        prop::array::uniform32(any::<u8>()),
        prop::collection::vec(arb_level, 1..6),
    )
        .prop_map(|(height, anchor, mut levels)| {
            // Guarantee a proven TXID on level 0.
            let anchor_leaf = PathLeaf::anchor(0, Hash256::new(anchor));
            levels[0].retain(|leaf| leaf.offset != 0);
            levels[0].insert(0, anchor_leaf);
            MerklePath::new(height, levels)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn binary_roundtrip(path in arb_path()) {
        let bytes = path.to_bytes();
        let decoded = MerklePath::from_bytes(&bytes).unwrap();
        prop_assert_eq!(decoded.to_bytes(), bytes);
    }

    #[test]
    fn hex_roundtrip(path in arb_path()) {
        let hex_str = path.to_hex();
        let decoded = MerklePath::from_hex(&hex_str).unwrap();
        prop_assert_eq!(decoded.to_hex(), hex_str);
    }

    #[test]
    fn combine_with_self_is_identity(path in arb_path()) {
        let mut combined = path.clone();
        combined.combine(&path).unwrap();
        prop_assert_eq!(combined, path);
    }
}
