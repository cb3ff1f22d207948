//! Compact Merkle inclusion proofs in the BRC-74 binary layout.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use txkit_codec::{ByteReader, ByteWriter, Hash256, VarInt};

use crate::error::MerkleError;
use crate::parent::merkle_parent;
use crate::tracker::ChainTracker;

/// One leaf of a Merkle path level.
///
/// The payload is one of: a plain hash, a `duplicate` marker (the sibling
/// hash is copied), or a hash flagged as a proven TXID on level 0.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathLeaf {
    /// Position within this tree level.
    pub offset: u64,
    /// Hash value; absent when `duplicate` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<Hash256>,
    /// Marks a level-0 leaf as a TXID this path proves.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub txid: bool,
    /// The sibling hash duplicates its pair (odd-width level).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
}

impl PathLeaf {
    /// A plain hash leaf.
    pub fn node(offset: u64, hash: Hash256) -> Self {
        PathLeaf {
            offset,
            hash: Some(hash),
            txid: false,
            duplicate: false,
        }
    }

    /// A level-0 leaf carrying a proven TXID.
    pub fn anchor(offset: u64, txid: Hash256) -> Self {
        PathLeaf {
            offset,
            hash: Some(txid),
            txid: true,
            duplicate: false,
        }
    }

    /// A duplicate marker.
    pub fn dup(offset: u64) -> Self {
        PathLeaf {
            offset,
            hash: None,
            txid: false,
            duplicate: true,
        }
    }
}

/// A Merkle path anchoring one or more TXIDs to a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerklePath {
    /// Height of the block this path commits to.
    pub block_height: u32,
    /// Levels from the leaves (index 0) up toward the root.
    pub path: Vec<Vec<PathLeaf>>,
}

impl MerklePath {
    /// Create a path from pre-built levels.
    pub fn new(block_height: u32, path: Vec<Vec<PathLeaf>>) -> Self {
        MerklePath { block_height, path }
    }

    /// Parse from hex.
    pub fn from_hex(hex_str: &str) -> Result<Self, MerkleError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| MerkleError::InvalidPath(format!("invalid hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Parse from BRC-74 binary.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MerkleError> {
        let mut reader = ByteReader::new(bytes);
        let path = Self::read_from(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(MerkleError::InvalidPath(format!(
                "{} trailing bytes after path",
                reader.remaining()
            )));
        }
        Ok(path)
    }

    /// Parse from a reader positioned at the start of a BRC-74 path.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, MerkleError> {
        let block_height = reader.read_varint()?.value() as u32;
        let tree_height = reader.read_u8()?;

        let mut path = Vec::with_capacity(tree_height as usize);
        for _ in 0..tree_height {
            let leaf_count = reader.read_varint()?.value();
            let mut level = Vec::with_capacity(leaf_count as usize);
            for _ in 0..leaf_count {
                let offset = reader.read_varint()?.value();
                let flags = reader.read_u8()?;
                let duplicate = flags & 1 != 0;
                let txid = flags & 2 != 0;

                if duplicate && offset % 2 == 0 {
                    return Err(MerkleError::InvalidPath(format!(
                        "duplicate marker at even offset {}",
                        offset
                    )));
                }

                let hash = if duplicate {
                    None
                } else {
                    Some(Hash256::from_slice(reader.read_bytes(32)?).map_err(MerkleError::Codec)?)
                };

                level.push(PathLeaf {
                    offset,
                    hash,
                    txid,
                    duplicate,
                });
            }
            level.sort_by_key(|leaf| leaf.offset);
            path.push(level);
        }

        let result = MerklePath { block_height, path };
        result.check_structure()?;
        Ok(result)
    }

    fn check_structure(&self) -> Result<(), MerkleError> {
        let level0 = self
            .path
            .first()
            .ok_or_else(|| MerkleError::InvalidPath("path has no levels".to_string()))?;
        if !level0.iter().any(|leaf| leaf.txid && leaf.hash.is_some()) {
            return Err(MerkleError::InvalidPath(
                "level 0 carries no proven TXID".to_string(),
            ));
        }
        Ok(())
    }

    /// Serialize to BRC-74 binary.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        writer.write_varint(VarInt(self.block_height as u64));
        writer.write_u8(self.path.len() as u8);
        for level in &self.path {
            writer.write_varint(VarInt(level.len() as u64));
            for leaf in level {
                writer.write_varint(VarInt(leaf.offset));
                let mut flags = 0u8;
                if leaf.duplicate {
                    flags |= 1;
                }
                if leaf.txid {
                    flags |= 2;
                }
                writer.write_u8(flags);
                if !leaf.duplicate {
                    if let Some(ref hash) = leaf.hash {
                        writer.write_bytes(hash.as_bytes());
                    }
                }
            }
        }
        writer.into_bytes()
    }

    /// Serialize to hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// The TXIDs this path proves (level-0 anchors).
    pub fn proven_txids(&self) -> Vec<Hash256> {
        match self.path.first() {
            Some(level) => level
                .iter()
                .filter(|leaf| leaf.txid)
                .filter_map(|leaf| leaf.hash)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Whether this path proves the given TXID.
    pub fn contains_txid(&self, txid: &Hash256) -> bool {
        match self.path.first() {
            Some(level) => level.iter().any(|leaf| leaf.hash.as_ref() == Some(txid)),
            None => false,
        }
    }

    /// Compute the Merkle root implied by this path for `txid`.
    ///
    /// Walks each level bottom-up: an even offset pairs with `offset + 1`,
    /// an odd offset with `offset - 1`, and a `duplicate` sibling repeats
    /// the working hash. Missing siblings are computed from the level
    /// below when the path carries both children.
    pub fn compute_root(&self, txid: &Hash256) -> Result<Hash256, MerkleError> {
        let level0 = self
            .path
            .first()
            .ok_or_else(|| MerkleError::InvalidPath("path has no levels".to_string()))?;

        let start = level0
            .iter()
            .find(|leaf| leaf.hash.as_ref() == Some(txid))
            .ok_or_else(|| {
                MerkleError::InvalidPath(format!("path does not contain txid {}", txid))
            })?;

        // A block with a single transaction is its own root.
        if self.path.len() == 1 && level0.len() == 1 {
            return Ok(*txid);
        }

        let index = IndexedPath::build(self);
        let mut working = *txid;
        let leaf_offset = start.offset;

        for height in 0..self.path.len() {
            let sibling_offset = (leaf_offset >> height) ^ 1;
            let sibling = index.resolve(height, sibling_offset).ok_or_else(|| {
                MerkleError::InvalidPath(format!(
                    "no hash for offset {} at height {}",
                    sibling_offset, height
                ))
            })?;

            working = match sibling {
                Resolved::Duplicate => merkle_parent(&working, &working),
                Resolved::Hash(h) => {
                    if sibling_offset % 2 != 0 {
                        merkle_parent(&working, &h)
                    } else {
                        merkle_parent(&h, &working)
                    }
                }
            };
        }

        Ok(working)
    }

    /// Verify this path for `txid` against a chain oracle.
    pub fn verify(&self, txid: &Hash256, tracker: &dyn ChainTracker) -> Result<bool, MerkleError> {
        let root = self.compute_root(txid)?;
        Ok(tracker.is_valid_root_for_height(&root, self.block_height)?)
    }

    /// Merge another path for the same block into this one.
    ///
    /// Levels are zipped and leaves unioned by offset; a leaf present in
    /// both with differing payloads is a conflict.
    pub fn combine(&mut self, other: &MerklePath) -> Result<(), MerkleError> {
        if self.block_height != other.block_height {
            return Err(MerkleError::CombineConflict(format!(
                "block heights differ: {} vs {}",
                self.block_height, other.block_height
            )));
        }
        if self.path.len() != other.path.len() {
            return Err(MerkleError::CombineConflict(format!(
                "tree heights differ: {} vs {}",
                self.path.len(),
                other.path.len()
            )));
        }

        for (level, other_level) in self.path.iter_mut().zip(&other.path) {
            for leaf in other_level {
                match level.iter_mut().find(|l| l.offset == leaf.offset) {
                    Some(existing) => {
                        if existing.hash != leaf.hash || existing.duplicate != leaf.duplicate {
                            return Err(MerkleError::CombineConflict(format!(
                                "conflicting leaves at offset {}",
                                leaf.offset
                            )));
                        }
                        // A TXID anchor wins over a plain node.
                        existing.txid |= leaf.txid;
                    }
                    None => level.push(leaf.clone()),
                }
            }
            level.sort_by_key(|leaf| leaf.offset);
        }
        Ok(())
    }
}

enum Resolved {
    Hash(Hash256),
    Duplicate,
}

/// Offset-indexed view of a path with bottom-up computation of missing
/// internal nodes.
struct IndexedPath {
    levels: Vec<HashMap<u64, PathLeaf>>,
}

impl IndexedPath {
    fn build(path: &MerklePath) -> Self {
        let levels = path
            .path
            .iter()
            .map(|level| {
                level
                    .iter()
                    .map(|leaf| (leaf.offset, leaf.clone()))
                    .collect()
            })
            .collect();
        IndexedPath { levels }
    }

    fn resolve(&self, height: usize, offset: u64) -> Option<Resolved> {
        if let Some(leaf) = self.levels[height].get(&offset) {
            if leaf.duplicate {
                return Some(Resolved::Duplicate);
            }
            return leaf.hash.map(Resolved::Hash);
        }
        if height == 0 {
            return None;
        }

        // Derive the node from its two children one level down.
        let left = match self.resolve(height - 1, offset * 2)? {
            Resolved::Hash(h) => h,
            Resolved::Duplicate => return None,
        };
        let parent = match self.resolve(height - 1, offset * 2 + 1)? {
            Resolved::Hash(right) => merkle_parent(&left, &right),
            Resolved::Duplicate => merkle_parent(&left, &left),
        };
        Some(Resolved::Hash(parent))
    }
}
