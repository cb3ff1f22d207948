//! BEEF (Background Evaluation Extended Format) containers.
//!
//! A BEEF bundles a transaction with every ancestor and Merkle path needed
//! to verify it offline. Transactions are stored in topological order,
//! ancestors before spenders; BUMPs are deduplicated by block and merged
//! when they prove leaves of the same tree. Atomic BEEF wraps a bundle with
//! a pinned subject TXID.

use std::collections::HashMap;
use std::sync::Arc;

use txkit_codec::{ByteReader, ByteWriter, Hash256, VarInt};
use txkit_merkle::MerklePath;
use txkit_transaction::Transaction;

use crate::error::SpvError;

/// BEEF V1 version tag (`0100BEEF` on the wire).
pub const BEEF_V1: u32 = u32::from_le_bytes([0x01, 0x00, 0xBE, 0xEF]);
/// BEEF V2 version tag (`0200BEEF` on the wire).
pub const BEEF_V2: u32 = u32::from_le_bytes([0x02, 0x00, 0xBE, 0xEF]);
/// Atomic BEEF framing prefix.
pub const ATOMIC_BEEF_PREFIX: u32 = 0x0101_0101;

/// Payload of one bundle entry.
#[derive(Debug, Clone)]
pub enum EntryData {
    /// An unmined transaction whose ancestry is in the bundle.
    Raw(Arc<Transaction>),
    /// A mined transaction proven by the BUMP at the given index.
    Mined(Arc<Transaction>, usize),
    /// A pruned parent known only by TXID (V2 opaqueness).
    TxidOnly,
}

/// One transaction entry of a bundle.
#[derive(Debug, Clone)]
pub struct BeefEntry {
    /// The entry's TXID.
    pub txid: Hash256,
    /// The entry payload.
    pub data: EntryData,
}

impl BeefEntry {
    /// The carried transaction, unless the entry is opaque.
    pub fn transaction(&self) -> Option<&Arc<Transaction>> {
        match &self.data {
            EntryData::Raw(tx) | EntryData::Mined(tx, _) => Some(tx),
            EntryData::TxidOnly => None,
        }
    }

    /// The BUMP index for a mined entry.
    pub fn bump_index(&self) -> Option<usize> {
        match self.data {
            EntryData::Mined(_, index) => Some(index),
            _ => None,
        }
    }
}

/// A topologically ordered bundle of transactions and Merkle paths.
#[derive(Debug, Clone, Default)]
pub struct Beef {
    /// The version tag, [`BEEF_V1`] or [`BEEF_V2`].
    pub version: u32,
    /// Deduplicated Merkle paths referenced by entry index.
    pub bumps: Vec<MerklePath>,
    entries: Vec<BeefEntry>,
    index: HashMap<Hash256, usize>,
}

impl Beef {
    /// An empty V1 bundle.
    pub fn new_v1() -> Self {
        Beef {
            version: BEEF_V1,
            ..Beef::default()
        }
    }

    /// An empty V2 bundle.
    pub fn new_v2() -> Self {
        Beef {
            version: BEEF_V2,
            ..Beef::default()
        }
    }

    /// The entries in bundle order.
    pub fn entries(&self) -> &[BeefEntry] {
        &self.entries
    }

    /// Look up a transaction by TXID.
    pub fn find_transaction(&self, txid: &Hash256) -> Option<&Arc<Transaction>> {
        self.index
            .get(txid)
            .and_then(|&i| self.entries[i].transaction())
    }

    /// The BUMP proving `txid`, if the bundle has one.
    pub fn find_bump(&self, txid: &Hash256) -> Option<&MerklePath> {
        let entry = self.index.get(txid).map(|&i| &self.entries[i])?;
        match entry.data {
            EntryData::Mined(_, bump_index) => self.bumps.get(bump_index),
            _ => self.bumps.iter().find(|bump| bump.contains_txid(txid)),
        }
    }

    // -----------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------

    /// Parse a bundle from hex.
    pub fn from_hex(hex_str: &str) -> Result<Self, SpvError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| SpvError::InvalidBeef(format!("invalid hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Parse a bundle from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SpvError> {
        let mut reader = ByteReader::new(bytes);
        let beef = Self::read_from(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(SpvError::InvalidBeef(format!(
                "{} trailing bytes after bundle",
                reader.remaining()
            )));
        }
        Ok(beef)
    }

    /// Parse a bundle from a reader.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, SpvError> {
        let version = reader.read_u32_le()?;
        if version != BEEF_V1 && version != BEEF_V2 {
            return Err(SpvError::UnknownBeefVersion(version));
        }

        let bump_count = reader.read_varint()?.value();
        let mut bumps = Vec::with_capacity(bump_count as usize);
        for _ in 0..bump_count {
            bumps.push(MerklePath::read_from(reader)?);
        }

        let mut beef = Beef {
            version,
            bumps,
            entries: Vec::new(),
            index: HashMap::new(),
        };

        let tx_count = reader.read_varint()?.value();
        for _ in 0..tx_count {
            if version == BEEF_V1 {
                let tx = Transaction::read_from(reader)?;
                let has_bump = reader.read_u8()?;
                let bump_index = if has_bump != 0 {
                    Some(beef.checked_bump_index(reader.read_varint()?)?)
                } else {
                    None
                };
                beef.adopt(tx, bump_index)?;
            } else {
                match reader.read_u8()? {
                    0 => {
                        let tx = Transaction::read_from(reader)?;
                        beef.adopt(tx, None)?;
                    }
                    1 => {
                        let bump_index = beef.checked_bump_index(reader.read_varint()?)?;
                        let tx = Transaction::read_from(reader)?;
                        beef.adopt(tx, Some(bump_index))?;
                    }
                    2 => {
                        let txid = Hash256::from_slice(reader.read_bytes(32)?)?;
                        beef.push_entry(BeefEntry {
                            txid,
                            data: EntryData::TxidOnly,
                        });
                    }
                    other => {
                        return Err(SpvError::InvalidBeef(format!(
                            "unknown entry format {}",
                            other
                        )));
                    }
                }
            }
        }

        Ok(beef)
    }

    fn checked_bump_index(&self, index: VarInt) -> Result<usize, SpvError> {
        let index = index.value() as usize;
        if index >= self.bumps.len() {
            return Err(SpvError::InvalidBeef(format!(
                "bump index {} out of range ({} bumps)",
                index,
                self.bumps.len()
            )));
        }
        Ok(index)
    }

    /// Link a freshly parsed transaction into the bundle.
    ///
    /// Ancestors already parsed are attached as shared source
    /// transactions; an unmined entry whose parent is neither in the
    /// bundle nor opaque is a dangling reference.
    fn adopt(&mut self, mut tx: Transaction, bump_index: Option<usize>) -> Result<(), SpvError> {
        for input in &mut tx.inputs {
            if let Some(parent) = self
                .index
                .get(&input.source_txid)
                .and_then(|&i| self.entries[i].transaction())
            {
                input.source_transaction = Some(Arc::clone(parent));
            } else if bump_index.is_none() {
                let known_opaque = self.index.contains_key(&input.source_txid);
                if !known_opaque {
                    return Err(SpvError::DanglingReference(input.source_txid));
                }
            }
        }

        if let Some(index) = bump_index {
            let txid = tx.txid()?;
            if self.bumps[index].contains_txid(&txid) {
                tx.merkle_path = Some(self.bumps[index].clone());
            }
        }

        let txid = tx.txid()?;
        // Some producers emit the same raw transaction twice; keep the
        // first occurrence.
        if self.index.contains_key(&txid) {
            return Ok(());
        }

        let data = match bump_index {
            Some(index) => EntryData::Mined(Arc::new(tx), index),
            None => EntryData::Raw(Arc::new(tx)),
        };
        self.push_entry(BeefEntry { txid, data });
        Ok(())
    }

    fn push_entry(&mut self, entry: BeefEntry) {
        if self.index.contains_key(&entry.txid) {
            return;
        }
        self.index.insert(entry.txid, self.entries.len());
        self.entries.push(entry);
    }

    // -----------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------

    /// Serialize the bundle. Entry order is preserved, so decoding and
    /// re-encoding a valid bundle is byte-identical.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SpvError> {
        let mut writer = ByteWriter::new();
        writer.write_u32_le(self.version);

        writer.write_varint(VarInt::from(self.bumps.len()));
        for bump in &self.bumps {
            writer.write_bytes(&bump.to_bytes());
        }

        writer.write_varint(VarInt::from(self.entries.len()));
        for entry in &self.entries {
            match (&entry.data, self.version) {
                (EntryData::Raw(tx), BEEF_V1) => {
                    writer.write_bytes(&tx.to_bytes()?);
                    writer.write_u8(0);
                }
                (EntryData::Mined(tx, bump_index), BEEF_V1) => {
                    writer.write_bytes(&tx.to_bytes()?);
                    writer.write_u8(1);
                    writer.write_varint(VarInt::from(*bump_index));
                }
                (EntryData::TxidOnly, BEEF_V1) => {
                    return Err(SpvError::InvalidBeef(
                        "txid-only entries require BEEF V2".to_string(),
                    ));
                }
                (EntryData::Raw(tx), _) => {
                    writer.write_u8(0);
                    writer.write_bytes(&tx.to_bytes()?);
                }
                (EntryData::Mined(tx, bump_index), _) => {
                    writer.write_u8(1);
                    writer.write_varint(VarInt::from(*bump_index));
                    writer.write_bytes(&tx.to_bytes()?);
                }
                (EntryData::TxidOnly, _) => {
                    writer.write_u8(2);
                    writer.write_bytes(entry.txid.as_bytes());
                }
            }
        }

        Ok(writer.into_bytes())
    }

    /// Serialize to hex.
    pub fn to_hex(&self) -> Result<String, SpvError> {
        Ok(hex::encode(self.to_bytes()?))
    }

    // -----------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------

    /// Merge a Merkle path, combining it with an existing BUMP for the
    /// same block when the roots agree. Returns the BUMP index.
    pub fn merge_bump(&mut self, bump: &MerklePath) -> Result<usize, SpvError> {
        let new_root = bump_root(bump);
        for (i, existing) in self.bumps.iter_mut().enumerate() {
            if existing.block_height == bump.block_height
                && bump_root(existing).is_some()
                && bump_root(existing) == new_root
            {
                existing.combine(bump)?;
                return Ok(i);
            }
        }
        self.bumps.push(bump.clone());
        Ok(self.bumps.len() - 1)
    }

    /// Merge a transaction and its in-memory ancestry, parents first.
    ///
    /// A mined transaction (carrying a Merkle path) anchors its branch and
    /// its parents are not required. Equal transactions are merged once.
    pub fn merge_transaction(&mut self, tx: &Transaction) -> Result<Hash256, SpvError> {
        let txid = tx.txid()?;
        if self.index.contains_key(&txid) {
            return Ok(txid);
        }

        if let Some(ref path) = tx.merkle_path {
            let bump_index = self.merge_bump(path)?;
            self.push_entry(BeefEntry {
                txid,
                data: EntryData::Mined(Arc::new(tx.clone()), bump_index),
            });
            return Ok(txid);
        }

        for input in &tx.inputs {
            match input.source_transaction {
                Some(ref parent) => {
                    self.merge_transaction(parent)?;
                }
                None => {
                    if !self.index.contains_key(&input.source_txid) {
                        return Err(SpvError::DanglingReference(input.source_txid));
                    }
                }
            }
        }

        self.push_entry(BeefEntry {
            txid,
            data: EntryData::Raw(Arc::new(tx.clone())),
        });
        Ok(txid)
    }

    /// Record a parent known only by TXID (V2 opaqueness).
    pub fn merge_txid_only(&mut self, txid: Hash256) -> Result<(), SpvError> {
        if self.version != BEEF_V2 {
            return Err(SpvError::InvalidBeef(
                "txid-only entries require BEEF V2".to_string(),
            ));
        }
        self.push_entry(BeefEntry {
            txid,
            data: EntryData::TxidOnly,
        });
        Ok(())
    }

    /// Structural validity: every non-opaque transaction is traceable to a
    /// BUMP through in-bundle parents.
    pub fn is_valid(&self, allow_txid_only: bool) -> bool {
        let mut proven: HashMap<Hash256, ()> = HashMap::new();

        for entry in &self.entries {
            match &entry.data {
                EntryData::TxidOnly => {
                    if !allow_txid_only {
                        return false;
                    }
                    proven.insert(entry.txid, ());
                }
                EntryData::Mined(_, bump_index) => {
                    match self.bumps.get(*bump_index) {
                        Some(bump) if bump.contains_txid(&entry.txid) => {
                            proven.insert(entry.txid, ());
                        }
                        _ => return false,
                    }
                }
                EntryData::Raw(tx) => {
                    let all_parents_proven = tx
                        .inputs
                        .iter()
                        .all(|input| proven.contains_key(&input.source_txid));
                    if !all_parents_proven {
                        return false;
                    }
                    proven.insert(entry.txid, ());
                }
            }
        }
        true
    }

    /// Check every BUMP root against a chain oracle.
    pub fn verify(
        &self,
        tracker: &dyn txkit_merkle::ChainTracker,
        allow_txid_only: bool,
    ) -> Result<bool, SpvError> {
        if !self.is_valid(allow_txid_only) {
            return Ok(false);
        }
        for bump in &self.bumps {
            let root = match bump_root(bump) {
                Some(root) => root,
                None => return Ok(false),
            };
            if !tracker.is_valid_root_for_height(&root, bump.block_height)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    // -----------------------------------------------------------------
    // Atomic framing
    // -----------------------------------------------------------------

    /// Frame this bundle as Atomic BEEF pinned to `subject`.
    pub fn to_atomic_bytes(&self, subject: &Hash256) -> Result<Vec<u8>, SpvError> {
        if !self.index.contains_key(subject) {
            return Err(SpvError::SubjectMissing(*subject));
        }
        let mut writer = ByteWriter::new();
        writer.write_u32_le(ATOMIC_BEEF_PREFIX);
        writer.write_reverse(subject.as_bytes());
        writer.write_bytes(&self.to_bytes()?);
        Ok(writer.into_bytes())
    }

    /// Unframe Atomic BEEF, returning the bundle and its subject.
    ///
    /// The subject must be present inside the embedded bundle.
    pub fn from_atomic_bytes(bytes: &[u8]) -> Result<(Self, Hash256), SpvError> {
        let mut reader = ByteReader::new(bytes);
        let prefix = reader.read_u32_le()?;
        if prefix != ATOMIC_BEEF_PREFIX {
            return Err(SpvError::InvalidBeef(format!(
                "bad atomic prefix 0x{:08x}",
                prefix
            )));
        }
        let mut subject_bytes = reader.read_bytes(32)?.to_vec();
        subject_bytes.reverse();
        let subject = Hash256::from_slice(&subject_bytes)?;

        let beef = Self::from_bytes(&bytes[36..])?;
        if !beef.index.contains_key(&subject) {
            return Err(SpvError::SubjectMissing(subject));
        }
        Ok((beef, subject))
    }
}

/// Extract one transaction (with linked ancestry) from serialized BEEF.
pub fn transaction_from_beef(
    bytes: &[u8],
    subject: &Hash256,
) -> Result<Arc<Transaction>, SpvError> {
    let beef = Beef::from_bytes(bytes)?;
    beef.find_transaction(subject)
        .cloned()
        .ok_or(SpvError::SubjectMissing(*subject))
}

/// Extract the subject transaction from serialized Atomic BEEF.
pub fn transaction_from_atomic_beef(bytes: &[u8]) -> Result<Arc<Transaction>, SpvError> {
    let (beef, subject) = Beef::from_atomic_bytes(bytes)?;
    beef.find_transaction(&subject)
        .cloned()
        .ok_or(SpvError::SubjectMissing(subject))
}

fn bump_root(bump: &MerklePath) -> Option<Hash256> {
    let anchor = bump.proven_txids().into_iter().next()?;
    bump.compute_root(&anchor).ok()
}
