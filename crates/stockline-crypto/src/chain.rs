use stockline_types::{Block, BlockHash};

use crate::hasher::{ContentHasher, HasherError};

/// Trait for records that participate in a hash chain.
pub trait ChainLinked {
    /// The record's own stored hash.
    fn block_hash(&self) -> &BlockHash;
    /// The predecessor's hash (the sentinel for genesis).
    fn previous_hash(&self) -> &BlockHash;
    /// Recompute the hash from the stored fields.
    fn compute_hash(&self) -> Result<BlockHash, HasherError>;
}

impl ChainLinked for Block {
    fn block_hash(&self) -> &BlockHash {
        &self.hash
    }

    fn previous_hash(&self) -> &BlockHash {
        &self.previous_hash
    }

    fn compute_hash(&self) -> Result<BlockHash, HasherError> {
        ContentHasher::seal(&self.hash_material())
    }
}

/// Hash chain integrity verifier.
///
/// Verifies that a sequence of records forms a valid hash chain: the first
/// record links to the sentinel, each subsequent record's previous hash
/// matches its predecessor's hash, and every stored hash matches the hash
/// recomputed from the record's fields.
pub struct HashChainVerifier;

impl HashChainVerifier {
    /// Verify a chain, stopping at the first broken position.
    pub fn verify_chain(records: &[impl ChainLinked]) -> Result<(), ChainError> {
        for (index, record) in records.iter().enumerate() {
            Self::verify_link(records, index, record)?;
        }
        Ok(())
    }

    /// Verify a single position against its predecessor.
    pub fn verify_link<R: ChainLinked>(
        records: &[R],
        index: usize,
        record: &R,
    ) -> Result<(), ChainError> {
        if index == 0 {
            if !record.previous_hash().is_sentinel() {
                return Err(ChainError::GenesisHasParent);
            }
        } else if record.previous_hash() != records[index - 1].block_hash() {
            return Err(ChainError::BrokenLink { index });
        }

        let computed = record
            .compute_hash()
            .map_err(|e| ChainError::Unhashable {
                index,
                reason: e.to_string(),
            })?;
        if &computed != record.block_hash() {
            return Err(ChainError::HashMismatch { index });
        }
        Ok(())
    }
}

/// Errors from chain verification.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("genesis block does not link to the sentinel previous hash")]
    GenesisHasParent,

    #[error("broken link at index {index}: previousHash does not match")]
    BrokenLink { index: usize },

    #[error("hash mismatch at index {index}: computed hash differs from stored")]
    HashMismatch { index: usize },

    #[error("cannot hash block at index {index}: {reason}")]
    Unhashable { index: usize, reason: String },
}

impl ChainError {
    /// Position of the first offending record.
    pub fn index(&self) -> usize {
        match self {
            Self::GenesisHasParent => 0,
            Self::BrokenLink { index }
            | Self::HashMismatch { index }
            | Self::Unhashable { index, .. } => *index,
        }
    }
}
