use std::sync::Arc;

use stockline_types::{Block, BlockStatus, NewEntry};

use crate::error::LedgerError;

/// Immutable, ordered view of the chain at one point in time.
pub type ChainSnapshot = Arc<Vec<Block>>;

/// Read boundary for ledger queries.
pub trait LedgerReader: Send + Sync {
    /// The full chain, genesis first.
    fn chain(&self) -> Result<ChainSnapshot, LedgerError>;

    fn get(&self, index: u64) -> Result<Option<Block>, LedgerError> {
        let chain = self.chain()?;
        Ok(usize::try_from(index)
            .ok()
            .and_then(|i| chain.get(i))
            .cloned())
    }

    fn head(&self) -> Result<Block, LedgerError> {
        self.chain()?
            .last()
            .cloned()
            .ok_or_else(|| LedgerError::Storage("ledger has no genesis block".into()))
    }

    fn block_count(&self) -> Result<u64, LedgerError> {
        Ok(self.chain()?.len() as u64)
    }
}

/// Write boundary for ledger mutations.
///
/// Implementations serialize all three operations behind one exclusion
/// boundary and persist each change before returning it.
pub trait LedgerWriter: Send + Sync {
    /// Seal and append a new pending block.
    fn append(&self, entry: NewEntry) -> Result<Block, LedgerError>;

    /// Move a pending block to `confirmed` or `rejected`.
    fn resolve(&self, index: u64, target: BlockStatus) -> Result<Block, LedgerError>;

    /// Replace the chain with a fresh genesis block.
    fn clear(&self) -> Result<Block, LedgerError>;
}

/// A complete ledger backend.
pub trait LedgerStore: LedgerReader + LedgerWriter {}

impl<T: LedgerReader + LedgerWriter> LedgerStore for T {}
