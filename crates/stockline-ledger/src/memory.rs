use std::sync::RwLock;

use stockline_types::{Block, BlockStatus, NewEntry};
use tracing::debug;

use crate::error::LedgerError;
use crate::state::{ChainState, LedgerEvent};
use crate::traits::{ChainSnapshot, LedgerReader, LedgerWriter};

/// In-memory ledger for tests, local demos, and embedding.
///
/// The chain lives behind a single `RwLock`; the write guard is the
/// mutual-exclusion boundary for append, resolve, and clear.
pub struct InMemoryLedger {
    inner: RwLock<ChainState>,
}

impl InMemoryLedger {
    /// Create a ledger holding a fresh genesis block.
    pub fn new() -> Result<Self, LedgerError> {
        Ok(Self {
            inner: RwLock::new(ChainState::genesis()?),
        })
    }

    fn mutate(
        &self,
        plan: impl FnOnce(&ChainState) -> Result<LedgerEvent, LedgerError>,
    ) -> Result<Block, LedgerError> {
        let mut state = self
            .inner
            .write()
            .map_err(|_| LedgerError::poisoned("ledger write"))?;
        let event = plan(&*state)?;
        let block = state.apply(&event)?;
        debug!(index = block.index, hash = block.hash.short(), "in-memory ledger write");
        Ok(block)
    }
}

impl LedgerReader for InMemoryLedger {
    fn chain(&self) -> Result<ChainSnapshot, LedgerError> {
        let state = self
            .inner
            .read()
            .map_err(|_| LedgerError::poisoned("ledger read"))?;
        Ok(state.snapshot())
    }
}

impl LedgerWriter for InMemoryLedger {
    fn append(&self, entry: NewEntry) -> Result<Block, LedgerError> {
        self.mutate(|state| state.plan_append(entry))
    }

    fn resolve(&self, index: u64, target: BlockStatus) -> Result<Block, LedgerError> {
        self.mutate(|state| state.plan_resolve(index, target))
    }

    fn clear(&self) -> Result<Block, LedgerError> {
        self.mutate(|state| state.plan_reset())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use stockline_types::BlockHash;

    use super::*;
    use crate::validation::ChainValidator;

    #[test]
    fn append_creates_pending_block_linked_to_head() {
        let ledger = InMemoryLedger::new().unwrap();
        let genesis = ledger.head().unwrap();

        let block = ledger
            .append(NewEntry::new("Toys", -100).with_note("order"))
            .unwrap();

        assert_eq!(block.index, 1);
        assert_eq!(block.status(), BlockStatus::Pending);
        assert_eq!(block.previous_hash, genesis.hash);
        assert_eq!(ledger.block_count().unwrap(), 2);
    }

    #[test]
    fn blank_product_is_a_validation_error() {
        let ledger = InMemoryLedger::new().unwrap();
        let err = ledger.append(NewEntry::new("", 5)).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(ledger.block_count().unwrap(), 1);
    }

    #[test]
    fn resolving_twice_keeps_first_outcome() {
        let ledger = InMemoryLedger::new().unwrap();
        ledger.append(NewEntry::new("Toys", 10)).unwrap();

        let first = ledger.resolve(1, BlockStatus::Confirmed).unwrap();
        assert_eq!(first.status(), BlockStatus::Confirmed);

        let second = ledger.resolve(1, BlockStatus::Rejected).unwrap_err();
        assert_eq!(
            second,
            LedgerError::InvalidTransition {
                index: 1,
                current: BlockStatus::Confirmed
            }
        );
        assert_eq!(
            ledger.get(1).unwrap().unwrap().status(),
            BlockStatus::Confirmed
        );
    }

    #[test]
    fn resolve_unknown_index_is_not_found() {
        let ledger = InMemoryLedger::new().unwrap();
        assert_eq!(
            ledger.resolve(42, BlockStatus::Confirmed).unwrap_err(),
            LedgerError::NotFound { index: 42 }
        );
    }

    #[test]
    fn pending_target_leaves_chain_unchanged() {
        let ledger = InMemoryLedger::new().unwrap();
        ledger.append(NewEntry::new("Toys", 10)).unwrap();
        let before = ledger.chain().unwrap();

        let err = ledger.resolve(1, BlockStatus::Pending).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidArgument(_)));
        assert_eq!(*ledger.chain().unwrap(), *before);
    }

    #[test]
    fn clear_yields_single_confirmed_genesis() {
        let ledger = InMemoryLedger::new().unwrap();
        for delta in [5, -3, 8] {
            ledger.append(NewEntry::new("Sports", delta)).unwrap();
        }

        ledger.clear().unwrap();
        let chain = ledger.chain().unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].status(), BlockStatus::Confirmed);
        assert_eq!(chain[0].payload.quantity_delta, 0);
        assert_eq!(chain[0].previous_hash, BlockHash::sentinel());
    }

    #[test]
    fn concurrent_appends_do_not_lose_updates() {
        let ledger = Arc::new(InMemoryLedger::new().unwrap());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    for i in 0..25 {
                        ledger
                            .append(NewEntry::new(format!("P{t}"), i))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ledger.block_count().unwrap(), 1 + 8 * 25);
        assert!(ChainValidator::verify(&*ledger).unwrap().is_valid());
    }
}
