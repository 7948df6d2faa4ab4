use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stockline_crypto::{ContentHasher, HashChainVerifier};
use stockline_types::{now_millis, Block, BlockHash, BlockPayload, BlockStatus, HashMaterial, NewEntry};

use crate::error::LedgerError;
use crate::traits::ChainSnapshot;
use crate::validation::ChainValidator;
use crate::workflow::StatusWorkflow;

/// A single durable change to the chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// A sealed pending block was appended at the head.
    Appended(Block),
    /// A pending block moved to a terminal status.
    Resolved { index: u64, status: BlockStatus },
    /// The chain was replaced by a fresh genesis block.
    Reset(Block),
}

/// The in-memory chain shared by every ledger backend.
///
/// Writers plan an event against the current state, persist it (if the
/// backend is durable), then apply it. `apply` re-validates every event so
/// that replayed log records receive the same checks as live writes.
#[derive(Clone, Debug)]
pub struct ChainState {
    blocks: ChainSnapshot,
}

impl ChainState {
    /// A chain holding only a freshly sealed genesis block.
    pub fn genesis() -> Result<Self, LedgerError> {
        Ok(Self {
            blocks: Arc::new(vec![seal_genesis()?]),
        })
    }

    /// Adopt a stored chain after checking every invariant.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, LedgerError> {
        let report = ChainValidator::verify_blocks(&blocks);
        if let Some(violation) = report.violations.first() {
            return Err(LedgerError::IntegrityViolation {
                index: violation.index,
                reason: violation.description.clone(),
            });
        }
        Ok(Self {
            blocks: Arc::new(blocks),
        })
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        Arc::clone(&self.blocks)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    fn head(&self) -> Result<&Block, LedgerError> {
        self.blocks
            .last()
            .ok_or_else(|| LedgerError::Storage("ledger has no genesis block".into()))
    }

    fn block(&self, index: u64) -> Result<&Block, LedgerError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.blocks.get(i))
            .ok_or(LedgerError::NotFound { index })
    }

    /// Seal a new pending block on top of the current head.
    pub fn plan_append(&self, entry: NewEntry) -> Result<LedgerEvent, LedgerError> {
        entry.validate()?;
        let head = self.head()?;
        let payload = entry.into_payload();
        let timestamp = now_millis();
        let previous_hash = head.hash.clone();
        let hash = ContentHasher::seal(&HashMaterial::new(&payload, &previous_hash, &timestamp))?;
        Ok(LedgerEvent::Appended(Block {
            index: head.index + 1,
            timestamp,
            payload,
            previous_hash,
            hash,
        }))
    }

    /// Check a status transition without touching the chain.
    pub fn plan_resolve(&self, index: u64, target: BlockStatus) -> Result<LedgerEvent, LedgerError> {
        StatusWorkflow::check_target(target)?;
        let block = self.block(index)?;
        let status = StatusWorkflow::transition(index, block.status(), target)?;
        Ok(LedgerEvent::Resolved { index, status })
    }

    /// A reset event carrying a new genesis block.
    pub fn plan_reset(&self) -> Result<LedgerEvent, LedgerError> {
        Ok(LedgerEvent::Reset(seal_genesis()?))
    }

    /// Validate and apply an event, returning the block it produced or changed.
    pub fn apply(&mut self, event: &LedgerEvent) -> Result<Block, LedgerError> {
        match event {
            LedgerEvent::Appended(block) => {
                let head = self.head()?;
                if block.index != head.index + 1 {
                    return Err(LedgerError::IntegrityViolation {
                        index: block.index,
                        reason: format!("expected index {}", head.index + 1),
                    });
                }
                if block.status() != BlockStatus::Pending {
                    return Err(LedgerError::IntegrityViolation {
                        index: block.index,
                        reason: "appended block is not pending".into(),
                    });
                }
                let blocks = Arc::make_mut(&mut self.blocks);
                blocks.push(block.clone());
                if let Err(e) = HashChainVerifier::verify_link(blocks, blocks.len() - 1, block) {
                    blocks.pop();
                    return Err(LedgerError::IntegrityViolation {
                        index: block.index,
                        reason: e.to_string(),
                    });
                }
                Ok(block.clone())
            }
            LedgerEvent::Resolved { index, status } => {
                let current = self.block(*index)?.status();
                let status = StatusWorkflow::transition(*index, current, *status)?;
                let blocks = Arc::make_mut(&mut self.blocks);
                let block = &mut blocks[*index as usize];
                block.payload.status = status;
                Ok(block.clone())
            }
            LedgerEvent::Reset(genesis) => {
                let fresh = vec![genesis.clone()];
                let report = ChainValidator::verify_blocks(&fresh);
                if let Some(violation) = report.violations.first() {
                    return Err(LedgerError::IntegrityViolation {
                        index: 0,
                        reason: violation.description.clone(),
                    });
                }
                self.blocks = Arc::new(fresh);
                Ok(genesis.clone())
            }
        }
    }
}

fn seal_genesis() -> Result<Block, LedgerError> {
    let payload = BlockPayload::genesis();
    let timestamp = now_millis();
    let previous_hash = BlockHash::sentinel();
    let hash = ContentHasher::seal(&HashMaterial::new(&payload, &previous_hash, &timestamp))?;
    Ok(Block {
        index: 0,
        timestamp,
        payload,
        previous_hash,
        hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appended(state: &mut ChainState, product: &str, delta: i64) -> Block {
        let event = state.plan_append(NewEntry::new(product, delta)).unwrap();
        state.apply(&event).unwrap()
    }

    #[test]
    fn genesis_shape() {
        let state = ChainState::genesis().unwrap();
        let chain = state.snapshot();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].index, 0);
        assert!(chain[0].previous_hash.is_sentinel());
        assert_eq!(chain[0].status(), BlockStatus::Confirmed);
    }

    #[test]
    fn append_links_to_head() {
        let mut state = ChainState::genesis().unwrap();
        let genesis_hash = state.snapshot()[0].hash.clone();
        let block = appended(&mut state, "Toys", -5);
        assert_eq!(block.index, 1);
        assert_eq!(block.previous_hash, genesis_hash);
        assert_eq!(block.status(), BlockStatus::Pending);
    }

    #[test]
    fn stale_append_event_is_rejected() {
        let mut state = ChainState::genesis().unwrap();
        let stale = state.plan_append(NewEntry::new("Toys", 1)).unwrap();
        appended(&mut state, "Toys", 2);
        let err = state.apply(&stale).unwrap_err();
        assert!(matches!(err, LedgerError::IntegrityViolation { index: 1, .. }));
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn forged_append_is_rejected_and_not_kept() {
        let mut state = ChainState::genesis().unwrap();
        let LedgerEvent::Appended(mut block) = state.plan_append(NewEntry::new("Toys", 1)).unwrap()
        else {
            panic!("expected append event");
        };
        block.payload.quantity_delta = 1_000;
        let err = state.apply(&LedgerEvent::Appended(block)).unwrap_err();
        assert!(matches!(err, LedgerError::IntegrityViolation { .. }));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn resolve_mutates_only_status() {
        let mut state = ChainState::genesis().unwrap();
        let block = appended(&mut state, "Toys", 3);
        let event = state.plan_resolve(1, BlockStatus::Confirmed).unwrap();
        let resolved = state.apply(&event).unwrap();
        assert_eq!(resolved.status(), BlockStatus::Confirmed);
        assert_eq!(resolved.hash, block.hash);
        assert_eq!(resolved.timestamp, block.timestamp);
    }

    #[test]
    fn plan_resolve_errors() {
        let mut state = ChainState::genesis().unwrap();
        appended(&mut state, "Toys", 3);
        assert_eq!(
            state.plan_resolve(9, BlockStatus::Confirmed),
            Err(LedgerError::NotFound { index: 9 })
        );
        assert_eq!(
            state.plan_resolve(0, BlockStatus::Rejected),
            Err(LedgerError::InvalidTransition {
                index: 0,
                current: BlockStatus::Confirmed
            })
        );
    }

    #[test]
    fn snapshots_are_isolated_from_later_writes() {
        let mut state = ChainState::genesis().unwrap();
        let before = state.snapshot();
        appended(&mut state, "Toys", 1);
        assert_eq!(before.len(), 1);
        assert_eq!(state.snapshot().len(), 2);
    }

    #[test]
    fn reset_replaces_chain() {
        let mut state = ChainState::genesis().unwrap();
        appended(&mut state, "Toys", 1);
        appended(&mut state, "Sports", 2);
        let event = state.plan_reset().unwrap();
        let genesis = state.apply(&event).unwrap();
        assert_eq!(state.len(), 1);
        assert_eq!(genesis.index, 0);
    }
}
