use serde::Serialize;
use stockline_crypto::{ChainError, HashChainVerifier};
use stockline_types::{Block, BlockStatus};

use crate::error::LedgerError;
use crate::traits::LedgerReader;

/// Result of chain validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub block_count: u64,
    pub indices_contiguous: bool,
    pub hash_chain_valid: bool,
    pub genesis_valid: bool,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Position of the first block that failed any check.
    pub fn first_invalid_index(&self) -> Option<u64> {
        self.violations.iter().map(|v| v.index).min()
    }
}

/// A specific integrity violation detected during validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub index: u64,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    EmptyChain,
    IndexGap,
    GenesisMalformed,
    HashChainBreak,
    HashMismatch,
}

/// Chain integrity validator.
pub struct ChainValidator;

impl ChainValidator {
    /// Validate the reader's current snapshot.
    pub fn verify<R: LedgerReader + ?Sized>(reader: &R) -> Result<ValidationReport, LedgerError> {
        let chain = reader.chain()?;
        Ok(Self::verify_blocks(&chain))
    }

    /// Walk the chain recomputing hashes and links.
    pub fn verify_blocks(blocks: &[Block]) -> ValidationReport {
        let mut violations = Vec::new();
        let mut indices_contiguous = true;
        let mut hash_chain_valid = true;
        let mut genesis_valid = true;

        if blocks.is_empty() {
            genesis_valid = false;
            violations.push(Violation {
                index: 0,
                kind: ViolationKind::EmptyChain,
                description: "chain has no genesis block".into(),
            });
        }

        for (position, block) in blocks.iter().enumerate() {
            let expected = position as u64;
            if block.index != expected {
                indices_contiguous = false;
                violations.push(Violation {
                    index: expected,
                    kind: ViolationKind::IndexGap,
                    description: format!("expected index {expected}, found {}", block.index),
                });
            }

            if position == 0
                && (block.payload.quantity_delta != 0
                    || block.status() != BlockStatus::Confirmed)
            {
                genesis_valid = false;
                violations.push(Violation {
                    index: 0,
                    kind: ViolationKind::GenesisMalformed,
                    description: "genesis must be confirmed with a zero delta".into(),
                });
            }

            if let Err(e) = HashChainVerifier::verify_link(blocks, position, block) {
                hash_chain_valid = false;
                let kind = match e {
                    ChainError::HashMismatch { .. } | ChainError::Unhashable { .. } => {
                        ViolationKind::HashMismatch
                    }
                    ChainError::GenesisHasParent | ChainError::BrokenLink { .. } => {
                        ViolationKind::HashChainBreak
                    }
                };
                violations.push(Violation {
                    index: expected,
                    kind,
                    description: e.to_string(),
                });
            }
        }

        ValidationReport {
            block_count: blocks.len() as u64,
            indices_contiguous,
            hash_chain_valid,
            genesis_valid,
            violations,
        }
    }
}
