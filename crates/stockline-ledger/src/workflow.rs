//! Block lifecycle state machine.
//!
//! ```text
//! pending ──► confirmed
//!    │
//!    └──────► rejected
//! ```
//!
//! Both targets are terminal. A block is resolved at most once.

use stockline_types::BlockStatus;

use crate::error::LedgerError;

pub struct StatusWorkflow;

impl StatusWorkflow {
    /// Parse a caller-supplied target status.
    pub fn parse_target(raw: &str) -> Result<BlockStatus, LedgerError> {
        let target = raw
            .parse::<BlockStatus>()
            .map_err(|_| LedgerError::InvalidArgument(format!("invalid status: {raw}")))?;
        Self::check_target(target)?;
        Ok(target)
    }

    /// Only terminal states are valid targets.
    pub fn check_target(target: BlockStatus) -> Result<(), LedgerError> {
        if !target.is_terminal() {
            return Err(LedgerError::InvalidArgument(format!(
                "invalid status: {target}"
            )));
        }
        Ok(())
    }

    /// Validate moving block `index` from `current` to `target`.
    pub fn transition(
        index: u64,
        current: BlockStatus,
        target: BlockStatus,
    ) -> Result<BlockStatus, LedgerError> {
        Self::check_target(target)?;
        if current != BlockStatus::Pending {
            return Err(LedgerError::InvalidTransition { index, current });
        }
        Ok(target)
    }
}
