use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::hash::BlockHash;
use crate::temporal::format_timestamp;

/// Product name carried by the genesis block.
pub const GENESIS_PRODUCT: &str = "Genesis";

/// Largest magnitude a single quantity change may have.
pub const MAX_QUANTITY_DELTA: i64 = i32::MAX as i64;

/// Lifecycle state of a block.
///
/// `Pending` is the only non-terminal state. A block moves at most once, to
/// either `Confirmed` or `Rejected`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl BlockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockStatus {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "rejected" => Ok(Self::Rejected),
            other => Err(TypeError::UnknownStatus(other.to_string())),
        }
    }
}

/// The inventory change recorded by a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPayload {
    pub product: String,
    #[serde(rename = "change")]
    pub quantity_delta: i64,
    pub note: String,
    #[serde(rename = "user")]
    pub submitted_by: String,
    pub status: BlockStatus,
}

impl BlockPayload {
    /// Payload of the seed block at index 0.
    pub fn genesis() -> Self {
        Self {
            product: GENESIS_PRODUCT.to_string(),
            quantity_delta: 0,
            note: "Genesis block".to_string(),
            submitted_by: "system".to_string(),
            status: BlockStatus::Confirmed,
        }
    }
}

/// One entry in the ledger chain.
///
/// Serialized in the wire shape the dashboard consumes:
/// `{index, timestamp, data: {product, change, note, user, status}, previousHash, hash}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "data")]
    pub payload: BlockPayload,
    pub previous_hash: BlockHash,
    pub hash: BlockHash,
}

impl Block {
    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    pub fn status(&self) -> BlockStatus {
        self.payload.status
    }

    /// The fields this block's hash is computed over.
    pub fn hash_material(&self) -> HashMaterial<'_> {
        HashMaterial::new(&self.payload, &self.previous_hash, &self.timestamp)
    }
}

/// Canonical hash input for a block.
///
/// Covers every immutable field of the payload plus the chain link and the
/// timestamp. `status` is excluded: it is the one field the workflow mutates
/// after the block is sealed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HashMaterial<'a> {
    pub product: &'a str,
    pub quantity_delta: i64,
    pub note: &'a str,
    pub submitted_by: &'a str,
    pub previous_hash: &'a str,
    pub timestamp: String,
}

impl<'a> HashMaterial<'a> {
    pub fn new(
        payload: &'a BlockPayload,
        previous_hash: &'a BlockHash,
        timestamp: &DateTime<Utc>,
    ) -> Self {
        Self {
            product: &payload.product,
            quantity_delta: payload.quantity_delta,
            note: &payload.note,
            submitted_by: &payload.submitted_by,
            previous_hash: previous_hash.as_str(),
            timestamp: format_timestamp(timestamp),
        }
    }
}

/// Caller input for an append.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEntry {
    pub product: String,
    pub quantity_delta: i64,
    pub note: String,
    pub submitted_by: String,
}

impl NewEntry {
    pub fn new(product: impl Into<String>, quantity_delta: i64) -> Self {
        Self {
            product: product.into(),
            quantity_delta,
            note: String::new(),
            submitted_by: "anonymous".to_string(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn submitted_by(mut self, user: impl Into<String>) -> Self {
        self.submitted_by = user.into();
        self
    }

    /// Reject entries with a blank product name or an out-of-range delta.
    pub fn validate(&self) -> Result<(), TypeError> {
        if self.product.trim().is_empty() {
            return Err(TypeError::EmptyProduct);
        }
        if self.quantity_delta.unsigned_abs() > MAX_QUANTITY_DELTA.unsigned_abs() {
            return Err(TypeError::QuantityOutOfRange(self.quantity_delta));
        }
        Ok(())
    }

    /// Build the pending payload for this entry.
    pub fn into_payload(self) -> BlockPayload {
        BlockPayload {
            product: self.product.trim().to_string(),
            quantity_delta: self.quantity_delta,
            note: self.note,
            submitted_by: self.submitted_by,
            status: BlockStatus::Pending,
        }
    }
}
