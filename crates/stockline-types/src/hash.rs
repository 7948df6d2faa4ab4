use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Hex-encoded link in the block chain.
///
/// Every block carries its own hash and the hash of its predecessor. The
/// genesis block has no predecessor; its `previousHash` is the sentinel `"0"`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockHash(String);

impl BlockHash {
    /// The previous-hash value carried by the genesis block.
    pub const SENTINEL: &'static str = "0";

    /// The genesis sentinel.
    pub fn sentinel() -> Self {
        Self(Self::SENTINEL.to_string())
    }

    /// Wrap a 32-byte digest.
    pub fn from_digest(digest: [u8; 32]) -> Self {
        Self(hex::encode(digest))
    }

    /// Parse a 64-character hex digest or the sentinel.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        if s == Self::SENTINEL {
            return Ok(Self::sentinel());
        }
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    pub fn is_sentinel(&self) -> bool {
        self.0 == Self::SENTINEL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({})", self.short())
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
