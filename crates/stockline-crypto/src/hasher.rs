use stockline_types::{BlockHash, HashMaterial};

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag that is prepended to every hash
/// computation, so identical bytes hashed for different purposes never
/// collide.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for ledger blocks.
    pub const BLOCK: Self = Self {
        domain: "stockline-block-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        *hasher.finalize().as_bytes()
    }

    /// Hash a serializable value as JSON with domain separation.
    pub fn hash_json<T: serde::Serialize>(&self, value: &T) -> Result<[u8; 32], HasherError> {
        let data =
            serde_json::to_vec(value).map_err(|e| HasherError::Serialization(e.to_string()))?;
        Ok(self.hash(&data))
    }

    /// Compute the chain hash for a block's material.
    pub fn seal(material: &HashMaterial<'_>) -> Result<BlockHash, HasherError> {
        Self::BLOCK.hash_json(material).map(BlockHash::from_digest)
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

/// Errors from hashing operations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use stockline_types::NewEntry;

    #[test]
    fn hash_is_deterministic() {
        let id1 = ContentHasher::BLOCK.hash(b"hello world");
        let id2 = ContentHasher::BLOCK.hash(b"hello world");
        assert_eq!(id1, id2);
    }

    #[test]
    fn custom_domain_changes_digest() {
        let other = ContentHasher::new("stockline-other-v1");
        assert_ne!(other.hash(b"data"), ContentHasher::BLOCK.hash(b"data"));
        assert_eq!(other.domain(), "stockline-other-v1");
    }

    #[test]
    fn seal_depends_on_every_immutable_field() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap();
        let prev = BlockHash::sentinel();
        let payload = NewEntry::new("Toys", 10).with_note("restock").into_payload();
        let base = ContentHasher::seal(&HashMaterial::new(&payload, &prev, &ts)).unwrap();

        let mut changed = payload.clone();
        changed.quantity_delta = 11;
        let other = ContentHasher::seal(&HashMaterial::new(&changed, &prev, &ts)).unwrap();
        assert_ne!(base, other);

        let later = ts + chrono::Duration::milliseconds(1);
        let other = ContentHasher::seal(&HashMaterial::new(&payload, &prev, &later)).unwrap();
        assert_ne!(base, other);

        let linked = BlockHash::from_digest([9; 32]);
        let other = ContentHasher::seal(&HashMaterial::new(&payload, &linked, &ts)).unwrap();
        assert_ne!(base, other);
    }
}
