//! Cryptographic primitives for Stockline.
//!
//! Provides domain-separated BLAKE3 hashing of block material and hash chain
//! verification. All crypto operations wrap established libraries; there is no custom
//! cryptography.

pub mod chain;
pub mod hasher;

pub use chain::{ChainError, ChainLinked, HashChainVerifier};
pub use hasher::{ContentHasher, HasherError};
