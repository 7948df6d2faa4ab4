//! Foundation types for Stockline.
//!
//! This crate provides the record and identifier types shared by every other
//! Stockline crate.
//!
//! # Key Types
//!
//! - [`Block`]: One hash-linked inventory-change record
//! - [`BlockPayload`]: The product, quantity delta and lifecycle status a block carries
//! - [`BlockStatus`]: Lifecycle state: pending, confirmed or rejected
//! - [`BlockHash`]: Hex-encoded chain link (or the genesis sentinel `"0"`)
//! - [`NewEntry`]: Caller-supplied input for an append
//! - [`HashMaterial`]: The immutable fields a block hash is computed over

pub mod block;
pub mod error;
pub mod hash;
pub mod temporal;

pub use block::{
    Block, BlockPayload, BlockStatus, HashMaterial, NewEntry, GENESIS_PRODUCT,
    MAX_QUANTITY_DELTA,
};
pub use error::TypeError;
pub use hash::BlockHash;
pub use temporal::{format_timestamp, now_millis};
