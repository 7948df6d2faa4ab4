//! Hash-linked inventory ledger for Stockline.
//!
//! This crate holds everything that touches the chain itself:
//! - `LedgerReader` / `LedgerWriter` trait boundaries
//! - `InMemoryLedger` for tests and embedding
//! - `FileLedger`, a durable store built from a write-ahead log and snapshot
//! - The pending → confirmed/rejected status workflow
//! - Chain validation (hash links, recomputed hashes, index contiguity)
//! - The inventory projection folded from the chain

pub mod error;
pub mod file;
pub mod memory;
pub mod projection;
pub mod snapshot;
pub mod state;
pub mod traits;
pub mod validation;
pub mod wal;
pub mod workflow;

pub use error::LedgerError;
pub use file::{FileLedger, FileLedgerConfig, LOCK_FILE, SNAPSHOT_FILE, WAL_FILE};
pub use memory::InMemoryLedger;
pub use projection::{
    Activity, ActivityKind, ChangeRecord, InventoryProjection, ProductProjection,
    ProjectionBuilder, ProjectionConfig, StockLevel,
};
pub use snapshot::Snapshot;
pub use state::{ChainState, LedgerEvent};
pub use traits::{ChainSnapshot, LedgerReader, LedgerStore, LedgerWriter};
pub use validation::{ChainValidator, ValidationReport, Violation, ViolationKind};
pub use wal::{SyncMode, WalRecord, WriteAheadLog};
pub use workflow::StatusWorkflow;
