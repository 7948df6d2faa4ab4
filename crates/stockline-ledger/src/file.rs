use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, RwLock};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use stockline_types::{Block, BlockStatus, NewEntry};
use tracing::{error, info, warn};

use crate::error::LedgerError;
use crate::snapshot::Snapshot;
use crate::state::{ChainState, LedgerEvent};
use crate::traits::{ChainSnapshot, LedgerReader, LedgerWriter};
use crate::wal::{SyncMode, WalRecord, WriteAheadLog};

pub const WAL_FILE: &str = "ledger.wal";
pub const SNAPSHOT_FILE: &str = "ledger.snapshot.json";
pub const LOCK_FILE: &str = "ledger.lock";

/// Configuration for the durable ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLedgerConfig {
    pub sync_mode: SyncMode,
    /// Number of WAL records after which the chain is snapshotted and the
    /// log truncated.
    pub compact_after: u64,
}

impl Default for FileLedgerConfig {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::EveryWrite,
            compact_after: 1024,
        }
    }
}

struct WriterState {
    wal: WriteAheadLog,
    next_seq: u64,
    uncompacted: u64,
}

/// Durable ledger: snapshot + write-ahead log + in-memory chain.
///
/// All mutations go through one writer mutex. Each change is planned against
/// the published chain, persisted to the WAL, and only then applied to the
/// in-memory chain, so readers never observe a change that is not on disk.
/// Readers take the `RwLock` only long enough to clone an `Arc`.
///
/// The directory is owned exclusively: `open` takes an advisory lock on
/// [`LOCK_FILE`] that is held until the ledger is dropped.
pub struct FileLedger {
    dir: PathBuf,
    config: FileLedgerConfig,
    _lock: File,
    writer: Mutex<WriterState>,
    chain: RwLock<ChainState>,
}

impl FileLedger {
    /// Open the ledger stored in `dir`, creating a genesis chain if empty.
    pub fn open(dir: impl AsRef<Path>, config: FileLedgerConfig) -> Result<Self, LedgerError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let lock = lock_dir(&dir)?;
        let snapshot_path = dir.join(SNAPSHOT_FILE);

        let (mut chain, last_seq) = match Snapshot::load(&snapshot_path)? {
            Some(snapshot) => (ChainState::from_blocks(snapshot.chain)?, snapshot.last_seq),
            None => {
                let chain = ChainState::genesis()?;
                Snapshot {
                    last_seq: 0,
                    chain: chain.snapshot().to_vec(),
                }
                .write_atomic(&snapshot_path)?;
                info!(dir = %dir.display(), "initialized new ledger");
                (chain, 0)
            }
        };

        let mut wal = WriteAheadLog::open(&dir.join(WAL_FILE), config.sync_mode)?;
        let mut next_seq = last_seq + 1;
        let mut replayed = 0u64;
        for record in wal.recover()? {
            if record.seq <= last_seq {
                continue;
            }
            if record.seq != next_seq {
                return Err(LedgerError::CorruptLog {
                    offset: wal.offset(),
                    reason: format!("expected seq {next_seq}, found {}", record.seq),
                });
            }
            chain.apply(&record.event)?;
            next_seq += 1;
            replayed += 1;
        }

        info!(
            dir = %dir.display(),
            blocks = chain.len(),
            replayed,
            "ledger opened"
        );

        Ok(Self {
            dir,
            config,
            _lock: lock,
            writer: Mutex::new(WriterState {
                wal,
                next_seq,
                uncompacted: replayed,
            }),
            chain: RwLock::new(chain),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Snapshot the current chain and truncate the WAL.
    pub fn compact(&self) -> Result<(), LedgerError> {
        let mut writer = self.lock_writer()?;
        self.compact_locked(&mut writer)
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, WriterState>, LedgerError> {
        self.writer
            .lock()
            .map_err(|_| LedgerError::poisoned("ledger writer"))
    }

    fn compact_locked(&self, writer: &mut WriterState) -> Result<(), LedgerError> {
        let snapshot = Snapshot {
            last_seq: writer.next_seq - 1,
            chain: self.chain()?.to_vec(),
        };
        snapshot.write_atomic(&self.dir.join(SNAPSHOT_FILE))?;
        writer.wal.truncate()?;
        writer.uncompacted = 0;
        info!(
            last_seq = snapshot.last_seq,
            blocks = snapshot.chain.len(),
            "ledger compacted"
        );
        Ok(())
    }

    fn mutate(
        &self,
        plan: impl FnOnce(&ChainState) -> Result<LedgerEvent, LedgerError>,
    ) -> Result<Block, LedgerError> {
        let mut writer = self.lock_writer()?;

        let event = {
            let chain = self
                .chain
                .read()
                .map_err(|_| LedgerError::poisoned("ledger read"))?;
            plan(&*chain)?
        };

        let record = WalRecord {
            seq: writer.next_seq,
            event,
        };
        let offset = match writer.wal.append(&record) {
            Ok(offset) => offset,
            Err(e) => {
                error!(seq = record.seq, error = %e, "failed to persist ledger event");
                return Err(e);
            }
        };

        let applied = {
            let mut chain = self
                .chain
                .write()
                .map_err(|_| LedgerError::poisoned("ledger write"))?;
            chain.apply(&record.event)
        };
        let block = match applied {
            Ok(block) => block,
            Err(e) => {
                // A logged event that cannot be applied would fail every future replay.
                error!(seq = record.seq, error = %e, "ledger event rejected after logging");
                writer.wal.rollback_to(offset)?;
                return Err(e);
            }
        };
        writer.next_seq += 1;
        writer.uncompacted += 1;

        let reset = matches!(record.event, LedgerEvent::Reset(_));
        if reset || writer.uncompacted >= self.config.compact_after {
            // The event is already durable in the WAL; a failed compaction
            // only delays log truncation.
            if let Err(e) = self.compact_locked(&mut writer) {
                warn!(error = %e, "ledger compaction failed");
            }
        }

        Ok(block)
    }
}

fn lock_dir(dir: &Path) -> Result<File, LedgerError> {
    let path = dir.join(LOCK_FILE);
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&path)?;
    file.try_lock_exclusive().map_err(|e| {
        LedgerError::Storage(format!(
            "ledger in {} is locked by another process: {e}",
            dir.display()
        ))
    })?;
    Ok(file)
}

impl LedgerReader for FileLedger {
    fn chain(&self) -> Result<ChainSnapshot, LedgerError> {
        let chain = self
            .chain
            .read()
            .map_err(|_| LedgerError::poisoned("ledger read"))?;
        Ok(chain.snapshot())
    }
}

impl LedgerWriter for FileLedger {
    fn append(&self, entry: NewEntry) -> Result<Block, LedgerError> {
        self.mutate(|chain| chain.plan_append(entry))
    }

    fn resolve(&self, index: u64, target: BlockStatus) -> Result<Block, LedgerError> {
        self.mutate(|chain| chain.plan_resolve(index, target))
    }

    fn clear(&self) -> Result<Block, LedgerError> {
        self.mutate(|chain| chain.plan_reset())
    }
}
