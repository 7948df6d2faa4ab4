use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::LedgerError;
use crate::state::LedgerEvent;

/// WAL record: one ledger event tagged with its log sequence number.
///
/// On-disk format:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized WalRecord)]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalRecord {
    pub seq: u64,
    pub event: LedgerEvent,
}

/// Flush/sync strategy for the WAL.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` after every write (safest, highest latency).
    #[default]
    EveryWrite,
    /// Rely on OS page-cache buffering (fastest, least durable).
    OsDefault,
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Crash-recoverable write-ahead log for ledger events.
///
/// Not internally synchronized: the owning store serializes access. Each
/// record is written with a single `write_all`; if the write or sync fails the
/// file is truncated back to its previous length, so a failed append never
/// leaves a partial frame behind.
pub struct WriteAheadLog {
    path: PathBuf,
    file: File,
    offset: u64,
    sync_mode: SyncMode,
}

impl WriteAheadLog {
    /// Open (or create) a WAL file at the given path.
    pub fn open(path: &Path, sync_mode: SyncMode) -> Result<Self, LedgerError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let offset = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            offset,
            sync_mode,
        })
    }

    /// Append a record. Returns the byte offset at which it starts.
    pub fn append(&mut self, record: &WalRecord) -> Result<u64, LedgerError> {
        let payload =
            bincode::serialize(record).map_err(|e| LedgerError::Serialization(e.to_string()))?;
        let length = u32::try_from(payload.len())
            .map_err(|_| LedgerError::Serialization("WAL record exceeds 4 GiB".into()))?;

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
        frame.extend_from_slice(&length.to_le_bytes());
        frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        frame.extend_from_slice(&payload);

        let entry_offset = self.offset;
        if let Err(e) = self.write_frame(&frame) {
            self.rollback_to(entry_offset)?;
            return Err(e.into());
        }
        self.offset += frame.len() as u64;

        debug!(offset = entry_offset, seq = record.seq, len = payload.len(), "WAL append");
        Ok(entry_offset)
    }

    fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()> {
        self.file.write_all(frame)?;
        self.file.flush()?;
        if self.sync_mode == SyncMode::EveryWrite {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Discard everything from `offset` onwards.
    pub(crate) fn rollback_to(&mut self, offset: u64) -> Result<(), LedgerError> {
        self.file.set_len(offset)?;
        self.file.sync_all()?;
        self.offset = offset;
        Ok(())
    }

    /// Read every record from the start of the log.
    ///
    /// A torn final frame (crash mid-write) is truncated away with a warning.
    /// A damaged frame anywhere before the tail is reported as corruption:
    /// skipping it would silently drop a committed change.
    pub fn recover(&mut self) -> Result<Vec<WalRecord>, LedgerError> {
        let mut data = Vec::new();
        File::open(&self.path)?.read_to_end(&mut data)?;
        let file_len = data.len() as u64;

        let mut records = Vec::new();
        let mut offset: u64 = 0;

        while offset < file_len {
            let start = offset as usize;
            if data.len() - start < HEADER_SIZE {
                warn!(offset, file_len, "truncated WAL header; discarding tail");
                self.rollback_to(offset)?;
                break;
            }

            let length = u32::from_le_bytes([
                data[start],
                data[start + 1],
                data[start + 2],
                data[start + 3],
            ]) as usize;
            let expected_crc = u32::from_le_bytes([
                data[start + 4],
                data[start + 5],
                data[start + 6],
                data[start + 7],
            ]);

            let body = start + HEADER_SIZE;
            let end = body + length;
            if length == 0 || end > data.len() {
                warn!(offset, length, file_len, "truncated WAL entry; discarding tail");
                self.rollback_to(offset)?;
                break;
            }

            let payload = &data[body..end];
            let actual_crc = crc32fast::hash(payload);
            if actual_crc != expected_crc {
                if end == data.len() {
                    warn!(offset, "CRC mismatch on final WAL entry; discarding torn write");
                    self.rollback_to(offset)?;
                    break;
                }
                return Err(LedgerError::CorruptLog {
                    offset,
                    reason: format!("CRC mismatch: expected {expected_crc:#010x}, got {actual_crc:#010x}"),
                });
            }

            let record: WalRecord =
                bincode::deserialize(payload).map_err(|e| LedgerError::CorruptLog {
                    offset,
                    reason: e.to_string(),
                })?;
            records.push(record);
            offset = end as u64;
        }

        self.offset = offset.min(file_len);
        debug!(recovered = records.len(), "WAL recovery complete");
        Ok(records)
    }

    /// Remove all data (after a snapshot has captured it).
    pub fn truncate(&mut self) -> Result<(), LedgerError> {
        self.rollback_to(0)?;
        debug!("WAL truncated");
        Ok(())
    }

    /// Current write offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
