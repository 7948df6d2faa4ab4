use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use stockline_types::Block;
use tracing::debug;

use crate::error::LedgerError;

/// Compacted chain image plus the last WAL sequence it covers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub last_seq: u64,
    pub chain: Vec<Block>,
}

impl Snapshot {
    /// Load a snapshot, or `None` if the file does not exist yet.
    pub fn load(path: &Path) -> Result<Option<Self>, LedgerError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| LedgerError::Serialization(format!("{}: {e}", path.display())))?;
        Ok(Some(snapshot))
    }

    /// Replace the snapshot file atomically.
    ///
    /// The image is written to a temporary file in the same directory,
    /// synced, then renamed over the target. Readers of `path` see either the
    /// old snapshot or the new one, never a partial write.
    pub fn write_atomic(&self, path: &Path) -> Result<(), LedgerError> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, self)
                .map_err(|e| LedgerError::Serialization(e.to_string()))?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| LedgerError::from(e.error))?;

        // Best effort: make the rename itself durable where the platform allows it.
        if let Ok(dir_handle) = File::open(dir) {
            let _ = dir_handle.sync_all();
        }

        debug!(last_seq = self.last_seq, blocks = self.chain.len(), "snapshot written");
        Ok(())
    }
}
