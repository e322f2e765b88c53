//! Snapshot Manager
//!
//! Reads and writes the snapshot file.
//!
//! ## Responsibilities
//! - Load the snapshot at startup and on `load`
//! - Write snapshots atomically: a temp file in the same directory is
//!   fsynced and renamed over the target, so readers never see a torn file
//! - Serialize every write together with the store read or swap that goes
//!   with it, so the file always ends up matching the last completed step
//!
//! Lock order: the persistence lock is taken before the store lock, never
//! the other way round.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::NamedTempFile;

use super::codec::{self, DecodeReport};
use crate::error::{BeingError, Result};
use crate::model::HumanBeing;
use crate::store::RecordStore;

/// Owns the snapshot file location
#[derive(Debug)]
pub struct SnapshotManager {
    path: PathBuf,

    /// Held across a file write and the store access paired with it
    persist: Mutex<()>,
}

/// What [`SnapshotManager::reload_into`] put into the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reloaded {
    pub loaded: usize,
    pub skipped: Vec<String>,
}

impl SnapshotManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            persist: Mutex::new(()),
        }
    }

    /// Read and leniently decode the snapshot file.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    pub fn load(&self) -> Result<Option<DecodeReport>> {
        let xml = match fs::read_to_string(&self.path) {
            Ok(xml) => xml,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if xml.trim().is_empty() {
            tracing::warn!("Snapshot file {} is empty", self.path.display());
            return Ok(Some(DecodeReport::default()));
        }

        let report = codec::decode_lenient(&xml)?;
        for reason in &report.skipped {
            tracing::warn!("Skipped invalid record in {}: {}", self.path.display(), reason);
        }
        Ok(Some(report))
    }

    /// Encode and atomically write the given records
    pub fn save(&self, records: &[HumanBeing]) -> Result<()> {
        let _persist = self.persist.lock();
        self.write_file(&codec::encode(records))
    }

    /// Atomically replace the snapshot file with `xml`
    pub fn write_xml(&self, xml: &str) -> Result<()> {
        let _persist = self.persist.lock();
        self.write_file(xml)
    }

    /// Write the current contents of `store`; returns the record count
    pub fn save_store(&self, store: &RecordStore) -> Result<usize> {
        let _persist = self.persist.lock();
        let records = store.values()?;
        self.write_file(&codec::encode(&records))?;
        Ok(records.len())
    }

    /// Write `records` to the file, then make them the contents of `store`.
    ///
    /// No other save can run between the two steps. Keys are checked before
    /// anything is written.
    pub fn install(&self, store: &RecordStore, records: Vec<HumanBeing>) -> Result<usize> {
        let mut keys: Vec<_> = records.iter().map(HumanBeing::id).collect();
        keys.sort_unstable();
        if let Some(pair) = keys.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(BeingError::Validation(format!("duplicate key {}", pair[0])));
        }

        let _persist = self.persist.lock();
        self.write_file(&codec::encode(&records))?;
        let count = records.len();
        store.replace_all(records)?;
        Ok(count)
    }

    /// Load the file into `store`, replacing its contents.
    ///
    /// Returns `Ok(None)` and leaves the store alone when the file does not
    /// exist.
    pub fn reload_into(&self, store: &RecordStore) -> Result<Option<Reloaded>> {
        let _persist = self.persist.lock();
        let report = match self.load()? {
            Some(report) => report,
            None => return Ok(None),
        };
        let loaded = report.records.len();
        store.replace_all(report.records)?;
        Ok(Some(Reloaded {
            loaded,
            skipped: report.skipped,
        }))
    }

    fn write_file(&self, xml: &str) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(xml.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.path)
            .map_err(|e| BeingError::Snapshot(format!("failed to persist {}: {}", self.path.display(), e)))?;

        tracing::debug!("Wrote snapshot to {} ({} bytes)", self.path.display(), xml.len());
        Ok(())
    }

    /// Rename an unreadable snapshot to `<file>.corrupt` and return the new path
    pub fn quarantine(&self) -> Result<PathBuf> {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".corrupt");
        let target = self.path.with_file_name(name);
        fs::rename(&self.path, &target)?;
        Ok(target)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
