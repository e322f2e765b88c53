//! RecordStore implementation
//!
//! BTreeMap-based store behind a single mutex.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Local};
use parking_lot::{Mutex, MutexGuard};

use crate::error::{BeingError, Result};
use crate::model::{HumanBeing, Key};

/// Result of [`RecordStore::replace_where`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replacement {
    /// No record under the key
    Absent,
    /// A record exists but the predicate kept it
    Rejected,
    Replaced,
}

/// In-memory record collection, ordered by key
pub struct RecordStore {
    /// Records by key
    records: Mutex<BTreeMap<Key, HumanBeing>>,

    /// Bound on lock acquisition; `None` waits forever
    lock_timeout: Option<Duration>,

    /// When this store was created (reported by `info`)
    initialized_at: DateTime<Local>,
}

impl RecordStore {
    /// Create a new empty store that waits indefinitely for its lock
    pub fn new() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            lock_timeout: None,
            initialized_at: Local::now(),
        }
    }

    /// Create a new empty store whose operations give up after `timeout`
    pub fn with_lock_timeout(timeout: Duration) -> Self {
        Self {
            lock_timeout: Some(timeout),
            ..Self::new()
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<Key, HumanBeing>>> {
        match self.lock_timeout {
            None => Ok(self.records.lock()),
            Some(timeout) => self
                .records
                .try_lock_for(timeout)
                .ok_or(BeingError::Timeout(timeout.as_millis() as u64)),
        }
    }

    // =========================================================================
    // Point Operations
    // =========================================================================

    /// Insert a record under its own key; false if the key is taken
    pub fn insert(&self, record: HumanBeing) -> Result<bool> {
        let mut records = self.lock()?;
        if records.contains_key(&record.id()) {
            return Ok(false);
        }
        records.insert(record.id(), record);
        Ok(true)
    }

    /// Insert a record under the next free key, chosen and used under one lock
    pub fn insert_new(&self, build: impl FnOnce(Key) -> Result<HumanBeing>) -> Result<Key> {
        let mut records = self.lock()?;
        let key = next_key_of(&records)?;
        let record = build(key)?;
        if record.id() != key {
            return Err(BeingError::Validation(format!(
                "record built with key {} instead of {}",
                record.id(),
                key
            )));
        }
        records.insert(key, record);
        Ok(key)
    }

    /// Replace the record with the same key; false if the key is absent.
    /// The stored creation date is kept.
    pub fn update(&self, record: HumanBeing) -> Result<bool> {
        let mut records = self.lock()?;
        match records.get_mut(&record.id()) {
            Some(existing) => {
                let creation_date = existing.creation_date();
                *existing = record.dated(creation_date);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove a record by key; false if the key is absent
    pub fn remove_by_key(&self, key: Key) -> Result<bool> {
        Ok(self.lock()?.remove(&key).is_some())
    }

    /// Get a copy of the record stored under `key`
    pub fn get(&self, key: Key) -> Result<Option<HumanBeing>> {
        Ok(self.lock()?.get(&key).cloned())
    }

    pub fn contains(&self, key: Key) -> Result<bool> {
        Ok(self.lock()?.contains_key(&key))
    }

    // =========================================================================
    // Bulk Operations
    // =========================================================================

    /// Remove every record
    pub fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    /// All records in key order, copied under the lock
    pub fn values(&self) -> Result<Vec<HumanBeing>> {
        Ok(self.lock()?.values().cloned().collect())
    }

    /// Run `f` over the records in key order while holding the lock
    pub fn with_values<R>(
        &self,
        f: impl FnOnce(&mut dyn Iterator<Item = &HumanBeing>) -> R,
    ) -> Result<R> {
        let records = self.lock()?;
        let mut iter = records.values();
        Ok(f(&mut iter))
    }

    /// Remove every record matching `predicate`; returns how many were removed
    pub fn remove_where(&self, predicate: impl Fn(&HumanBeing) -> bool) -> Result<usize> {
        let mut records = self.lock()?;
        let before = records.len();
        records.retain(|_, record| !predicate(record));
        Ok(before - records.len())
    }

    /// Replace the record under `new_value`'s key when `should_replace(old, new)`
    /// holds. Lookup, predicate and write happen under one lock.
    /// The stored creation date is kept.
    pub fn replace_where(
        &self,
        new_value: HumanBeing,
        should_replace: impl Fn(&HumanBeing, &HumanBeing) -> bool,
    ) -> Result<Replacement> {
        let mut records = self.lock()?;
        match records.get_mut(&new_value.id()) {
            None => Ok(Replacement::Absent),
            Some(existing) if should_replace(existing, &new_value) => {
                let creation_date = existing.creation_date();
                *existing = new_value.dated(creation_date);
                Ok(Replacement::Replaced)
            }
            Some(_) => Ok(Replacement::Rejected),
        }
    }

    /// Swap the whole contents in one step.
    /// Fails without touching the store if `records` repeats a key.
    pub fn replace_all(&self, records: Vec<HumanBeing>) -> Result<()> {
        let mut fresh = BTreeMap::new();
        for record in records {
            let key = record.id();
            if fresh.insert(key, record).is_some() {
                return Err(BeingError::Validation(format!("duplicate key {}", key)));
            }
        }
        *self.lock()? = fresh;
        Ok(())
    }

    /// Smallest key greater than every stored key
    pub fn next_key(&self) -> Result<Key> {
        let records = self.lock()?;
        next_key_of(&records)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    pub fn initialized_at(&self) -> DateTime<Local> {
        self.initialized_at
    }
}

fn next_key_of(records: &BTreeMap<Key, HumanBeing>) -> Result<Key> {
    let last = records.keys().next_back().copied().unwrap_or(0);
    last.checked_add(1)
        .ok_or_else(|| BeingError::Validation("key space exhausted".to_string()))
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}
