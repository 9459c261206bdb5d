//! This module defines the storage interface and implementations for the
//! durable log slots.
use crate::error::{Result, TelemetryError};
use crate::types::LogEntry;
use sled::Db;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// A named, size-bounded slot holding one JSON array of entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogSlot {
    /// Every accepted entry.
    Logs,
    /// ERROR entries only.
    Errors,
}

impl LogSlot {
    pub fn key(self) -> &'static str {
        match self {
            LogSlot::Logs => "site_logs",
            LogSlot::Errors => "site_errors",
        }
    }
}

/// A trait for loading and overwriting log slots.
///
/// Writes replace the whole slot; implementations are not append-only.
pub trait LogStore: Send + Sync {
    /// Loads the entries stored in `slot`.
    ///
    /// # Returns
    ///
    /// An empty `Vec` when the slot has never been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be read or holds malformed data.
    fn load(&self, slot: LogSlot) -> Result<Vec<LogEntry>>;

    /// Overwrites `slot` with `entries`.
    ///
    /// # Errors
    ///
    /// Returns an error if the entries cannot be serialized, exceed the
    /// store's quota, or cannot be written.
    fn save(&self, slot: LogSlot, entries: &[LogEntry]) -> Result<()>;

    /// Removes `slot` entirely.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be removed.
    fn clear(&self, slot: LogSlot) -> Result<()>;

    /// Forces buffered writes to durable media.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

fn encode(entries: &[LogEntry], quota_bytes: usize) -> Result<Vec<u8>> {
    let bytes = serde_json::to_vec(entries)?;
    if bytes.len() > quota_bytes {
        return Err(TelemetryError::QuotaExceeded {
            needed: bytes.len(),
            limit: quota_bytes,
        });
    }
    Ok(bytes)
}

fn decode(bytes: &[u8]) -> Result<Vec<LogEntry>> {
    Ok(serde_json::from_slice(bytes)?)
}

/// A `LogStore` implementation using `sled` for storage.
pub struct SledLogStore {
    tree: sled::Tree,
    quota_bytes: usize,
}

impl SledLogStore {
    /// Creates a new `SledLogStore`.
    ///
    /// # Arguments
    ///
    /// * `db` - The `sled::Db` instance to use for storage.
    /// * `quota_bytes` - The largest serialized slot accepted by `save`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying `sled` tree cannot be opened.
    pub fn new(db: &Db, quota_bytes: usize) -> Result<Self> {
        let tree = db.open_tree("telemetry")?;
        Ok(Self { tree, quota_bytes })
    }
}

impl LogStore for SledLogStore {
    fn load(&self, slot: LogSlot) -> Result<Vec<LogEntry>> {
        match self.tree.get(slot.key())? {
            Some(bytes) => decode(&bytes),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, slot: LogSlot, entries: &[LogEntry]) -> Result<()> {
        let bytes = encode(entries, self.quota_bytes)?;
        self.tree.insert(slot.key(), bytes)?;
        Ok(())
    }

    fn clear(&self, slot: LogSlot) -> Result<()> {
        self.tree.remove(slot.key())?;
        self.tree.flush()?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.tree.flush()?;
        Ok(())
    }
}

/// An in-memory `LogStore`, for ephemeral sessions and tests.
pub struct MemoryLogStore {
    slots: Mutex<HashMap<LogSlot, Vec<u8>>>,
    quota_bytes: usize,
}

impl MemoryLogStore {
    pub fn new(quota_bytes: usize) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            quota_bytes,
        }
    }

    /// Stores raw bytes in a slot without validation.
    pub fn put_raw(&self, slot: LogSlot, bytes: impl Into<Vec<u8>>) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(slot, bytes.into());
    }

    /// Returns the raw bytes held by a slot.
    pub fn raw(&self, slot: LogSlot) -> Option<Vec<u8>> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&slot)
            .cloned()
    }
}

impl Default for MemoryLogStore {
    fn default() -> Self {
        Self::new(usize::MAX)
    }
}

impl LogStore for MemoryLogStore {
    fn load(&self, slot: LogSlot) -> Result<Vec<LogEntry>> {
        match self.raw(slot) {
            Some(bytes) => decode(&bytes),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, slot: LogSlot, entries: &[LogEntry]) -> Result<()> {
        let bytes = encode(entries, self.quota_bytes)?;
        self.put_raw(slot, bytes);
        Ok(())
    }

    fn clear(&self, slot: LogSlot) -> Result<()> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&slot);
        Ok(())
    }
}
