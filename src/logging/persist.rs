//! Best-effort mirror of the in-memory buffers into a `LogStore`.
use super::console::ConsoleSink;
use crate::storage::{LogSlot, LogStore};
use crate::types::LogEntry;
use std::sync::Arc;

/// Wraps a `LogStore` so that no storage failure reaches the caller.
pub struct PersistenceAdapter {
    store: Arc<dyn LogStore>,
    console: Arc<dyn ConsoleSink>,
    enabled: bool,
}

impl PersistenceAdapter {
    pub fn new(store: Arc<dyn LogStore>, console: Arc<dyn ConsoleSink>, enabled: bool) -> Self {
        Self {
            store,
            console,
            enabled,
        }
    }

    /// Loads a slot. Absent or malformed data yields an empty `Vec`.
    pub fn load(&self, slot: LogSlot) -> Vec<LogEntry> {
        if !self.enabled {
            return Vec::new();
        }
        match self.store.load(slot) {
            Ok(entries) => entries,
            Err(err) => {
                self.console
                    .warn(&format!("Could not load persisted logs: {}", err));
                Vec::new()
            }
        }
    }

    /// Overwrites a slot with the already-trimmed entries.
    pub fn save(&self, slot: LogSlot, entries: &[LogEntry]) {
        if !self.enabled {
            return;
        }
        if let Err(err) = self.store.save(slot, entries) {
            self.console
                .warn(&format!("Could not persist log to storage: {}", err));
        }
    }

    pub fn clear(&self, slot: LogSlot) {
        if !self.enabled {
            return;
        }
        if let Err(err) = self.store.clear(slot) {
            self.console
                .warn(&format!("Could not clear persisted logs: {}", err));
        }
    }
}
