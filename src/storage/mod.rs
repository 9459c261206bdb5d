//! This module defines the storage interfaces and implementations for the
//! durable mirror of the log buffers.
pub mod logs;

pub use logs::{LogSlot, LogStore, MemoryLogStore, SledLogStore};
