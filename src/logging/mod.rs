//! This module contains the telemetry logging pipeline.
//!
//! The `Logger` facade composes an entry builder, a level filter, bounded
//! buffers with a durable mirror, an optional remote sink, named timers and a
//! console channel. A `tracing` layer and a set of observers feed host events
//! into the same pipeline.
pub mod buffer;
pub mod collector;
pub mod console;
pub mod entry;
pub mod export;
pub mod filter;
pub mod logger;
pub mod observer;
pub mod persist;
pub mod remote;
pub mod timers;

pub use buffer::RingBuffer;
pub use collector::TelemetryLayer;
pub use console::{ConsoleFormat, ConsoleSink, MemoryConsole, StderrConsole, TracingConsole};
pub use entry::EntryBuilder;
pub use filter::LevelFilter;
pub use logger::{Logger, LoggerBuilder};
pub use observer::PerformanceMonitor;
pub use persist::PersistenceAdapter;
pub use remote::{HttpTransport, RemoteSink, Transport};
pub use timers::TimerRegistry;
