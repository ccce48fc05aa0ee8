//! Structured logging infrastructure for Bulwark
//!
//! This crate provides:
//! - Service events describing the outcome of every protected call
//! - Event sinks (JSON lines file, in-memory buffer, tracing) and a fan-out log
//! - Console tracing initialisation

pub mod event;
pub mod init;
pub mod sinks;

// Re-export main types for convenience
pub use event::{EventCategory, ServiceEvent};
pub use init::{init_tracing, LogFormat, LoggingConfig};
pub use sinks::{EventLog, EventSink, JsonlFileSink, MemorySink, SinkError, TracingSink};
