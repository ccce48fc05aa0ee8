//! Destinations for service events

pub mod file;
pub mod memory;
pub mod tracing_sink;

pub use file::JsonlFileSink;
pub use memory::MemorySink;
pub use tracing_sink::TracingSink;

use crate::event::ServiceEvent;
use std::sync::Arc;

/// Error persisting an event
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Destination for structured service events
pub trait EventSink: Send + Sync {
    fn name(&self) -> &str;

    fn record(&self, event: &ServiceEvent) -> Result<(), SinkError>;
}

/// Fan-out over every configured sink
///
/// Recording never fails: a sink error is reported through `tracing` and the
/// remaining sinks still receive the event.
#[derive(Clone, Default)]
pub struct EventLog {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn add_sink(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn record(&self, event: &ServiceEvent) {
        for sink in &self.sinks {
            if let Err(e) = sink.record(event) {
                tracing::warn!(
                    sink = sink.name(),
                    service = %event.service_name,
                    "failed to record service event: {}",
                    e
                );
            }
        }
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.sinks.iter().map(|s| s.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventCategory;

    struct BrokenSink;

    impl EventSink for BrokenSink {
        fn name(&self) -> &str {
            "broken"
        }

        fn record(&self, _event: &ServiceEvent) -> Result<(), SinkError> {
            Err(SinkError::Io(std::io::Error::other("disk full")))
        }
    }

    #[test]
    fn test_failing_sink_does_not_block_others() {
        let memory = Arc::new(MemorySink::new(10));
        let log = EventLog::new()
            .with_sink(Arc::new(BrokenSink))
            .with_sink(memory.clone());

        log.record(&ServiceEvent::new("LLM", EventCategory::Success, "ok"));

        assert_eq!(log.len(), 2);
        assert_eq!(memory.len(), 1);
    }
}
