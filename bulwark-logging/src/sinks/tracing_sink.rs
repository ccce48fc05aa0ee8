//! Event sink that forwards to `tracing`

use super::{EventSink, SinkError};
use crate::event::{EventCategory, ServiceEvent};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn name(&self) -> &str {
        "tracing"
    }

    fn record(&self, event: &ServiceEvent) -> Result<(), SinkError> {
        match event.category {
            EventCategory::Success => tracing::info!(
                service = %event.service_name,
                category = %event.category,
                retry_count = event.retry_count,
                circuit_state = %event.circuit_state,
                "{}",
                event.message
            ),
            _ => tracing::warn!(
                service = %event.service_name,
                category = %event.category,
                retry_count = event.retry_count,
                circuit_state = %event.circuit_state,
                "{}",
                event.message
            ),
        }
        Ok(())
    }
}
