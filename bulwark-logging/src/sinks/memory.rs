//! Bounded in-memory event buffer

use parking_lot::Mutex;
use std::collections::VecDeque;

use super::{EventSink, SinkError};
use crate::event::{EventCategory, ServiceEvent};

/// Keeps the most recent events, dropping the oldest beyond capacity
#[derive(Debug)]
pub struct MemorySink {
    capacity: usize,
    events: Mutex<VecDeque<ServiceEvent>>,
}

impl MemorySink {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: Mutex::new(VecDeque::new()),
        }
    }

    pub fn events(&self) -> Vec<ServiceEvent> {
        self.events.lock().iter().cloned().collect()
    }

    pub fn by_category(&self, category: EventCategory) -> Vec<ServiceEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.category == category)
            .cloned()
            .collect()
    }

    pub fn last(&self) -> Option<ServiceEvent> {
        self.events.lock().back().cloned()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn record(&self, event: &ServiceEvent) -> Result<(), SinkError> {
        let mut events = self.events.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_drops_oldest() {
        let sink = MemorySink::new(2);
        for i in 0..3 {
            sink.record(&ServiceEvent::new("svc", EventCategory::Success, format!("event {i}")))
                .unwrap();
        }

        let messages: Vec<_> = sink.events().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["event 1", "event 2"]);
    }

    #[test]
    fn test_filter_by_category() {
        let sink = MemorySink::new(10);
        sink.record(&ServiceEvent::new("svc", EventCategory::Success, "ok"))
            .unwrap();
        sink.record(&ServiceEvent::new("svc", EventCategory::PermanentError, "bad key"))
            .unwrap();

        assert_eq!(sink.by_category(EventCategory::PermanentError).len(), 1);
        assert_eq!(sink.last().unwrap().message, "bad key");
        sink.clear();
        assert!(sink.is_empty());
    }
}
