//! Event bus abstraction for decoupled event emission.
//!
//! The detector publishes status deliveries through this trait so the core can
//! be exercised without any host transport attached.

use crate::{event_names, CallStatusChangedEvent};
use std::sync::{Arc, Mutex, MutexGuard};

/// Sink for events bound for the host transport.
pub trait EventBus: Send + Sync {
    /// Emit an event with a JSON payload.
    ///
    /// # Arguments
    /// * `topic` - Event name/topic (e.g., "call_detector:status_changed")
    /// * `payload` - JSON payload to emit
    fn emit(&self, topic: &str, payload: serde_json::Value);

    /// Publish a call status on `call_detector:status_changed`.
    ///
    /// Returns false if the event could not be serialized.
    fn publish_status(&self, event: &CallStatusChangedEvent) -> bool {
        match serde_json::to_value(event) {
            Ok(payload) => {
                self.emit(event_names::CALL_STATUS_CHANGED, payload);
                true
            }
            Err(_) => false,
        }
    }
}

pub type EventBusRef = Arc<dyn EventBus>;

/// Captures emitted events for later inspection.
#[derive(Default)]
pub struct InMemoryEventBus {
    events: Mutex<Vec<EmittedEvent>>,
}

#[derive(Debug, Clone)]
pub struct EmittedEvent {
    pub topic: String,
    pub payload: serde_json::Value,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking test thread must not hide the events captured so far.
    fn guard(&self) -> MutexGuard<'_, Vec<EmittedEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn events(&self) -> Vec<EmittedEvent> {
        self.guard().clone()
    }

    pub fn events_for(&self, topic: &str) -> Vec<EmittedEvent> {
        self.guard()
            .iter()
            .filter(|e| e.topic == topic)
            .cloned()
            .collect()
    }

    /// Status events in delivery order, skipping payloads that do not decode.
    pub fn statuses(&self) -> Vec<CallStatusChangedEvent> {
        self.guard()
            .iter()
            .filter(|e| e.topic == event_names::CALL_STATUS_CHANGED)
            .filter_map(|e| serde_json::from_value(e.payload.clone()).ok())
            .collect()
    }

    pub fn clear(&self) {
        self.guard().clear();
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }
}

impl EventBus for InMemoryEventBus {
    fn emit(&self, topic: &str, payload: serde_json::Value) {
        self.guard().push(EmittedEvent {
            topic: topic.to_string(),
            payload,
        });
    }
}

/// Discards everything. For hosts that only use `current_status`.
pub struct NullEventBus;

impl EventBus for NullEventBus {
    fn emit(&self, _topic: &str, _payload: serde_json::Value) {}
}
