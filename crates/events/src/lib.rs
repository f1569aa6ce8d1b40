//! Shared event contracts for call-state delivery.
//!
//! These are the DTOs a host transport forwards to its consumers. Keeping them
//! in one crate means the detector and whatever bridges it to the host agree on
//! field names and topics.
//!
//! Also provides the `EventBus` trait for decoupled event emission.

mod bus;

pub use bus::{EmittedEvent, EventBus, EventBusRef, InMemoryEventBus, NullEventBus};

use serde::{Deserialize, Serialize};

/// Event emitted whenever the subscriber receives a call status.
///
/// Producers: call detector (change notifier)
/// Consumers: host transport, event stream listeners
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallStatusChangedEvent {
    /// Whether the device is currently in a call.
    pub is_in_call: bool,
    /// True for the snapshot delivered on subscribe, false for real edges.
    #[serde(default)]
    pub initial: bool,
    /// Timestamp in milliseconds since epoch.
    #[serde(default)]
    pub timestamp_ms: i64,
}

impl CallStatusChangedEvent {
    /// Snapshot delivered right after subscribing.
    pub fn initial(is_in_call: bool) -> Self {
        Self {
            is_in_call,
            initial: true,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// A status transition.
    pub fn changed(is_in_call: bool) -> Self {
        Self {
            is_in_call,
            initial: false,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Response payload for an explicit status request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStatusResponse {
    pub is_in_call: bool,
}

/// Event names as constants to prevent typos.
pub mod event_names {
    /// Call status delivered to the subscriber.
    pub const CALL_STATUS_CHANGED: &str = "call_detector:status_changed";
}

/// Channel and method names the host bridge registers.
pub mod channels {
    /// Request/response channel.
    pub const METHOD_CHANNEL: &str = "call_detector_method_channel";
    /// Event stream channel.
    pub const EVENT_CHANNEL: &str = "call_detector_event_channel";
    /// Method returning the current status snapshot.
    pub const GET_CURRENT_STATUS: &str = "get_current_status";
}
