//! Single-subscriber delivery of call status.

use calldetect_events::{CallStatusChangedEvent, EventBusRef};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Callback receiving the call status.
pub type StatusCallback = Arc<dyn Fn(bool) + Send + Sync + 'static>;

pub fn new_callback<F>(f: F) -> StatusCallback
where
    F: Fn(bool) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Callback that publishes every delivery onto an event bus.
///
/// The first delivery of a subscription is the snapshot and is flagged as
/// `initial`.
pub fn bus_callback(bus: EventBusRef) -> StatusCallback {
    let delivered = AtomicBool::new(false);
    Arc::new(move |is_in_call| {
        let event = if delivered.swap(true, Ordering::SeqCst) {
            CallStatusChangedEvent::changed(is_in_call)
        } else {
            CallStatusChangedEvent::initial(is_in_call)
        };
        if !bus.publish_status(&event) {
            tracing::error!(in_call = is_in_call, "failed to serialize call status event");
        }
    })
}

/// Holds the one active subscriber.
///
/// Whether a value is a real edge is decided by the engine; the notifier only
/// forwards while a subscription is active.
#[derive(Default)]
pub struct ChangeNotifier {
    subscriber: Option<StatusCallback>,
    active: bool,
}

impl ChangeNotifier {
    /// Store the subscriber and hand it the snapshot right away.
    pub fn start(&mut self, callback: StatusCallback, initial: bool) {
        if self.active {
            tracing::debug!("replacing existing subscriber");
        }
        self.subscriber = Some(Arc::clone(&callback));
        self.active = true;
        callback(initial);
    }

    pub fn notify(&self, is_in_call: bool) {
        if !self.active {
            return;
        }
        if let Some(subscriber) = &self.subscriber {
            tracing::debug!(in_call = is_in_call, "delivering call status");
            subscriber(is_in_call);
        }
    }

    /// Returns false when there was nothing to stop.
    pub fn stop(&mut self) -> bool {
        let was_active = self.active;
        self.subscriber = None;
        self.active = false;
        was_active
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}
