//! In-memory platform driven by tests and the monitor demo.
//!
//! Holds a scriptable routing mode and focus-request result, records every
//! call the engine makes, and fires registered listeners on demand.

use super::{
    AudioPlatform, CallStateCallback, FocusRequest, ListenerId, PlatformCapabilities, PlatformError,
    RawSignalCallback,
};
use crate::normalize::raw;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// How often each platform operation was invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimCounters {
    pub samples: usize,
    pub focus_requests: usize,
    pub focus_abandons: usize,
    pub subscribes: usize,
    pub unsubscribes: usize,
}

struct SimState {
    capabilities: PlatformCapabilities,
    mode: i32,
    request_result: i32,
    sample_failure: Option<PlatformError>,
    request_failure: Option<PlatformError>,
    subscribe_failure: Option<PlatformError>,
    focus_listeners: BTreeMap<ListenerId, RawSignalCallback>,
    mode_listeners: BTreeMap<ListenerId, RawSignalCallback>,
    call_listeners: BTreeMap<ListenerId, CallStateCallback>,
    next_id: u64,
    focus_held: bool,
    last_request: Option<FocusRequest>,
    counters: SimCounters,
}

pub struct SimulatedPlatform {
    state: Mutex<SimState>,
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self::with_capabilities(PlatformCapabilities::poll_only())
    }
}

impl SimulatedPlatform {
    /// Poll-only platform in normal mode that grants focus.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(capabilities: PlatformCapabilities) -> Self {
        Self {
            state: Mutex::new(SimState {
                capabilities,
                mode: raw::MODE_NORMAL,
                request_result: raw::AUDIOFOCUS_REQUEST_GRANTED,
                sample_failure: None,
                request_failure: None,
                subscribe_failure: None,
                focus_listeners: BTreeMap::new(),
                mode_listeners: BTreeMap::new(),
                call_listeners: BTreeMap::new(),
                next_id: 1,
                focus_held: false,
                last_request: None,
                counters: SimCounters::default(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change the routing mode silently, as the OS would between signals.
    pub fn set_mode(&self, mode: i32) {
        self.lock().mode = mode;
    }

    /// Result code returned by subsequent focus requests.
    pub fn set_request_result(&self, result: i32) {
        self.lock().request_result = result;
    }

    pub fn fail_sampling(&self, failure: Option<PlatformError>) {
        self.lock().sample_failure = failure;
    }

    pub fn fail_focus_requests(&self, failure: Option<PlatformError>) {
        self.lock().request_failure = failure;
    }

    pub fn fail_subscriptions(&self, failure: Option<PlatformError>) {
        self.lock().subscribe_failure = failure;
    }

    /// Deliver a raw focus change to every focus listener.
    pub fn emit_focus_change(&self, focus: i32) {
        let listeners: Vec<_> = self.lock().focus_listeners.values().cloned().collect();
        for listener in listeners {
            listener(focus);
        }
    }

    /// Switch the routing mode and notify mode listeners.
    pub fn emit_mode_change(&self, mode: i32) {
        let listeners: Vec<_> = {
            let mut state = self.lock();
            state.mode = mode;
            state.mode_listeners.values().cloned().collect()
        };
        for listener in listeners {
            listener(mode);
        }
    }

    /// Switch the routing mode and poke the call observers.
    pub fn emit_call_state_change(&self, mode: i32) {
        let listeners: Vec<_> = {
            let mut state = self.lock();
            state.mode = mode;
            state.call_listeners.values().cloned().collect()
        };
        for listener in listeners {
            listener();
        }
    }

    /// Registrations currently held, across all signal kinds.
    pub fn active_listeners(&self) -> usize {
        let state = self.lock();
        state.focus_listeners.len() + state.mode_listeners.len() + state.call_listeners.len()
    }

    pub fn holds_focus(&self) -> bool {
        self.lock().focus_held
    }

    pub fn last_request(&self) -> Option<FocusRequest> {
        self.lock().last_request.clone()
    }

    pub fn counters(&self) -> SimCounters {
        self.lock().counters
    }

    fn register(&self, kind: ListenerKind) -> Result<ListenerId, PlatformError> {
        let mut state = self.lock();
        if let Some(failure) = state.subscribe_failure.clone() {
            return Err(failure);
        }
        let id = ListenerId(state.next_id);
        state.next_id += 1;
        state.counters.subscribes += 1;
        match kind {
            ListenerKind::Focus(cb) => {
                state.focus_listeners.insert(id, cb);
            }
            ListenerKind::Mode(cb) => {
                state.mode_listeners.insert(id, cb);
            }
            ListenerKind::Call(cb) => {
                state.call_listeners.insert(id, cb);
            }
        }
        Ok(id)
    }
}

enum ListenerKind {
    Focus(RawSignalCallback),
    Mode(RawSignalCallback),
    Call(CallStateCallback),
}

impl AudioPlatform for SimulatedPlatform {
    fn capabilities(&self) -> PlatformCapabilities {
        self.lock().capabilities
    }

    fn sample_current_mode(&self) -> Result<i32, PlatformError> {
        let mut state = self.lock();
        state.counters.samples += 1;
        match &state.sample_failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(state.mode),
        }
    }

    fn request_focus(&self, request: &FocusRequest) -> Result<i32, PlatformError> {
        let mut state = self.lock();
        state.counters.focus_requests += 1;
        state.last_request = Some(request.clone());
        if let Some(failure) = state.request_failure.clone() {
            return Err(failure);
        }
        state.focus_held = state.request_result == raw::AUDIOFOCUS_REQUEST_GRANTED;
        Ok(state.request_result)
    }

    fn abandon_focus(&self) -> Result<(), PlatformError> {
        let mut state = self.lock();
        state.counters.focus_abandons += 1;
        state.focus_held = false;
        Ok(())
    }

    fn subscribe_focus_change(&self, callback: RawSignalCallback) -> Result<ListenerId, PlatformError> {
        self.register(ListenerKind::Focus(callback))
    }

    fn subscribe_mode_change(&self, callback: RawSignalCallback) -> Result<ListenerId, PlatformError> {
        if !self.capabilities().mode_change_observer {
            return Err(PlatformError::Unsupported("mode change observer"));
        }
        self.register(ListenerKind::Mode(callback))
    }

    fn observe_call_state(&self, callback: CallStateCallback) -> Result<ListenerId, PlatformError> {
        if !self.capabilities().call_observer {
            return Err(PlatformError::Unsupported("call observer"));
        }
        self.register(ListenerKind::Call(callback))
    }

    fn unsubscribe(&self, id: ListenerId) {
        let mut state = self.lock();
        state.counters.unsubscribes += 1;
        state.focus_listeners.remove(&id);
        state.mode_listeners.remove(&id);
        state.call_listeners.remove(&id);
    }
}
