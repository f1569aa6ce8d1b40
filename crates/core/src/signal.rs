//! Signal source adapters.
//!
//! Two strategies share the `SignalSource` interface:
//! - `PushSignal`: the platform pushes routing-mode or call-state changes, so
//!   every notification is already authoritative.
//! - `PollSignal`: only audio-focus changes are pushed; the engine samples the
//!   routing mode on its own schedule. Starting it acquires transient focus.
//!
//! `select_source` picks one from the platform's capabilities. It is the only
//! place that looks at them.

use crate::config::{DetectorConfig, SourceStrategy};
use crate::engine::EngineEvent;
use crate::normalize::{focus_from_request, AudioMode, FocusState};
use crate::platform::{
    CallStateCallback, FocusRequest, ListenerId, PlatformError, PlatformRef, RawSignalCallback,
};
use crate::query::sample_mode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Cloneable handle platform callbacks use to reach the engine.
///
/// Sending never blocks. Once the engine is gone, signals are dropped.
/// Focus callbacks are stamped with the listener generation they were created
/// in, so the engine can discard events a retired listener queued.
#[derive(Clone)]
pub struct SignalSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
    generation: Arc<AtomicU64>,
}

impl SignalSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self {
            tx,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Focus change stamped with the current listener generation.
    pub fn focus_changed(&self, raw: i32) {
        self.send(EngineEvent::FocusChanged {
            raw,
            generation: self.generation(),
        });
    }

    pub fn mode_changed(&self, raw: i32) {
        self.send(EngineEvent::ModeChanged(raw));
    }

    pub fn call_state_changed(&self) {
        self.send(EngineEvent::CallStateChanged);
    }

    pub fn focus_callback(&self) -> RawSignalCallback {
        let sink = self.clone();
        let generation = self.generation();
        Arc::new(move |raw| sink.send(EngineEvent::FocusChanged { raw, generation }))
    }

    pub fn mode_callback(&self) -> RawSignalCallback {
        let sink = self.clone();
        Arc::new(move |raw| sink.mode_changed(raw))
    }

    pub fn call_state_callback(&self) -> CallStateCallback {
        let sink = self.clone();
        Arc::new(move || sink.call_state_changed())
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Start a new listener generation. Callbacks created before this call
    /// keep their old stamp.
    pub(crate) fn retire_listeners(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Ask the engine to release everything and exit.
    pub(crate) fn shutdown(&self, ack: oneshot::Sender<()>) -> bool {
        self.tx.send(EngineEvent::Shutdown(ack)).is_ok()
    }

    fn send(&self, event: EngineEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("engine stopped; dropping platform signal");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// Routing-mode change listener.
    PushMode,
    /// Native call observer.
    PushCallObserver,
    /// Audio-focus arbitration plus mode sampling.
    Poll,
}

pub trait SignalSource: Send {
    fn kind(&self) -> SignalKind;

    /// Subscribe to the platform.
    ///
    /// Returns a focus state the engine must reconcile, when starting produced
    /// one.
    fn start(&mut self, sink: &SignalSink) -> Option<FocusState>;

    /// Release every platform resource held. Safe to call repeatedly.
    fn stop(&mut self);

    fn restart(&mut self, sink: &SignalSink) -> Option<FocusState> {
        self.stop();
        self.start(sink)
    }

    fn sample_mode(&self) -> Result<AudioMode, PlatformError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushChannel {
    ModeObserver,
    CallObserver,
}

pub struct PushSignal {
    platform: PlatformRef,
    channel: PushChannel,
    listener: Option<ListenerId>,
}

impl PushSignal {
    pub fn new(platform: PlatformRef, channel: PushChannel) -> Self {
        Self {
            platform,
            channel,
            listener: None,
        }
    }
}

impl SignalSource for PushSignal {
    fn kind(&self) -> SignalKind {
        match self.channel {
            PushChannel::ModeObserver => SignalKind::PushMode,
            PushChannel::CallObserver => SignalKind::PushCallObserver,
        }
    }

    fn start(&mut self, sink: &SignalSink) -> Option<FocusState> {
        if self.listener.is_some() {
            self.stop();
        }

        let registered = match self.channel {
            PushChannel::ModeObserver => self.platform.subscribe_mode_change(sink.mode_callback()),
            PushChannel::CallObserver => self.platform.observe_call_state(sink.call_state_callback()),
        };

        match registered {
            Ok(id) => {
                tracing::debug!(channel = ?self.channel, "push signal subscribed");
                self.listener = Some(id);
                None
            }
            Err(e) => {
                // Without push events the engine falls back to uncertain polling.
                tracing::warn!(channel = ?self.channel, error = %e, "push subscription failed");
                Some(FocusState::Unknown)
            }
        }
    }

    fn stop(&mut self) {
        if let Some(id) = self.listener.take() {
            self.platform.unsubscribe(id);
            tracing::debug!(channel = ?self.channel, "push signal unsubscribed");
        }
    }

    fn sample_mode(&self) -> Result<AudioMode, PlatformError> {
        sample_mode(self.platform.as_ref())
    }
}

pub struct PollSignal {
    platform: PlatformRef,
    request: FocusRequest,
    listener: Option<ListenerId>,
    focus_requested: bool,
}

impl PollSignal {
    pub fn new(platform: PlatformRef, request: FocusRequest) -> Self {
        Self {
            platform,
            request,
            listener: None,
            focus_requested: false,
        }
    }

    fn request_focus(&mut self) -> FocusState {
        match self.platform.request_focus(&self.request) {
            Ok(result) => {
                self.focus_requested = true;
                let focus = focus_from_request(result);
                tracing::debug!(result, %focus, "audio focus requested");
                focus
            }
            Err(e) => {
                tracing::warn!(error = %e, "audio focus request failed");
                FocusState::Unknown
            }
        }
    }
}

impl SignalSource for PollSignal {
    fn kind(&self) -> SignalKind {
        SignalKind::Poll
    }

    fn start(&mut self, sink: &SignalSink) -> Option<FocusState> {
        if self.listener.is_some() || self.focus_requested {
            self.stop();
        }

        let subscribed = match self.platform.subscribe_focus_change(sink.focus_callback()) {
            Ok(id) => {
                self.listener = Some(id);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "focus change subscription failed");
                false
            }
        };

        let focus = self.request_focus();
        if subscribed {
            Some(focus)
        } else {
            // No focus events will arrive, so a grant proves nothing.
            Some(FocusState::Unknown)
        }
    }

    fn stop(&mut self) {
        if self.focus_requested {
            self.focus_requested = false;
            if let Err(e) = self.platform.abandon_focus() {
                tracing::warn!(error = %e, "abandoning audio focus failed");
            }
        }
        if let Some(id) = self.listener.take() {
            self.platform.unsubscribe(id);
            tracing::debug!("focus change listener removed");
        }
    }

    fn sample_mode(&self) -> Result<AudioMode, PlatformError> {
        sample_mode(self.platform.as_ref())
    }
}

/// Choose the signal source for a platform.
///
/// Preference: mode observer, then call observer, then focus polling.
pub fn select_source(platform: PlatformRef, config: &DetectorConfig) -> Box<dyn SignalSource> {
    let capabilities = platform.capabilities();
    let source: Box<dyn SignalSource> = match config.strategy {
        SourceStrategy::Auto if capabilities.mode_change_observer => {
            Box::new(PushSignal::new(platform, PushChannel::ModeObserver))
        }
        SourceStrategy::Auto if capabilities.call_observer => {
            Box::new(PushSignal::new(platform, PushChannel::CallObserver))
        }
        _ => Box::new(PollSignal::new(platform, config.focus_request.clone())),
    };
    tracing::info!(
        kind = ?source.kind(),
        strategy = ?config.strategy,
        ?capabilities,
        "signal source selected"
    );
    source
}
