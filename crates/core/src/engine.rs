//! Call-state reconciliation engine.
//!
//! One engine runs per active subscription, as a single Tokio task that owns
//! all mutable state: the held call status, the last focus/mode pair and the
//! poll slot. Platform callbacks only enqueue raw values, so bursts of
//! notifications are handled strictly one at a time and nothing here needs a
//! lock.

use crate::config::DetectorConfig;
use crate::normalize::{
    focus_from_raw, is_gain, is_in_call, is_loss, is_loss_transient, is_ringing_or_normal,
    is_unknown, mode_from_raw, AudioMode, FocusState,
};
use crate::notifier::ChangeNotifier;
use crate::poll::{PollKind, PollSlot};
use crate::signal::{SignalSink, SignalSource};
use tokio::sync::{mpsc, oneshot};

pub(crate) enum EngineEvent {
    /// Raw focus value plus the listener generation it came from.
    FocusChanged { raw: i32, generation: u64 },
    ModeChanged(i32),
    CallStateChanged,
    Shutdown(oneshot::Sender<()>),
}

/// Response to a focus notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Poll without a bound until a resolving sample arrives.
    Uncertain,
    /// Re-acquire focus from scratch.
    Restart,
    /// Short bounded poll to confirm a stable state.
    Confirm,
}

/// Pure transition table for the poll strategy.
///
/// A transient loss while the route is ringing or normal means a call is being
/// set up. A gain while ringing is an unanswered incoming call. Both stay
/// uncertain until sampling says otherwise, as does an unknown focus.
pub fn reconcile(focus: FocusState, mode: AudioMode) -> Reconciliation {
    if is_unknown(focus)
        || (is_loss_transient(focus) && is_ringing_or_normal(mode))
        || (is_gain(focus) && mode == AudioMode::Ringing)
    {
        Reconciliation::Uncertain
    } else if is_loss(focus) {
        Reconciliation::Restart
    } else {
        Reconciliation::Confirm
    }
}

pub(crate) struct Engine {
    source: Box<dyn SignalSource>,
    sink: SignalSink,
    inbox: mpsc::UnboundedReceiver<EngineEvent>,
    config: DetectorConfig,
    notifier: ChangeNotifier,
    status: bool,
    focus: FocusState,
    mode: AudioMode,
    poll: PollSlot,
}

impl Engine {
    /// `status` seeds the held call status, normally with the snapshot the
    /// subscriber has just received.
    pub(crate) fn new(
        source: Box<dyn SignalSource>,
        config: DetectorConfig,
        notifier: ChangeNotifier,
        status: bool,
    ) -> Self {
        let (tx, inbox) = mpsc::unbounded_channel();
        Self {
            source,
            sink: SignalSink::new(tx),
            inbox,
            config,
            notifier,
            status,
            focus: FocusState::Unknown,
            mode: AudioMode::Unknown,
            poll: PollSlot::default(),
        }
    }

    pub(crate) fn sink(&self) -> SignalSink {
        self.sink.clone()
    }

    /// Start the signal source and reconcile whatever it reported.
    ///
    /// Must run inside a Tokio runtime.
    pub(crate) fn boot(&mut self) {
        if let Some(focus) = self.source.start(&self.sink) {
            self.reconcile_focus(focus);
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                event = self.inbox.recv() => match event {
                    Some(EngineEvent::Shutdown(ack)) => {
                        self.shutdown();
                        let _ = ack.send(());
                        break;
                    }
                    Some(event) => self.handle(event),
                    None => {
                        self.shutdown();
                        break;
                    }
                },
                session = self.poll.next_tick() => self.on_tick(session),
            }
        }
        tracing::debug!("engine stopped");
    }

    pub(crate) fn handle(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::FocusChanged { raw, generation } => {
                if generation != self.sink.generation() {
                    tracing::debug!(raw, generation, "dropping focus change from a retired listener");
                    return;
                }
                self.reconcile_focus(focus_from_raw(raw));
            }
            EngineEvent::ModeChanged(raw) => {
                let mode = mode_from_raw(raw);
                tracing::debug!(raw, %mode, "mode changed");
                self.mode = mode;
                self.end_recovery();
                self.publish(is_in_call(mode));
            }
            EngineEvent::CallStateChanged => match self.sample() {
                Some(mode) => {
                    tracing::debug!(%mode, "call observer fired");
                    self.end_recovery();
                    self.publish(is_in_call(mode));
                }
                None => self.start_recovery(),
            },
            EngineEvent::Shutdown(ack) => {
                self.shutdown();
                let _ = ack.send(());
            }
        }
    }

    /// Pair a focus state with a fresh mode sample, then act on it.
    fn reconcile_focus(&mut self, focus: FocusState) {
        match self.sample() {
            Some(_) => self.apply_focus(focus),
            None => self.apply_focus(FocusState::Unknown),
        }
    }

    fn apply_focus(&mut self, focus: FocusState) {
        self.focus = focus;
        let decision = reconcile(focus, self.mode);
        tracing::debug!(%focus, mode = %self.mode, ?decision, "focus changed");
        match decision {
            Reconciliation::Uncertain => {
                self.poll
                    .start(PollKind::Uncertain, self.config.uncertain_interval(), None);
            }
            Reconciliation::Confirm => {
                self.poll.start(
                    PollKind::Confirm,
                    self.config.confirm_interval(),
                    Some(self.config.confirm_poll.max_attempts),
                );
            }
            Reconciliation::Restart => self.restart_source(),
        }
    }

    /// Poll a push source whose sample just failed, until sampling works.
    ///
    /// Leaves any running session alone: that is either a recovery poll
    /// already or the fallback poll of a failed subscription.
    fn start_recovery(&mut self) {
        if self.poll.is_idle() {
            self.poll
                .start(PollKind::Recovery, self.config.uncertain_interval(), None);
        }
    }

    /// A push signal that sampled fine makes the recovery poll redundant.
    fn end_recovery(&mut self) {
        if self.poll.current().is_some_and(|s| s.kind() == PollKind::Recovery) {
            tracing::debug!("push signal delivered; ending recovery poll");
            self.poll.cancel();
        }
    }

    /// Recover from another process taking focus for good.
    fn restart_source(&mut self) {
        self.poll.cancel();
        // Focus events the old listener already queued are stale from here on.
        let generation = self.sink.retire_listeners();
        tracing::info!(generation, "audio focus lost; restarting signal source");
        if let Some(focus) = self.source.restart(&self.sink) {
            // Acquisition only yields Gain or Unknown, so this cannot loop.
            self.reconcile_focus(focus);
        }
    }

    fn on_tick(&mut self, session_id: u64) {
        let Some(session) = self.poll.current_mut() else {
            return;
        };
        if session.id() != session_id || !session.is_live() {
            return;
        }
        let exhausted = session.record_attempt();
        let attempt = session.attempts();
        let kind = session.kind();

        let Some(mode) = self.sample() else {
            match kind {
                PollKind::Confirm => self.apply_focus(FocusState::Unknown),
                // Only a new focus signal may end this poll now.
                PollKind::Uncertain => self.focus = FocusState::Unknown,
                PollKind::Recovery => {}
            }
            return;
        };

        let changed = self.publish(is_in_call(mode));
        tracing::debug!(session = session_id, attempt, %mode, changed, "poll tick");

        if kind == PollKind::Recovery {
            tracing::debug!(session = session_id, "sampling recovered; ending poll");
            self.poll.cancel();
        } else if changed && !is_unknown(self.focus) {
            tracing::debug!(session = session_id, "call status resolved; ending poll");
            self.poll.cancel();
        } else if exhausted {
            tracing::debug!(session = session_id, attempt, "poll attempts exhausted");
            self.poll.cancel();
        }
    }

    /// Sample the routing mode, remembering it on success.
    fn sample(&mut self) -> Option<AudioMode> {
        match self.source.sample_mode() {
            Ok(mode) => {
                self.mode = mode;
                Some(mode)
            }
            Err(e) => {
                tracing::warn!(error = %e, "mode sample failed; treating focus as unknown");
                self.mode = AudioMode::Unknown;
                None
            }
        }
    }

    /// Compare-and-emit: only a changed value reaches the subscriber.
    fn publish(&mut self, in_call: bool) -> bool {
        if in_call == self.status {
            return false;
        }
        self.status = in_call;
        tracing::info!(in_call, "call status changed");
        self.notifier.notify(in_call);
        true
    }

    fn shutdown(&mut self) {
        self.poll.cancel();
        self.source.stop();
        self.notifier.stop();
    }

    #[cfg(test)]
    pub(crate) fn status(&self) -> bool {
        self.status
    }

    #[cfg(test)]
    pub(crate) fn poll_slot(&self) -> &PollSlot {
        &self.poll
    }

    #[cfg(test)]
    pub(crate) fn focus(&self) -> FocusState {
        self.focus
    }
}
