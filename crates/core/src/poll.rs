//! Cancelable periodic sampling sessions.
//!
//! A session does not own a task. The engine awaits `PollSlot::next_tick`
//! alongside its signal inbox, so every tick runs on the engine's own context.

use std::future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Interval, MissedTickBehavior};

/// Why a session was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollKind {
    /// Bounded poll confirming a stable focus gain.
    Confirm,
    /// Unbounded poll through an ambiguous state.
    Uncertain,
    /// Push source bridging a failed sample; ends on the first good one.
    Recovery,
}

/// Observer view of a session's liveness.
#[derive(Debug, Clone)]
pub struct PollHandle {
    id: u64,
    kind: PollKind,
    live: Arc<AtomicBool>,
}

impl PollHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> PollKind {
        self.kind
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

pub struct PollSession {
    id: u64,
    kind: PollKind,
    period: Duration,
    interval: Interval,
    max_attempts: Option<u32>,
    attempts: u32,
    live: Arc<AtomicBool>,
}

impl PollSession {
    /// The first tick fires immediately, later ones every `period`.
    ///
    /// Must be called from within a Tokio runtime.
    fn new(id: u64, kind: PollKind, period: Duration, max_attempts: Option<u32>) -> Self {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            id,
            kind,
            period,
            interval,
            max_attempts,
            attempts: 0,
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> PollKind {
        self.kind
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    pub fn handle(&self) -> PollHandle {
        PollHandle {
            id: self.id,
            kind: self.kind,
            live: Arc::clone(&self.live),
        }
    }

    fn cancel(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    /// Count a tick. Returns true once the attempt bound is reached.
    pub fn record_attempt(&mut self) -> bool {
        self.attempts = self.attempts.saturating_add(1);
        self.max_attempts.is_some_and(|max| self.attempts >= max)
    }
}

/// Holds at most one live session.
#[derive(Default)]
pub struct PollSlot {
    current: Option<PollSession>,
    next_id: u64,
}

impl PollSlot {
    /// Cancel any running session, then install a new one.
    pub fn start(&mut self, kind: PollKind, period: Duration, max_attempts: Option<u32>) -> PollHandle {
        self.cancel();
        self.next_id += 1;
        let session = PollSession::new(self.next_id, kind, period, max_attempts);
        let handle = session.handle();
        tracing::debug!(
            session = session.id,
            ?kind,
            period_ms = period.as_millis() as u64,
            max_attempts = ?max_attempts,
            "poll session started"
        );
        self.current = Some(session);
        handle
    }

    pub fn cancel(&mut self) {
        if let Some(session) = self.current.take() {
            session.cancel();
            tracing::debug!(session = session.id, attempts = session.attempts, "poll session cancelled");
        }
    }

    pub fn current(&self) -> Option<&PollSession> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut PollSession> {
        self.current.as_mut()
    }

    pub fn is_idle(&self) -> bool {
        self.current.is_none()
    }

    /// Resolves with the session id when the live session is due.
    ///
    /// Pending forever while no live session exists.
    pub async fn next_tick(&mut self) -> u64 {
        match self.current.as_mut() {
            Some(session) if session.is_live() => {
                session.interval.tick().await;
                session.id
            }
            _ => future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_start_cancels_predecessor() {
        let mut slot = PollSlot::default();
        let first = slot.start(PollKind::Confirm, Duration::from_millis(500), Some(7));
        assert!(first.is_live());

        let second = slot.start(PollKind::Uncertain, Duration::from_secs(1), None);
        assert!(!first.is_live());
        assert!(second.is_live());
        assert_ne!(first.id(), second.id());
        assert_eq!(slot.current().map(PollSession::kind), Some(PollKind::Uncertain));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_is_immediate() {
        let mut slot = PollSlot::default();
        let handle = slot.start(PollKind::Confirm, Duration::from_millis(500), Some(7));

        let started = time::Instant::now();
        assert_eq!(slot.next_tick().await, handle.id());
        assert!(started.elapsed() < Duration::from_millis(5));

        assert_eq!(slot.next_tick().await, handle.id());
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert!(started.elapsed() < Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_slot_never_ticks() {
        let mut slot = PollSlot::default();
        let result = time::timeout(Duration::from_secs(60), slot.next_tick()).await;
        assert!(result.is_err());

        let handle = slot.start(PollKind::Uncertain, Duration::from_secs(1), None);
        slot.cancel();
        assert!(!handle.is_live());
        assert!(slot.is_idle());
        let result = time::timeout(Duration::from_secs(60), slot.next_tick()).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_bound() {
        let mut slot = PollSlot::default();
        slot.start(PollKind::Confirm, Duration::from_millis(500), Some(3));
        let session = slot.current_mut().unwrap();
        assert!(!session.record_attempt());
        assert!(!session.record_attempt());
        assert!(session.record_attempt());
        assert_eq!(session.attempts(), 3);

        slot.start(PollKind::Uncertain, Duration::from_secs(1), None);
        let session = slot.current_mut().unwrap();
        for _ in 0..1000 {
            assert!(!session.record_attempt());
        }
    }
}
