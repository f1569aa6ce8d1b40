//! Call-state detection for calldetect.
//!
//! The OS has no single authoritative "in call" signal. This crate reconciles
//! the proxies it does offer (audio-focus arbitration, routing-mode changes,
//! native call observers) into one boolean, delivered as an edge-triggered
//! stream plus an on-demand snapshot.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Domain Layer                             │
//! │  normalize.rs - FocusState / AudioMode tags (pure)          │
//! │  engine.rs    - reconcile() transition table                │
//! │  platform/    - AudioPlatform trait, simulated platform     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Signal Layer                               │
//! │  signal.rs   - PushSignal / PollSignal + source selection   │
//! │  poll.rs     - cancelable poll sessions                     │
//! │  query.rs    - side-effect-free status snapshot             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Application Layer                          │
//! │  engine.rs   - single-task engine owning CallStatus         │
//! │  notifier.rs - subscriber delivery                          │
//! │  detector.rs - CallDetector start/stop/current_status       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use calldetect_core::{new_callback, CallDetector, DetectorConfig, SimulatedPlatform};
//! use std::sync::Arc;
//!
//! let platform = Arc::new(SimulatedPlatform::new());
//! let detector = CallDetector::new(platform, DetectorConfig::from_env()?)?;
//!
//! detector.start(new_callback(|in_call| {
//!     println!("in call: {in_call}");
//! })).await?;
//! ```

mod config;
mod detector;
mod engine;
mod error;
mod notifier;
mod poll;
mod query;
mod signal;

pub mod normalize;
pub mod platform;

pub use config::{
    ConfirmPollConfig, DetectorConfig, SourceStrategy, DEFAULT_CONFIRM_INTERVAL_MS,
    DEFAULT_CONFIRM_MAX_ATTEMPTS, DEFAULT_UNCERTAIN_INTERVAL_MS, ENV_CONFIRM_INTERVAL_MS,
    ENV_CONFIRM_MAX_ATTEMPTS, ENV_STRATEGY, ENV_UNCERTAIN_INTERVAL_MS,
};
pub use detector::CallDetector;
pub use engine::{reconcile, Reconciliation};
pub use error::{ConfigError, DetectError, Result};
pub use normalize::{AudioMode, FocusState};
pub use notifier::{bus_callback, new_callback, ChangeNotifier, StatusCallback};
pub use platform::{
    AudioPlatform, FocusRequest, NullPlatform, PlatformCapabilities, PlatformError, PlatformRef,
    SimCounters, SimulatedPlatform,
};
pub use poll::{PollHandle, PollKind, PollSession, PollSlot};
pub use query::StatusQuery;
pub use signal::{select_source, PollSignal, PushChannel, PushSignal, SignalKind, SignalSink, SignalSource};

// Re-export the event contract consumers need alongside the detector
pub use calldetect_events::{CallStatusChangedEvent, EventBus, EventBusRef};
