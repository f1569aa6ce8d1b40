//! Platform collaborator interface.
//!
//! Each platform binding supplies one `AudioPlatform`. The engine only ever
//! talks to the OS through this trait, so everything above it stays pure and
//! testable.

mod simulated;

pub use simulated::{SimCounters, SimulatedPlatform};

use crate::normalize::{raw, FocusState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Callback receiving a raw focus or mode value.
pub type RawSignalCallback = Arc<dyn Fn(i32) + Send + Sync + 'static>;

/// Callback fired when the native call observer reports any call change.
pub type CallStateCallback = Arc<dyn Fn() + Send + Sync + 'static>;

/// Shared platform reference.
pub type PlatformRef = Arc<dyn AudioPlatform>;

/// Registration handle returned by the subscribe operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub u64);

/// Signals the platform can push without polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlatformCapabilities {
    /// Routing-mode change listener (Android 12+).
    pub mode_change_observer: bool,
    /// Native call observer (CallKit style).
    pub call_observer: bool,
}

impl PlatformCapabilities {
    pub fn poll_only() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioUsage {
    VoiceCommunication,
    Media,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Speech,
    Music,
}

/// Attributes of the focus request issued when the poll source starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusRequest {
    pub gain: FocusState,
    pub usage: AudioUsage,
    pub content_type: ContentType,
    pub accepts_delayed_gain: bool,
}

impl Default for FocusRequest {
    fn default() -> Self {
        Self {
            gain: FocusState::GainTransientMayDuck,
            usage: AudioUsage::VoiceCommunication,
            content_type: ContentType::Speech,
            accepts_delayed_gain: true,
        }
    }
}

/// Failures reported by a platform binding.
///
/// None of these are fatal to the engine; they are logged and read as
/// `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    #[error("operation not supported on this platform: {0}")]
    Unsupported(&'static str),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("audio service unavailable: {0}")]
    Unavailable(String),
}

/// Operations consumed from the OS audio stack.
pub trait AudioPlatform: Send + Sync {
    /// Which push signals exist. Queried once, when the source is selected.
    fn capabilities(&self) -> PlatformCapabilities;

    /// Synchronous read of the current routing mode (raw value).
    fn sample_current_mode(&self) -> Result<i32, PlatformError>;

    /// Request audio focus; returns the raw request result code.
    fn request_focus(&self, request: &FocusRequest) -> Result<i32, PlatformError>;

    /// Release any focus request held by this process.
    fn abandon_focus(&self) -> Result<(), PlatformError>;

    fn subscribe_focus_change(&self, callback: RawSignalCallback) -> Result<ListenerId, PlatformError>;

    fn subscribe_mode_change(&self, _callback: RawSignalCallback) -> Result<ListenerId, PlatformError> {
        Err(PlatformError::Unsupported("mode change observer"))
    }

    fn observe_call_state(&self, _callback: CallStateCallback) -> Result<ListenerId, PlatformError> {
        Err(PlatformError::Unsupported("call observer"))
    }

    /// Remove a registration made by any subscribe operation.
    fn unsubscribe(&self, id: ListenerId);
}

/// Null implementation for unsupported platforms.
///
/// Always reports a normal routing mode and grants focus.
pub struct NullPlatform;

impl AudioPlatform for NullPlatform {
    fn capabilities(&self) -> PlatformCapabilities {
        PlatformCapabilities::poll_only()
    }

    fn sample_current_mode(&self) -> Result<i32, PlatformError> {
        Ok(raw::MODE_NORMAL)
    }

    fn request_focus(&self, _request: &FocusRequest) -> Result<i32, PlatformError> {
        Ok(raw::AUDIOFOCUS_REQUEST_GRANTED)
    }

    fn abandon_focus(&self) -> Result<(), PlatformError> {
        Ok(())
    }

    fn subscribe_focus_change(&self, _callback: RawSignalCallback) -> Result<ListenerId, PlatformError> {
        Ok(ListenerId(0))
    }

    fn unsubscribe(&self, _id: ListenerId) {}
}
