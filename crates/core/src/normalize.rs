//! Raw platform values to canonical focus/mode tags.
//!
//! Pure domain logic - no I/O, no platform dependencies. Every mapping is
//! total: anything outside the known value space becomes `Unknown`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw value space shared by every platform binding.
///
/// Values follow Android's `AudioManager` constants. Bindings for other
/// platforms translate their native values into these before delivery.
pub mod raw {
    pub const AUDIOFOCUS_GAIN: i32 = 1;
    pub const AUDIOFOCUS_GAIN_TRANSIENT: i32 = 2;
    pub const AUDIOFOCUS_GAIN_TRANSIENT_MAY_DUCK: i32 = 3;
    pub const AUDIOFOCUS_GAIN_TRANSIENT_EXCLUSIVE: i32 = 4;
    pub const AUDIOFOCUS_LOSS: i32 = -1;
    pub const AUDIOFOCUS_LOSS_TRANSIENT: i32 = -2;
    pub const AUDIOFOCUS_LOSS_TRANSIENT_CAN_DUCK: i32 = -3;

    pub const AUDIOFOCUS_REQUEST_FAILED: i32 = 0;
    pub const AUDIOFOCUS_REQUEST_GRANTED: i32 = 1;
    pub const AUDIOFOCUS_REQUEST_DELAYED: i32 = 2;

    /// Query-only sentinel; never a real routing mode.
    pub const MODE_CURRENT: i32 = -1;
    pub const MODE_NORMAL: i32 = 0;
    pub const MODE_RINGTONE: i32 = 1;
    pub const MODE_IN_CALL: i32 = 2;
    pub const MODE_IN_COMMUNICATION: i32 = 3;
    pub const MODE_CALL_SCREENING: i32 = 4;
    pub const MODE_CALL_REDIRECT: i32 = 5;
    pub const MODE_COMMUNICATION_REDIRECT: i32 = 6;
}

/// Outcome of audio-focus arbitration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FocusState {
    Gain,
    GainTransient,
    GainTransientMayDuck,
    GainTransientExclusive,
    Loss,
    LossTransient,
    LossTransientCanDuck,
    #[default]
    Unknown,
}

/// Current purpose of the audio route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AudioMode {
    Normal,
    Ringing,
    InCall,
    InCommunication,
    CallScreening,
    CallRedirect,
    CommunicationRedirect,
    #[default]
    Unknown,
}

impl FocusState {
    pub const ALL: [FocusState; 8] = [
        FocusState::Gain,
        FocusState::GainTransient,
        FocusState::GainTransientMayDuck,
        FocusState::GainTransientExclusive,
        FocusState::Loss,
        FocusState::LossTransient,
        FocusState::LossTransientCanDuck,
        FocusState::Unknown,
    ];

    /// Platform label, used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            FocusState::Gain => "AUDIOFOCUS_GAIN",
            FocusState::GainTransient => "AUDIOFOCUS_GAIN_TRANSIENT",
            FocusState::GainTransientMayDuck => "AUDIOFOCUS_GAIN_TRANSIENT_MAY_DUCK",
            FocusState::GainTransientExclusive => "AUDIOFOCUS_GAIN_TRANSIENT_EXCLUSIVE",
            FocusState::Loss => "AUDIOFOCUS_LOSS",
            FocusState::LossTransient => "AUDIOFOCUS_LOSS_TRANSIENT",
            FocusState::LossTransientCanDuck => "AUDIOFOCUS_LOSS_TRANSIENT_CAN_DUCK",
            FocusState::Unknown => "UNKNOWN",
        }
    }
}

impl AudioMode {
    pub const ALL: [AudioMode; 8] = [
        AudioMode::Normal,
        AudioMode::Ringing,
        AudioMode::InCall,
        AudioMode::InCommunication,
        AudioMode::CallScreening,
        AudioMode::CallRedirect,
        AudioMode::CommunicationRedirect,
        AudioMode::Unknown,
    ];

    /// Platform label, used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            AudioMode::Normal => "MODE_NORMAL",
            AudioMode::Ringing => "MODE_RINGTONE",
            AudioMode::InCall => "MODE_IN_CALL",
            AudioMode::InCommunication => "MODE_IN_COMMUNICATION",
            AudioMode::CallScreening => "MODE_CALL_SCREENING",
            AudioMode::CallRedirect => "MODE_CALL_REDIRECT",
            AudioMode::CommunicationRedirect => "MODE_COMMUNICATION_REDIRECT",
            AudioMode::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for FocusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for AudioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Map a raw focus-change value.
pub fn focus_from_raw(value: i32) -> FocusState {
    match value {
        raw::AUDIOFOCUS_GAIN => FocusState::Gain,
        raw::AUDIOFOCUS_GAIN_TRANSIENT => FocusState::GainTransient,
        raw::AUDIOFOCUS_GAIN_TRANSIENT_MAY_DUCK => FocusState::GainTransientMayDuck,
        raw::AUDIOFOCUS_GAIN_TRANSIENT_EXCLUSIVE => FocusState::GainTransientExclusive,
        raw::AUDIOFOCUS_LOSS => FocusState::Loss,
        raw::AUDIOFOCUS_LOSS_TRANSIENT => FocusState::LossTransient,
        raw::AUDIOFOCUS_LOSS_TRANSIENT_CAN_DUCK => FocusState::LossTransientCanDuck,
        _ => FocusState::Unknown,
    }
}

/// Map a focus-request result code.
///
/// Only an immediate grant counts as holding focus. A delayed grant is still
/// ambiguous and is treated like a denial.
pub fn focus_from_request(result: i32) -> FocusState {
    match result {
        raw::AUDIOFOCUS_REQUEST_GRANTED => FocusState::Gain,
        _ => FocusState::Unknown,
    }
}

/// Map a raw routing-mode value.
pub fn mode_from_raw(value: i32) -> AudioMode {
    match value {
        raw::MODE_NORMAL => AudioMode::Normal,
        raw::MODE_RINGTONE => AudioMode::Ringing,
        raw::MODE_IN_CALL => AudioMode::InCall,
        raw::MODE_IN_COMMUNICATION => AudioMode::InCommunication,
        raw::MODE_CALL_SCREENING => AudioMode::CallScreening,
        raw::MODE_CALL_REDIRECT => AudioMode::CallRedirect,
        raw::MODE_COMMUNICATION_REDIRECT => AudioMode::CommunicationRedirect,
        _ => AudioMode::Unknown,
    }
}

pub fn is_gain(state: FocusState) -> bool {
    matches!(
        state,
        FocusState::Gain
            | FocusState::GainTransient
            | FocusState::GainTransientMayDuck
            | FocusState::GainTransientExclusive
    )
}

/// Only a plain transient loss; the duckable variant does not count.
pub fn is_loss_transient(state: FocusState) -> bool {
    matches!(state, FocusState::LossTransient)
}

pub fn is_loss(state: FocusState) -> bool {
    matches!(state, FocusState::Loss)
}

pub fn is_unknown(state: FocusState) -> bool {
    matches!(state, FocusState::Unknown)
}

/// Telephony and VoIP both count as a call.
pub fn is_in_call(mode: AudioMode) -> bool {
    matches!(mode, AudioMode::InCall | AudioMode::InCommunication)
}

pub fn is_ringing_or_normal(mode: AudioMode) -> bool {
    matches!(mode, AudioMode::Ringing | AudioMode::Normal)
}
