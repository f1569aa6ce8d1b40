//! Scripted signal timelines for the simulated platform.

use anyhow::Context;
use calldetect_core::normalize::raw;
use calldetect_core::platform::SimulatedPlatform;
use calldetect_core::{CallDetector, PlatformCapabilities, PlatformError};
use calldetect_events::{channels, CurrentStatusResponse};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// One platform-side event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Signal {
    /// Change the routing mode without notifying anyone.
    SetMode { mode: i32 },
    /// Audio-focus change notification.
    Focus { focus: i32 },
    /// Routing-mode change notification.
    Mode { mode: i32 },
    /// Call-observer callback, after switching to `mode`.
    CallState { mode: i32 },
    GrantFocus,
    DenyFocus,
    FailSampling {
        #[serde(default = "default_failure_reason")]
        reason: String,
    },
    RestoreSampling,
    /// Answer a `get_current_status` request the way the host bridge would.
    Query,
}

fn default_failure_reason() -> String {
    "scripted failure".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Step {
    pub at_ms: u64,
    pub signal: Signal,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub capabilities: PlatformCapabilities,
    /// Initial routing mode.
    #[serde(default)]
    pub mode: i32,
    pub steps: Vec<Step>,
    /// How long to keep monitoring after the last step.
    #[serde(default = "default_tail_ms")]
    pub tail_ms: u64,
}

fn default_name() -> String {
    "unnamed".to_string()
}

fn default_tail_ms() -> u64 {
    3000
}

impl Scenario {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("invalid scenario {}", path.display()))
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let mut scenario: Scenario = serde_json::from_str(json)?;
        scenario.steps.sort_by_key(|step| step.at_ms);
        Ok(scenario)
    }

    /// Poll-only device: an incoming call rings, is answered, then hangs up.
    pub fn incoming_call() -> Self {
        let step = |at_ms, signal| Step { at_ms, signal };
        Self {
            name: "incoming call".to_string(),
            capabilities: PlatformCapabilities::poll_only(),
            mode: raw::MODE_NORMAL,
            steps: vec![
                step(500, Signal::SetMode { mode: raw::MODE_RINGTONE }),
                step(500, Signal::Focus { focus: raw::AUDIOFOCUS_LOSS_TRANSIENT }),
                step(4000, Signal::SetMode { mode: raw::MODE_IN_CALL }),
                step(6000, Signal::Query),
                step(9000, Signal::SetMode { mode: raw::MODE_NORMAL }),
                step(9000, Signal::Focus { focus: raw::AUDIOFOCUS_GAIN }),
            ],
            tail_ms: default_tail_ms(),
        }
    }

    pub fn platform(&self) -> SimulatedPlatform {
        let platform = SimulatedPlatform::with_capabilities(self.capabilities);
        platform.set_mode(self.mode);
        platform
    }

    /// Apply every step at its offset from now, then wait out the tail.
    pub async fn play(&self, platform: &SimulatedPlatform, detector: &CallDetector) -> anyhow::Result<()> {
        let started = Instant::now();
        for step in &self.steps {
            sleep_until(started + Duration::from_millis(step.at_ms)).await;
            tracing::debug!(at_ms = step.at_ms, signal = ?step.signal, "applying step");
            apply(platform, detector, &step.signal)?;
        }
        let last = self.steps.last().map_or(0, |step| step.at_ms);
        sleep_until(started + Duration::from_millis(last + self.tail_ms)).await;
        Ok(())
    }
}

/// Reply line for a `get_current_status` method call.
pub fn status_reply(is_in_call: bool) -> anyhow::Result<String> {
    let response = serde_json::to_string(&CurrentStatusResponse { is_in_call })
        .context("failed to encode status response")?;
    Ok(format!("{} -> {}", channels::GET_CURRENT_STATUS, response))
}

fn apply(platform: &SimulatedPlatform, detector: &CallDetector, signal: &Signal) -> anyhow::Result<()> {
    match signal {
        Signal::SetMode { mode } => platform.set_mode(*mode),
        Signal::Focus { focus } => platform.emit_focus_change(*focus),
        Signal::Mode { mode } => platform.emit_mode_change(*mode),
        Signal::CallState { mode } => platform.emit_call_state_change(*mode),
        Signal::GrantFocus => platform.set_request_result(raw::AUDIOFOCUS_REQUEST_GRANTED),
        Signal::DenyFocus => platform.set_request_result(raw::AUDIOFOCUS_REQUEST_FAILED),
        Signal::FailSampling { reason } => {
            platform.fail_sampling(Some(PlatformError::Unavailable(reason.clone())))
        }
        Signal::RestoreSampling => platform.fail_sampling(None),
        Signal::Query => println!("{}", status_reply(detector.current_status())?),
    }
    Ok(())
}
