//! Detector configuration.

use crate::error::ConfigError;
use crate::platform::FocusRequest;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Interval of the bounded poll that confirms a stable focus gain.
pub const DEFAULT_CONFIRM_INTERVAL_MS: u64 = 500;

/// Ticks of the confirming poll before it gives up.
pub const DEFAULT_CONFIRM_MAX_ATTEMPTS: u32 = 7;

/// Interval of the unbounded poll used while the call state is ambiguous.
pub const DEFAULT_UNCERTAIN_INTERVAL_MS: u64 = 1000;

pub const ENV_CONFIRM_INTERVAL_MS: &str = "CALLDETECT_CONFIRM_INTERVAL_MS";
pub const ENV_CONFIRM_MAX_ATTEMPTS: &str = "CALLDETECT_CONFIRM_MAX_ATTEMPTS";
pub const ENV_UNCERTAIN_INTERVAL_MS: &str = "CALLDETECT_UNCERTAIN_INTERVAL_MS";
pub const ENV_STRATEGY: &str = "CALLDETECT_STRATEGY";

/// How the signal source is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStrategy {
    /// Prefer push signals when the platform has them.
    #[default]
    Auto,
    /// Always use focus arbitration plus polling.
    Poll,
}

impl std::str::FromStr for SourceStrategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(SourceStrategy::Auto),
            "poll" => Ok(SourceStrategy::Poll),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmPollConfig {
    pub interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for ConfirmPollConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_CONFIRM_INTERVAL_MS,
            max_attempts: DEFAULT_CONFIRM_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub confirm_poll: ConfirmPollConfig,
    pub uncertain_interval_ms: u64,
    pub strategy: SourceStrategy,
    pub focus_request: FocusRequest,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confirm_poll: ConfirmPollConfig::default(),
            uncertain_interval_ms: DEFAULT_UNCERTAIN_INTERVAL_MS,
            strategy: SourceStrategy::Auto,
            focus_request: FocusRequest::default(),
        }
    }
}

impl DetectorConfig {
    /// Defaults overlaid with `CALLDETECT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from any key/value source.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_CONFIRM_INTERVAL_MS) {
            self.confirm_poll.interval_ms = parse_var(ENV_CONFIRM_INTERVAL_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_CONFIRM_MAX_ATTEMPTS) {
            self.confirm_poll.max_attempts = parse_var(ENV_CONFIRM_MAX_ATTEMPTS, &value)?;
        }
        if let Some(value) = lookup(ENV_UNCERTAIN_INTERVAL_MS) {
            self.uncertain_interval_ms = parse_var(ENV_UNCERTAIN_INTERVAL_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_STRATEGY) {
            self.strategy = value.parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_STRATEGY,
                value: value.clone(),
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.confirm_poll.interval_ms == 0 {
            return Err(ConfigError::Zero {
                field: "confirm_poll.interval_ms",
            });
        }
        if self.confirm_poll.max_attempts == 0 {
            return Err(ConfigError::Zero {
                field: "confirm_poll.max_attempts",
            });
        }
        if self.uncertain_interval_ms == 0 {
            return Err(ConfigError::Zero {
                field: "uncertain_interval_ms",
            });
        }
        Ok(())
    }

    pub fn confirm_interval(&self) -> Duration {
        Duration::from_millis(self.confirm_poll.interval_ms)
    }

    pub fn uncertain_interval(&self) -> Duration {
        Duration::from_millis(self.uncertain_interval_ms)
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
    })
}
