//! On-demand status snapshot.

use crate::normalize::{is_in_call, mode_from_raw, AudioMode};
use crate::platform::{AudioPlatform, PlatformError, PlatformRef};

/// Sample and normalize the current routing mode.
pub(crate) fn sample_mode(platform: &dyn AudioPlatform) -> Result<AudioMode, PlatformError> {
    platform.sample_current_mode().map(mode_from_raw)
}

/// Re-derives the call status straight from the platform.
///
/// Never touches engine state, polling, or the subscription.
#[derive(Clone)]
pub struct StatusQuery {
    platform: PlatformRef,
}

impl StatusQuery {
    pub fn new(platform: PlatformRef) -> Self {
        Self { platform }
    }

    /// A failed sample reads as `Unknown`.
    pub fn current_mode(&self) -> AudioMode {
        sample_mode(self.platform.as_ref()).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "mode sample failed; reporting unknown");
            AudioMode::Unknown
        })
    }

    pub fn current_status(&self) -> bool {
        is_in_call(self.current_mode())
    }
}
