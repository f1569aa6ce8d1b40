//! Integration tests for the call detector.
//!
//! Every test drives a `SimulatedPlatform` with the Tokio clock paused, so
//! poll intervals advance deterministically.

use calldetect_core::normalize::raw;
use calldetect_core::platform::SimulatedPlatform;
use calldetect_core::{
    bus_callback, new_callback, CallDetector, DetectorConfig, PlatformCapabilities, SignalKind,
    StatusCallback,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

fn recorder() -> (StatusCallback, Arc<Mutex<Vec<bool>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    let callback = new_callback(move |v| seen_clone.lock().unwrap().push(v));
    (callback, seen)
}

fn poll_platform() -> Arc<SimulatedPlatform> {
    Arc::new(SimulatedPlatform::new())
}

fn detector_for(platform: &Arc<SimulatedPlatform>) -> CallDetector {
    CallDetector::new(platform.clone(), DetectorConfig::default())
        .expect("default config is valid")
}

/// Let the engine drain its inbox and run any immediate tick.
async fn settle() {
    sleep(Duration::from_millis(1)).await;
}

// =============================================================================
// Poll Strategy Tests
// =============================================================================

mod poll_strategy {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ringing_gain_polls_until_call_is_answered() {
        let platform = poll_platform();
        let detector = detector_for(&platform);
        let (callback, seen) = recorder();
        detector.start(callback).await.unwrap();

        platform.set_mode(raw::MODE_RINGTONE);
        platform.emit_focus_change(raw::AUDIOFOCUS_GAIN_TRANSIENT);
        settle().await;
        let before = platform.counters().samples;

        // Still ringing: one sample per second, nothing delivered.
        sleep(Duration::from_millis(2500)).await;
        assert_eq!(platform.counters().samples - before, 2);
        assert_eq!(*seen.lock().unwrap(), vec![false]);

        platform.set_mode(raw::MODE_IN_CALL);
        sleep(Duration::from_millis(1000)).await;
        assert_eq!(*seen.lock().unwrap(), vec![false, true]);

        // The resolving sample silenced the session.
        let resolved = platform.counters().samples;
        sleep(Duration::from_secs(30)).await;
        assert_eq!(platform.counters().samples, resolved);
        assert_eq!(*seen.lock().unwrap(), vec![false, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_poll_is_bounded() {
        let platform = poll_platform();
        let detector = detector_for(&platform);
        let (callback, seen) = recorder();
        detector.start(callback).await.unwrap();
        let before = platform.counters().samples;

        sleep(Duration::from_secs(10)).await;

        assert_eq!(platform.counters().samples - before, 7);
        assert_eq!(*seen.lock().unwrap(), vec![false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_confirm_poll() {
        let platform = poll_platform();
        let config = DetectorConfig::default()
            .with_overrides(|var| match var {
                "CALLDETECT_CONFIRM_INTERVAL_MS" => Some("100".to_string()),
                "CALLDETECT_CONFIRM_MAX_ATTEMPTS" => Some("3".to_string()),
                _ => None,
            })
            .unwrap();
        let detector = CallDetector::new(platform.clone(), config).unwrap();
        detector.start(new_callback(|_| {})).await.unwrap();
        let before = platform.counters().samples;

        sleep(Duration::from_millis(150)).await;
        assert_eq!(platform.counters().samples - before, 2);
        sleep(Duration::from_secs(5)).await;
        assert_eq!(platform.counters().samples - before, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loss_restarts_with_single_subscription() {
        let platform = poll_platform();
        let detector = detector_for(&platform);
        let (callback, seen) = recorder();
        detector.start(callback).await.unwrap();

        platform.emit_focus_change(raw::AUDIOFOCUS_LOSS);
        settle().await;

        assert_eq!(platform.active_listeners(), 1);
        let counters = platform.counters();
        assert_eq!(counters.subscribes, 2);
        assert_eq!(counters.unsubscribes, 1);
        assert_eq!(counters.focus_requests, 2);
        assert_eq!(counters.focus_abandons, 1);
        assert!(platform.holds_focus());
        assert!(!detector.current_status());

        // The re-acquired focus confirms the call the engine then observes.
        platform.set_mode(raw::MODE_IN_CALL);
        sleep(Duration::from_millis(600)).await;
        assert_eq!(*seen.lock().unwrap(), vec![false, true]);
        assert!(detector.current_status());
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_losses_restart_once() {
        let platform = poll_platform();
        let detector = detector_for(&platform);
        detector.start(new_callback(|_| {})).await.unwrap();

        platform.emit_focus_change(raw::AUDIOFOCUS_LOSS);
        platform.emit_focus_change(raw::AUDIOFOCUS_LOSS);
        settle().await;

        let counters = platform.counters();
        assert_eq!(counters.focus_requests, 2);
        assert_eq!(counters.focus_abandons, 1);
        assert_eq!(platform.active_listeners(), 1);

        // The new listener's events are still honoured.
        platform.emit_focus_change(raw::AUDIOFOCUS_LOSS);
        settle().await;
        assert_eq!(platform.counters().focus_requests, 3);
        assert_eq!(platform.active_listeners(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_focus_burst_leaves_one_session() {
        let platform = poll_platform();
        let detector = detector_for(&platform);
        let (callback, seen) = recorder();
        detector.start(callback).await.unwrap();

        for value in [
            raw::AUDIOFOCUS_LOSS_TRANSIENT,
            raw::AUDIOFOCUS_GAIN,
            99,
            raw::AUDIOFOCUS_LOSS_TRANSIENT_CAN_DUCK,
            raw::AUDIOFOCUS_LOSS_TRANSIENT,
        ] {
            platform.emit_focus_change(value);
        }
        settle().await;
        let before = platform.counters().samples;

        // Only the last (uncertain, 1000 ms) session ticks.
        sleep(Duration::from_secs(10)).await;
        assert_eq!(platform.counters().samples - before, 10);
        assert_eq!(*seen.lock().unwrap(), vec![false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_denied_focus_polls_without_bound() {
        let platform = poll_platform();
        platform.set_request_result(raw::AUDIOFOCUS_REQUEST_FAILED);
        let detector = detector_for(&platform);
        let (callback, seen) = recorder();
        detector.start(callback).await.unwrap();
        settle().await;
        let before = platform.counters().samples;

        sleep(Duration::from_secs(60)).await;
        assert_eq!(platform.counters().samples - before, 60);

        // Unknown focus keeps polling through a change.
        platform.set_mode(raw::MODE_IN_COMMUNICATION);
        sleep(Duration::from_secs(1)).await;
        platform.set_mode(raw::MODE_NORMAL);
        sleep(Duration::from_secs(1)).await;
        assert_eq!(*seen.lock().unwrap(), vec![false, true, false]);
        assert_eq!(platform.counters().samples - before, 62);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampling_failure_keeps_status() {
        let platform = poll_platform();
        platform.set_mode(raw::MODE_IN_CALL);
        let detector = detector_for(&platform);
        let (callback, seen) = recorder();
        detector.start(callback).await.unwrap();

        platform.fail_sampling(Some(calldetect_core::PlatformError::Unavailable(
            "media server died".into(),
        )));
        sleep(Duration::from_secs(5)).await;
        assert_eq!(*seen.lock().unwrap(), vec![true]);
        assert!(!detector.current_status());

        platform.fail_sampling(None);
        platform.set_mode(raw::MODE_NORMAL);
        sleep(Duration::from_secs(2)).await;
        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
    }
}

// =============================================================================
// Push Strategy Tests
// =============================================================================

mod push_strategy {
    use super::*;

    fn push_platform(mode_change_observer: bool, call_observer: bool) -> Arc<SimulatedPlatform> {
        Arc::new(SimulatedPlatform::with_capabilities(PlatformCapabilities {
            mode_change_observer,
            call_observer,
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_observer_emits_only_edges() {
        let platform = push_platform(true, true);
        let detector = detector_for(&platform);
        let (callback, seen) = recorder();
        detector.start(callback).await.unwrap();
        assert_eq!(detector.signal_kind().await, Some(SignalKind::PushMode));

        for mode in [
            raw::MODE_RINGTONE,
            raw::MODE_IN_CALL,
            raw::MODE_IN_CALL,
            raw::MODE_IN_COMMUNICATION,
            raw::MODE_NORMAL,
            raw::MODE_CALL_SCREENING,
        ] {
            platform.emit_mode_change(mode);
        }
        settle().await;

        assert_eq!(*seen.lock().unwrap(), vec![false, true, false]);
        assert_eq!(platform.counters().focus_requests, 0);

        // No polling on the push path.
        let samples = platform.counters().samples;
        sleep(Duration::from_secs(30)).await;
        assert_eq!(platform.counters().samples, samples);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_observer_samples_on_each_callback() {
        let platform = push_platform(false, true);
        let detector = detector_for(&platform);
        let (callback, seen) = recorder();
        detector.start(callback).await.unwrap();
        assert_eq!(detector.signal_kind().await, Some(SignalKind::PushCallObserver));

        platform.emit_call_state_change(raw::MODE_IN_CALL);
        settle().await;
        platform.emit_call_state_change(raw::MODE_IN_CALL);
        settle().await;
        platform.emit_call_state_change(raw::MODE_NORMAL);
        settle().await;

        assert_eq!(*seen.lock().unwrap(), vec![false, true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_observer_recovers_from_sampling_failure() {
        let platform = push_platform(false, true);
        let detector = detector_for(&platform);
        let (callback, seen) = recorder();
        detector.start(callback).await.unwrap();

        platform.fail_sampling(Some(calldetect_core::PlatformError::Unavailable(
            "telephony service died".into(),
        )));
        platform.emit_call_state_change(raw::MODE_IN_CALL);
        settle().await;

        // Polls while the platform cannot be read.
        let failing = platform.counters().samples;
        sleep(Duration::from_millis(2500)).await;
        assert_eq!(platform.counters().samples - failing, 2);

        platform.fail_sampling(None);
        platform.emit_call_state_change(raw::MODE_IN_CALL);
        settle().await;
        platform.emit_call_state_change(raw::MODE_NORMAL);
        settle().await;
        assert_eq!(*seen.lock().unwrap(), vec![false, true, false]);

        let recovered = platform.counters().samples;
        sleep(Duration::from_secs(3600)).await;
        assert_eq!(platform.counters().samples, recovered);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscription_failure_falls_back_to_polling() {
        let platform = push_platform(true, false);
        platform.fail_subscriptions(Some(calldetect_core::PlatformError::PermissionDenied(
            "mode listener".into(),
        )));
        let detector = detector_for(&platform);
        let (callback, seen) = recorder();
        detector.start(callback).await.unwrap();
        settle().await;

        platform.set_mode(raw::MODE_IN_CALL);
        sleep(Duration::from_secs(1)).await;
        assert_eq!(*seen.lock().unwrap(), vec![false, true]);
    }
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

mod lifecycle {
    use super::*;
    use calldetect_events::{event_names, InMemoryEventBus};

    #[tokio::test(start_paused = true)]
    async fn test_current_status_without_subscription() {
        let platform = poll_platform();
        let detector = detector_for(&platform);

        assert!(!detector.current_status());
        platform.set_mode(raw::MODE_IN_CALL);
        assert!(detector.current_status());

        let counters = platform.counters();
        assert_eq!(counters.subscribes, 0);
        assert_eq!(counters.focus_requests, 0);
        assert!(!detector.is_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_delivers_snapshot() {
        let platform = poll_platform();
        platform.set_mode(raw::MODE_IN_COMMUNICATION);
        let detector = detector_for(&platform);
        let (callback, seen) = recorder();

        detector.start(callback).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![true]);
        assert!(detector.is_running().await);

        // Seeded with the snapshot: confirm ticks sampling the same mode stay quiet.
        sleep(Duration::from_secs(5)).await;
        assert_eq!(*seen.lock().unwrap(), vec![true]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_twice_unsubscribes_once() {
        let platform = poll_platform();
        let detector = detector_for(&platform);
        detector.stop().await;

        let (callback, seen) = recorder();
        detector.start(callback).await.unwrap();
        detector.stop().await;
        detector.stop().await;

        let counters = platform.counters();
        assert_eq!(counters.unsubscribes, 1);
        assert_eq!(counters.focus_abandons, 1);
        assert_eq!(platform.active_listeners(), 0);
        assert!(!platform.holds_focus());
        assert!(!detector.is_running().await);

        platform.emit_focus_change(raw::AUDIOFOCUS_LOSS_TRANSIENT);
        platform.set_mode(raw::MODE_IN_CALL);
        sleep(Duration::from_secs(5)).await;
        assert_eq!(*seen.lock().unwrap(), vec![false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_stop_polls_again() {
        let platform = poll_platform();
        let detector = detector_for(&platform);

        detector.start(new_callback(|_| {})).await.unwrap();
        detector.stop().await;

        let (callback, seen) = recorder();
        detector.start(callback).await.unwrap();
        platform.set_mode(raw::MODE_IN_CALL);
        sleep(Duration::from_millis(600)).await;
        assert_eq!(*seen.lock().unwrap(), vec![false, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_running_replaces_subscriber() {
        let platform = poll_platform();
        let detector = detector_for(&platform);
        let (first, first_seen) = recorder();
        let (second, second_seen) = recorder();

        detector.start(first).await.unwrap();
        detector.start(second).await.unwrap();
        assert_eq!(platform.active_listeners(), 1);
        assert_eq!(platform.counters().focus_abandons, 1);

        platform.set_mode(raw::MODE_IN_CALL);
        sleep(Duration::from_millis(600)).await;
        assert_eq!(*first_seen.lock().unwrap(), vec![false]);
        assert_eq!(*second_seen.lock().unwrap(), vec![false, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bus_callback_publishes_events() {
        let platform = Arc::new(SimulatedPlatform::with_capabilities(PlatformCapabilities {
            mode_change_observer: true,
            call_observer: false,
        }));
        let bus = Arc::new(InMemoryEventBus::new());
        let detector = detector_for(&platform);

        detector.start(bus_callback(bus.clone())).await.unwrap();
        platform.emit_mode_change(raw::MODE_IN_CALL);
        settle().await;

        let events = bus.events_for(event_names::CALL_STATUS_CHANGED);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].payload["initial"], true);
        assert_eq!(events[0].payload["isInCall"], false);
        assert_eq!(events[1].payload["initial"], false);
        assert_eq!(events[1].payload["isInCall"], true);
    }
}
