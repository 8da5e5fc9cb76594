//! Foundation crate tests
//!
//! Tests cover:
//! - PlaybackState transition validation and broadcast
//! - Error taxonomy (codes, subsystem tags, recoverability)
//! - ManualClock determinism

use readalong_foundation::error::{AudioError, ReadalongError, SessionError};
use readalong_foundation::{ManualClock, PlaybackClock, PlaybackState, StateTracker};

// ─── StateTracker ───────────────────────────────────────────────────

#[test]
fn tracker_starts_stopped() {
    let tracker = StateTracker::new();
    assert_eq!(tracker.current(), PlaybackState::Stopped);
}

#[test]
fn full_session_lifecycle_is_valid() {
    let tracker = StateTracker::new();
    tracker.transition(PlaybackState::Loading).unwrap();
    tracker.transition(PlaybackState::Playing).unwrap();
    tracker.transition(PlaybackState::Paused).unwrap();
    tracker.transition(PlaybackState::Playing).unwrap();
    tracker.transition(PlaybackState::Stopped).unwrap();
    assert_eq!(tracker.current(), PlaybackState::Stopped);
}

#[test]
fn stop_is_reachable_from_every_non_stopped_state() {
    for intermediate in [
        PlaybackState::Loading,
        PlaybackState::Playing,
        PlaybackState::Paused,
    ] {
        let tracker = StateTracker::new();
        tracker.transition(PlaybackState::Loading).unwrap();
        if intermediate != PlaybackState::Loading {
            tracker.transition(PlaybackState::Playing).unwrap();
        }
        if intermediate == PlaybackState::Paused {
            tracker.transition(PlaybackState::Paused).unwrap();
        }
        tracker.transition(PlaybackState::Stopped).unwrap();
        assert_eq!(tracker.current(), PlaybackState::Stopped);
    }
}

#[test]
fn stopped_to_playing_is_rejected() {
    let tracker = StateTracker::new();
    let err = tracker.transition(PlaybackState::Playing).unwrap_err();
    assert!(matches!(err, SessionError::InvalidTransition { .. }));
    assert_eq!(tracker.current(), PlaybackState::Stopped);
}

#[test]
fn loading_to_paused_is_rejected() {
    let tracker = StateTracker::new();
    tracker.transition(PlaybackState::Loading).unwrap();
    assert!(tracker.transition(PlaybackState::Paused).is_err());
}

#[test]
fn subscribers_observe_transitions_in_order() {
    let tracker = StateTracker::new();
    let rx = tracker.subscribe();
    tracker.transition(PlaybackState::Loading).unwrap();
    tracker.transition(PlaybackState::Playing).unwrap();
    assert_eq!(rx.recv().unwrap(), PlaybackState::Loading);
    assert_eq!(rx.recv().unwrap(), PlaybackState::Playing);
}

// ─── Error taxonomy ─────────────────────────────────────────────────

#[test]
fn device_unavailable_is_recoverable() {
    let err: ReadalongError = AudioError::DeviceUnavailable {
        reason: "host deferred unlock".into(),
    }
    .into();
    assert_eq!(err.code(), "device_unavailable");
    assert_eq!(err.subsystem(), "audio");
    assert!(err.is_recoverable());
}

#[test]
fn model_unavailable_is_terminal() {
    let err: ReadalongError = SessionError::ModelUnavailable {
        message: "all backends exhausted".into(),
    }
    .into();
    assert_eq!(err.code(), "model_unavailable");
    assert_eq!(err.subsystem(), "generation");
    assert!(!err.is_recoverable());
}

#[test]
fn extraction_failure_is_terminal() {
    let err: ReadalongError = SessionError::ExtractionFailed {
        message: "document not readable".into(),
    }
    .into();
    assert_eq!(err.subsystem(), "extraction");
    assert!(!err.is_recoverable());
}

#[test]
fn context_lost_is_recoverable() {
    let err: ReadalongError = SessionError::ContextLost {
        collaborator: "generator".into(),
    }
    .into();
    assert_eq!(err.code(), "context_lost");
    assert!(err.is_recoverable());
}

#[test]
fn timing_mismatch_carries_counts() {
    let err = SessionError::TimingMismatch {
        groups: 3,
        words: 5,
    };
    let msg = format!("{}", err);
    assert!(msg.contains('3'));
    assert!(msg.contains('5'));
    assert!(ReadalongError::from(err).is_recoverable());
}

// ─── ManualClock ────────────────────────────────────────────────────

#[test]
fn manual_clock_starts_at_zero() {
    let clock = ManualClock::new();
    assert_eq!(clock.position_ms(), 0);
}

#[test]
fn manual_clock_advance_accumulates() {
    let clock = ManualClock::new();
    clock.advance(100);
    clock.advance(250);
    assert_eq!(clock.position_ms(), 350);
    clock.set(40);
    assert_eq!(clock.position_ms(), 40);
}
