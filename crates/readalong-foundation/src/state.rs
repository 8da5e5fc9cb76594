use crate::error::SessionError;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Lifecycle of the single playback session.
///
/// `Stopped` is both the initial and the terminal state; at most one
/// non-stopped session exists at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Stopped,
    Loading,
    Playing,
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PlaybackState::Stopped => "stopped",
            PlaybackState::Loading => "loading",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
        };
        f.write_str(s)
    }
}

pub struct StateTracker {
    state: Arc<RwLock<PlaybackState>>,
    state_tx: Sender<PlaybackState>,
    state_rx: Receiver<PlaybackState>,
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StateTracker {
    pub fn new() -> Self {
        let (state_tx, state_rx) = crossbeam_channel::unbounded();
        Self {
            state: Arc::new(RwLock::new(PlaybackState::Stopped)),
            state_tx,
            state_rx,
        }
    }

    pub fn transition(&self, new_state: PlaybackState) -> Result<(), SessionError> {
        let mut current = self.state.write();

        let valid = matches!(
            (&*current, &new_state),
            (PlaybackState::Stopped, PlaybackState::Loading)
                | (PlaybackState::Loading, PlaybackState::Playing)
                | (PlaybackState::Loading, PlaybackState::Stopped)
                | (PlaybackState::Playing, PlaybackState::Paused)
                | (PlaybackState::Playing, PlaybackState::Stopped)
                | (PlaybackState::Paused, PlaybackState::Playing)
                | (PlaybackState::Paused, PlaybackState::Stopped)
        );

        if !valid {
            return Err(SessionError::InvalidTransition {
                from: current.to_string(),
                to: new_state.to_string(),
            });
        }

        tracing::info!(target: "session", "State transition: {} -> {}", *current, new_state);
        *current = new_state;
        let _ = self.state_tx.send(new_state);
        Ok(())
    }

    pub fn current(&self) -> PlaybackState {
        *self.state.read()
    }

    pub fn subscribe(&self) -> Receiver<PlaybackState> {
        self.state_rx.clone()
    }
}
