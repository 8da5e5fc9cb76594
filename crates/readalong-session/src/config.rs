use serde::{Deserialize, Serialize};

/// Per-session tuning. Constructed by the host; nothing here persists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Voice passed through to the generation collaborator.
    pub voice_id: String,
    /// Speech rate multiplier (1.0 is normal).
    pub speed: f32,
    /// Highlight lead time in milliseconds.
    pub lead_ms: u64,
    /// Automatic scroll cadence in words.
    pub scroll_every: usize,
    /// Back-off window after a user-initiated scroll, milliseconds.
    pub scroll_debounce_ms: u64,
    /// Cadence of position updates from the playback controller.
    pub position_update_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            voice_id: "en-default".to_string(),
            speed: 1.0,
            lead_ms: 50,
            scroll_every: 10,
            scroll_debounce_ms: 2000,
            position_update_ms: 250,
        }
    }
}
