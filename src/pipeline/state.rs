//! Recording lifecycle states.
//!
//! [`RecorderState`] is the single source of truth for where the
//! push-to-talk lifecycle stands.  Exactly one instance exists, owned by
//! the orchestrator, and every transition happens on its coordination
//! task in response to a key edge or the debounce timer.

// ---------------------------------------------------------------------------
// RecorderState
// ---------------------------------------------------------------------------

/// States of the push-to-talk recording lifecycle.
///
/// ```text
/// Idle ──press──▶ Arming ──timer fires, key held──▶ Recording
///                  │  │
///                  │  └─timer fires, key released─▶ Idle
///                  └────release before timer──────▶ Idle
/// Recording ──release──▶ Idle   (capture ends, handoff begins)
/// ```
///
/// `Recording` is only ever entered from `Arming`; the window between
/// press and timer expiry is what filters out the sub-50 ms key flickers
/// the physical Fn key produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderState {
    /// Waiting for the push-to-talk key.
    #[default]
    Idle,

    /// Key is down; the debounce timer is running.  No audio is captured
    /// yet.
    Arming,

    /// The tap is installed and audio is accumulating.
    Recording,
}

impl RecorderState {
    /// Returns `true` while the key is being held (debouncing or
    /// recording).
    pub fn is_engaged(&self) -> bool {
        matches!(self, RecorderState::Arming | RecorderState::Recording)
    }

    /// A short human-readable label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            RecorderState::Idle => "idle",
            RecorderState::Arming => "arming",
            RecorderState::Recording => "recording",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
