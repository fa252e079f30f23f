//! Global push-to-talk hotkey: raw flag samples → clean edges.
//!
//! The OS delivers a *flag* signal for the push-to-talk key, not clean
//! press/release pairs: modifier keys repeat their press notification
//! while held, and flag-change notifications can arrive with the same
//! value twice.  [`FlagDebouncer`] collapses that stream into exactly one
//! [`KeyEdge::Pressed`] per physical press and one [`KeyEdge::Released`]
//! per physical release.
//!
//! Short-press filtering (rejecting taps under the debounce window) is
//! **not** done here — edges are forwarded immediately and the recording
//! state machine owns the debounce timer.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::{atomic::AtomicBool, Arc};
//! use tokio::sync::mpsc;
//! use dictate::hotkey::{parse_key, HotkeyListener, KeyEdge};
//!
//! let (tx, mut rx) = mpsc::channel::<KeyEdge>(16);
//! let key_held = Arc::new(AtomicBool::new(false));
//! let key = parse_key("Fn").expect("unknown key");
//! let _listener = HotkeyListener::start(key, tx, Arc::clone(&key_held));
//!
//! // In your async loop:
//! // while let Some(edge) = rx.recv().await { ... }
//! ```

pub mod listener;

pub use listener::HotkeyListener;

use std::time::Instant;

// ---------------------------------------------------------------------------
// KeyEdge
// ---------------------------------------------------------------------------

/// Direction of a clean key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// The push-to-talk key went down.
    Pressed,
    /// The push-to-talk key came up.
    Released,
}

/// One debounced key transition with the time it was observed.
#[derive(Debug, Clone, Copy)]
pub struct KeyEdge {
    pub kind: EdgeKind,
    pub at: Instant,
}

impl KeyEdge {
    /// Convenience constructor stamped with the current time.
    pub fn now(kind: EdgeKind) -> Self {
        Self {
            kind,
            at: Instant::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// FlagDebouncer
// ---------------------------------------------------------------------------

/// Collapses a raw boolean flag stream into press/release edges.
///
/// Feed every hardware notification into [`observe`](Self::observe); an
/// edge comes back only when the flag actually changed.  Duplicate
/// notifications (same flag value again) produce nothing, which makes the
/// debouncer safe against the high-frequency repeats modifier keys
/// generate.
#[derive(Debug, Default)]
pub struct FlagDebouncer {
    was_pressed: bool,
}

impl FlagDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe one raw flag sample taken at `at`.
    ///
    /// Returns `Some(KeyEdge)` on a rising or falling edge, `None` when
    /// the flag is unchanged.
    pub fn observe(&mut self, pressed: bool, at: Instant) -> Option<KeyEdge> {
        if pressed == self.was_pressed {
            return None;
        }
        self.was_pressed = pressed;

        let kind = if pressed {
            EdgeKind::Pressed
        } else {
            EdgeKind::Released
        };
        Some(KeyEdge { kind, at })
    }

    /// The flag value seen most recently.
    pub fn is_pressed(&self) -> bool {
        self.was_pressed
    }
}

// ---------------------------------------------------------------------------
// parse_key
// ---------------------------------------------------------------------------

/// Parse a hotkey name from a config string into an [`rdev::Key`].
///
/// Supports the Fn modifier, F1–F12 and a handful of named keys.  Returns
/// `None` for unrecognised names so callers can fall back to the default.
///
/// # Examples
///
/// ```
/// use dictate::hotkey::parse_key;
///
/// assert_eq!(parse_key("Fn"), Some(rdev::Key::Function));
/// assert_eq!(parse_key("F9"), Some(rdev::Key::F9));
/// assert_eq!(parse_key("xyz"), None);
/// ```
pub fn parse_key(key_str: &str) -> Option<rdev::Key> {
    match key_str {
        // The Fn modifier — the default push-to-talk key.
        "Fn" | "Function" => Some(rdev::Key::Function),

        // Function keys
        "F1" => Some(rdev::Key::F1),
        "F2" => Some(rdev::Key::F2),
        "F3" => Some(rdev::Key::F3),
        "F4" => Some(rdev::Key::F4),
        "F5" => Some(rdev::Key::F5),
        "F6" => Some(rdev::Key::F6),
        "F7" => Some(rdev::Key::F7),
        "F8" => Some(rdev::Key::F8),
        "F9" => Some(rdev::Key::F9),
        "F10" => Some(rdev::Key::F10),
        "F11" => Some(rdev::Key::F11),
        "F12" => Some(rdev::Key::F12),

        // Other usable hold-to-talk keys
        "CapsLock" => Some(rdev::Key::CapsLock),
        "ScrollLock" => Some(rdev::Key::ScrollLock),
        "Pause" => Some(rdev::Key::Pause),
        "Insert" => Some(rdev::Key::Insert),
        "Home" => Some(rdev::Key::Home),
        "End" => Some(rdev::Key::End),

        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- FlagDebouncer -----------------------------------------------------

    #[test]
    fn rising_edge_emits_pressed() {
        let mut deb = FlagDebouncer::new();
        let edge = deb.observe(true, Instant::now()).expect("edge");
        assert_eq!(edge.kind, EdgeKind::Pressed);
        assert!(deb.is_pressed());
    }

    #[test]
    fn falling_edge_emits_released() {
        let mut deb = FlagDebouncer::new();
        deb.observe(true, Instant::now());
        let edge = deb.observe(false, Instant::now()).expect("edge");
        assert_eq!(edge.kind, EdgeKind::Released);
        assert!(!deb.is_pressed());
    }

    #[test]
    fn duplicate_flags_are_suppressed() {
        let mut deb = FlagDebouncer::new();
        assert!(deb.observe(true, Instant::now()).is_some());
        // Modifier repeats: same flag value over and over.
        for _ in 0..100 {
            assert!(deb.observe(true, Instant::now()).is_none());
        }
        assert!(deb.observe(false, Instant::now()).is_some());
        assert!(deb.observe(false, Instant::now()).is_none());
    }

    #[test]
    fn initial_released_flag_emits_nothing() {
        let mut deb = FlagDebouncer::new();
        assert!(deb.observe(false, Instant::now()).is_none());
    }

    #[test]
    fn alternating_flags_emit_alternating_edges() {
        let mut deb = FlagDebouncer::new();
        let mut kinds = Vec::new();
        for i in 0..6 {
            if let Some(edge) = deb.observe(i % 2 == 0, Instant::now()) {
                kinds.push(edge.kind);
            }
        }
        assert_eq!(
            kinds,
            vec![
                EdgeKind::Pressed,
                EdgeKind::Released,
                EdgeKind::Pressed,
                EdgeKind::Released,
                EdgeKind::Pressed,
                EdgeKind::Released,
            ]
        );
    }

    #[test]
    fn edge_carries_observation_time() {
        let mut deb = FlagDebouncer::new();
        let at = Instant::now();
        let edge = deb.observe(true, at).expect("edge");
        assert_eq!(edge.at, at);
    }

    // ---- parse_key ---------------------------------------------------------

    #[test]
    fn parse_fn_key() {
        assert_eq!(parse_key("Fn"), Some(rdev::Key::Function));
        assert_eq!(parse_key("Function"), Some(rdev::Key::Function));
    }

    #[test]
    fn parse_function_keys() {
        assert_eq!(parse_key("F1"), Some(rdev::Key::F1));
        assert_eq!(parse_key("F9"), Some(rdev::Key::F9));
        assert_eq!(parse_key("F12"), Some(rdev::Key::F12));
    }

    #[test]
    fn parse_unknown_key_returns_none() {
        assert_eq!(parse_key("xyz"), None);
        assert_eq!(parse_key(""), None);
        assert_eq!(parse_key("Ctrl+V"), None);
    }
}
