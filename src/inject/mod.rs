//! Text injection — clipboard-paste delivery into the focused window.
//!
//! Typing a transcript key-by-key is fragile (layouts, IMEs, combining
//! characters), so delivery goes through the clipboard instead:
//!
//! 1. **Save** the current clipboard plain-text content.
//! 2. **Set** the transcript into the clipboard.
//! 3. **Simulate** ⌘V / Ctrl+V into the focused window.
//! 4. **Restore** the original clipboard content (best-effort).
//!
//! Injection failures are never fatal to the pipeline — the only
//! user-visible effect is that no text appears.

use arboard::Clipboard;
use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use thiserror::Error;

// ---------------------------------------------------------------------------
// InjectError
// ---------------------------------------------------------------------------

/// Errors that can surface during text injection.
#[derive(Debug, Error)]
pub enum InjectError {
    /// Could not open or read the system clipboard.
    #[error("cannot access clipboard: {0}")]
    ClipboardAccess(String),

    /// Could not write text to the system clipboard.
    #[error("cannot set clipboard text: {0}")]
    ClipboardSet(String),

    /// Could not simulate a key press/release event.
    #[error("cannot simulate key press: {0}")]
    KeySimulation(String),
}

// ---------------------------------------------------------------------------
// TextSink
// ---------------------------------------------------------------------------

/// Consumer of a successful transcription.
///
/// The production implementation is [`TextInjector`]; tests substitute a
/// recording mock so no real clipboard or key events are involved.
pub trait TextSink: Send + Sync {
    /// Deliver `text` to the user's focused application.
    fn deliver(&self, text: &str) -> Result<(), InjectError>;
}

// ---------------------------------------------------------------------------
// TextInjector
// ---------------------------------------------------------------------------

/// Clipboard-paste injector with configurable inter-step delays.
///
/// The delays give the clipboard manager time to flush before the paste
/// and the target app time to finish pasting before the original content
/// is restored.  Defaults suit typical desktop apps; slow systems may
/// need larger values via `InjectConfig`.
#[derive(Debug, Clone)]
pub struct TextInjector {
    /// Milliseconds between setting the clipboard and simulating paste.
    pub flush_delay_ms: u64,
    /// Milliseconds between simulating paste and restoring the clipboard.
    pub settle_delay_ms: u64,
}

impl Default for TextInjector {
    fn default() -> Self {
        Self {
            flush_delay_ms: 50,
            settle_delay_ms: 100,
        }
    }
}

impl TextInjector {
    /// Create an injector with explicit delays.
    pub fn new(flush_delay_ms: u64, settle_delay_ms: u64) -> Self {
        Self {
            flush_delay_ms,
            settle_delay_ms,
        }
    }

    /// Run the full save → set → paste → restore sequence.
    ///
    /// # Errors
    ///
    /// Returns the first [`InjectError`] from the save/set/paste steps.
    /// The final restore is always attempted and its result discarded.
    pub fn inject(&self, text: &str) -> Result<(), InjectError> {
        let saved = save_clipboard()?;

        set_clipboard(text)?;
        std::thread::sleep(std::time::Duration::from_millis(self.flush_delay_ms));

        simulate_paste()?;
        std::thread::sleep(std::time::Duration::from_millis(self.settle_delay_ms));

        let _ = restore_clipboard(saved);
        Ok(())
    }
}

impl TextSink for TextInjector {
    fn deliver(&self, text: &str) -> Result<(), InjectError> {
        self.inject(text)
    }
}

// ---------------------------------------------------------------------------
// Clipboard helpers (arboard)
// ---------------------------------------------------------------------------

// A short-lived `arboard::Clipboard` handle is created per call rather
// than shared, because the handle is not `Send` on all platforms and is
// cheap to construct.

/// Capture the current clipboard plain-text content.
///
/// Returns `Ok(None)` when the clipboard is empty or holds non-text data
/// (e.g. an image) — that is not an error.
pub fn save_clipboard() -> Result<Option<String>, InjectError> {
    let mut clipboard = open_clipboard()?;
    Ok(clipboard.get_text().ok())
}

/// Write `text` into the system clipboard, replacing whatever was there.
pub fn set_clipboard(text: &str) -> Result<(), InjectError> {
    let mut clipboard = open_clipboard()?;
    clipboard
        .set_text(text)
        .map_err(|e| InjectError::ClipboardSet(e.to_string()))
}

/// Restore a previously saved clipboard value; `None` means nothing was
/// saved and the clipboard is left untouched.
pub fn restore_clipboard(saved: Option<String>) -> Result<(), InjectError> {
    match saved {
        Some(text) => set_clipboard(&text),
        None => Ok(()),
    }
}

fn open_clipboard() -> Result<Clipboard, InjectError> {
    Clipboard::new().map_err(|e| InjectError::ClipboardAccess(e.to_string()))
}

// ---------------------------------------------------------------------------
// Paste simulation (enigo)
// ---------------------------------------------------------------------------

/// Simulate the system paste shortcut in the currently focused window:
/// ⌘V on macOS, Ctrl+V elsewhere.
///
/// A new [`Enigo`] instance is created per call because `Enigo` is not
/// `Send` and the handle is cheap to construct.
pub fn simulate_paste() -> Result<(), InjectError> {
    let mut enigo =
        Enigo::new(&Settings::default()).map_err(|e| InjectError::KeySimulation(e.to_string()))?;

    #[cfg(target_os = "macos")]
    let modifier = Key::Meta;
    #[cfg(not(target_os = "macos"))]
    let modifier = Key::Control;

    enigo
        .key(modifier, Direction::Press)
        .map_err(|e| InjectError::KeySimulation(e.to_string()))?;
    enigo
        .key(Key::Unicode('v'), Direction::Click)
        .map_err(|e| InjectError::KeySimulation(e.to_string()))?;
    enigo
        .key(modifier, Direction::Release)
        .map_err(|e| InjectError::KeySimulation(e.to_string()))?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
