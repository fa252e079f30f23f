//! Transcript history — a JSON file of `(text, timestamp)` records.
//!
//! Every successfully injected transcript is appended (newest first) and
//! the whole list is rewritten to disk.  Loading tolerates a missing or
//! unreadable file so a corrupted history never blocks dictation.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// One dictated utterance and when it was recognised.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transcript {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Transcript {
    /// Create a transcript stamped with the current time.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Persistent transcript history backed by a JSON file.
///
/// # Example
///
/// ```rust,no_run
/// use dictate::history::History;
///
/// let mut history = History::open("history.json");
/// history.append("hello world").unwrap();
/// assert_eq!(history.entries()[0].text, "hello world");
/// ```
pub struct History {
    path: PathBuf,
    entries: Vec<Transcript>,
}

impl History {
    /// Open (or start) the history stored at `path`.
    ///
    /// A missing or unparseable file yields an empty history rather than
    /// an error.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();
        Self { path, entries }
    }

    /// Prepend a new transcript and persist the list.
    pub fn append(&mut self, text: &str) -> Result<()> {
        self.entries.insert(0, Transcript::new(text));
        self.save()
    }

    /// All transcripts, newest first.
    pub fn entries(&self) -> &[Transcript] {
        &self.entries
    }

    /// Remove all transcripts and persist the empty list.
    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
