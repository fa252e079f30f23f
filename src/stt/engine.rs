//! Speech-engine trait and the whisper-backed implementation.
//!
//! [`SpeechEngine`] is the collaborator boundary the pipeline hands
//! finished audio to.  It is object-safe and `Send + Sync` so it can live
//! behind an `Arc<dyn SpeechEngine>` and be called from the blocking
//! thread pool.
//!
//! [`WhisperEngine`] is the production implementation wrapping a
//! `whisper_rs::WhisperContext`.  [`MockEngine`] (test-only) records call
//! counts and received buffer sizes so tests can assert the handoff's
//! exactly-once and padding behaviour.

use std::path::Path;

use thiserror::Error;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// Errors the speech engine can report.
///
/// The pipeline never surfaces these to the user; a failed engine call
/// degrades to "no text" at the handoff.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The model file was not found at the given path.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// whisper-rs failed to initialise a context or per-call state.
    #[error("whisper context initialisation failed: {0}")]
    ContextInit(String),

    /// The inference pass itself failed.
    #[error("transcription error: {0}")]
    Transcription(String),
}

// ---------------------------------------------------------------------------
// SpeechEngine trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe speech-to-text interface.
///
/// # Contract
///
/// `audio` is **16 kHz mono f32** PCM — the canonical capture format.
/// The handoff guarantees at least one second of samples (zero-padded when
/// the utterance was shorter), so implementations need no length guards.
pub trait SpeechEngine: Send + Sync {
    /// Transcribe `audio` and return the transcript text.
    ///
    /// An empty string means the engine ran but heard nothing usable.
    fn transcribe(&self, audio: &[f32]) -> Result<String, EngineError>;
}

// Compile-time assertion: Box<dyn SpeechEngine> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechEngine>) {}
};

// ---------------------------------------------------------------------------
// EngineParams
// ---------------------------------------------------------------------------

/// Settings for a whisper inference run.
#[derive(Debug, Clone)]
pub struct EngineParams {
    /// ISO-639-1 language code, or `"auto"` for language detection.
    pub language: String,
    /// CPU threads handed to whisper; capped at 8 where more gives
    /// diminishing returns.
    pub n_threads: i32,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            language: "en".into(),
            n_threads: optimal_threads(),
        }
    }
}

fn optimal_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8) as i32)
        .unwrap_or(4)
}

// ---------------------------------------------------------------------------
// WhisperEngine
// ---------------------------------------------------------------------------

/// Production engine wrapping a `whisper_rs::WhisperContext`.
///
/// A new `WhisperState` is created per [`transcribe`] call so the engine
/// can be shared across threads without locking.
///
/// [`transcribe`]: SpeechEngine::transcribe
pub struct WhisperEngine {
    ctx: WhisperContext,
    params: EngineParams,
}

impl std::fmt::Debug for WhisperEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperEngine")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// `WhisperContext` holds a raw pointer internally but declares
// `unsafe impl Send`/`Sync` in whisper-rs — the model weights are
// read-only after loading.  `EngineParams` is fully owned.
// SAFETY: WhisperContext is Send+Sync as declared by whisper-rs.
unsafe impl Send for WhisperEngine {}
unsafe impl Sync for WhisperEngine {}

impl WhisperEngine {
    /// Load a GGML model from `model_path`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::ModelNotFound`] — `model_path` does not exist.
    /// - [`EngineError::ContextInit`] — whisper-rs failed to load it.
    pub fn load(
        model_path: impl AsRef<Path>,
        params: EngineParams,
    ) -> Result<Self, EngineError> {
        let path = model_path.as_ref();

        if !path.exists() {
            return Err(EngineError::ModelNotFound(path.display().to_string()));
        }

        let path_str = path.to_str().ok_or_else(|| {
            EngineError::ModelNotFound(format!(
                "model path contains non-UTF-8 characters: {}",
                path.display()
            ))
        })?;

        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| EngineError::ContextInit(e.to_string()))?;

        Ok(Self { ctx, params })
    }
}

impl SpeechEngine for WhisperEngine {
    fn transcribe(&self, audio: &[f32]) -> Result<String, EngineError> {
        let mut fp = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        let lang: Option<&str> = if self.params.language == "auto" {
            None
        } else {
            Some(self.params.language.as_str())
        };
        fp.set_language(lang);
        fp.set_n_threads(self.params.n_threads);
        fp.set_print_progress(false);
        fp.set_print_realtime(false);

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| EngineError::ContextInit(e.to_string()))?;

        state
            .full(fp, audio)
            .map_err(|e| EngineError::Transcription(e.to_string()))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| EngineError::Transcription(e.to_string()))?;

        let mut text = String::new();
        for i in 0..n_segments {
            let seg_text = state
                .full_get_segment_text(i)
                .map_err(|e| EngineError::Transcription(format!("segment {i}: {e}")))?;
            text.push_str(&seg_text);
        }

        Ok(text.trim().to_string())
    }
}

// ---------------------------------------------------------------------------
// NoModelEngine
// ---------------------------------------------------------------------------

/// Stub engine used when no model file is present, so the app still
/// launches and degrades to "no text" instead of refusing to start.
pub struct NoModelEngine {
    path: String,
}

impl NoModelEngine {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl SpeechEngine for NoModelEngine {
    fn transcribe(&self, _audio: &[f32]) -> Result<String, EngineError> {
        Err(EngineError::ModelNotFound(self.path.clone()))
    }
}

// ---------------------------------------------------------------------------
// MockEngine  (test-only)
// ---------------------------------------------------------------------------

/// Test double that records calls and returns a canned response.
///
/// # Example
///
/// ```rust
/// # use dictate::stt::{MockEngine, SpeechEngine};
/// let engine = MockEngine::ok("hello");
/// let _ = engine.transcribe(&vec![0.1f32; 16_000]);
/// assert_eq!(engine.calls(), 1);
/// assert_eq!(engine.last_len(), Some(16_000));
/// ```
#[cfg(test)]
pub struct MockEngine {
    response: Result<String, EngineError>,
    calls: std::sync::atomic::AtomicUsize,
    last_len: std::sync::Mutex<Option<usize>>,
}

#[cfg(test)]
impl MockEngine {
    /// A mock that always returns `Ok(text)`.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
            calls: std::sync::atomic::AtomicUsize::new(0),
            last_len: std::sync::Mutex::new(None),
        }
    }

    /// A mock that always returns `Err(error)`.
    pub fn err(error: EngineError) -> Self {
        Self {
            response: Err(error),
            calls: std::sync::atomic::AtomicUsize::new(0),
            last_len: std::sync::Mutex::new(None),
        }
    }

    /// Number of `transcribe` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Sample count of the most recent `transcribe` call.
    pub fn last_len(&self) -> Option<usize> {
        *self.last_len.lock().unwrap()
    }
}

#[cfg(test)]
impl SpeechEngine for MockEngine {
    fn transcribe(&self, audio: &[f32]) -> Result<String, EngineError> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        *self.last_len.lock().unwrap() = Some(audio.len());
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
