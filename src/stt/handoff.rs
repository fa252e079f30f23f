//! One-shot transfer of a finished recording to the speech engine.
//!
//! [`TranscriptionHandoff`] receives the sample buffer of a completed
//! capture session **by value** — the session was consumed to produce it,
//! so each recording can reach the engine at most once.  Calls are
//! serialized through an async mutex: a new recording may start while an
//! earlier transcription is still running, but two engine calls never
//! overlap.
//!
//! Before the engine sees anything, the buffer goes through pre-flight
//! checks.  Each failure produces `None` — "nothing to transcribe" — not
//! an error:
//!
//! 1. empty buffer;
//! 2. any NaN or infinite sample;
//! 3. near-silent buffer (peak below the silence floor).
//!
//! A buffer that passes but is shorter than the engine minimum (one
//! second) is right-padded with zeros rather than rejected, so very short
//! utterances still get a chance at recognition.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::audio::CANONICAL_SAMPLE_RATE;
use crate::stt::SpeechEngine;

/// Minimum buffer the engine is given: one second at the canonical rate.
pub const MIN_ENGINE_SAMPLES: usize = CANONICAL_SAMPLE_RATE as usize;

/// Default peak amplitude below which a buffer counts as silence.
pub const DEFAULT_SILENCE_FLOOR: f32 = 0.01;

// ---------------------------------------------------------------------------
// TranscriptionHandoff
// ---------------------------------------------------------------------------

/// Validates finished recordings and runs the engine exactly once per
/// session.
pub struct TranscriptionHandoff {
    engine: Arc<dyn SpeechEngine>,
    /// Serializes engine calls across sessions.
    gate: Mutex<()>,
    /// Peak amplitude below which the buffer is treated as silence.
    silence_floor: f32,
}

impl TranscriptionHandoff {
    /// Create a handoff around `engine` with the default silence floor.
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        Self::with_silence_floor(engine, DEFAULT_SILENCE_FLOOR)
    }

    /// Create a handoff with an explicit silence floor.
    pub fn with_silence_floor(engine: Arc<dyn SpeechEngine>, silence_floor: f32) -> Self {
        Self {
            engine,
            gate: Mutex::new(()),
            silence_floor,
        }
    }

    /// Validate `samples` and transcribe them.
    ///
    /// Returns `None` when validation rejects the buffer, when the engine
    /// fails, or when the engine produces an empty transcript.  The engine
    /// runs on the blocking thread pool so this never stalls key-event
    /// processing; the caller's task just awaits.
    pub async fn transcribe(&self, mut samples: Vec<f32>) -> Option<String> {
        if samples.is_empty() {
            log::debug!("handoff: empty buffer, skipping");
            return None;
        }

        if samples.iter().any(|s| !s.is_finite()) {
            log::warn!("handoff: buffer contains non-finite samples, skipping");
            return None;
        }

        let peak = samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max);
        if peak < self.silence_floor {
            log::debug!(
                "handoff: peak amplitude {peak:.4} below silence floor {:.4}, skipping",
                self.silence_floor
            );
            return None;
        }

        if samples.len() < MIN_ENGINE_SAMPLES {
            log::debug!(
                "handoff: padding {} samples up to {MIN_ENGINE_SAMPLES}",
                samples.len()
            );
            samples.resize(MIN_ENGINE_SAMPLES, 0.0);
        }

        // One engine call at a time; later sessions queue here in order.
        let _serialized = self.gate.lock().await;

        let engine = Arc::clone(&self.engine);
        let result = tokio::task::spawn_blocking(move || engine.transcribe(&samples)).await;

        match result {
            Ok(Ok(text)) if !text.is_empty() => Some(text),
            Ok(Ok(_)) => {
                log::debug!("handoff: engine produced an empty transcript");
                None
            }
            Ok(Err(e)) => {
                log::warn!("handoff: engine failed: {e}");
                None
            }
            Err(e) => {
                log::warn!("handoff: transcription task panicked: {e}");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
