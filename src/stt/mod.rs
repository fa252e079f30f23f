//! Speech-to-text: engine boundary and the per-session handoff.
//!
//! # Architecture
//!
//! ```text
//! CaptureSession samples ──▶ TranscriptionHandoff
//!                              ├─ pre-flight: empty / NaN / silence
//!                              ├─ zero-pad to 1 s minimum
//!                              └─ SpeechEngine::transcribe  (blocking pool,
//!                                 one call at a time)
//! ```
//!
//! The engine side is deliberately thin: [`SpeechEngine`] is the whole
//! collaborator contract, and the bundled [`WhisperEngine`] is just one
//! implementation of it.

pub mod engine;
pub mod handoff;

pub use engine::{EngineError, EngineParams, NoModelEngine, SpeechEngine, WhisperEngine};
pub use handoff::{TranscriptionHandoff, DEFAULT_SILENCE_FLOOR, MIN_ENGINE_SAMPLES};

// test-only re-export so other modules' tests can import MockEngine
// without the `engine::` path.
#[cfg(test)]
pub use engine::MockEngine;
