//! Push-to-talk dictation: hold a hotkey, speak, release, and the
//! transcript is pasted into the focused application.
//!
//! # Architecture
//!
//! ```text
//! rdev listener ─▶ FlagDebouncer ─▶ KeyEdge channel
//!                                      │
//!                              PipelineOrchestrator (state machine)
//!                                      │ begin / end
//!                              AudioRecorder (cpal tap → 16 kHz mono)
//!                                      │ finished samples
//!                              TranscriptionHandoff ─▶ SpeechEngine
//!                                      │ text
//!                              TextInjector + History
//! ```
//!
//! The amplitude envelope computed per captured chunk flows independently
//! over a `watch` channel for level-meter rendering.

pub mod audio;
pub mod config;
pub mod history;
pub mod hotkey;
pub mod inject;
pub mod pipeline;
pub mod stt;
