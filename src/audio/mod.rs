//! Audio pipeline — microphone tap → format conversion → session buffer →
//! amplitude envelope.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → AudioChunk (mpsc) → StreamConverter
//!           → CaptureSession (bounded)  +  chunk_level → LevelMeter
//! ```
//!
//! All captured audio ends up in the canonical format: mono, `f32`,
//! [`CANONICAL_SAMPLE_RATE`] Hz.  That is also the contract every
//! downstream collaborator (speech engine included) accepts.

pub mod capture;
pub mod convert;
pub mod meter;
pub mod recorder;
pub mod session;

pub use capture::{AudioCapture, AudioChunk, CaptureError, StreamHandle};
pub use convert::{downmix_to_mono, StreamConverter};
pub use meter::{chunk_level, LevelMeter, BAR_COUNT, DEFAULT_LEVEL_GAIN};
pub use recorder::{AudioRecorder, CapturePipeline, PermissionProvider, SystemPermission};
pub use session::CaptureSession;

/// Canonical capture sample rate in Hz.
pub const CANONICAL_SAMPLE_RATE: u32 = 16_000;

/// Canonical channel count (mono).
pub const CANONICAL_CHANNELS: u16 = 1;
