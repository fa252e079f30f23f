//! The capture pipeline: tap → owned chunks → conversion → session buffer.
//!
//! [`AudioRecorder`] owns the whole capture side of a recording session:
//!
//! ```text
//! cpal callback ──AudioChunk (mpsc)──▶ consumer thread
//!                                        ├─ chunk_level ──▶ watch channel (UI)
//!                                        └─ StreamConverter ──▶ CaptureSession
//! ```
//!
//! One session at a time: [`begin`](AudioRecorder::begin) rejects a second
//! call while a session is active, and [`end`](AudioRecorder::end) tears
//! the tap down synchronously before the buffer is considered final — the
//! stream is dropped first, the consumer thread drains the queued chunks
//! in arrival order, and only then is the session moved out.  A chunk that
//! shows up after that finds no session and is discarded.

use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use tokio::sync::watch;

use crate::audio::{
    chunk_level, AudioCapture, AudioChunk, CaptureError, CaptureSession, StreamConverter,
    StreamHandle,
};

// ---------------------------------------------------------------------------
// PermissionProvider
// ---------------------------------------------------------------------------

/// Microphone permission check, performed before the tap is installed.
///
/// Implementations may prompt the user and block on the grant/deny
/// decision.  The pipeline treats `false` as [`CaptureError::PermissionDenied`]
/// and reverts to idle without creating a session.
pub trait PermissionProvider: Send {
    /// Returns `true` when microphone capture is allowed.
    fn check_microphone(&self) -> bool;
}

/// Default provider: defers to the operating system, which prompts on the
/// first tap installation and fails the stream when access is refused.
pub struct SystemPermission;

impl PermissionProvider for SystemPermission {
    fn check_microphone(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// CapturePipeline
// ---------------------------------------------------------------------------

/// Seam between the recording state machine and the audio hardware.
///
/// The production implementation is [`AudioRecorder`]; tests drive the
/// state machine against a mock.
pub trait CapturePipeline {
    /// Start a new capture session.
    ///
    /// Must be rejected — not queued — while a session is active.
    fn begin(&mut self) -> Result<(), CaptureError>;

    /// Stop the tap synchronously and return the accumulated canonical
    /// samples, consuming the session.  Returns an empty buffer when no
    /// session is active.
    fn end(&mut self) -> Vec<f32>;
}

// ---------------------------------------------------------------------------
// AudioRecorder
// ---------------------------------------------------------------------------

/// Everything belonging to one live capture session.
struct ActiveSession {
    /// Keeps the cpal stream alive; dropped first on `end()`.
    stream: StreamHandle,
    /// Consumer thread converting and accumulating chunks.
    worker: thread::JoinHandle<()>,
    /// The session buffer, shared with the consumer thread.  `None` after
    /// the buffer has been moved out.
    session: Arc<Mutex<Option<CaptureSession>>>,
}

/// Production [`CapturePipeline`] backed by cpal.
///
/// Constructed once at startup; each `begin`/`end` pair opens and closes
/// one hardware tap.  Amplitude levels are published on a `watch` channel:
/// delivery is fire-and-forget and only the most recent value is kept,
/// which is all a level meter needs.
pub struct AudioRecorder {
    permission: Box<dyn PermissionProvider>,
    level_tx: Arc<watch::Sender<f32>>,
    /// RMS boost factor for the published level.
    level_gain: f32,
    /// Session ceiling in canonical samples.
    max_samples: usize,
    /// Input device name; `None` = system default.
    device_name: Option<String>,
    active: Option<ActiveSession>,
}

impl AudioRecorder {
    /// Create a recorder and the receiving end of its amplitude stream.
    pub fn new(
        permission: Box<dyn PermissionProvider>,
        level_gain: f32,
        max_samples: usize,
        device_name: Option<String>,
    ) -> (Self, watch::Receiver<f32>) {
        let (level_tx, level_rx) = watch::channel(0.0_f32);
        (
            Self {
                permission,
                level_tx: Arc::new(level_tx),
                level_gain,
                max_samples,
                device_name,
                active: None,
            },
            level_rx,
        )
    }

    /// Returns `true` while a capture session is active.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }
}

impl CapturePipeline for AudioRecorder {
    fn begin(&mut self) -> Result<(), CaptureError> {
        if self.active.is_some() {
            return Err(CaptureError::SessionActive);
        }
        if !self.permission.check_microphone() {
            return Err(CaptureError::PermissionDenied);
        }

        let capture = AudioCapture::open(self.device_name.as_deref())?;
        let mut converter = StreamConverter::new(capture.sample_rate(), capture.channels());

        let session = Arc::new(Mutex::new(Some(CaptureSession::new(self.max_samples))));
        let (chunk_tx, chunk_rx) = mpsc::channel::<AudioChunk>();

        let worker_session = Arc::clone(&session);
        let level_tx = Arc::clone(&self.level_tx);
        let gain = self.level_gain;

        // FIFO consumer: chunks are processed strictly in arrival order so
        // concatenation in the session matches the acoustic order.
        let worker = thread::Builder::new()
            .name("capture-pipeline".into())
            .spawn(move || {
                while let Ok(chunk) = chunk_rx.recv() {
                    let level = chunk_level(&chunk.samples, gain);
                    let _ = level_tx.send(level);

                    let converted = converter.convert(&chunk.samples);
                    if converted.is_empty() {
                        continue;
                    }

                    if let Some(session) = worker_session.lock().unwrap().as_mut() {
                        if !session.append(&converted) {
                            log::trace!(
                                "capture: chunk of {} samples dropped at ceiling",
                                converted.len()
                            );
                        }
                    }
                }
            })
            .map_err(|e| CaptureError::Worker(e.to_string()))?;

        let stream = capture.start(chunk_tx)?;

        log::debug!(
            "capture started ({} Hz, {} ch, ceiling {} samples)",
            capture.sample_rate(),
            capture.channels(),
            self.max_samples
        );

        self.active = Some(ActiveSession {
            stream,
            worker,
            session,
        });
        Ok(())
    }

    fn end(&mut self) -> Vec<f32> {
        let Some(active) = self.active.take() else {
            return Vec::new();
        };

        // Tear the tap down before the buffer is considered final.
        drop(active.stream);

        // The callback (and with it the channel sender) is gone; the worker
        // drains whatever was queued, in order, then exits.
        if active.worker.join().is_err() {
            log::error!("capture: consumer thread panicked");
        }

        // Settle the meter.
        let _ = self.level_tx.send(0.0);

        let samples = active
            .session
            .lock()
            .unwrap()
            .take()
            .map(CaptureSession::into_samples)
            .unwrap_or_default();

        log::debug!(
            "capture stopped with {} samples ({:.2}s)",
            samples.len(),
            samples.len() as f32 / crate::audio::CANONICAL_SAMPLE_RATE as f32
        );
        samples
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct Deny;

    impl PermissionProvider for Deny {
        fn check_microphone(&self) -> bool {
            false
        }
    }

    #[test]
    fn denied_permission_rejects_begin_without_a_session() {
        let (mut recorder, _level) =
            AudioRecorder::new(Box::new(Deny), 20.0, 16_000, None);

        let err = recorder.begin().unwrap_err();
        assert!(matches!(err, CaptureError::PermissionDenied));
        assert!(!recorder.is_active());
    }

    #[test]
    fn end_without_session_returns_empty() {
        let (mut recorder, _level) =
            AudioRecorder::new(Box::new(SystemPermission), 20.0, 16_000, None);

        assert!(recorder.end().is_empty());
        // Idempotent: a second call is also a no-op.
        assert!(recorder.end().is_empty());
    }

    #[test]
    fn level_channel_starts_at_zero() {
        let (_recorder, level) =
            AudioRecorder::new(Box::new(SystemPermission), 20.0, 16_000, None);
        assert_eq!(*level.borrow(), 0.0);
    }
}
