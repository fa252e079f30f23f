//! Pipeline orchestrator — debounced edges → capture lifecycle → handoff.
//!
//! [`PipelineOrchestrator`] owns the [`RecorderState`] and is the only
//! place transitions happen.  It consumes [`KeyEdge`]s from the hotkey
//! listener and drives the capture pipeline:
//!
//! ```text
//! KeyEdge::Pressed   (Idle)      └─▶ Arming, start debounce delay
//! debounce elapses   (Arming)    ├─▶ key still held → begin capture → Recording
//! │                              └─▶ key released   → Idle (accidental tap)
//! KeyEdge::Released  (Arming)    └─▶ cancel delay → Idle
//! KeyEdge::Released  (Recording) └─▶ end capture (sync) → spawn handoff → Idle
//! ```
//!
//! The debounce delay is a `sleep_until` raced against the edge channel
//! inside `tokio::select!` — a release edge arriving first simply wins
//! the race, which is the cancellation.  When the delay *does* fire, the
//! decision re-reads the live key flag shared with the listener thread
//! rather than trusting the state cached at press time, closing the
//! window where a release slips in between timer expiry and handling.
//!
//! A finished session is handed to the transcription path on a spawned
//! task, so a new recording can start while an earlier transcription is
//! still running.  Handoff calls themselves are serialized inside
//! [`TranscriptionHandoff`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;

use crate::audio::CapturePipeline;
use crate::history::History;
use crate::hotkey::{EdgeKind, KeyEdge};
use crate::inject::TextSink;
use crate::stt::TranscriptionHandoff;

use super::state::RecorderState;

/// Default debounce window for filtering accidental key flickers.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// PipelineOrchestrator
// ---------------------------------------------------------------------------

/// Drives the push-to-talk lifecycle.
///
/// Create with [`PipelineOrchestrator::new`], then drive it with
/// [`run`](Self::run) on the coordination task.  The capture pipeline is
/// taken as a `Box<dyn CapturePipeline>`; the production implementation
/// holds a cpal stream and is not `Send`, so `run` is intended for
/// `Runtime::block_on` rather than `tokio::spawn`.
pub struct PipelineOrchestrator {
    state: RecorderState,
    capture: Box<dyn CapturePipeline>,
    handoff: Arc<TranscriptionHandoff>,
    sink: Arc<dyn TextSink>,
    history: Arc<Mutex<History>>,
    /// Live key flag mirrored by the listener thread; re-read when the
    /// debounce delay fires.
    key_held: Arc<AtomicBool>,
    debounce: Duration,
    /// Deadline of the running debounce delay, when in `Arming`.
    arm_deadline: Option<time::Instant>,
    /// In-flight transcription tasks, awaited on shutdown.
    pending: Vec<JoinHandle<()>>,
}

impl PipelineOrchestrator {
    pub fn new(
        capture: Box<dyn CapturePipeline>,
        handoff: Arc<TranscriptionHandoff>,
        sink: Arc<dyn TextSink>,
        history: Arc<Mutex<History>>,
        key_held: Arc<AtomicBool>,
        debounce: Duration,
    ) -> Self {
        Self {
            state: RecorderState::Idle,
            capture,
            handoff,
            sink,
            history,
            key_held,
            debounce,
            arm_deadline: None,
            pending: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Main loop
    // -----------------------------------------------------------------------

    /// Run until `edges` is closed, then drain in-flight transcriptions.
    pub async fn run(mut self, mut edges: mpsc::Receiver<KeyEdge>) {
        loop {
            let edge = if let Some(deadline) = self.arm_deadline {
                tokio::select! {
                    edge = edges.recv() => match edge {
                        Some(edge) => edge,
                        None => break,
                    },
                    _ = time::sleep_until(deadline) => {
                        self.on_debounce_elapsed();
                        continue;
                    }
                }
            } else {
                match edges.recv().await {
                    Some(edge) => edge,
                    None => break,
                }
            };

            match edge.kind {
                EdgeKind::Pressed => self.on_pressed(),
                EdgeKind::Released => self.on_released(),
            }
        }

        for task in self.pending.drain(..) {
            let _ = task.await;
        }
        log::info!("pipeline: edge channel closed, orchestrator shutting down");
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Press: arm the debounce delay.  Ignored unless idle, so a repeated
    /// press can never open a second session.
    fn on_pressed(&mut self) {
        if self.state != RecorderState::Idle {
            log::debug!("pipeline: press ignored while {}", self.state.label());
            return;
        }
        log::debug!("pipeline: press → arming ({:?} debounce)", self.debounce);
        self.state = RecorderState::Arming;
        self.arm_deadline = Some(time::Instant::now() + self.debounce);
    }

    /// The debounce delay fired: start recording if the key is *still*
    /// physically held, otherwise treat the press as an accidental tap.
    fn on_debounce_elapsed(&mut self) {
        self.arm_deadline = None;
        if self.state != RecorderState::Arming {
            return;
        }

        // Fresh read of the hardware flag, not the state cached at press
        // time — the release may have raced the timer.
        if !self.key_held.load(Ordering::Relaxed) {
            log::debug!("pipeline: key released within debounce window, ignoring tap");
            self.state = RecorderState::Idle;
            return;
        }

        match self.capture.begin() {
            Ok(()) => {
                log::info!("pipeline: recording started");
                self.state = RecorderState::Recording;
            }
            Err(e) => {
                log::warn!("pipeline: capture failed to start: {e}");
                self.state = RecorderState::Idle;
            }
        }
    }

    /// Release: cancel the debounce when arming, or finish the session
    /// when recording.
    fn on_released(&mut self) {
        match self.state {
            RecorderState::Arming => {
                log::debug!("pipeline: released during debounce, cancelling");
                self.arm_deadline = None;
                self.state = RecorderState::Idle;
            }
            RecorderState::Recording => {
                self.state = RecorderState::Idle;
                // Synchronous tap teardown: once end() returns, no further
                // audio can reach the session that is about to be handed
                // off.
                let samples = self.capture.end();
                log::info!(
                    "pipeline: recording stopped with {} samples",
                    samples.len()
                );
                self.spawn_handoff(samples);
            }
            RecorderState::Idle => {
                log::debug!("pipeline: release ignored while idle");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Handoff
    // -----------------------------------------------------------------------

    /// Transcribe → inject → record, off the coordination task.
    fn spawn_handoff(&mut self, samples: Vec<f32>) {
        let handoff = Arc::clone(&self.handoff);
        let sink = Arc::clone(&self.sink);
        let history = Arc::clone(&self.history);

        self.pending.retain(|task| !task.is_finished());
        self.pending.push(tokio::spawn(async move {
            let Some(text) = handoff.transcribe(samples).await else {
                return;
            };

            let inject_text = text.clone();
            let inject_result =
                tokio::task::spawn_blocking(move || sink.deliver(&inject_text)).await;
            match inject_result {
                Ok(Ok(())) => log::debug!("pipeline: injected transcript"),
                // Injection failure is non-fatal; the transcript still
                // reaches the history below.
                Ok(Err(e)) => log::warn!("pipeline: injection failed: {e}"),
                Err(e) => log::warn!("pipeline: inject task panicked: {e}"),
            }

            let record = tokio::task::spawn_blocking(move || {
                history.lock().unwrap().append(&text)
            })
            .await;
            match record {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::warn!("pipeline: failed to record history: {e}"),
                Err(e) => log::warn!("pipeline: history task panicked: {e}"),
            }
        }));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::CaptureError;
    use crate::hotkey::KeyEdge;
    use crate::inject::InjectError;
    use crate::stt::MockEngine;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::atomic::AtomicUsize;
    use tempfile::tempdir;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Shared observation point for the mock capture pipeline.
    #[derive(Clone, Default)]
    struct CaptureProbe {
        active: Arc<AtomicBool>,
        begins: Arc<AtomicUsize>,
        ends: Arc<AtomicUsize>,
        overlap: Arc<AtomicBool>,
    }

    struct MockCapture {
        probe: CaptureProbe,
        fail_begin: bool,
        samples: Vec<f32>,
    }

    impl MockCapture {
        fn new(probe: CaptureProbe, samples: Vec<f32>) -> Self {
            Self {
                probe,
                fail_begin: false,
                samples,
            }
        }

        fn failing(probe: CaptureProbe) -> Self {
            Self {
                probe,
                fail_begin: true,
                samples: Vec::new(),
            }
        }
    }

    impl CapturePipeline for MockCapture {
        fn begin(&mut self) -> Result<(), CaptureError> {
            self.probe.begins.fetch_add(1, Ordering::SeqCst);
            if self.fail_begin {
                return Err(CaptureError::PermissionDenied);
            }
            if self.probe.active.swap(true, Ordering::SeqCst) {
                self.probe.overlap.store(true, Ordering::SeqCst);
                return Err(CaptureError::SessionActive);
            }
            Ok(())
        }

        fn end(&mut self) -> Vec<f32> {
            if !self.probe.active.swap(false, Ordering::SeqCst) {
                return Vec::new();
            }
            self.probe.ends.fetch_add(1, Ordering::SeqCst);
            self.samples.clone()
        }
    }

    /// Sink that records delivered texts instead of touching the OS.
    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<String>>);

    impl TextSink for RecordingSink {
        fn deliver(&self, text: &str) -> Result<(), InjectError> {
            self.0.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    // -----------------------------------------------------------------------
    // Harness
    // -----------------------------------------------------------------------

    struct Harness {
        probe: CaptureProbe,
        engine: Arc<MockEngine>,
        sink: Arc<RecordingSink>,
        key_held: Arc<AtomicBool>,
        orchestrator: PipelineOrchestrator,
        _history_dir: tempfile::TempDir,
    }

    /// One second of clearly audible signal.
    fn speech() -> Vec<f32> {
        (0..16_000).map(|i| ((i as f32) * 0.01).sin() * 0.3).collect()
    }

    fn harness_with(capture: impl FnOnce(CaptureProbe) -> MockCapture) -> Harness {
        let probe = CaptureProbe::default();
        let engine = Arc::new(MockEngine::ok("transcript"));
        let sink = Arc::new(RecordingSink::default());
        let key_held = Arc::new(AtomicBool::new(false));
        let history_dir = tempdir().expect("temp dir");
        let history = Arc::new(Mutex::new(History::open(
            history_dir.path().join("history.json"),
        )));

        let orchestrator = PipelineOrchestrator::new(
            Box::new(capture(probe.clone())),
            Arc::new(TranscriptionHandoff::new(
                Arc::clone(&engine) as Arc<dyn crate::stt::SpeechEngine>
            )),
            Arc::clone(&sink) as Arc<dyn TextSink>,
            history,
            Arc::clone(&key_held),
            DEFAULT_DEBOUNCE,
        );

        Harness {
            probe,
            engine,
            sink,
            key_held,
            orchestrator,
            _history_dir: history_dir,
        }
    }

    fn harness() -> Harness {
        harness_with(|probe| MockCapture::new(probe, speech()))
    }

    fn pressed() -> KeyEdge {
        KeyEdge::now(EdgeKind::Pressed)
    }

    fn released() -> KeyEdge {
        KeyEdge::now(EdgeKind::Released)
    }

    // -----------------------------------------------------------------------
    // Debounce behaviour
    // -----------------------------------------------------------------------

    /// Press at t=0, release at t=30 ms — inside the debounce window —
    /// must never start a capture.
    #[tokio::test(start_paused = true)]
    async fn tap_shorter_than_debounce_never_records() {
        let h = harness();
        let key_held = Arc::clone(&h.key_held);
        let (tx, rx) = mpsc::channel(16);

        let driver = async move {
            key_held.store(true, Ordering::Relaxed);
            tx.send(pressed()).await.unwrap();
            time::sleep(Duration::from_millis(30)).await;
            key_held.store(false, Ordering::Relaxed);
            tx.send(released()).await.unwrap();
            time::sleep(Duration::from_millis(100)).await;
        };

        tokio::join!(h.orchestrator.run(rx), driver);

        assert_eq!(h.probe.begins.load(Ordering::SeqCst), 0);
        assert_eq!(h.probe.ends.load(Ordering::SeqCst), 0);
        assert_eq!(h.engine.calls(), 0);
    }

    /// Press at t=0, release at t=200 ms — exactly one BeginCapture
    /// (at ~t=50 ms) followed by exactly one EndCapture.
    #[tokio::test(start_paused = true)]
    async fn held_press_records_exactly_once() {
        let h = harness();
        let key_held = Arc::clone(&h.key_held);
        let begins = Arc::clone(&h.probe.begins);
        let (tx, rx) = mpsc::channel(16);

        let driver = async move {
            key_held.store(true, Ordering::Relaxed);
            tx.send(pressed()).await.unwrap();

            // Just after the debounce window, capture must be running.
            time::sleep(Duration::from_millis(60)).await;
            assert_eq!(begins.load(Ordering::SeqCst), 1);

            time::sleep(Duration::from_millis(140)).await;
            key_held.store(false, Ordering::Relaxed);
            tx.send(released()).await.unwrap();
        };

        tokio::join!(h.orchestrator.run(rx), driver);

        assert_eq!(h.probe.begins.load(Ordering::SeqCst), 1);
        assert_eq!(h.probe.ends.load(Ordering::SeqCst), 1);
        assert_eq!(h.engine.calls(), 1);
        assert_eq!(h.sink.0.lock().unwrap().as_slice(), ["transcript"]);
    }

    /// Rapid flag toggles faster than the debounce window: no recording
    /// is ever entered.
    #[tokio::test(start_paused = true)]
    async fn rapid_toggles_never_record() {
        let h = harness();
        let key_held = Arc::clone(&h.key_held);
        let (tx, rx) = mpsc::channel(64);

        let driver = async move {
            for _ in 0..10 {
                key_held.store(true, Ordering::Relaxed);
                tx.send(pressed()).await.unwrap();
                time::sleep(Duration::from_millis(10)).await;
                key_held.store(false, Ordering::Relaxed);
                tx.send(released()).await.unwrap();
                time::sleep(Duration::from_millis(10)).await;
            }
        };

        tokio::join!(h.orchestrator.run(rx), driver);

        assert_eq!(h.probe.begins.load(Ordering::SeqCst), 0);
        assert_eq!(h.engine.calls(), 0);
    }

    /// The key is physically released just before the timer fires but the
    /// release edge is delivered late.  The fire-time re-read of the flag
    /// must prevent the capture.
    #[tokio::test(start_paused = true)]
    async fn release_racing_timer_is_caught_by_flag_reread() {
        let h = harness();
        let key_held = Arc::clone(&h.key_held);
        let (tx, rx) = mpsc::channel(16);

        let driver = async move {
            key_held.store(true, Ordering::Relaxed);
            tx.send(pressed()).await.unwrap();

            // Physical release at 40 ms; the edge event lags to 70 ms.
            time::sleep(Duration::from_millis(40)).await;
            key_held.store(false, Ordering::Relaxed);
            time::sleep(Duration::from_millis(30)).await;
            tx.send(released()).await.unwrap();
        };

        tokio::join!(h.orchestrator.run(rx), driver);

        assert_eq!(h.probe.begins.load(Ordering::SeqCst), 0);
        assert_eq!(h.probe.ends.load(Ordering::SeqCst), 0);
    }

    /// A second press while arming or recording is ignored.
    #[tokio::test(start_paused = true)]
    async fn repeated_press_is_ignored() {
        let h = harness();
        let key_held = Arc::clone(&h.key_held);
        let (tx, rx) = mpsc::channel(16);

        let driver = async move {
            key_held.store(true, Ordering::Relaxed);
            tx.send(pressed()).await.unwrap();
            time::sleep(Duration::from_millis(20)).await;
            tx.send(pressed()).await.unwrap(); // during Arming
            time::sleep(Duration::from_millis(80)).await;
            tx.send(pressed()).await.unwrap(); // during Recording
            time::sleep(Duration::from_millis(50)).await;
            key_held.store(false, Ordering::Relaxed);
            tx.send(released()).await.unwrap();
        };

        tokio::join!(h.orchestrator.run(rx), driver);

        assert_eq!(h.probe.begins.load(Ordering::SeqCst), 1);
        assert_eq!(h.probe.ends.load(Ordering::SeqCst), 1);
        assert!(!h.probe.overlap.load(Ordering::SeqCst));
    }

    // -----------------------------------------------------------------------
    // Failure handling
    // -----------------------------------------------------------------------

    /// A failed BeginCapture reverts to idle and the next press can try
    /// again.
    #[tokio::test(start_paused = true)]
    async fn begin_failure_reverts_to_idle() {
        let h = harness_with(MockCapture::failing);
        let key_held = Arc::clone(&h.key_held);
        let (tx, rx) = mpsc::channel(16);

        let driver = async move {
            for _ in 0..2 {
                key_held.store(true, Ordering::Relaxed);
                tx.send(pressed()).await.unwrap();
                time::sleep(Duration::from_millis(100)).await;
                key_held.store(false, Ordering::Relaxed);
                tx.send(released()).await.unwrap();
                time::sleep(Duration::from_millis(20)).await;
            }
        };

        tokio::join!(h.orchestrator.run(rx), driver);

        // Both presses attempted a capture — the failure did not wedge the
        // state machine — and nothing was ever recorded or transcribed.
        assert_eq!(h.probe.begins.load(Ordering::SeqCst), 2);
        assert_eq!(h.probe.ends.load(Ordering::SeqCst), 0);
        assert_eq!(h.engine.calls(), 0);
    }

    /// Silent audio flows through EndCapture but is dropped at the
    /// handoff — no injection, no engine call.
    #[tokio::test(start_paused = true)]
    async fn silent_session_is_not_transcribed() {
        let h = harness_with(|probe| MockCapture::new(probe, vec![0.0; 16_000]));
        let key_held = Arc::clone(&h.key_held);
        let (tx, rx) = mpsc::channel(16);

        let driver = async move {
            key_held.store(true, Ordering::Relaxed);
            tx.send(pressed()).await.unwrap();
            time::sleep(Duration::from_millis(150)).await;
            key_held.store(false, Ordering::Relaxed);
            tx.send(released()).await.unwrap();
        };

        tokio::join!(h.orchestrator.run(rx), driver);

        assert_eq!(h.probe.ends.load(Ordering::SeqCst), 1);
        assert_eq!(h.engine.calls(), 0);
        assert!(h.sink.0.lock().unwrap().is_empty());
    }

    // -----------------------------------------------------------------------
    // Session invariant under randomized timing
    // -----------------------------------------------------------------------

    /// Randomized press/hold/release interleavings: at most one session
    /// is ever open, and every opened session is closed.
    #[tokio::test(start_paused = true)]
    async fn stress_at_most_one_session() {
        let h = harness();
        let key_held = Arc::clone(&h.key_held);
        let (tx, rx) = mpsc::channel(64);

        let driver = async move {
            let mut rng = StdRng::seed_from_u64(0xD1C7);
            for _ in 0..200 {
                key_held.store(true, Ordering::Relaxed);
                tx.send(pressed()).await.unwrap();

                let hold_ms = rng.random_range(0..120);
                time::sleep(Duration::from_millis(hold_ms)).await;

                key_held.store(false, Ordering::Relaxed);
                tx.send(released()).await.unwrap();

                let gap_ms = rng.random_range(0..30);
                time::sleep(Duration::from_millis(gap_ms)).await;
            }
        };

        tokio::join!(h.orchestrator.run(rx), driver);

        assert!(!h.probe.overlap.load(Ordering::SeqCst), "session overlap");
        assert_eq!(
            h.probe.begins.load(Ordering::SeqCst),
            h.probe.ends.load(Ordering::SeqCst),
            "every opened session must be closed"
        );
    }

    // -----------------------------------------------------------------------
    // End-to-end delivery
    // -----------------------------------------------------------------------

    /// A full press-hold-release cycle lands the transcript in both the
    /// sink and the history, in that order of observation.
    #[tokio::test(start_paused = true)]
    async fn transcript_reaches_sink_and_history() {
        let probe = CaptureProbe::default();
        let engine = Arc::new(MockEngine::ok("dictated text"));
        let sink = Arc::new(RecordingSink::default());
        let key_held = Arc::new(AtomicBool::new(false));
        let history_dir = tempdir().expect("temp dir");
        let history_path = history_dir.path().join("history.json");
        let history = Arc::new(Mutex::new(History::open(&history_path)));

        let orchestrator = PipelineOrchestrator::new(
            Box::new(MockCapture::new(probe, speech())),
            Arc::new(TranscriptionHandoff::new(
                Arc::clone(&engine) as Arc<dyn crate::stt::SpeechEngine>
            )),
            Arc::clone(&sink) as Arc<dyn TextSink>,
            Arc::clone(&history),
            Arc::clone(&key_held),
            DEFAULT_DEBOUNCE,
        );

        let (tx, rx) = mpsc::channel(16);
        let driver = async move {
            key_held.store(true, Ordering::Relaxed);
            tx.send(pressed()).await.unwrap();
            time::sleep(Duration::from_millis(200)).await;
            key_held.store(false, Ordering::Relaxed);
            tx.send(released()).await.unwrap();
        };

        tokio::join!(orchestrator.run(rx), driver);

        assert_eq!(sink.0.lock().unwrap().as_slice(), ["dictated text"]);
        let history = history.lock().unwrap();
        assert_eq!(history.entries().len(), 1);
        assert_eq!(history.entries()[0].text, "dictated text");
    }
}
