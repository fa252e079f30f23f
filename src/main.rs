//! Application entry point.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create the tokio runtime (multi-thread, 2 workers).
//! 4. Build the speech engine (whisper model, or a stub when the model
//!    file is missing so the app still launches).
//! 5. Build the audio recorder and spawn the level-meter task.
//! 6. Spawn the hotkey listener thread.
//! 7. Drive the [`PipelineOrchestrator`] with `block_on` — the capture
//!    pipeline holds a cpal stream, which is not `Send`, so the
//!    coordination loop stays on the main thread.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use dictate::{
    audio::{AudioRecorder, LevelMeter, SystemPermission},
    config::{AppConfig, AppPaths},
    history::History,
    hotkey::{parse_key, HotkeyListener, KeyEdge},
    inject::{TextInjector, TextSink},
    pipeline::PipelineOrchestrator,
    stt::{EngineParams, NoModelEngine, SpeechEngine, TranscriptionHandoff, WhisperEngine},
};

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("dictate starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    let paths = AppPaths::new();

    // 3. Tokio runtime (2 workers — transcription and injection each take
    //    a blocking slot)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    // 4. Speech engine (degrade gracefully when the model is missing)
    let model_path = paths.models_dir.join(format!("{}.bin", config.stt.model));
    let engine_params = EngineParams {
        language: config.stt.language.clone(),
        ..EngineParams::default()
    };
    let engine: Arc<dyn SpeechEngine> = match WhisperEngine::load(&model_path, engine_params) {
        Ok(engine) => {
            log::info!("whisper model loaded: {}", model_path.display());
            Arc::new(engine)
        }
        Err(e) => {
            log::warn!(
                "Could not load whisper model ({}): {e}. Transcription will be unavailable.",
                model_path.display()
            );
            Arc::new(NoModelEngine::new(model_path.display().to_string()))
        }
    };

    let handoff = Arc::new(TranscriptionHandoff::with_silence_floor(
        engine,
        config.audio.silence_floor,
    ));

    // 5. Audio recorder + level-meter task
    let (recorder, mut level_rx) = AudioRecorder::new(
        Box::new(SystemPermission),
        config.audio.level_gain,
        config.audio.max_samples(),
        config.audio.input_device.clone(),
    );

    // A UI overlay would subscribe to the bar heights here; without one
    // they go to trace logging.
    rt.spawn(async move {
        let meter = LevelMeter::default();
        while level_rx.changed().await.is_ok() {
            let level = *level_rx.borrow_and_update();
            log::trace!("level {level:.3} bars {:?}", meter.bars(level));
        }
    });

    // 6. Hotkey listener thread
    let key = parse_key(&config.hotkey.key).unwrap_or_else(|| {
        log::warn!("Unknown hotkey {:?}; falling back to Fn", config.hotkey.key);
        rdev::Key::Function
    });
    let (edge_tx, edge_rx) = mpsc::channel::<KeyEdge>(16);
    let key_held = Arc::new(AtomicBool::new(false));
    let _hotkey_listener = HotkeyListener::start(key, edge_tx, Arc::clone(&key_held));
    log::info!("push-to-talk on {:?} (hold to record)", key);

    // 7. Orchestrator on the main thread
    let sink: Arc<dyn TextSink> = Arc::new(TextInjector::new(
        config.inject.flush_delay_ms,
        config.inject.settle_delay_ms,
    ));
    let history = Arc::new(Mutex::new(History::open(&paths.history_file)));

    let orchestrator = PipelineOrchestrator::new(
        Box::new(recorder),
        handoff,
        sink,
        history,
        key_held,
        Duration::from_millis(config.hotkey.debounce_ms),
    );

    rt.block_on(orchestrator.run(edge_rx));
    Ok(())
}
