//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across
//! threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// HotkeyConfig
// ---------------------------------------------------------------------------

/// Push-to-talk key binding and debounce tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotkeyConfig {
    /// Push-to-talk key name (e.g. `"Fn"`, `"F9"`).  Parsed with
    /// [`crate::hotkey::parse_key`].
    pub key: String,
    /// Milliseconds a press must be held before recording starts.  Presses
    /// shorter than this are treated as accidental key flickers.
    pub debounce_ms: u64,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            key: "Fn".into(),
            debounce_ms: 50,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Audio capture and level-meter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// RMS boost applied to the amplitude level shown in the meter.  The
    /// default of 20 suits common laptop microphone gain; quieter setups
    /// may need more.
    pub level_gain: f32,
    /// Maximum recording length in seconds; audio past this point is
    /// dropped rather than buffered.
    pub max_recording_secs: f32,
    /// Peak amplitude below which a finished recording counts as silence
    /// and is not transcribed.
    pub silence_floor: f32,
    /// Input device name — `None` means the system default.
    pub input_device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            level_gain: crate::audio::DEFAULT_LEVEL_GAIN,
            max_recording_secs: 300.0,
            silence_floor: 0.01,
            input_device: None,
        }
    }
}

impl AudioConfig {
    /// Session ceiling in canonical samples.
    pub fn max_samples(&self) -> usize {
        (self.max_recording_secs * crate::audio::CANONICAL_SAMPLE_RATE as f32) as usize
    }
}

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for the whisper speech engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    /// GGML model file stem (e.g. `"ggml-base.en"`), resolved under the
    /// models directory.
    pub model: String,
    /// ISO-639-1 language code, or `"auto"` for language detection.
    pub language: String,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: "ggml-base.en".into(),
            language: "en".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// InjectConfig
// ---------------------------------------------------------------------------

/// Delays for the clipboard-paste injection sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectConfig {
    /// Milliseconds between setting the clipboard and simulating paste.
    pub flush_delay_ms: u64,
    /// Milliseconds between the paste and restoring the old clipboard.
    pub settle_delay_ms: u64,
}

impl Default for InjectConfig {
    fn default() -> Self {
        Self {
            flush_delay_ms: 50,
            settle_delay_ms: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use dictate::config::AppConfig;
///
/// // Load (returns Default when the file is missing)
/// let config = AppConfig::load().unwrap();
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Push-to-talk key binding.
    pub hotkey: HotkeyConfig,
    /// Capture / level-meter settings.
    pub audio: AudioConfig,
    /// Speech-engine settings.
    pub stt: SttConfig,
    /// Text-injection delays.
    pub inject: InjectConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a
    /// missing file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// A default `AppConfig` must survive a TOML round trip unchanged.
    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.hotkey.key, loaded.hotkey.key);
        assert_eq!(original.hotkey.debounce_ms, loaded.hotkey.debounce_ms);
        assert_eq!(original.audio.level_gain, loaded.audio.level_gain);
        assert_eq!(
            original.audio.max_recording_secs,
            loaded.audio.max_recording_secs
        );
        assert_eq!(original.audio.silence_floor, loaded.audio.silence_floor);
        assert_eq!(original.audio.input_device, loaded.audio.input_device);
        assert_eq!(original.stt.model, loaded.stt.model);
        assert_eq!(original.stt.language, loaded.stt.language);
        assert_eq!(original.inject.flush_delay_ms, loaded.inject.flush_delay_ms);
    }

    /// `load_from` on a non-existent path must return defaults without
    /// error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        let default = AppConfig::default();

        assert_eq!(config.hotkey.key, default.hotkey.key);
        assert_eq!(config.audio.level_gain, default.audio.level_gain);
        assert_eq!(config.stt.model, default.stt.model);
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.hotkey.key, "Fn");
        assert_eq!(cfg.hotkey.debounce_ms, 50);
        assert_eq!(cfg.audio.level_gain, 20.0);
        assert_eq!(cfg.audio.max_recording_secs, 300.0);
        assert_eq!(cfg.audio.silence_floor, 0.01);
        assert!(cfg.audio.input_device.is_none());
        assert_eq!(cfg.stt.language, "en");
    }

    /// 300 s at 16 kHz is the 4.8 M sample ceiling.
    #[test]
    fn default_ceiling_is_4_8_million_samples() {
        assert_eq!(AudioConfig::default().max_samples(), 4_800_000);
    }

    /// Modified non-default values survive a round trip.
    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.hotkey.key = "F9".into();
        cfg.hotkey.debounce_ms = 80;
        cfg.audio.level_gain = 12.5;
        cfg.audio.input_device = Some("USB Mic".into());
        cfg.stt.language = "de".into();
        cfg.inject.settle_delay_ms = 250;

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.hotkey.key, "F9");
        assert_eq!(loaded.hotkey.debounce_ms, 80);
        assert_eq!(loaded.audio.level_gain, 12.5);
        assert_eq!(loaded.audio.input_device.as_deref(), Some("USB Mic"));
        assert_eq!(loaded.stt.language, "de");
        assert_eq!(loaded.inject.settle_delay_ms, 250);
    }
}
