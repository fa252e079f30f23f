//! Amplitude envelope and level-meter bar heights for the recording
//! overlay.
//!
//! While a recording is active the capture pipeline computes one
//! [`chunk_level`] value per captured chunk (RMS energy, boosted and
//! clamped to `[0, 1]`) and publishes it to the UI side.  A UI consumes
//! the latest level through [`LevelMeter::bars`], which maps it onto a
//! small symmetric bar graph.
//!
//! # Example
//!
//! ```rust
//! use dictate::audio::{chunk_level, LevelMeter, BAR_COUNT};
//!
//! let level = chunk_level(&vec![0.02_f32; 1_024], 20.0);
//! assert!(level > 0.0 && level <= 1.0);
//!
//! let bars = LevelMeter::default().bars(level);
//! assert_eq!(bars.len(), BAR_COUNT);
//! ```

use rand::Rng;

/// Number of bars in the level meter.  Odd so the peak sits on a center
/// bar.
pub const BAR_COUNT: usize = 7;

/// Default RMS boost applied before clamping.
///
/// Raw microphone RMS for normal speech sits well below full scale, so the
/// level is multiplied up before display.  The factor is tied to typical
/// microphone gain and is exposed through `AudioConfig::level_gain` rather
/// than hardcoded at call sites.
pub const DEFAULT_LEVEL_GAIN: f32 = 20.0;

// ---------------------------------------------------------------------------
// chunk_level
// ---------------------------------------------------------------------------

/// Compute the amplitude level of one chunk: RMS energy × `gain`, clamped
/// to `[0.0, 1.0]`.
///
/// An empty chunk yields `0.0`.
pub fn chunk_level(samples: &[f32], gain: f32) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let mean_sq: f32 = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    (mean_sq.sqrt() * gain).clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// LevelMeter
// ---------------------------------------------------------------------------

/// Maps a scalar amplitude level onto [`BAR_COUNT`] bar heights.
///
/// Bars attenuate linearly with distance from the center index and each
/// bar gets a small random jitter in `[0.8, 1.2]` so the meter looks alive
/// at a steady level.  Heights are floor-clamped to `floor` (default
/// `0.05`) so silent input still renders a resting bar.
///
/// The transform is stateless per call; no history is kept beyond what the
/// caller displays.
#[derive(Debug, Clone)]
pub struct LevelMeter {
    /// Minimum bar height.
    pub floor: f32,
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self { floor: 0.05 }
    }
}

impl LevelMeter {
    /// Bar heights for `level`, with random per-bar jitter.
    pub fn bars(&self, level: f32) -> [f32; BAR_COUNT] {
        let mut rng = rand::rng();
        self.bars_with(level, |_| rng.random_range(0.8..=1.2))
    }

    /// Bar heights for `level` with an injected jitter source.
    ///
    /// `jitter` is called once per bar index and should return a factor in
    /// `[0.8, 1.2]`; pass `|_| 1.0` for a deterministic shape.
    pub fn bars_with<F>(&self, level: f32, mut jitter: F) -> [f32; BAR_COUNT]
    where
        F: FnMut(usize) -> f32,
    {
        let center = (BAR_COUNT - 1) as f32 / 2.0;
        let mut bars = [0.0_f32; BAR_COUNT];

        for (i, bar) in bars.iter_mut().enumerate() {
            let dist = (i as f32 - center).abs();
            // Linear falloff from the center; the +1 keeps the edge bars
            // above zero scale.
            let scale = 1.0 - dist / (center + 1.0);
            *bar = (level * scale * jitter(i)).max(self.floor);
        }

        bars
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
