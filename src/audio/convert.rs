//! Conversion from the hardware capture format to the canonical format.
//!
//! The speech engine requires **16 kHz mono `f32`** audio
//! ([`CANONICAL_SAMPLE_RATE`]).  Hardware devices deliver whatever they
//! like (commonly 44.1 or 48 kHz, often stereo), so every captured chunk
//! passes through two steps:
//!
//! 1. [`downmix_to_mono`] — average interleaved channels into one.
//! 2. [`StreamConverter`] — resample to 16 000 Hz with linear
//!    interpolation, carrying the fractional read position **across chunk
//!    boundaries** so a stream fed chunk-by-chunk produces the same samples
//!    as the whole buffer converted at once.
//!
//! [`CANONICAL_SAMPLE_RATE`]: crate::audio::CANONICAL_SAMPLE_RATE

use crate::audio::CANONICAL_SAMPLE_RATE;

// ---------------------------------------------------------------------------
// downmix_to_mono
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging channels.
///
/// The output length is `samples.len() / channels`.
///
/// * `channels == 1` returns the input as an owned `Vec` unchanged.
/// * `channels == 0` returns an empty vector.
///
/// # Example
///
/// ```rust
/// use dictate::audio::downmix_to_mono;
///
/// let stereo = vec![0.5_f32, -0.5, 0.2, -0.2]; // L R L R
/// let mono = downmix_to_mono(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[0] - 0.0).abs() < 1e-6);
/// assert!((mono[1] - 0.0).abs() < 1e-6);
/// ```
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// StreamConverter
// ---------------------------------------------------------------------------

/// Streaming hardware-format → canonical-format converter.
///
/// One converter is constructed per capture session from the device's
/// native sample rate and channel count.  [`convert`](Self::convert) is
/// called once per captured chunk, in arrival order; the converter keeps
/// the unconsumed tail of the previous chunk plus the fractional read
/// position, so interpolation windows spanning a chunk boundary are
/// handled exactly like windows inside a chunk.
///
/// # Example
///
/// ```rust
/// use dictate::audio::StreamConverter;
///
/// // 48 kHz mono → 16 kHz: 480 input samples become 160 output samples.
/// let mut conv = StreamConverter::new(48_000, 1);
/// let out = conv.convert(&vec![0.5_f32; 480]);
/// assert_eq!(out.len(), 160);
/// ```
#[derive(Debug)]
pub struct StreamConverter {
    source_rate: u32,
    channels: u16,
    /// Fractional read position into `carry ++ next chunk`, in source samples.
    pos: f64,
    /// Unconsumed tail of the previous chunk (mono, source rate).
    carry: Vec<f32>,
}

impl StreamConverter {
    /// Create a converter for a device delivering `source_rate` Hz audio
    /// with `channels` interleaved channels.
    pub fn new(source_rate: u32, channels: u16) -> Self {
        Self {
            source_rate,
            channels,
            pos: 0.0,
            carry: Vec::new(),
        }
    }

    /// Convert one interleaved hardware-format chunk to canonical samples.
    ///
    /// Output ordering follows input ordering; feeding a stream chunk by
    /// chunk and concatenating the outputs yields the same sample sequence
    /// as converting the concatenated input (modulo a trailing
    /// interpolation window that only resolves once more input arrives).
    pub fn convert(&mut self, interleaved: &[f32]) -> Vec<f32> {
        let mono = downmix_to_mono(interleaved, self.channels);

        // Already at the canonical rate — no interpolation needed.
        if self.source_rate == CANONICAL_SAMPLE_RATE {
            return mono;
        }
        if mono.is_empty() {
            return Vec::new();
        }

        let step = self.source_rate as f64 / CANONICAL_SAMPLE_RATE as f64;

        let mut buf = std::mem::take(&mut self.carry);
        buf.extend_from_slice(&mono);

        let mut out = Vec::with_capacity((buf.len() as f64 / step).ceil() as usize + 1);
        let mut pos = self.pos;

        while (pos as usize) + 1 < buf.len() {
            let idx = pos as usize;
            let frac = (pos - idx as f64) as f32;
            out.push(buf[idx] * (1.0 - frac) + buf[idx + 1] * frac);
            pos += step;
        }

        // Keep the samples still inside the next interpolation window.
        let consumed = (pos as usize).min(buf.len());
        self.carry = buf.split_off(consumed);
        self.pos = pos - consumed as f64;

        out
    }

    /// Discard carried state so the converter can start a fresh stream.
    pub fn reset(&mut self) {
        self.pos = 0.0;
        self.carry.clear();
    }

    /// Source sample rate this converter was built for, in Hz.
    pub fn source_rate(&self) -> u32 {
        self.source_rate
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
