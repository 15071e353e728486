//! Streaming audio level analysis for lip-sync.
//!
//! Converts whatever the playback side can provide each frame (an explicit
//! level, a PCM block, or frequency-bin energies) into a smoothed,
//! peak-aware level plus a coarse frequency modifier.

use std::collections::VecDeque;

use crate::config::AudioConfig;

/// Audio data available for one frame, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AudioInput<'a> {
    /// Pre-computed level in [0, 1]
    Level(f32),
    /// Raw PCM samples
    Pcm(&'a [f32]),
    /// Frequency-bin magnitudes, lowest bin first
    Spectrum(&'a [f32]),
    #[default]
    None,
}

/// Coarse vowel/consonant proxy derived from the dominant frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyModifier {
    /// Factor on jaw-family channels
    pub jaw: f32,
    /// Factor on mouth-width channels
    pub width: f32,
}

impl Default for FrequencyModifier {
    fn default() -> Self {
        Self {
            jaw: 1.0,
            width: 1.0,
        }
    }
}

/// Analyzer output for one frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioFrame {
    /// Smoothed level, always >= 0
    pub level: f32,
    /// A syllable peak was flagged this frame
    pub peak: bool,
    pub modifier: FrequencyModifier,
    /// Speaking without any audio data; the nominal amplitude was used
    pub data_absent: bool,
}

/// RMS of a sample block
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// RMS of the lower half of a spectrum, which approximates voiced energy.
pub fn lower_half_rms(bins: &[f32]) -> f32 {
    let half = bins.len().div_ceil(2);
    rms(&bins[..half])
}

/// Smoothed, peak-aware audio level tracker
#[derive(Debug, Clone)]
pub struct AudioLevelAnalyzer {
    config: AudioConfig,
    history: VecDeque<f32>,
    smoothed: f32,
    /// Seconds since the analyzer was created or reset
    clock: f32,
    last_peak_at: Option<f32>,
}

impl AudioLevelAnalyzer {
    pub fn new(config: &AudioConfig) -> Self {
        let capacity = config.history_len.max(1);
        Self {
            config: config.clone(),
            history: VecDeque::with_capacity(capacity),
            smoothed: 0.0,
            clock: 0.0,
            last_peak_at: None,
        }
    }

    /// Instantaneous level for an input, or `None` when no data is present.
    pub fn measure(&self, input: AudioInput<'_>) -> Option<f32> {
        let level = match input {
            AudioInput::Level(level) => level,
            AudioInput::Pcm(samples) if !samples.is_empty() => rms(samples) * self.config.pcm_gain,
            AudioInput::Spectrum(bins) if !bins.is_empty() => {
                lower_half_rms(bins) * self.config.spectrum_gain
            }
            _ => return None,
        };
        if level.is_nan() {
            return None;
        }
        Some(level.clamp(0.0, 1.0))
    }

    /// Frequency modifier for a dominant-frequency hint in Hz.
    pub fn frequency_modifier(&self, hint: Option<f32>) -> FrequencyModifier {
        match hint {
            Some(hz) if hz > 0.0 && hz < self.config.low_freq_hz => FrequencyModifier {
                jaw: self.config.low_freq_jaw_factor,
                width: 1.0,
            },
            Some(hz) if hz > self.config.high_freq_hz => FrequencyModifier {
                jaw: 1.0,
                width: self.config.high_freq_width_factor,
            },
            _ => FrequencyModifier::default(),
        }
    }

    /// Advance one frame.
    pub fn update(
        &mut self,
        is_speaking: bool,
        input: AudioInput<'_>,
        frequency_hint: Option<f32>,
        dt: f32,
    ) -> AudioFrame {
        self.clock += dt.max(0.0);

        if !is_speaking {
            self.push_history(0.0);
            self.decay();
            return AudioFrame {
                level: self.smoothed,
                ..Default::default()
            };
        }

        let (instant, data_absent) = match self.measure(input) {
            Some(level) => (level, false),
            None => (self.config.nominal_amplitude, true),
        };

        self.push_history(instant);
        let alpha = self.config.smoothing;
        self.smoothed = (alpha * instant + (1.0 - alpha) * self.smoothed).max(0.0);

        AudioFrame {
            level: self.smoothed,
            peak: self.detect_peak(instant),
            modifier: self.frequency_modifier(frequency_hint),
            data_absent,
        }
    }

    fn decay(&mut self) {
        self.smoothed *= self.config.silence_decay;
        if self.smoothed < 1e-4 {
            self.smoothed = 0.0;
        }
    }

    fn detect_peak(&mut self, instant: f32) -> bool {
        if instant <= self.config.peak_threshold {
            return false;
        }
        let interval = self.config.peak_interval_ms as f32 / 1000.0;
        let due = match self.last_peak_at {
            Some(last) => self.clock - last >= interval,
            None => true,
        };
        if due {
            self.last_peak_at = Some(self.clock);
        }
        due
    }

    fn push_history(&mut self, level: f32) {
        if self.history.len() >= self.config.history_len.max(1) {
            self.history.pop_front();
        }
        self.history.push_back(level);
    }

    /// Current smoothed level
    pub fn level(&self) -> f32 {
        self.smoothed
    }

    /// Recent instantaneous levels, oldest first
    pub fn history(&self) -> impl Iterator<Item = f32> + '_ {
        self.history.iter().copied()
    }

    /// Time of the last flagged peak, in analyzer seconds
    pub fn last_peak_at(&self) -> Option<f32> {
        self.last_peak_at
    }

    /// Drop all history and return to silence immediately
    pub fn reset(&mut self) {
        self.history.clear();
        self.smoothed = 0.0;
        self.clock = 0.0;
        self.last_peak_at = None;
    }
}
