//! PCM → magnitude spectrum, for playback code that only has raw audio.
//!
//! Runs outside the per-frame hot loop; the render loop only sees the bins
//! and the dominant-frequency hint it produces.

use std::sync::Arc;

use rustfft::num_complex::Complex32;
use rustfft::{Fft, FftPlanner};

/// One analysed block
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Spectrum {
    /// Magnitudes for bins `0..fft_len/2`, normalised so the loudest is 1.0
    pub bins: Vec<f32>,
    /// Frequency of the loudest non-DC bin, if the block was not silent
    pub dominant_hz: Option<f32>,
}

/// Hann-windowed forward FFT with a cached plan
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    sample_rate: u32,
    buffer: Vec<Complex32>,
}

impl std::fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("fft_len", &self.window.len())
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

impl SpectrumAnalyzer {
    pub fn new(fft_len: usize, sample_rate: u32) -> Self {
        let fft_len = fft_len.max(2);
        let mut planner = FftPlanner::<f32>::new();
        Self {
            fft: planner.plan_fft_forward(fft_len),
            window: hann_window(fft_len),
            sample_rate,
            buffer: vec![Complex32::new(0.0, 0.0); fft_len],
        }
    }

    pub fn fft_len(&self) -> usize {
        self.window.len()
    }

    /// Frequency in Hz of bin `index`
    pub fn bin_hz(&self, index: usize) -> f32 {
        index as f32 * self.sample_rate as f32 / self.fft_len() as f32
    }

    /// Analyse one block. Short blocks are zero-padded, long ones truncated.
    pub fn analyze(&mut self, samples: &[f32]) -> Spectrum {
        for (i, (slot, w)) in self.buffer.iter_mut().zip(&self.window).enumerate() {
            let s = samples.get(i).copied().unwrap_or(0.0);
            *slot = Complex32::new(s * w, 0.0);
        }

        self.fft.process(&mut self.buffer);

        let half = self.fft_len() / 2;
        let mut bins: Vec<f32> = self.buffer[..half].iter().map(|c| c.norm()).collect();

        let (peak_index, peak) = bins
            .iter()
            .enumerate()
            .skip(1)
            .fold((0, 0.0f32), |best, (i, &m)| if m > best.1 { (i, m) } else { best });

        if peak <= f32::EPSILON {
            bins.iter_mut().for_each(|b| *b = 0.0);
            return Spectrum {
                bins,
                dominant_hz: None,
            };
        }

        let norm = bins.iter().copied().fold(0.0f32, f32::max);
        bins.iter_mut().for_each(|b| *b /= norm);

        Spectrum {
            bins,
            dominant_hz: Some(self.bin_hz(peak_index)),
        }
    }
}

fn hann_window(n: usize) -> Vec<f32> {
    let denom = (n - 1).max(1) as f32;
    (0..n)
        .map(|i| {
            let x = i as f32 / denom;
            0.5 - 0.5 * (2.0 * std::f32::consts::PI * x).cos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(hz: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * hz * i as f32 / sample_rate as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_dominant_frequency() {
        let mut analyzer = SpectrumAnalyzer::new(1024, 16_000);
        let spectrum = analyzer.analyze(&tone(500.0, 16_000, 1024));
        let hz = spectrum.dominant_hz.unwrap();
        assert!((hz - 500.0).abs() <= analyzer.bin_hz(1), "got {hz}");
        assert_eq!(spectrum.bins.len(), 512);
        assert!(spectrum.bins.iter().all(|b| (0.0..=1.0).contains(b)));
    }

    #[test]
    fn test_silence() {
        let mut analyzer = SpectrumAnalyzer::new(256, 16_000);
        let spectrum = analyzer.analyze(&[0.0; 256]);
        assert!(spectrum.dominant_hz.is_none());
        assert!(spectrum.bins.iter().all(|b| *b == 0.0));
    }

    #[test]
    fn test_short_block_is_padded() {
        let mut analyzer = SpectrumAnalyzer::new(512, 16_000);
        let spectrum = analyzer.analyze(&tone(1000.0, 16_000, 100));
        assert_eq!(spectrum.bins.len(), 256);
        assert!(spectrum.dominant_hz.is_some());
    }

    #[test]
    fn test_hann_window_endpoints() {
        let w = hann_window(8);
        assert!(w[0].abs() < 1e-6);
        assert!(w[7].abs() < 1e-6);
        assert!(w.iter().all(|v| (0.0..=1.0).contains(v)));
    }
}
