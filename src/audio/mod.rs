//! Audio processing module
//!
//! Turns per-frame amplitude and frequency data into the modulation signal
//! the blender uses.

pub mod analyzer;
pub mod spectrum;

pub use analyzer::{AudioFrame, AudioInput, AudioLevelAnalyzer, FrequencyModifier};
pub use spectrum::{Spectrum, SpectrumAnalyzer};
