//! Speech signal feed between the playback side and the render loop.
//!
//! Playback (TTS fetch, decoding, audio output) runs asynchronously and
//! publishes owned snapshots. The render loop never blocks on it: each frame
//! it drains whatever arrived and keeps the most recent snapshot.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

use crate::audio::AudioInput;
use crate::phoneme::Language;

/// What the playback side knows about speech at one instant
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSignal {
    pub is_speaking: bool,
    /// Current word, phoneme code or mora
    pub token: Option<String>,
    pub language: Language,
    /// Pre-computed level in [0, 1]
    pub audio_level: Option<f32>,
    /// Raw PCM for this frame
    pub pcm: Option<Vec<f32>>,
    /// Frequency-bin magnitudes for this frame, lowest bin first
    pub spectrum: Option<Vec<f32>>,
    /// Dominant frequency in Hz
    pub frequency_hint: Option<f32>,
    /// Utterance progress, 0 to 100
    pub progress: f32,
}

impl SpeechSignal {
    /// A silent snapshot
    pub fn silent() -> Self {
        Self::default()
    }

    /// A speaking snapshot with a token and explicit level
    pub fn speaking(token: &str, audio_level: f32) -> Self {
        Self {
            is_speaking: true,
            token: Some(token.to_string()),
            audio_level: Some(audio_level),
            ..Default::default()
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_frequency_hint(mut self, hz: f32) -> Self {
        self.frequency_hint = Some(hz);
        self
    }

    pub fn with_pcm(mut self, samples: Vec<f32>) -> Self {
        self.pcm = Some(samples);
        self
    }

    pub fn with_spectrum(mut self, bins: Vec<f32>) -> Self {
        self.spectrum = Some(bins);
        self
    }

    pub fn with_progress(mut self, progress: f32) -> Self {
        self.progress = progress.clamp(0.0, 100.0);
        self
    }

    /// Token with surrounding whitespace removed, if non-empty
    pub fn token(&self) -> Option<&str> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Best available audio data: level, then PCM, then spectrum.
    pub fn audio_input(&self) -> AudioInput<'_> {
        if let Some(level) = self.audio_level {
            AudioInput::Level(level)
        } else if let Some(pcm) = self.pcm.as_deref().filter(|p| !p.is_empty()) {
            AudioInput::Pcm(pcm)
        } else if let Some(bins) = self.spectrum.as_deref().filter(|b| !b.is_empty()) {
            AudioInput::Spectrum(bins)
        } else {
            AudioInput::None
        }
    }
}

/// Publishing side of the feed
#[derive(Debug, Clone)]
pub struct SpeechFeed {
    tx: broadcast::Sender<SpeechSignal>,
}

impl SpeechFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish a snapshot. Returns the number of receivers reached.
    pub fn publish(&self, signal: SpeechSignal) -> usize {
        // No receivers is fine: nothing is rendering yet
        self.tx.send(signal).unwrap_or(0)
    }

    /// Subscribe a render loop
    pub fn subscribe(&self) -> SignalReceiver {
        SignalReceiver {
            rx: self.tx.subscribe(),
            latest: SpeechSignal::silent(),
            closed: false,
        }
    }
}

impl Default for SpeechFeed {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Render-loop side of the feed
#[derive(Debug)]
pub struct SignalReceiver {
    rx: broadcast::Receiver<SpeechSignal>,
    latest: SpeechSignal,
    closed: bool,
}

impl SignalReceiver {
    /// Drain pending snapshots without blocking and return the newest.
    pub fn latest(&mut self) -> &SpeechSignal {
        loop {
            match self.rx.try_recv() {
                Ok(signal) => {
                    self.latest = signal;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Lagged(n)) => {
                    tracing::debug!("Speech feed receiver lagged by {} messages", n);
                    // Continue draining
                }
                Err(TryRecvError::Closed) => {
                    if !self.closed {
                        tracing::debug!("Speech feed closed");
                        // The utterance cannot continue without a producer
                        self.latest = SpeechSignal::silent();
                    }
                    self.closed = true;
                    break;
                }
            }
        }
        &self.latest
    }

    /// Has the publishing side gone away?
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
