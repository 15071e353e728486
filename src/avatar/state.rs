//! Per-avatar animation state machine

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::animation::{BlinkScheduler, IdleMotion};
use crate::audio::AudioLevelAnalyzer;
use crate::channels::MorphWeights;
use crate::config::AudioConfig;
use crate::rig::RigProfile;

/// Speech state of the blender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechPhase {
    /// Not speaking; speech channels decay
    #[default]
    Idle,
    /// Speaking; speech channels follow the target directly
    Speaking,
}

impl SpeechPhase {
    pub fn from_speaking(is_speaking: bool) -> Self {
        if is_speaking {
            Self::Speaking
        } else {
            Self::Idle
        }
    }

    pub fn is_speaking(&self) -> bool {
        matches!(self, Self::Speaking)
    }
}

impl std::fmt::Display for SpeechPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpeechPhase::Idle => write!(f, "idle"),
            SpeechPhase::Speaking => write!(f, "speaking"),
        }
    }
}

/// Mutable animation state owned by exactly one avatar instance.
///
/// Created on mount, dropped on unmount or model swap.
#[derive(Debug, Clone)]
pub struct AnimationFrameState {
    pub phase: SpeechPhase,
    /// Speech channels, before the emotion and blink layers
    pub active_channels: MorphWeights,
    /// Emotion layer, eased toward the active preset
    pub emotion_channels: MorphWeights,
    pub blink: BlinkScheduler,
    pub idle: IdleMotion,
    pub audio: AudioLevelAnalyzer,
    /// Consecutive idle frames since speech ended
    pub idle_frames: u32,
    /// Runtime emotion override; rig defaults apply when `None`
    pub emotion_override: Option<String>,
    /// Frames processed since mount or the last hard stop
    pub frame: u64,
}

impl AnimationFrameState {
    pub fn new<R: Rng + ?Sized>(rig: &RigProfile, audio: &AudioConfig, rng: &mut R) -> Self {
        Self {
            phase: SpeechPhase::Idle,
            active_channels: MorphWeights::new(),
            emotion_channels: MorphWeights::new(),
            blink: BlinkScheduler::new(rig, rng),
            idle: IdleMotion::new(),
            audio: AudioLevelAnalyzer::new(audio),
            idle_frames: 0,
            emotion_override: None,
            frame: 0,
        }
    }

    /// Name of the emotion preset currently targeted
    pub fn emotion_name<'a>(&'a self, rig: &'a RigProfile) -> &'a str {
        match &self.emotion_override {
            Some(name) => name,
            None if self.phase.is_speaking() => &rig.speaking_emotion,
            None => &rig.idle_emotion,
        }
    }

    /// Return every channel, timer and level to neutral at once.
    ///
    /// The emotion override is a caller choice and survives.
    pub fn reset<R: Rng + ?Sized>(&mut self, rig: &RigProfile, rng: &mut R) {
        self.phase = SpeechPhase::Idle;
        self.active_channels.clear();
        self.emotion_channels.clear();
        self.blink.reset(rig, rng);
        self.idle.reset();
        self.audio.reset();
        self.idle_frames = 0;
        self.frame = 0;
    }
}
