//! Per-frame blending of speech, emotion, blink and idle layers.
//!
//! The blender is rig-agnostic: everything character-specific is read from
//! the `RigProfile`. All mutable state lives in the avatar's
//! `AnimationFrameState`, so one blender can serve any number of avatars.

use std::collections::HashSet;
use std::sync::Arc;

use rand::Rng;

use crate::audio::AudioFrame;
use crate::avatar::{AnimationFrameState, EmotionLibrary, SpeechPhase};
use crate::channels::{
    ChannelFamily, MorphWeights, BROW_DOWN, CHEEK_SQUINT, JAW_OPEN, MOUTH_WIDTH_CHANNELS,
};
use crate::config::AudioConfig;
use crate::error::LipSyncError;
use crate::feed::SpeechSignal;
use crate::phoneme::{fallback_shape, Language, PhonemeResolver};
use crate::rig::RigProfile;

use super::bones::BoneDeltas;
use super::idle::HeadMotion;

/// Result of one frame
#[derive(Debug, Clone, Default)]
pub struct FrameOutput {
    pub phase: SpeechPhase,
    /// Final channel map, every value within the rig ceiling
    pub channels: MorphWeights,
    /// Logical bone deltas (head plus any secondary drive)
    pub bones: BoneDeltas,
    pub head: HeadMotion,
    pub audio_level: f32,
    /// A syllable peak was flagged this frame
    pub peak: bool,
    pub blink_started: bool,
    /// Emotion preset targeted this frame
    pub emotion: String,
    /// Degradations hit this frame; the frame still completed
    pub issues: Vec<LipSyncError>,
    pub frame: u64,
}

impl FrameOutput {
    /// Neutral output, as after a hard stop
    pub fn neutral() -> Self {
        Self::default()
    }
}

/// Stateless frame pipeline shared by avatar instances
#[derive(Debug, Clone)]
pub struct Blender {
    resolver: Arc<PhonemeResolver>,
    emotions: Arc<EmotionLibrary>,
    audio: AudioConfig,
}

impl Default for Blender {
    fn default() -> Self {
        Self::new(
            Arc::new(PhonemeResolver::new()),
            Arc::new(EmotionLibrary::with_builtins()),
            AudioConfig::default(),
        )
    }
}

impl Blender {
    pub fn new(
        resolver: Arc<PhonemeResolver>,
        emotions: Arc<EmotionLibrary>,
        audio: AudioConfig,
    ) -> Self {
        Self {
            resolver,
            emotions,
            audio,
        }
    }

    pub fn resolver(&self) -> &PhonemeResolver {
        &self.resolver
    }

    pub fn emotions(&self) -> &EmotionLibrary {
        &self.emotions
    }

    pub fn audio_config(&self) -> &AudioConfig {
        &self.audio
    }

    /// Speech-layer target for one token: resolve, modulate by audio, apply
    /// rig multipliers and clamp.
    ///
    /// Tokens without a shape fall back to a slightly open mouth; speaking
    /// without any token (between words) uses the same shape silently.
    pub fn speech_target(
        &self,
        token: Option<&str>,
        language: Language,
        rig: &RigProfile,
        audio: &AudioFrame,
    ) -> (MorphWeights, Option<LipSyncError>) {
        let (base, issue) = match token {
            Some(token) => match self.resolver.try_resolve(token, language, rig) {
                Ok(shape) => (shape, None),
                Err(e) => (fallback_shape(), Some(e)),
            },
            None => (fallback_shape(), None),
        };

        let tuning = &rig.tuning;
        let modulation = tuning.audio_floor + (1.0 - tuning.audio_floor) * audio.level;
        let boost_jaw = base.get(JAW_OPEN) > 0.0;

        let mut target = MorphWeights::new();
        for (channel, weight) in base.iter() {
            let family = ChannelFamily::of(channel);

            let mut value = weight * modulation;
            if family == ChannelFamily::Jaw {
                value *= audio.modifier.jaw;
            }
            if MOUTH_WIDTH_CHANNELS.contains(&channel) {
                value *= audio.modifier.width;
            }
            // Opening tracks loudness even for shapes with a small nominal jaw
            if channel == JAW_OPEN && boost_jaw {
                value += tuning.jaw_boost * audio.level;
            }

            value *= rig.multiplier_for(family);
            target.set(channel, value.min(rig.max_morph_clamp));
        }
        target.prune(tuning.epsilon);

        (target, issue)
    }

    /// Run one frame for one avatar.
    pub fn blend<R: Rng + ?Sized>(
        &self,
        state: &mut AnimationFrameState,
        rig: &RigProfile,
        signal: &SpeechSignal,
        dt: f32,
        rng: &mut R,
    ) -> FrameOutput {
        let tuning = &rig.tuning;
        let mut issues = Vec::new();

        let phase = SpeechPhase::from_speaking(signal.is_speaking);
        if phase != state.phase {
            tracing::debug!("Speech phase {} -> {}", state.phase, phase);
            state.phase = phase;
            state.idle_frames = 0;
        }
        state.frame += 1;

        let audio = state.audio.update(
            signal.is_speaking,
            signal.audio_input(),
            signal.frequency_hint,
            dt,
        );
        if audio.data_absent {
            issues.push(LipSyncError::AudioDataAbsent);
        }

        // Speech layer
        if phase.is_speaking() {
            let (target, issue) = self.speech_target(signal.token(), signal.language, rig, &audio);
            issues.extend(issue);
            // Fast attack: no inter-frame smoothing while speaking
            state.active_channels = target;
        } else if !state.active_channels.is_empty() {
            state.idle_frames += 1;
            if state.idle_frames >= tuning.release_frames {
                state.active_channels.clear();
            } else {
                state.active_channels.scale(tuning.idle_decay);
                state.active_channels.prune(tuning.epsilon);
            }
        }

        // Emotion layer
        let emotion = state.emotion_name(rig).to_string();
        self.ease_emotion(state, rig, &emotion);

        let mut channels = state.active_channels.clone();
        for (channel, value) in state.emotion_channels.iter() {
            let merged = (channels.get(channel) + value * tuning.emotion_blend).min(1.0);
            channels.set(channel, merged);
        }

        // Blink layer
        let blink = state.blink.update(dt, rig, rng);
        if blink.closure > 0.0 {
            for channel in &rig.blink_channels {
                let value = channels.get(channel).max(blink.closure);
                channels.set(channel, value);
            }
            if rig.micro_motion > 0.0 {
                let squint = channels.get(CHEEK_SQUINT) + blink.closure * rig.micro_motion;
                channels.set(CHEEK_SQUINT, squint);
                let brow = channels.get(BROW_DOWN) + blink.closure * rig.micro_motion * 0.5;
                channels.set(BROW_DOWN, brow);
            }
        }

        channels.clamp_all(rig.max_morph_clamp);
        channels.prune(tuning.epsilon);

        let head = state
            .idle
            .update(dt, phase.is_speaking(), audio.peak, rig.idle_sway);

        FrameOutput {
            phase,
            channels,
            bones: BoneDeltas::new(),
            head,
            audio_level: audio.level,
            peak: audio.peak,
            blink_started: blink.started,
            emotion,
            issues,
            frame: state.frame,
        }
    }

    /// Ease the emotion layer toward the named preset.
    fn ease_emotion(&self, state: &mut AnimationFrameState, rig: &RigProfile, name: &str) {
        let empty = MorphWeights::new();
        let target = self
            .emotions
            .get(name)
            .map(|preset| &preset.weights)
            .unwrap_or(&empty);

        let rate = rig.tuning.emotion_ease_rate;
        let current = &state.emotion_channels;
        let names: HashSet<&str> = target.channels().chain(current.channels()).collect();

        let mut next = MorphWeights::new();
        for channel in names {
            let value = current.get(channel);
            next.set(channel, value + (target.get(channel) - value) * rate);
        }
        next.prune(rig.tuning.epsilon);
        state.emotion_channels = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::FrequencyModifier;
    use crate::channels::{MOUTH_CLOSE, MOUTH_OPEN, MOUTH_STRETCH};
    use crate::rig::RigRegistry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const DT: f32 = 1.0 / 60.0;

    fn loud() -> AudioFrame {
        AudioFrame {
            level: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_speech_target_full_level() {
        let blender = Blender::default();
        let rig = RigProfile::default();
        let (target, issue) = blender.speech_target(Some("あ"), Language::Japanese, &rig, &loud());
        assert!(issue.is_none());
        // 0.7 at full modulation plus the jaw boost
        assert!((target.get(JAW_OPEN) - 0.85).abs() < 1e-5);
        assert!((target.get(MOUTH_OPEN) - 0.6).abs() < 1e-5);
    }

    #[test]
    fn test_speech_target_quiet_keeps_floor() {
        let blender = Blender::default();
        let rig = RigProfile::default();
        let (target, _) =
            blender.speech_target(Some("あ"), Language::Japanese, &rig, &AudioFrame::default());
        assert!((target.get(JAW_OPEN) - 0.7 * rig.tuning.audio_floor).abs() < 1e-5);
    }

    #[test]
    fn test_bilabial_keeps_jaw_shut() {
        let blender = Blender::default();
        let rig = RigProfile::default();
        let (target, _) = blender.speech_target(Some("M"), Language::English, &rig, &loud());
        assert!(target.get(JAW_OPEN) < 0.05);
        assert!(target.get(MOUTH_CLOSE) > 0.5);
    }

    #[test]
    fn test_unresolved_token_reports_and_falls_back() {
        let blender = Blender::default();
        let rig = RigProfile::default();
        let (target, issue) = blender.speech_target(Some("Ω"), Language::Japanese, &rig, &loud());
        assert_eq!(issue, Some(LipSyncError::UnresolvedToken("Ω".to_string())));
        assert!(target.get(JAW_OPEN) > 0.0);
        assert!(target.get(MOUTH_OPEN) > 0.0);
    }

    #[test]
    fn test_frequency_modifier_applied() {
        let blender = Blender::default();
        let rig = RigProfile::default();
        let narrow = AudioFrame {
            level: 0.5,
            modifier: FrequencyModifier {
                jaw: 1.0,
                width: 0.8,
            },
            ..Default::default()
        };
        let plain = AudioFrame {
            level: 0.5,
            ..Default::default()
        };
        let (a, _) = blender.speech_target(Some("い"), Language::Japanese, &rig, &plain);
        let (b, _) = blender.speech_target(Some("い"), Language::Japanese, &rig, &narrow);
        assert!((b.get(MOUTH_STRETCH) - a.get(MOUTH_STRETCH) * 0.8).abs() < 1e-5);
        assert!((b.get(JAW_OPEN) - a.get(JAW_OPEN)).abs() < 1e-6);
    }

    #[test]
    fn test_multipliers_and_ceiling() {
        let blender = Blender::default();
        let registry = RigRegistry::with_builtins();
        let teen = registry.get("teen").unwrap();
        let (target, _) = blender.speech_target(Some("あ"), Language::Japanese, &teen, &loud());
        assert!(target.max_value() <= teen.max_morph_clamp + 1e-6);
        assert!((target.get(JAW_OPEN) - teen.max_morph_clamp).abs() < 1e-5);
    }

    #[test]
    fn test_emotion_eases_slowly() {
        let blender = Blender::default();
        let rig = RigProfile::default();
        let mut rng = StdRng::seed_from_u64(5);
        let mut state = AnimationFrameState::new(&rig, blender.audio_config(), &mut rng);
        let signal = SpeechSignal::speaking("あ", 0.5);

        blender.blend(&mut state, &rig, &signal, DT, &mut rng);
        let first = state.emotion_channels.get(crate::channels::MOUTH_SMILE);
        assert!(first > 0.0 && first < 0.05, "emotion jumped to {first}");

        for _ in 0..200 {
            blender.blend(&mut state, &rig, &signal, DT, &mut rng);
        }
        let settled = state.emotion_channels.get(crate::channels::MOUTH_SMILE);
        assert!((settled - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_phase_transitions() {
        let blender = Blender::default();
        let rig = RigProfile::default();
        let mut rng = StdRng::seed_from_u64(5);
        let mut state = AnimationFrameState::new(&rig, blender.audio_config(), &mut rng);

        let out = blender.blend(&mut state, &rig, &SpeechSignal::speaking("お", 0.7), DT, &mut rng);
        assert_eq!(out.phase, SpeechPhase::Speaking);
        assert_eq!(out.emotion, "friendly");
        assert!(!state.active_channels.is_empty());

        let out = blender.blend(&mut state, &rig, &SpeechSignal::silent(), DT, &mut rng);
        assert_eq!(out.phase, SpeechPhase::Idle);
        assert_eq!(out.emotion, "neutral");
        assert_eq!(state.idle_frames, 1);
    }

    #[test]
    fn test_missing_audio_reported() {
        let blender = Blender::default();
        let rig = RigProfile::default();
        let mut rng = StdRng::seed_from_u64(5);
        let mut state = AnimationFrameState::new(&rig, blender.audio_config(), &mut rng);
        let signal = SpeechSignal {
            is_speaking: true,
            token: Some("あ".to_string()),
            ..Default::default()
        };

        let out = blender.blend(&mut state, &rig, &signal, DT, &mut rng);
        assert!(out.issues.contains(&LipSyncError::AudioDataAbsent));
        // The mouth still moves
        assert!(out.channels.get(JAW_OPEN) > 0.3);
    }

    #[test]
    fn test_micro_motion_couples_to_blink() {
        let blender = Blender::default();
        let registry = RigRegistry::with_builtins();
        let expressive = registry.get("expressive").unwrap();
        let rig = RigProfile {
            blink_interval_seconds: 0.05,
            blink_jitter_seconds: 0.0,
            idle_emotion: "neutral".to_string(),
            ..(*expressive).clone()
        };
        let mut rng = StdRng::seed_from_u64(9);
        let mut state = AnimationFrameState::new(&rig, blender.audio_config(), &mut rng);

        let mut saw_blink = false;
        for _ in 0..12 {
            let out = blender.blend(&mut state, &rig, &SpeechSignal::silent(), DT, &mut rng);
            let closure = out.channels.get(crate::channels::EYE_BLINK_LEFT);
            if closure > 0.2 {
                saw_blink = true;
                assert!(out.channels.get(CHEEK_SQUINT) > 0.0);
                assert!(out.channels.get(BROW_DOWN) > 0.0);
            }
        }
        assert!(saw_blink);
    }
}
