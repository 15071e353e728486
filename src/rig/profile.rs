//! Per-avatar rig profile

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::animation::{BlinkCurve, BoneDriveProfile};
use crate::channels::{
    ChannelFamily, MorphWeights, EYE_BLINK_LEFT, EYE_BLINK_RIGHT,
};
use crate::error::ConfigError;

/// Frame-rate tuning constants.
///
/// These were chosen by eye for perceptual quality; each rig may adjust them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationTuning {
    /// Weights below this are treated as zero and dropped
    pub epsilon: f32,
    /// Per-frame decay of speech channels after speaking ends
    pub idle_decay: f32,
    /// Idle frames after which any remaining speech channels are dropped
    pub release_frames: u32,
    /// Per-frame easing rate of emotion channels toward their preset
    pub emotion_ease_rate: f32,
    /// Share of the emotion layer added on top of speech
    pub emotion_blend: f32,
    /// Extra jaw opening at full amplitude
    pub jaw_boost: f32,
    /// Audio gain at zero amplitude, so quiet syllables still move the mouth
    pub audio_floor: f32,
}

impl Default for AnimationTuning {
    fn default() -> Self {
        Self {
            epsilon: 0.001,
            idle_decay: 0.85,
            release_frames: 10,
            emotion_ease_rate: 0.1,
            emotion_blend: 0.3,
            jaw_boost: 0.15,
            audio_floor: 0.35,
        }
    }
}

/// Immutable per-character configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigProfile {
    /// Unique profile id
    pub id: String,
    /// Display name for UI
    pub display_name: Option<String>,
    /// Case-insensitive substrings of a model path that select this profile
    pub match_patterns: Vec<String>,

    pub jaw_multiplier: f32,
    pub mouth_multiplier: f32,
    pub tongue_multiplier: f32,
    /// Ceiling applied to every output channel
    pub max_morph_clamp: f32,

    pub blink_interval_seconds: f32,
    /// Upper bound of the random delay added to each blink interval
    pub blink_jitter_seconds: f32,
    pub blink_duration_seconds: f32,
    pub blink_curve: BlinkCurve,
    pub blink_channels: Vec<String>,
    /// Cheek/brow motion coupled to blinks (0 disables)
    pub micro_motion: f32,

    /// Idle sway amplitude multiplier (0 disables)
    pub idle_sway: f32,
    /// Emotion preset while idle
    pub idle_emotion: String,
    /// Emotion preset while speaking
    pub speaking_emotion: String,

    /// Canonical channel → rig morph target names
    pub channel_aliases: HashMap<String, Vec<String>>,
    /// Logical bone (`head`, `jaw`, `teeth`, `tongue`) → rig bone name
    pub bone_aliases: HashMap<String, String>,
    /// Rig-specific mouth shapes keyed by token or phoneme code
    pub phoneme_table_override: Option<HashMap<String, MorphWeights>>,
    /// Jaw/teeth/tongue bone drive for rigs with limited blendshapes
    pub bone_drive: Option<BoneDriveProfile>,

    pub tuning: AnimationTuning,
}

impl Default for RigProfile {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            display_name: None,
            match_patterns: Vec::new(),
            jaw_multiplier: 1.0,
            mouth_multiplier: 1.0,
            tongue_multiplier: 1.0,
            max_morph_clamp: 1.0,
            blink_interval_seconds: 4.0,
            blink_jitter_seconds: 2.0,
            blink_duration_seconds: 0.15,
            blink_curve: BlinkCurve::Symmetric,
            blink_channels: vec![EYE_BLINK_LEFT.to_string(), EYE_BLINK_RIGHT.to_string()],
            micro_motion: 0.0,
            idle_sway: 1.0,
            idle_emotion: "neutral".to_string(),
            speaking_emotion: "friendly".to_string(),
            channel_aliases: HashMap::new(),
            bone_aliases: HashMap::new(),
            phoneme_table_override: None,
            bone_drive: None,
            tuning: AnimationTuning::default(),
        }
    }
}

impl RigProfile {
    /// Create a profile with default settings
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }

    /// Get the display name or fall back to the id
    pub fn get_display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    /// Multiplier for a channel's family.
    pub fn multiplier_for(&self, family: ChannelFamily) -> f32 {
        match family {
            ChannelFamily::Jaw => self.jaw_multiplier,
            ChannelFamily::Mouth => self.mouth_multiplier,
            ChannelFamily::Tongue => self.tongue_multiplier,
            ChannelFamily::Other => 1.0,
        }
    }

    /// Rig-specific shape for a token or phoneme code, if any.
    pub fn override_shape(&self, key: &str) -> Option<&MorphWeights> {
        self.phoneme_table_override
            .as_ref()
            .and_then(|table| table.get(key))
    }

    /// Morph target names a canonical channel writes to on this rig.
    pub fn morph_names<'a>(&'a self, channel: &'a str) -> Vec<&'a str> {
        match self.channel_aliases.get(channel) {
            Some(names) if !names.is_empty() => names.iter().map(String::as_str).collect(),
            _ => vec![channel],
        }
    }

    /// Rig bone name for a logical bone.
    pub fn bone_name<'a>(&'a self, logical: &'a str) -> &'a str {
        self.bone_aliases
            .get(logical)
            .map(String::as_str)
            .unwrap_or(logical)
    }

    /// Does a model path or id select this profile by pattern?
    pub fn matches(&self, model: &str) -> bool {
        let model = model.to_lowercase();
        self.match_patterns
            .iter()
            .any(|p| !p.is_empty() && model.contains(&p.to_lowercase()))
    }

    /// Validate the profile's numeric ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        let field = |name: &str| format!("rigs.{}.{}", self.id, name);

        if self.id.trim().is_empty() {
            return Err(ConfigError::invalid("rigs.id", "Rig id must not be empty"));
        }

        if !(self.max_morph_clamp > 0.0 && self.max_morph_clamp <= 1.0) {
            return Err(ConfigError::invalid(
                field("max_morph_clamp"),
                "Clamp must be in (0.0, 1.0]",
            ));
        }

        for (name, value) in [
            ("jaw_multiplier", self.jaw_multiplier),
            ("mouth_multiplier", self.mouth_multiplier),
            ("tongue_multiplier", self.tongue_multiplier),
            ("micro_motion", self.micro_motion),
            ("idle_sway", self.idle_sway),
            ("blink_jitter_seconds", self.blink_jitter_seconds),
        ] {
            if !(value >= 0.0) {
                return Err(ConfigError::invalid(field(name), "Must not be negative"));
            }
        }

        if !(self.blink_interval_seconds > 0.0) {
            return Err(ConfigError::invalid(
                field("blink_interval_seconds"),
                "Blink interval must be greater than 0",
            ));
        }

        if !(0.15..=0.2).contains(&self.blink_duration_seconds) {
            return Err(ConfigError::invalid(
                field("blink_duration_seconds"),
                "Blink duration must be between 0.15 and 0.2 seconds",
            ));
        }

        let tuning = &self.tuning;
        if !(tuning.idle_decay > 0.0 && tuning.idle_decay < 1.0) {
            return Err(ConfigError::invalid(
                field("tuning.idle_decay"),
                "Decay must be in (0.0, 1.0)",
            ));
        }
        if !(0.0..=1.0).contains(&tuning.emotion_ease_rate) {
            return Err(ConfigError::invalid(
                field("tuning.emotion_ease_rate"),
                "Ease rate must be between 0.0 and 1.0",
            ));
        }
        if !(0.0..=1.0).contains(&tuning.audio_floor) {
            return Err(ConfigError::invalid(
                field("tuning.audio_floor"),
                "Audio floor must be between 0.0 and 1.0",
            ));
        }

        if tuning.release_frames == 0 {
            return Err(ConfigError::invalid(
                field("tuning.release_frames"),
                "Release frames must be at least 1",
            ));
        }
        for (name, value) in [
            ("tuning.epsilon", tuning.epsilon),
            ("tuning.emotion_blend", tuning.emotion_blend),
            ("tuning.jaw_boost", tuning.jaw_boost),
        ] {
            if !(value >= 0.0) {
                return Err(ConfigError::invalid(field(name), "Must not be negative"));
            }
        }

        if let Some(drive) = &self.bone_drive {
            if !(drive.return_rate > 0.0 && drive.return_rate <= 1.0) {
                return Err(ConfigError::invalid(
                    field("bone_drive.return_rate"),
                    "Return rate must be in (0.0, 1.0]",
                ));
            }
        }

        Ok(())
    }
}
