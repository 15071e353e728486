//! Canonical blendshape channel names and the weight map passed between stages.
//!
//! Channel names follow ARKit conventions. Rigs with different morph naming
//! map these through `RigProfile::channel_aliases` at the scene sink.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const JAW_OPEN: &str = "jawOpen";
pub const MOUTH_OPEN: &str = "mouthOpen";
pub const MOUTH_CLOSE: &str = "mouthClose";
pub const MOUTH_PUCKER: &str = "mouthPucker";
pub const MOUTH_FUNNEL: &str = "mouthFunnel";
pub const MOUTH_SMILE: &str = "mouthSmile";
pub const MOUTH_STRETCH: &str = "mouthStretch";
pub const MOUTH_LOWER_DOWN: &str = "mouthLowerDown";
pub const MOUTH_UPPER_UP: &str = "mouthUpperUp";
pub const MOUTH_ROLL_LOWER: &str = "mouthRollLower";
pub const TONGUE_OUT: &str = "tongueOut";
pub const EYE_BLINK_LEFT: &str = "eyeBlinkLeft";
pub const EYE_BLINK_RIGHT: &str = "eyeBlinkRight";
pub const CHEEK_SQUINT: &str = "cheekSquint";
pub const BROW_INNER_UP: &str = "browInnerUp";
pub const BROW_OUTER_UP: &str = "browOuterUp";
pub const BROW_DOWN: &str = "browDown";

/// Channels that widen or narrow the mouth horizontally.
pub const MOUTH_WIDTH_CHANNELS: [&str; 2] = [MOUTH_SMILE, MOUTH_STRETCH];

/// Multiplier group a channel belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelFamily {
    Jaw,
    Mouth,
    Tongue,
    Other,
}

impl ChannelFamily {
    /// Classify a channel by its name prefix.
    pub fn of(channel: &str) -> Self {
        let lower = channel.to_ascii_lowercase();
        if lower.starts_with("jaw") {
            Self::Jaw
        } else if lower.starts_with("mouth") || lower.starts_with("lip") {
            Self::Mouth
        } else if lower.starts_with("tongue") {
            Self::Tongue
        } else {
            Self::Other
        }
    }
}

/// Channel name → weight. Every stored value lies in [0, 1].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MorphWeights(HashMap<String, f32>);

impl MorphWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(channel, weight)` pairs, clamping each weight.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f32)>,
    {
        let mut weights = Self::new();
        for (name, value) in pairs {
            weights.set(name, value);
        }
        weights
    }

    /// Set a channel, clamping to [0, 1]. NaN is stored as 0.
    pub fn set(&mut self, channel: &str, value: f32) {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        match self.0.get_mut(channel) {
            Some(slot) => *slot = value,
            None => {
                self.0.insert(channel.to_string(), value);
            }
        }
    }

    pub fn get(&self, channel: &str) -> f32 {
        self.0.get(channel).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.0.contains_key(channel)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    /// Multiply every channel by `factor`.
    pub fn scale(&mut self, factor: f32) {
        for value in self.0.values_mut() {
            *value = (*value * factor).clamp(0.0, 1.0);
        }
    }

    /// Clamp every channel to `[0, ceiling]`.
    pub fn clamp_all(&mut self, ceiling: f32) {
        let ceiling = ceiling.clamp(0.0, 1.0);
        for value in self.0.values_mut() {
            *value = value.min(ceiling);
        }
    }

    /// Largest weight in the map, or 0 when empty.
    pub fn max_value(&self) -> f32 {
        self.0.values().copied().fold(0.0, f32::max)
    }

    /// Drop entries whose weight is below `epsilon`.
    pub fn prune(&mut self, epsilon: f32) {
        self.0.retain(|_, v| *v >= epsilon);
    }

    /// Owned copy as a plain map, for serialization or the UI.
    pub fn to_map(&self) -> HashMap<String, f32> {
        self.0.clone()
    }
}

impl From<HashMap<String, f32>> for MorphWeights {
    fn from(map: HashMap<String, f32>) -> Self {
        let mut weights = Self::new();
        for (name, value) in map {
            weights.set(&name, value);
        }
        weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_clamps() {
        let mut w = MorphWeights::new();
        w.set(JAW_OPEN, 1.7);
        w.set(MOUTH_OPEN, -0.3);
        w.set(MOUTH_CLOSE, f32::NAN);
        assert_eq!(w.get(JAW_OPEN), 1.0);
        assert_eq!(w.get(MOUTH_OPEN), 0.0);
        assert_eq!(w.get(MOUTH_CLOSE), 0.0);
    }

    #[test]
    fn test_family_classification() {
        assert_eq!(ChannelFamily::of("jawOpen"), ChannelFamily::Jaw);
        assert_eq!(ChannelFamily::of("mouthPucker"), ChannelFamily::Mouth);
        assert_eq!(ChannelFamily::of("tongueOut"), ChannelFamily::Tongue);
        assert_eq!(ChannelFamily::of("eyeBlinkLeft"), ChannelFamily::Other);
    }

    #[test]
    fn test_clamp_and_prune() {
        let mut w = MorphWeights::from_pairs([(JAW_OPEN, 0.9), (MOUTH_OPEN, 0.0005)]);
        w.clamp_all(0.4);
        assert!((w.get(JAW_OPEN) - 0.4).abs() < 1e-6);
        w.prune(0.001);
        assert!(!w.contains(MOUTH_OPEN));
        assert_eq!(w.len(), 1);
    }
}
