//! Emotion presets and the library they are looked up in

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::channels::{
    MorphWeights, BROW_DOWN, BROW_INNER_UP, BROW_OUTER_UP, CHEEK_SQUINT, MOUTH_ROLL_LOWER,
    MOUTH_SMILE,
};
use crate::error::RigError;

pub const NEUTRAL: &str = "neutral";

/// A named emotion overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionPreset {
    /// Unique name for this preset
    pub name: String,
    /// Display name for UI
    pub display_name: Option<String>,
    /// Target weights the emotion layer eases toward
    pub weights: MorphWeights,
}

impl EmotionPreset {
    /// Create an empty preset
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: None,
            weights: MorphWeights::new(),
        }
    }

    /// Set the display name
    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = Some(name.to_string());
        self
    }

    /// Set one channel weight
    pub fn with_weight(mut self, channel: &str, value: f32) -> Self {
        self.weights.set(channel, value);
        self
    }

    /// Get the display name or fall back to name
    pub fn get_display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// All presets known to an avatar
#[derive(Debug, Clone, Default)]
pub struct EmotionLibrary {
    presets: HashMap<String, EmotionPreset>,
}

impl EmotionLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Library with the built-in presets
    pub fn with_builtins() -> Self {
        let mut library = Self::new();
        library.add(EmotionPreset::new(NEUTRAL).with_display_name("Neutral"));
        library.add(
            EmotionPreset::new("friendly")
                .with_display_name("Friendly")
                .with_weight(MOUTH_SMILE, 0.25)
                .with_weight(CHEEK_SQUINT, 0.1),
        );
        library.add(
            EmotionPreset::new("curious")
                .with_display_name("Curious")
                .with_weight(BROW_INNER_UP, 0.35)
                .with_weight(BROW_OUTER_UP, 0.2),
        );
        library.add(
            EmotionPreset::new("happy")
                .with_display_name("Happy")
                .with_weight(MOUTH_SMILE, 0.5)
                .with_weight(CHEEK_SQUINT, 0.3),
        );
        library.add(
            EmotionPreset::new("surprised")
                .with_display_name("Surprised")
                .with_weight(BROW_INNER_UP, 0.5)
                .with_weight(BROW_OUTER_UP, 0.45),
        );
        library.add(
            EmotionPreset::new("thinking")
                .with_display_name("Thinking")
                .with_weight(BROW_DOWN, 0.3)
                .with_weight(MOUTH_ROLL_LOWER, 0.15),
        );
        library
    }

    /// Built-ins plus presets from the `[emotions]` config table.
    /// Config entries replace built-ins of the same name.
    pub fn from_config(emotions: &HashMap<String, HashMap<String, f32>>) -> Self {
        let mut library = Self::with_builtins();
        for (name, weights) in emotions {
            let mut preset = EmotionPreset::new(name);
            preset.weights = MorphWeights::from(weights.clone());
            library.add(preset);
        }
        library
    }

    /// Add or replace a preset
    pub fn add(&mut self, preset: EmotionPreset) {
        self.presets.insert(preset.name.clone(), preset);
    }

    /// Get a preset by name
    pub fn get(&self, name: &str) -> Option<&EmotionPreset> {
        self.presets.get(name)
    }

    /// Get a preset, reporting unknown names
    pub fn require(&self, name: &str) -> Result<&EmotionPreset, RigError> {
        self.get(name)
            .ok_or_else(|| RigError::UnknownEmotion(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }

    /// Get all preset names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(|s| s.as_str())
    }
}
