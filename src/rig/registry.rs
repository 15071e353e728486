//! Read-only registry of rig profiles, built once at startup.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::animation::{BlinkCurve, BoneDriveProfile};
use crate::channels::{
    MorphWeights, EYE_BLINK_LEFT, EYE_BLINK_RIGHT, JAW_OPEN, MOUTH_FUNNEL, MOUTH_LOWER_DOWN,
    MOUTH_OPEN, MOUTH_PUCKER, MOUTH_SMILE, MOUTH_STRETCH,
};
use crate::config::Config;
use crate::error::{KuchipakuError, RigError};

use super::RigProfile;

pub const DEFAULT_RIG: &str = "default";

/// Resolves avatar identifiers to rig profiles.
#[derive(Debug, Clone)]
pub struct RigRegistry {
    profiles: HashMap<String, Arc<RigProfile>>,
    /// Registration order, used for deterministic pattern matching
    order: Vec<String>,
    default_id: String,
}

impl RigRegistry {
    /// Registry containing only the built-in profiles.
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            profiles: HashMap::new(),
            order: Vec::new(),
            default_id: DEFAULT_RIG.to_string(),
        };
        for profile in builtin_profiles() {
            // Built-in ids are unique
            let _ = registry.register(profile);
        }
        registry
    }

    /// Built-ins plus the `[[rigs]]` entries of the configuration.
    pub fn from_config(config: &Config) -> Result<Self, KuchipakuError> {
        let mut registry = Self::with_builtins();
        for profile in &config.rigs {
            profile.validate()?;
            registry.register(profile.clone())?;
        }
        registry.set_default(&config.avatar.default_rig)?;
        Ok(registry)
    }

    /// Add a profile. Ids must be unique.
    pub fn register(&mut self, profile: RigProfile) -> Result<(), RigError> {
        if self.profiles.contains_key(&profile.id) {
            return Err(RigError::DuplicateRig(profile.id));
        }
        tracing::debug!("Registered rig profile: {}", profile.id);
        self.order.push(profile.id.clone());
        self.profiles.insert(profile.id.clone(), Arc::new(profile));
        Ok(())
    }

    /// Choose the profile used when nothing else matches.
    pub fn set_default(&mut self, id: &str) -> Result<(), RigError> {
        if !self.profiles.contains_key(id) {
            return Err(RigError::UnknownRig(id.to_string()));
        }
        self.default_id = id.to_string();
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<RigProfile>> {
        self.profiles.get(id).cloned()
    }

    pub fn default_profile(&self) -> Arc<RigProfile> {
        self.profiles
            .get(&self.default_id)
            .cloned()
            .unwrap_or_else(|| Arc::new(RigProfile::default()))
    }

    /// Resolve a model id or model path to a profile.
    ///
    /// Order: exact id, file stem of a path, match patterns, default.
    pub fn resolve(&self, model: &str) -> Arc<RigProfile> {
        if let Some(profile) = self.get(model) {
            return profile;
        }

        if let Some(stem) = Path::new(model).file_stem().and_then(|s| s.to_str()) {
            if let Some(profile) = self.get(stem) {
                return profile;
            }
        }

        for id in &self.order {
            if let Some(profile) = self.profiles.get(id) {
                if profile.matches(model) {
                    tracing::debug!("Model {} matched rig profile {}", model, id);
                    return Arc::clone(profile);
                }
            }
        }

        tracing::debug!("No rig profile for {}, using {}", model, self.default_id);
        self.default_profile()
    }

    /// Profile ids in registration order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

fn shape(pairs: &[(&str, f32)]) -> MorphWeights {
    MorphWeights::from_pairs(pairs.iter().copied())
}

fn aliases(pairs: &[(&str, &str)]) -> HashMap<String, Vec<String>> {
    pairs
        .iter()
        .map(|(channel, morph)| (channel.to_string(), vec![morph.to_string()]))
        .collect()
}

fn builtin_profiles() -> Vec<RigProfile> {
    let default = RigProfile {
        display_name: Some("Default".to_string()),
        ..RigProfile::new(DEFAULT_RIG)
    };

    let adult = RigProfile {
        display_name: Some("Adult".to_string()),
        match_patterns: vec!["adult".to_string()],
        jaw_multiplier: 0.9,
        max_morph_clamp: 0.8,
        blink_interval_seconds: 3.5,
        blink_duration_seconds: 0.18,
        ..RigProfile::new("adult")
    };

    let teen = RigProfile {
        display_name: Some("Teen".to_string()),
        match_patterns: vec!["teen".to_string(), "student".to_string()],
        jaw_multiplier: 0.8,
        mouth_multiplier: 0.9,
        max_morph_clamp: 0.5,
        blink_interval_seconds: 3.0,
        ..RigProfile::new("teen")
    };

    // Smaller mouth proportions for younger characters
    let mut child_table = HashMap::new();
    child_table.insert(
        "あ".to_string(),
        shape(&[(JAW_OPEN, 0.5), (MOUTH_OPEN, 0.45), (MOUTH_LOWER_DOWN, 0.25)]),
    );
    child_table.insert(
        "う".to_string(),
        shape(&[(JAW_OPEN, 0.1), (MOUTH_PUCKER, 0.45), (MOUTH_FUNNEL, 0.2)]),
    );
    child_table.insert(
        "お".to_string(),
        shape(&[(JAW_OPEN, 0.35), (MOUTH_OPEN, 0.3), (MOUTH_FUNNEL, 0.4)]),
    );
    child_table.insert(
        "AA".to_string(),
        shape(&[(JAW_OPEN, 0.5), (MOUTH_OPEN, 0.45), (MOUTH_LOWER_DOWN, 0.25)]),
    );
    let child = RigProfile {
        display_name: Some("Child".to_string()),
        match_patterns: vec!["child".to_string(), "kid".to_string()],
        jaw_multiplier: 0.7,
        mouth_multiplier: 0.8,
        tongue_multiplier: 0.5,
        max_morph_clamp: 0.4,
        blink_interval_seconds: 3.0,
        blink_duration_seconds: 0.16,
        speaking_emotion: "happy".to_string(),
        phoneme_table_override: Some(child_table),
        ..RigProfile::new("child")
    };

    // VRM-style anime rig: Fcl_* morph names, asymmetric blink, micro-motion
    let expressive = RigProfile {
        display_name: Some("Expressive (VRM)".to_string()),
        match_patterns: vec!["expressive".to_string(), ".vrm".to_string()],
        max_morph_clamp: 1.0,
        blink_curve: BlinkCurve::Asymmetric,
        blink_duration_seconds: 0.2,
        micro_motion: 0.15,
        speaking_emotion: "happy".to_string(),
        idle_emotion: "friendly".to_string(),
        channel_aliases: aliases(&[
            (JAW_OPEN, "Fcl_MTH_A"),
            (MOUTH_PUCKER, "Fcl_MTH_U"),
            (MOUTH_FUNNEL, "Fcl_MTH_O"),
            (MOUTH_STRETCH, "Fcl_MTH_I"),
            (MOUTH_SMILE, "Fcl_MTH_E"),
            (EYE_BLINK_LEFT, "Fcl_EYE_Close_L"),
            (EYE_BLINK_RIGHT, "Fcl_EYE_Close_R"),
        ]),
        ..RigProfile::new("expressive")
    };

    let mut lowpoly_bones = HashMap::new();
    lowpoly_bones.insert("head".to_string(), "J_Head".to_string());
    lowpoly_bones.insert("jaw".to_string(), "J_Jaw".to_string());
    lowpoly_bones.insert("teeth".to_string(), "J_TeethLower".to_string());
    lowpoly_bones.insert("tongue".to_string(), "J_Tongue".to_string());
    let lowpoly = RigProfile {
        display_name: Some("Low-poly (bone driven)".to_string()),
        match_patterns: vec!["lowpoly".to_string(), "low_poly".to_string(), "chibi".to_string()],
        max_morph_clamp: 0.8,
        blink_interval_seconds: 5.0,
        bone_aliases: lowpoly_bones,
        bone_drive: Some(BoneDriveProfile::default()),
        ..RigProfile::new("lowpoly")
    };

    vec![default, adult, teen, child, expressive, lowpoly]
}
