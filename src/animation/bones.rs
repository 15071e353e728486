//! Secondary bone drive for rigs with limited mouth blendshapes.
//!
//! Jaw, teeth and tongue bones are derived from the blended mouth channels
//! and expressed as deltas from the rest pose, so the scene sink never needs
//! to know how they were computed.

use std::collections::HashMap;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::channels::{MorphWeights, JAW_OPEN, MOUTH_LOWER_DOWN, TONGUE_OUT};

pub const HEAD_BONE: &str = "head";
pub const JAW_BONE: &str = "jaw";
pub const TEETH_BONE: &str = "teeth";
pub const TONGUE_BONE: &str = "tongue";

/// Per-rig bone drive limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoneDriveProfile {
    /// Jaw rotation about X at full opening, radians
    pub jaw_max_angle: f32,
    /// Lower teeth drop at full opening, model units
    pub teeth_drop: f32,
    /// Tongue forward travel at full `tongueOut`, model units
    pub tongue_forward: f32,
    /// Contribution of `mouthLowerDown` to the jaw drive
    pub lower_lip_weight: f32,
    /// Overall scale of the drive
    pub scale: f32,
    /// Per-frame fraction of the remaining distance to rest while idle
    pub return_rate: f32,
}

impl Default for BoneDriveProfile {
    fn default() -> Self {
        Self {
            jaw_max_angle: 0.35,
            teeth_drop: 0.008,
            tongue_forward: 0.01,
            lower_lip_weight: 0.5,
            scale: 1.0,
            return_rate: 0.2,
        }
    }
}

/// Bone-local offset from the rest pose
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoneDelta {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Default for BoneDelta {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BoneDelta {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// Move `fraction` of the way toward `target`.
    pub fn ease_toward(&self, target: &BoneDelta, fraction: f32) -> Self {
        let fraction = fraction.clamp(0.0, 1.0);
        Self {
            translation: self.translation.lerp(target.translation, fraction),
            rotation: self.rotation.slerp(target.rotation, fraction).normalize(),
        }
    }

    /// Is this (nearly) the rest pose?
    pub fn is_rest(&self, epsilon: f32) -> bool {
        self.translation.length() < epsilon && self.rotation.xyz().length() < epsilon
    }
}

/// Logical bone name → delta
pub type BoneDeltas = HashMap<String, BoneDelta>;

/// Derives jaw/teeth/tongue deltas frame by frame.
#[derive(Debug, Clone, Default)]
pub struct SecondaryBoneDriver {
    current: BoneDeltas,
}

impl SecondaryBoneDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target pose for a set of blended channels.
    pub fn target(channels: &MorphWeights, profile: &BoneDriveProfile) -> BoneDeltas {
        let drive = ((channels.get(JAW_OPEN)
            + channels.get(MOUTH_LOWER_DOWN) * profile.lower_lip_weight)
            * profile.scale)
            .clamp(0.0, 1.0);
        let tongue = (channels.get(TONGUE_OUT) * profile.scale).clamp(0.0, 1.0);

        let jaw_rotation = Quat::from_axis_angle(Vec3::X, drive * profile.jaw_max_angle);

        let mut deltas = BoneDeltas::with_capacity(3);
        deltas.insert(
            JAW_BONE.to_string(),
            BoneDelta::new(Vec3::ZERO, jaw_rotation),
        );
        deltas.insert(
            TEETH_BONE.to_string(),
            BoneDelta::new(Vec3::new(0.0, -drive * profile.teeth_drop, 0.0), Quat::IDENTITY),
        );
        // The tongue rides on the jaw, half the angle
        deltas.insert(
            TONGUE_BONE.to_string(),
            BoneDelta::new(
                Vec3::new(0.0, 0.0, tongue * profile.tongue_forward),
                Quat::from_axis_angle(Vec3::X, drive * profile.jaw_max_angle * 0.5),
            ),
        );
        deltas
    }

    /// Advance one frame.
    ///
    /// While speaking the target is written directly; otherwise each bone
    /// eases back toward rest. Rigs without a drive profile get no deltas.
    pub fn update(
        &mut self,
        channels: &MorphWeights,
        speaking: bool,
        profile: Option<&BoneDriveProfile>,
    ) -> BoneDeltas {
        let Some(profile) = profile else {
            return BoneDeltas::new();
        };

        if speaking {
            self.current = Self::target(channels, profile);
        } else {
            for delta in self.current.values_mut() {
                *delta = delta.ease_toward(&BoneDelta::IDENTITY, profile.return_rate);
                if delta.is_rest(1e-4) {
                    *delta = BoneDelta::IDENTITY;
                }
            }
        }

        self.current.clone()
    }

    pub fn current(&self) -> &BoneDeltas {
        &self.current
    }

    /// Snap every bone to rest.
    pub fn reset(&mut self) {
        self.current.clear();
    }
}
