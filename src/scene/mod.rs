//! Scene sink adapter
//!
//! The only layer that knows the concrete scene representation. Animation
//! code hands over a plain channel map and logical bone deltas; sinks decide
//! how (and whether) each one lands on the loaded model.

pub mod graph;

use crate::animation::BoneDeltas;
use crate::channels::MorphWeights;
use crate::rig::RigProfile;

pub use graph::{Bone, GraphSink, Mesh, SceneGraph, SceneManifest};

/// Receives each frame's output.
///
/// Implementations skip channels and bones the model lacks; nothing here
/// may fail the frame.
pub trait SceneSink {
    /// Write canonical channel weights. Channels absent from `channels`
    /// must end up at 0.
    fn apply_channels(&mut self, rig: &RigProfile, channels: &MorphWeights);

    /// Apply logical bone deltas relative to each bone's rest pose.
    fn apply_bones(&mut self, rig: &RigProfile, bones: &BoneDeltas);

    /// Immediately return every morph to 0 and every bone to rest.
    fn reset(&mut self, rig: &RigProfile);
}
