//! In-memory scene graph and the sink that writes into it.
//!
//! The model-loading side describes the loaded model with a JSON manifest:
//!
//! ```json
//! {
//!   "name": "sakura",
//!   "meshes": [{ "name": "Face", "morph_targets": ["Fcl_MTH_A", "Fcl_EYE_Close_L"] }],
//!   "bones": [{ "name": "J_Jaw", "rest_translation": [0, 1.5, 0], "rest_rotation": [0, 0, 0, 1] }]
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::animation::{BoneDelta, BoneDeltas};
use crate::channels::MorphWeights;
use crate::diagnostics::OnceLogger;
use crate::error::SceneError;
use crate::rig::RigProfile;

use super::SceneSink;

/// Model description supplied once the model has loaded
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneManifest {
    pub name: String,
    pub meshes: Vec<MeshManifest>,
    pub bones: Vec<BoneManifest>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshManifest {
    pub name: String,
    pub morph_targets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoneManifest {
    pub name: String,
    #[serde(default)]
    pub rest_translation: Vec3,
    #[serde(default = "identity")]
    pub rest_rotation: Quat,
}

fn identity() -> Quat {
    Quat::IDENTITY
}

/// A mesh with its morph target dictionary
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    name_to_index: HashMap<String, usize>,
    weights: Vec<f32>,
}

impl Mesh {
    pub fn new(name: &str, morph_targets: &[String]) -> Self {
        let mut name_to_index = HashMap::new();
        for (i, target) in morph_targets.iter().enumerate() {
            name_to_index.entry(target.clone()).or_insert(i);
        }
        Self {
            name: name.to_string(),
            name_to_index,
            weights: vec![0.0; morph_targets.len()],
        }
    }

    pub fn has_morph(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    pub fn weight(&self, name: &str) -> Option<f32> {
        self.name_to_index.get(name).map(|&i| self.weights[i])
    }

    fn set_weight(&mut self, name: &str, value: f32) -> bool {
        match self.name_to_index.get(name) {
            Some(&i) => {
                self.weights[i] = value.clamp(0.0, 1.0);
                true
            }
            None => false,
        }
    }

    pub fn morph_names(&self) -> impl Iterator<Item = &str> {
        self.name_to_index.keys().map(String::as_str)
    }

    /// Raw weights array, in morph target order
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }
}

/// A named bone with its recorded rest pose
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    pub rest_translation: Vec3,
    pub rest_rotation: Quat,
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Bone {
    pub fn new(name: &str, rest_translation: Vec3, rest_rotation: Quat) -> Self {
        Self {
            name: name.to_string(),
            rest_translation,
            rest_rotation,
            translation: rest_translation,
            rotation: rest_rotation,
        }
    }

    /// Pose the bone at rest plus `delta`
    pub fn apply_delta(&mut self, delta: &BoneDelta) {
        self.translation = self.rest_translation + delta.translation;
        self.rotation = (delta.rotation * self.rest_rotation).normalize();
    }

    pub fn reset(&mut self) {
        self.translation = self.rest_translation;
        self.rotation = self.rest_rotation;
    }

    pub fn is_at_rest(&self) -> bool {
        self.translation == self.rest_translation && self.rotation == self.rest_rotation
    }
}

/// Meshes and bones of one loaded model
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    pub name: String,
    meshes: Vec<Mesh>,
    bones: HashMap<String, Bone>,
}

impl SceneGraph {
    /// Build from a manifest. A model with neither meshes nor bones is a
    /// load failure.
    pub fn from_manifest(manifest: SceneManifest) -> Result<Self, SceneError> {
        if manifest.meshes.is_empty() && manifest.bones.is_empty() {
            return Err(SceneError::ModelLoad(format!(
                "model {:?} has no meshes or bones",
                manifest.name
            )));
        }

        let meshes = manifest
            .meshes
            .iter()
            .map(|m| Mesh::new(&m.name, &m.morph_targets))
            .collect();

        let mut bones = HashMap::with_capacity(manifest.bones.len());
        for bone in &manifest.bones {
            if bone.name.is_empty() {
                return Err(SceneError::ModelLoad("bone with empty name".to_string()));
            }
            bones.insert(
                bone.name.clone(),
                Bone::new(&bone.name, bone.rest_translation, bone.rest_rotation),
            );
        }

        tracing::info!(
            "Loaded scene {:?}: {} meshes, {} bones",
            manifest.name,
            manifest.meshes.len(),
            bones.len()
        );

        Ok(Self {
            name: manifest.name,
            meshes,
            bones,
        })
    }

    /// Parse a JSON manifest
    pub fn from_json(json: &str) -> Result<Self, SceneError> {
        let manifest: SceneManifest =
            serde_json::from_str(json).map_err(|e| SceneError::ModelLoad(e.to_string()))?;
        Self::from_manifest(manifest)
    }

    /// Load a JSON manifest file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SceneError> {
        let json = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            SceneError::ModelLoad(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Set a morph on every mesh that has it. Returns the number of meshes written.
    pub fn set_morph(&mut self, name: &str, value: f32) -> usize {
        self.meshes
            .iter_mut()
            .map(|mesh| mesh.set_weight(name, value))
            .filter(|&hit| hit)
            .count()
    }

    /// Weight of a morph on the first mesh that has it
    pub fn morph_weight(&self, name: &str) -> Option<f32> {
        self.meshes.iter().find_map(|mesh| mesh.weight(name))
    }

    pub fn has_morph(&self, name: &str) -> bool {
        self.meshes.iter().any(|mesh| mesh.has_morph(name))
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn bone(&self, name: &str) -> Option<&Bone> {
        self.bones.get(name)
    }

    pub fn bone_mut(&mut self, name: &str) -> Option<&mut Bone> {
        self.bones.get_mut(name)
    }

    pub fn bone_names(&self) -> impl Iterator<Item = &str> {
        self.bones.keys().map(String::as_str)
    }

    /// Every morph to 0, every bone to rest
    pub fn reset(&mut self) {
        for mesh in &mut self.meshes {
            mesh.weights.iter_mut().for_each(|w| *w = 0.0);
        }
        for bone in self.bones.values_mut() {
            bone.reset();
        }
    }

    /// Largest morph weight across all meshes
    pub fn max_morph_weight(&self) -> f32 {
        self.meshes
            .iter()
            .flat_map(|mesh| mesh.weights.iter().copied())
            .fold(0.0, f32::max)
    }
}

/// `SceneSink` writing into a `SceneGraph`
#[derive(Debug)]
pub struct GraphSink {
    graph: SceneGraph,
    /// Morph names written last frame
    written: HashSet<String>,
    missing: OnceLogger,
}

impl GraphSink {
    pub fn new(graph: SceneGraph) -> Self {
        Self {
            graph,
            written: HashSet::new(),
            missing: OnceLogger::new(),
        }
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn into_graph(self) -> SceneGraph {
        self.graph
    }

    /// Current weight of a canonical channel after rig aliasing
    pub fn channel_weight(&self, rig: &RigProfile, channel: &str) -> Option<f32> {
        rig.morph_names(channel)
            .into_iter()
            .find_map(|name| self.graph.morph_weight(name))
    }

    fn report(&mut self, error: SceneError) {
        let key = error.to_string();
        self.missing.warn_once(&key, &error);
    }
}

impl SceneSink for GraphSink {
    fn apply_channels(&mut self, rig: &RigProfile, channels: &MorphWeights) {
        let mut written = HashSet::with_capacity(channels.len());

        for (channel, value) in channels.iter() {
            let mut hit = false;
            for name in rig.morph_names(channel) {
                if self.graph.set_morph(name, value) > 0 {
                    written.insert(name.to_string());
                    hit = true;
                }
            }
            if !hit {
                self.report(SceneError::MissingMorphTarget {
                    channel: channel.to_string(),
                });
            }
        }

        // Morphs driven last frame but not this one go back to rest
        for name in self.written.difference(&written) {
            self.graph.set_morph(name, 0.0);
        }
        self.written = written;
    }

    fn apply_bones(&mut self, rig: &RigProfile, bones: &BoneDeltas) {
        for (logical, delta) in bones {
            let name = rig.bone_name(logical);
            let found = match self.graph.bone_mut(name) {
                Some(bone) => {
                    bone.apply_delta(delta);
                    true
                }
                None => false,
            };
            if !found {
                self.report(SceneError::MissingBone(name.to_string()));
            }
        }
    }

    fn reset(&mut self, _rig: &RigProfile) {
        self.graph.reset();
        self.written.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::JAW_BONE;
    use crate::channels::{JAW_OPEN, MOUTH_OPEN, TONGUE_OUT};
    use crate::rig::RigRegistry;

    const MANIFEST: &str = r#"{
        "name": "test-head",
        "meshes": [
            { "name": "Face", "morph_targets": ["jawOpen", "mouthOpen", "eyeBlinkLeft"] },
            { "name": "Teeth", "morph_targets": ["jawOpen"] }
        ],
        "bones": [
            { "name": "head", "rest_translation": [0.0, 1.5, 0.0] },
            { "name": "jaw" }
        ]
    }"#;

    #[test]
    fn test_load_manifest() {
        let graph = SceneGraph::from_json(MANIFEST).unwrap();
        assert_eq!(graph.name, "test-head");
        assert_eq!(graph.meshes().len(), 2);
        assert!(graph.has_morph("eyeBlinkLeft"));
        assert_eq!(graph.bone("head").unwrap().rest_translation, Vec3::new(0.0, 1.5, 0.0));
        assert_eq!(graph.bone("jaw").unwrap().rest_rotation, Quat::IDENTITY);
    }

    #[test]
    fn test_empty_manifest_is_load_failure() {
        assert!(matches!(
            SceneGraph::from_json(r#"{"name": "nothing"}"#),
            Err(SceneError::ModelLoad(_))
        ));
        assert!(matches!(
            SceneGraph::from_json("not json"),
            Err(SceneError::ModelLoad(_))
        ));
        assert!(matches!(
            SceneGraph::from_file("/nonexistent/model.json"),
            Err(SceneError::ModelLoad(_))
        ));
    }

    #[test]
    fn test_set_morph_hits_every_mesh() {
        let mut graph = SceneGraph::from_json(MANIFEST).unwrap();
        assert_eq!(graph.set_morph(JAW_OPEN, 0.5), 2);
        assert_eq!(graph.set_morph("browDown", 0.5), 0);
    }

    #[test]
    fn test_sink_zeroes_stale_morphs() {
        let rig = RigProfile::default();
        let mut sink = GraphSink::new(SceneGraph::from_json(MANIFEST).unwrap());

        sink.apply_channels(&rig, &MorphWeights::from_pairs([(JAW_OPEN, 0.6), (MOUTH_OPEN, 0.4)]));
        assert_eq!(sink.graph().morph_weight(JAW_OPEN), Some(0.6));

        sink.apply_channels(&rig, &MorphWeights::from_pairs([(JAW_OPEN, 0.3)]));
        assert_eq!(sink.graph().morph_weight(JAW_OPEN), Some(0.3));
        assert_eq!(sink.graph().morph_weight(MOUTH_OPEN), Some(0.0));
    }

    #[test]
    fn test_missing_morph_is_skipped_and_logged_once() {
        let rig = RigProfile::default();
        let mut sink = GraphSink::new(SceneGraph::from_json(MANIFEST).unwrap());
        let channels = MorphWeights::from_pairs([(TONGUE_OUT, 0.5), (JAW_OPEN, 0.2)]);

        sink.apply_channels(&rig, &channels);
        sink.apply_channels(&rig, &channels);
        assert_eq!(sink.missing.len(), 1);
        assert_eq!(sink.graph().morph_weight(JAW_OPEN), Some(0.2));
    }

    #[test]
    fn test_aliases_route_channels() {
        let registry = RigRegistry::with_builtins();
        let rig = registry.get("expressive").unwrap();
        let graph = SceneGraph::from_json(
            r#"{"meshes": [{"name": "Face", "morph_targets": ["Fcl_MTH_A", "Fcl_EYE_Close_L"]}]}"#,
        )
        .unwrap();
        let mut sink = GraphSink::new(graph);

        sink.apply_channels(&rig, &MorphWeights::from_pairs([(JAW_OPEN, 0.7)]));
        assert_eq!(sink.graph().morph_weight("Fcl_MTH_A"), Some(0.7));
        assert_eq!(sink.channel_weight(&rig, JAW_OPEN), Some(0.7));
    }

    #[test]
    fn test_bones_relative_to_rest() {
        let registry = RigRegistry::with_builtins();
        let rig = registry.default_profile();
        let mut sink = GraphSink::new(SceneGraph::from_json(MANIFEST).unwrap());

        let mut bones = BoneDeltas::new();
        bones.insert(
            "head".to_string(),
            BoneDelta::new(Vec3::new(0.0, 0.01, 0.0), Quat::IDENTITY),
        );
        bones.insert(
            JAW_BONE.to_string(),
            BoneDelta::new(Vec3::ZERO, Quat::from_axis_angle(Vec3::X, 0.2)),
        );
        bones.insert("tongue".to_string(), BoneDelta::IDENTITY);
        sink.apply_bones(&rig, &bones);

        let head = sink.graph().bone("head").unwrap();
        assert!((head.translation.y - 1.51).abs() < 1e-6);
        assert!(!sink.graph().bone("jaw").unwrap().is_at_rest());
        assert_eq!(sink.missing.len(), 1);

        sink.reset(&rig);
        assert!(sink.graph().bone("jaw").unwrap().is_at_rest());
        assert!(sink.graph().bone("head").unwrap().is_at_rest());
    }

    #[test]
    fn test_reset_zeroes_morphs() {
        let rig = RigProfile::default();
        let mut sink = GraphSink::new(SceneGraph::from_json(MANIFEST).unwrap());
        sink.apply_channels(&rig, &MorphWeights::from_pairs([(JAW_OPEN, 0.9)]));
        sink.reset(&rig);
        assert_eq!(sink.graph().max_morph_weight(), 0.0);
    }
}
