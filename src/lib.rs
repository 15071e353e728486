//! Kuchipaku - Audio-driven lip-sync and facial animation
//!
//! Turns a stream of speech signals into per-frame facial animation for a
//! loaded 3D avatar:
//! - Resolves Japanese kana and English phonemes/words into mouth shapes
//! - Modulates shapes by audio loudness and dominant frequency
//! - Layers emotion presets, procedural blinks and idle head motion
//! - Adapts to each character's rig through data-driven profiles
//! - Drives optional jaw/teeth/tongue bones for low-poly rigs

pub mod animation;
pub mod audio;
pub mod avatar;
pub mod channels;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod feed;
pub mod phoneme;
pub mod rig;
pub mod scene;

pub use animation::{Blender, FrameOutput};
pub use avatar::{AvatarAnimator, EmotionLibrary};
pub use channels::MorphWeights;
pub use config::Config;
pub use error::{KuchipakuError, Result};
pub use feed::{SignalReceiver, SpeechFeed, SpeechSignal};
pub use phoneme::{Language, PhonemeResolver};
pub use rig::{RigProfile, RigRegistry};
pub use scene::{GraphSink, SceneGraph, SceneSink};

use std::sync::Arc;

/// Shared, read-only engine state built once from configuration.
///
/// Every avatar mounted from the same engine shares the rig registry,
/// phoneme tables and emotion presets; per-avatar state lives in each
/// `AvatarAnimator`.
#[derive(Debug, Clone)]
pub struct Engine {
    config: Config,
    registry: Arc<RigRegistry>,
    blender: Blender,
}

impl Engine {
    /// Build from a validated configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let registry = RigRegistry::from_config(&config)?;
        let emotions = EmotionLibrary::from_config(&config.emotions);
        let blender = Blender::new(
            Arc::new(PhonemeResolver::new()),
            Arc::new(emotions),
            config.audio.clone(),
        );

        tracing::debug!(
            "Engine ready: {} rig profiles, default {}",
            registry.len(),
            config.avatar.default_rig
        );

        Ok(Self {
            config,
            registry: Arc::new(registry),
            blender,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &RigRegistry {
        &self.registry
    }

    pub fn blender(&self) -> &Blender {
        &self.blender
    }

    /// Mount an avatar on a loaded model. `model_id` is the rig id or the
    /// model path used to pick a rig profile.
    pub fn mount<S: SceneSink>(&self, model_id: &str, sink: S) -> AvatarAnimator<S> {
        let rig = self.registry.resolve(model_id);
        AvatarAnimator::with_parts(rig, self.blender.clone(), sink)
            .with_stats_interval(self.config.logging.stats_interval_secs)
    }
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_from_config() {
        let config = Config::from_str(
            r#"
            [avatar]
            default_rig = "teen"

            [emotions.smug]
            mouthSmile = 0.4
            browDown = 0.2
            "#,
        )
        .unwrap();
        let engine = Engine::new(config).unwrap();

        assert!(engine.blender().emotions().contains("smug"));
        assert_eq!(engine.registry().default_profile().id, "teen");

        let graph = SceneGraph::from_json(
            r#"{"name": "engine-head", "meshes": [{"name": "Face", "morph_targets": ["jawOpen"]}]}"#,
        )
        .unwrap();
        let mut avatar = engine.mount("no-such-model", GraphSink::new(graph));
        assert_eq!(avatar.rig().id, "teen");
        avatar.set_emotion(Some("smug")).unwrap();
    }

    #[test]
    fn test_engine_rejects_unknown_default_rig() {
        let config = Config::from_str("[avatar]\ndefault_rig = \"ghost\"\n").unwrap();
        assert!(matches!(
            Engine::new(config),
            Err(KuchipakuError::Rig(error::RigError::UnknownRig(_)))
        ));
    }
}
