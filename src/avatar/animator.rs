//! One animated avatar: rig, frame state and the scene it drives.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::animation::{Blender, FrameOutput, SecondaryBoneDriver, HEAD_BONE};
use crate::channels::MorphWeights;
use crate::diagnostics::{OnceLogger, Throttle};
use crate::error::{LipSyncError, RigError};
use crate::feed::SpeechSignal;
use crate::rig::{RigProfile, RigRegistry};
use crate::scene::SceneSink;

use super::state::AnimationFrameState;

/// Seconds between frame statistics at debug level
const DEFAULT_STATS_INTERVAL: f32 = 5.0;

/// Drives one loaded model from speech signals.
///
/// An animator exists only once a scene sink exists, so nothing runs before
/// the model has loaded. On a model swap, call `into_sink` (or drop it) and
/// mount a fresh animator against the new scene.
pub struct AvatarAnimator<S: SceneSink> {
    rig: Arc<RigProfile>,
    blender: Blender,
    state: AnimationFrameState,
    bones: SecondaryBoneDriver,
    rng: StdRng,
    sink: S,
    diagnostics: OnceLogger,
    stats: Throttle,
    last: FrameOutput,
}

impl<S: SceneSink> AvatarAnimator<S> {
    /// Mount on a loaded model, resolving the rig from the model id or path.
    pub fn mount(registry: &RigRegistry, model_id: &str, sink: S) -> Self {
        Self::with_parts(registry.resolve(model_id), Blender::default(), sink)
    }

    /// Mount with an explicit rig and blender.
    pub fn with_parts(rig: Arc<RigProfile>, blender: Blender, sink: S) -> Self {
        let mut rng = StdRng::from_entropy();
        let state = AnimationFrameState::new(&rig, blender.audio_config(), &mut rng);

        let mut diagnostics = OnceLogger::new();
        for name in [&rig.idle_emotion, &rig.speaking_emotion] {
            if !blender.emotions().contains(name) {
                diagnostics.warn_once(
                    &format!("emotion:{name}"),
                    format!("Rig {} uses unknown emotion {:?}, treated as neutral", rig.id, name),
                );
            }
        }

        tracing::info!(
            "Mounted avatar with rig profile {} ({})",
            rig.id,
            rig.get_display_name()
        );

        Self {
            rig,
            blender,
            state,
            bones: SecondaryBoneDriver::new(),
            rng,
            sink,
            diagnostics,
            stats: Throttle::new(DEFAULT_STATS_INTERVAL),
            last: FrameOutput::neutral(),
        }
    }

    /// Reseed blink jitter, for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self.state.blink.reset(&self.rig, &mut self.rng);
        self
    }

    /// Set how often frame statistics are logged
    pub fn with_stats_interval(mut self, seconds: f32) -> Self {
        self.stats = Throttle::new(seconds);
        self
    }

    /// Run one frame and push the result to the scene.
    pub fn update(&mut self, signal: &SpeechSignal, dt: f32) -> &FrameOutput {
        let mut output = self
            .blender
            .blend(&mut self.state, &self.rig, signal, dt, &mut self.rng);

        // One key per issue kind; the set stays bounded whatever text is spoken
        for issue in &output.issues {
            let key = match issue {
                LipSyncError::UnresolvedToken(_) => "token:unresolved",
                LipSyncError::AudioDataAbsent => "audio:absent",
            };
            if !self.diagnostics.warn_once(key, issue) {
                tracing::trace!("{}", issue);
            }
        }

        output.bones = self.bones.update(
            &output.channels,
            output.phase.is_speaking(),
            self.rig.bone_drive.as_ref(),
        );
        output.bones.insert(HEAD_BONE.to_string(), output.head.into());

        self.sink.apply_channels(&self.rig, &output.channels);
        self.sink.apply_bones(&self.rig, &output.bones);

        if self.stats.tick(dt) {
            let audio = &self.state.audio;
            let recent = audio.history().fold(0.0f32, f32::max);
            tracing::debug!(
                "[{}] frame {} phase={} level={:.2} recent_max={:.2} last_peak={:?} channels={} emotion={} next_blink={:.2}s",
                self.rig.id,
                output.frame,
                output.phase,
                output.audio_level,
                recent,
                audio.last_peak_at(),
                output.channels.len(),
                output.emotion,
                self.state.blink.time_to_next()
            );
        }

        self.last = output;
        &self.last
    }

    /// Cancel immediately: every channel, timer and level back to neutral
    /// within this call, with no decay tail.
    pub fn hard_stop(&mut self) {
        self.state.reset(&self.rig, &mut self.rng);
        self.bones.reset();
        self.sink.reset(&self.rig);
        self.last = FrameOutput::neutral();
        tracing::info!("Hard stop on avatar {}", self.rig.id);
    }

    /// Override the emotion preset; `None` restores the rig defaults.
    pub fn set_emotion(&mut self, name: Option<&str>) -> Result<(), RigError> {
        if let Some(name) = name {
            self.blender.emotions().require(name)?;
        }
        self.state.emotion_override = name.map(str::to_string);
        Ok(())
    }

    /// Channels of the most recent frame
    pub fn channels(&self) -> &MorphWeights {
        &self.last.channels
    }

    pub fn last_output(&self) -> &FrameOutput {
        &self.last
    }

    pub fn state(&self) -> &AnimationFrameState {
        &self.state
    }

    pub fn rig(&self) -> &Arc<RigProfile> {
        &self.rig
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Tear down and hand back the sink. All frame state is discarded.
    pub fn into_sink(self) -> S {
        tracing::debug!("Unmounted avatar {}", self.rig.id);
        self.sink
    }
}
