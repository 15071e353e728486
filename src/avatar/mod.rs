//! Avatar instances
//!
//! Handles per-avatar animation state, emotion presets and the animator that
//! drives a scene sink.

pub mod animator;
pub mod emotion;
pub mod state;

pub use animator::AvatarAnimator;
pub use emotion::{EmotionLibrary, EmotionPreset};
pub use state::{AnimationFrameState, SpeechPhase};
