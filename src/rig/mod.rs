//! Rig profiles: per-character multipliers, limits, aliases and overrides.
//!
//! Adding a character means adding a profile; the blending algorithm only
//! reads profile data.

pub mod profile;
pub mod registry;

pub use profile::{AnimationTuning, RigProfile};
pub use registry::{RigRegistry, DEFAULT_RIG};
