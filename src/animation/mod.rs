//! Frame animation: channel blending, blinks, idle motion and bone drive.

pub mod blender;
pub mod blink;
pub mod bones;
pub mod idle;

pub use blender::{Blender, FrameOutput};
pub use blink::{BlinkCurve, BlinkFrame, BlinkScheduler, EasingType};
pub use bones::{
    BoneDelta, BoneDeltas, BoneDriveProfile, SecondaryBoneDriver, HEAD_BONE, JAW_BONE, TEETH_BONE,
    TONGUE_BONE,
};
pub use idle::{HeadMotion, IdleMotion};
