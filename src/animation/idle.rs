//! Procedural head motion: breathing, idle sway, speaking nod.
//!
//! Runs every frame regardless of speech state and never touches the
//! channel map.

use glam::{Quat, Vec3};
use std::f32::consts::PI;

use super::bones::BoneDelta;

/// Decay of the peak-triggered nod impulse per 60 Hz frame
const NOD_DECAY: f32 = 0.85;
/// Extra pitch at full nod impulse, radians
const NOD_PITCH: f32 = 0.03;

/// Head offset from rest for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadMotion {
    pub rotation: Quat,
    pub translation: Vec3,
}

impl Default for HeadMotion {
    fn default() -> Self {
        Self {
            rotation: Quat::IDENTITY,
            translation: Vec3::ZERO,
        }
    }
}

impl From<HeadMotion> for BoneDelta {
    fn from(motion: HeadMotion) -> Self {
        BoneDelta::new(motion.translation, motion.rotation)
    }
}

/// Idle clock plus the nod impulse kicked by audio peaks
#[derive(Debug, Clone, Default)]
pub struct IdleMotion {
    clock: f32,
    nod: f32,
}

impl IdleMotion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds of idle clock elapsed
    pub fn clock(&self) -> f32 {
        self.clock
    }

    /// Advance one frame. `amplitude` scales sway and breathing (0 disables).
    pub fn update(&mut self, dt: f32, speaking: bool, peak: bool, amplitude: f32) -> HeadMotion {
        let dt = dt.max(0.0);
        self.clock += dt;
        let time = self.clock;

        if peak {
            self.nod = 1.0;
        } else {
            self.nod *= NOD_DECAY.powf(dt * 60.0);
            if self.nod < 1e-3 {
                self.nod = 0.0;
            }
        }

        // Breathing lifts the head slightly, sway drifts it
        let breath = (time * 1.2 * PI).sin() * 0.002 * amplitude;
        let mut pitch = (time * 0.7).sin() * 0.015 * amplitude;
        let yaw = (time * 0.5).sin() * 0.01 * amplitude;
        let roll = (time * 0.4 * PI).sin() * 0.006 * amplitude;

        if speaking {
            pitch += (time * 6.0).sin() * 0.02;
        }
        pitch += self.nod * NOD_PITCH;

        let rotation = Quat::from_axis_angle(Vec3::Y, yaw)
            * Quat::from_axis_angle(Vec3::X, pitch)
            * Quat::from_axis_angle(Vec3::Z, roll);

        HeadMotion {
            rotation,
            translation: Vec3::new(0.0, breath, 0.0),
        }
    }

    pub fn reset(&mut self) {
        self.clock = 0.0;
        self.nod = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_motion_is_small_and_continuous() {
        let mut idle = IdleMotion::new();
        let mut moved = false;
        for _ in 0..600 {
            let motion = idle.update(DT, false, false, 1.0);
            let angle = motion.rotation.angle_between(Quat::IDENTITY);
            assert!(angle < 0.05, "idle rotation too large: {angle}");
            assert!(motion.translation.length() < 0.01);
            moved |= angle > 1e-3;
        }
        assert!(moved, "idle motion should move the head");
    }

    #[test]
    fn test_zero_amplitude_is_still() {
        let mut idle = IdleMotion::new();
        for _ in 0..120 {
            let motion = idle.update(DT, false, false, 0.0);
            assert_eq!(motion.translation, Vec3::ZERO);
            assert!(motion.rotation.angle_between(Quat::IDENTITY) < 1e-3);
        }
    }

    #[test]
    fn test_peak_kicks_nod() {
        let mut quiet = IdleMotion::new();
        let mut kicked = IdleMotion::new();
        let a = quiet.update(DT, true, false, 0.0);
        let b = kicked.update(DT, true, true, 0.0);
        assert!(b.rotation.x > a.rotation.x);

        // The impulse fades
        for _ in 0..120 {
            kicked.update(DT, false, false, 0.0);
        }
        assert_eq!(kicked.nod, 0.0);
    }

    #[test]
    fn test_reset() {
        let mut idle = IdleMotion::new();
        idle.update(1.0, true, true, 1.0);
        idle.reset();
        assert_eq!(idle.clock(), 0.0);
        assert_eq!(idle.nod, 0.0);
    }
}
