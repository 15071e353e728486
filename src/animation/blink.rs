//! Blink scheduling and eyelid curves.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::rig::RigProfile;

/// Easing function type for eyelid motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EasingType {
    QuadInOut,
    CubicOut,
}

impl EasingType {
    /// Apply easing to a normalized t value [0, 1].
    pub fn ease(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Self::CubicOut => 1.0 - (1.0 - t).powi(3),
        }
    }
}

/// Shape of the close/open cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlinkCurve {
    /// Equal closing and opening time
    #[default]
    Symmetric,
    /// Snappy close, slower open
    Asymmetric,
}

impl BlinkCurve {
    /// Share of the blink spent closing
    fn close_share(&self) -> f32 {
        match self {
            Self::Symmetric => 0.5,
            Self::Asymmetric => 0.35,
        }
    }

    /// Eyelid closure (0 open, 1 closed) at blink progress `t` in [0, 1].
    pub fn closure(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        let split = self.close_share();
        if t < split {
            let close = match self {
                Self::Symmetric => EasingType::QuadInOut,
                Self::Asymmetric => EasingType::CubicOut,
            };
            close.ease(t / split)
        } else {
            1.0 - EasingType::QuadInOut.ease((t - split) / (1.0 - split))
        }
    }
}

/// Blink state for one frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BlinkFrame {
    pub closure: f32,
    /// A new blink began this frame
    pub started: bool,
}

/// Independent blink timer. At most one blink is in progress.
#[derive(Debug, Clone)]
pub struct BlinkScheduler {
    /// Seconds since mount or the last reset
    clock: f32,
    next_blink_at: f32,
    /// Start time of the blink in progress
    in_progress: Option<f32>,
}

impl BlinkScheduler {
    pub fn new<R: Rng + ?Sized>(rig: &RigProfile, rng: &mut R) -> Self {
        Self {
            clock: 0.0,
            next_blink_at: next_interval(rig, rng),
            in_progress: None,
        }
    }

    /// Advance the timer by `dt` seconds.
    pub fn update<R: Rng + ?Sized>(&mut self, dt: f32, rig: &RigProfile, rng: &mut R) -> BlinkFrame {
        self.clock += dt.max(0.0);

        if let Some(start) = self.in_progress {
            let t = (self.clock - start) / rig.blink_duration_seconds;
            if t >= 1.0 {
                // Intervals are measured start to start
                self.in_progress = None;
                self.next_blink_at = start + next_interval(rig, rng);
            } else {
                return BlinkFrame {
                    closure: rig.blink_curve.closure(t),
                    started: false,
                };
            }
        }

        if self.in_progress.is_none() && self.clock >= self.next_blink_at {
            self.in_progress = Some(self.clock);
            return BlinkFrame {
                closure: rig.blink_curve.closure(0.0),
                started: true,
            };
        }

        BlinkFrame::default()
    }

    pub fn is_blinking(&self) -> bool {
        self.in_progress.is_some()
    }

    /// Seconds until the next scheduled blink starts (0 while blinking)
    pub fn time_to_next(&self) -> f32 {
        if self.in_progress.is_some() {
            0.0
        } else {
            (self.next_blink_at - self.clock).max(0.0)
        }
    }

    /// Cancel any blink and restart the timer.
    pub fn reset<R: Rng + ?Sized>(&mut self, rig: &RigProfile, rng: &mut R) {
        *self = Self::new(rig, rng);
    }
}

fn next_interval<R: Rng + ?Sized>(rig: &RigProfile, rng: &mut R) -> f32 {
    let jitter = if rig.blink_jitter_seconds > 0.0 {
        rng.gen_range(0.0..=rig.blink_jitter_seconds)
    } else {
        0.0
    };
    rig.blink_interval_seconds + jitter
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_easing_endpoints() {
        for easing in [EasingType::QuadInOut, EasingType::CubicOut] {
            assert!(easing.ease(0.0).abs() < 1e-6);
            assert!((easing.ease(1.0) - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_curves_close_and_reopen() {
        for curve in [BlinkCurve::Symmetric, BlinkCurve::Asymmetric] {
            assert!(curve.closure(0.0).abs() < 1e-6);
            assert!((curve.closure(curve.close_share()) - 1.0).abs() < 1e-6);
            assert!(curve.closure(1.0).abs() < 1e-6);
        }
        // Asymmetric closes faster
        assert!(BlinkCurve::Asymmetric.closure(0.2) > BlinkCurve::Symmetric.closure(0.2));
    }

    #[test]
    fn test_blink_timing() {
        let rig = RigProfile::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut blink = BlinkScheduler::new(&rig, &mut rng);

        let mut starts = Vec::new();
        let mut run = 0usize;
        let mut longest_run = 0usize;
        for frame in 0..(60 * 60) {
            let out = blink.update(DT, &rig, &mut rng);
            if out.started {
                starts.push(frame as f32 * DT);
            }
            assert!((0.0..=1.0).contains(&out.closure));
            if blink.is_blinking() {
                run += 1;
                longest_run = longest_run.max(run);
            } else {
                run = 0;
            }
        }

        assert!(starts.len() >= 8, "expected regular blinks, got {}", starts.len());
        for pair in starts.windows(2) {
            assert!(
                pair[1] - pair[0] >= rig.blink_interval_seconds - 1e-3,
                "blinks too close: {:?}",
                pair
            );
        }
        let max_frames = (rig.blink_duration_seconds / DT).ceil() as usize + 1;
        assert!(longest_run <= max_frames, "blink lasted {longest_run} frames");
    }

    #[test]
    fn test_no_jitter_is_deterministic() {
        let rig = RigProfile {
            blink_jitter_seconds: 0.0,
            blink_interval_seconds: 1.0,
            ..RigProfile::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let blink = BlinkScheduler::new(&rig, &mut rng);
        assert!((blink.time_to_next() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_reset_cancels_blink() {
        let rig = RigProfile {
            blink_interval_seconds: 0.1,
            blink_jitter_seconds: 0.0,
            ..RigProfile::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let mut blink = BlinkScheduler::new(&rig, &mut rng);
        for _ in 0..8 {
            blink.update(DT, &rig, &mut rng);
        }
        assert!(blink.is_blinking());
        blink.reset(&rig, &mut rng);
        assert!(!blink.is_blinking());
        assert!(blink.time_to_next() > 0.0);
    }
}
