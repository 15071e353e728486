//! Log-once and throttled logging helpers.
//!
//! Non-fatal degradations (missing morphs, missing bones, unresolved tokens)
//! can recur every frame. They are reported once per key per owner; frame
//! statistics are gated on elapsed frame time.

use std::collections::HashSet;
use std::fmt::Display;

/// Remembers which keys have already been reported
#[derive(Debug, Clone, Default)]
pub struct OnceLogger {
    seen: HashSet<String>,
}

impl OnceLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a warning the first time `key` is seen. Returns whether it logged.
    pub fn warn_once(&mut self, key: &str, message: impl Display) -> bool {
        if !self.first(key) {
            return false;
        }
        tracing::warn!("{}", message);
        true
    }

    fn first(&mut self, key: &str) -> bool {
        if self.seen.contains(key) {
            return false;
        }
        self.seen.insert(key.to_string());
        true
    }

    pub fn has_seen(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Opens at most once per interval of accumulated frame time
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: f32,
    elapsed: f32,
}

impl Throttle {
    pub fn new(interval_secs: f32) -> Self {
        Self {
            interval: interval_secs.max(0.0),
            // Open on the first tick
            elapsed: interval_secs.max(0.0),
        }
    }

    /// Advance by `dt` seconds; true when the interval has passed.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.elapsed += dt.max(0.0);
        if self.elapsed >= self.interval {
            self.elapsed = 0.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_once_per_key() {
        let mut log = OnceLogger::new();
        assert!(log.warn_once("morph:jawOpen", "missing jawOpen"));
        assert!(!log.warn_once("morph:jawOpen", "missing jawOpen"));
        assert!(log.warn_once("bone:jaw", "missing jaw"));
        assert!(log.has_seen("bone:jaw"));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_throttle() {
        let mut throttle = Throttle::new(1.0);
        assert!(throttle.tick(0.016));
        let opened = (0..8).filter(|_| throttle.tick(0.25)).count();
        assert_eq!(opened, 2);
    }
}
