//! Configuration parsing and management for Kuchipaku

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, KuchipakuError};
use crate::phoneme::Language;
use crate::rig::{RigProfile, DEFAULT_RIG};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub avatar: AvatarConfig,
    pub audio: AudioConfig,
    pub logging: LoggingConfig,
    /// Additional rig profiles, same schema as the built-ins
    pub rigs: Vec<RigProfile>,
    /// Additional emotion presets: name → channel → weight
    pub emotions: HashMap<String, HashMap<String, f32>>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, KuchipakuError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, KuchipakuError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Load configuration from default paths
    pub fn load() -> Result<Self, KuchipakuError> {
        let paths = [
            PathBuf::from("kuchipaku.toml"),
            PathBuf::from("config/kuchipaku.toml"),
            dirs_path().join("kuchipaku.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), KuchipakuError> {
        if self.avatar.default_rig.trim().is_empty() {
            return Err(ConfigError::invalid("avatar.default_rig", "Rig id must not be empty").into());
        }

        self.audio.validate()?;

        if !(self.logging.stats_interval_secs > 0.0) {
            return Err(ConfigError::invalid(
                "logging.stats_interval_secs",
                "Interval must be greater than 0",
            )
            .into());
        }

        for rig in &self.rigs {
            rig.validate()?;
        }

        for (name, weights) in &self.emotions {
            for (channel, value) in weights {
                if !(0.0..=1.0).contains(value) {
                    return Err(ConfigError::invalid(
                        format!("emotions.{}.{}", name, channel),
                        "Weight must be between 0.0 and 1.0",
                    )
                    .into());
                }
            }
        }

        Ok(())
    }
}

/// Avatar selection defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    /// Rig used when a model matches no profile
    pub default_rig: String,
    /// Language assumed when the playback side sends no tag
    pub language: Language,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            default_rig: DEFAULT_RIG.to_string(),
            language: Language::Japanese,
        }
    }
}

/// Audio level analyzer tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Ring buffer length of instantaneous levels
    pub history_len: usize,
    /// Weight of the new level in exponential smoothing (0.9 = near pass-through)
    pub smoothing: f32,
    /// Per-frame decay of the smoothed level while silent
    pub silence_decay: f32,
    /// Level above which a syllable peak is flagged
    pub peak_threshold: f32,
    /// Minimum time between flagged peaks
    pub peak_interval_ms: u32,
    /// Gain applied to PCM RMS
    pub pcm_gain: f32,
    /// Gain applied to lower-half spectrum RMS
    pub spectrum_gain: f32,
    /// Dominant frequencies below this widen the jaw
    pub low_freq_hz: f32,
    /// Dominant frequencies above this narrow the mouth
    pub high_freq_hz: f32,
    pub low_freq_jaw_factor: f32,
    pub high_freq_width_factor: f32,
    /// Level substituted while speaking without any audio data
    pub nominal_amplitude: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            history_len: 10,
            smoothing: 0.9,
            silence_decay: 0.95,
            peak_threshold: 0.6,
            peak_interval_ms: 100,
            pcm_gain: 3.0,
            spectrum_gain: 1.0,
            low_freq_hz: 300.0,
            high_freq_hz: 2000.0,
            low_freq_jaw_factor: 1.2,
            high_freq_width_factor: 0.8,
            nominal_amplitude: 0.5,
        }
    }
}

impl AudioConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_len == 0 {
            return Err(ConfigError::invalid(
                "audio.history_len",
                "History length must be greater than 0",
            ));
        }

        for (field, value) in [
            ("audio.smoothing", self.smoothing),
            ("audio.silence_decay", self.silence_decay),
            ("audio.peak_threshold", self.peak_threshold),
            ("audio.nominal_amplitude", self.nominal_amplitude),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid(field, "Must be between 0.0 and 1.0"));
            }
        }

        for (field, value) in [
            ("audio.pcm_gain", self.pcm_gain),
            ("audio.spectrum_gain", self.spectrum_gain),
            ("audio.low_freq_jaw_factor", self.low_freq_jaw_factor),
            ("audio.high_freq_width_factor", self.high_freq_width_factor),
        ] {
            if !(value >= 0.0) {
                return Err(ConfigError::invalid(field, "Must not be negative"));
            }
        }

        if !(self.low_freq_hz < self.high_freq_hz) {
            return Err(ConfigError::invalid(
                "audio.low_freq_hz",
                "Low band must be below the high band",
            ));
        }

        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum seconds between per-avatar frame statistics
    pub stats_interval_secs: f32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stats_interval_secs: 5.0,
        }
    }
}

/// Get the platform-specific configuration directory
fn dirs_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir).join("kuchipaku");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config/kuchipaku");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join("Library/Application Support/kuchipaku");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("kuchipaku");
        }
    }

    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.avatar.default_rig, "default");
        assert_eq!(config.avatar.language, Language::Japanese);
        assert_eq!(config.audio.history_len, 10);
        assert_eq!(config.audio.smoothing, 0.9);
        assert_eq!(config.audio.silence_decay, 0.95);
        assert_eq!(config.audio.peak_interval_ms, 100);
        assert!(config.rigs.is_empty());
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            [avatar]
            default_rig = "teen"
            language = "en"

            [audio]
            smoothing = 0.8
            nominal_amplitude = 0.4

            [[rigs]]
            id = "narrator"
            match_patterns = ["narrator"]
            max_morph_clamp = 0.6
            jaw_multiplier = 0.9

            [rigs.tuning]
            idle_decay = 0.8

            [emotions.sleepy]
            browDown = 0.4
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.avatar.default_rig, "teen");
        assert_eq!(config.avatar.language, Language::English);
        assert_eq!(config.audio.smoothing, 0.8);
        assert_eq!(config.audio.history_len, 10);
        assert_eq!(config.rigs.len(), 1);
        assert_eq!(config.rigs[0].id, "narrator");
        assert_eq!(config.rigs[0].max_morph_clamp, 0.6);
        assert_eq!(config.rigs[0].tuning.idle_decay, 0.8);
        assert_eq!(config.rigs[0].tuning.release_frames, 10);
        assert_eq!(config.rigs[0].blink_interval_seconds, 4.0);
        assert_eq!(config.emotions["sleepy"]["browDown"], 0.4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_invalid_values() {
        let mut config = Config::default();
        config.audio.smoothing = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.audio.history_len = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rigs.push(RigProfile {
            max_morph_clamp: 0.0,
            ..RigProfile::new("flat")
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("rigs.flat.max_morph_clamp"));

        let mut config = Config::default();
        config.rigs.push(RigProfile {
            jaw_multiplier: -1.0,
            ..RigProfile::new("inverted")
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_error() {
        let result = Config::from_str("[audio\nsmoothing = ");
        assert!(matches!(
            result,
            Err(KuchipakuError::Config(ConfigError::Parse(_)))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nstats_interval_secs = 2.5").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.logging.stats_interval_secs, 2.5);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::from_file(dir.path().join("absent.toml"));
        assert!(matches!(
            result,
            Err(KuchipakuError::Config(ConfigError::ReadFile(_)))
        ));
    }
}
