//! Error types for Kuchipaku

use thiserror::Error;

/// Main error type for Kuchipaku
#[derive(Error, Debug)]
pub enum KuchipakuError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Rig error: {0}")]
    Rig(#[from] RigError),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Lip-sync error: {0}")]
    LipSync(#[from] LipSyncError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Rig profile and emotion lookup errors
#[derive(Error, Debug)]
pub enum RigError {
    #[error("Unknown rig profile: {0}")]
    UnknownRig(String),

    #[error("Rig profile registered twice: {0}")]
    DuplicateRig(String),

    #[error("Unknown emotion preset: {0}")]
    UnknownEmotion(String),
}

/// Scene graph errors.
///
/// Only `ModelLoad` is ever surfaced to callers; missing morphs and bones are
/// logged once by the sink and the write is skipped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("Morph target not found on any mesh: {channel}")]
    MissingMorphTarget { channel: String },

    #[error("Bone not found in rig: {0}")]
    MissingBone(String),

    #[error("Model load failed: {0}")]
    ModelLoad(String),
}

/// Per-frame lip-sync degradations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LipSyncError {
    #[error("Token could not be resolved to a mouth shape: {0:?}")]
    UnresolvedToken(String),

    #[error("Speaking without audio data, using nominal amplitude")]
    AudioDataAbsent,
}

/// Result type alias for Kuchipaku operations
pub type Result<T> = std::result::Result<T, KuchipakuError>;
