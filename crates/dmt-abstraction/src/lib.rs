//! Capability abstraction layer for DMT.
//!
//! This crate defines the seams between the data pipeline, the training
//! orchestrator and the model version store, and the collaborators they
//! drive but do not implement:
//! - the opaque `Trainer` and `Predictor` capabilities
//! - progress and activity-log sinks
//! - the key-value `SettingsStore`
//! - the on-disk `ArtifactLayout` and atomic artifact replacement

pub mod artifact;
pub mod capability;
pub mod example;
pub mod log;
pub mod settings;

use thiserror::Error;

pub use artifact::{copy_artifact, remove_artifact, replace_artifact, ArtifactLayout};
pub use capability::{
    BackupTrigger, DataAugmenter, Predictor, ProgressSink, Trainer, TrainerEvent, UpdateConfig,
    UpdateOutcome,
};
pub use example::{FeatureVector, LabeledExample};
pub use log::{ChannelLogSink, LogSink, MemoryLogSink, TracingLogSink};
pub use settings::{MemorySettings, SettingKey, SettingsStore, Toggle};

/// Errors reported by capability implementations.
#[derive(Error, Debug)]
pub enum CapabilityError {
    /// The trainer could not load, update or persist a model.
    #[error("Trainer error: {0}")]
    Trainer(String),

    /// The predictor could not load a model or score a feature vector.
    #[error("Predictor error: {0}")]
    Predictor(String),

    /// The settings collaborator failed to persist a value.
    #[error("Settings error: {0}")]
    Settings(String),

    /// Local artifact I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for capability operations.
pub type CapabilityResult<T> = std::result::Result<T, CapabilityError>;
