//! Opaque capabilities driven by the orchestrator and evaluator.

use crate::example::{FeatureVector, LabeledExample};
use crate::CapabilityResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Progress reported by a trainer while an update runs.
///
/// A well-behaved trainer emits `TrainingBegin` once, then for every epoch
/// zero or more `MiniBatchEnd` followed by one `EpochEnd`, with strictly
/// increasing epoch indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrainerEvent {
    TrainingBegin,
    MiniBatchEnd { batch_index: usize, loss: f64 },
    EpochEnd { epoch_index: u32, loss: f64 },
}

/// Receives trainer progress events.
pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: TrainerEvent);
}

/// Parameters handed to the trainer for one update run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateConfig {
    pub epochs: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self { epochs: 500, learning_rate: None, batch_size: None }
    }
}

/// Terminal state of a trainer update.
#[derive(Debug)]
pub enum UpdateOutcome<H> {
    Completed { model: H, final_loss: f64 },
    Failed { reason: String },
}

/// Incremental training capability.
///
/// The orchestrator never inspects a handle; it only loads one, passes it to
/// `update`, and asks the trainer to persist the updated model.
#[async_trait]
pub trait Trainer: Send + Sync {
    type Handle: Send + Sync;

    fn id(&self) -> &'static str;

    async fn load(&self, path: &Path) -> CapabilityResult<Self::Handle>;

    async fn update(
        &self,
        handle: &Self::Handle,
        batch: &[LabeledExample],
        config: &UpdateConfig,
        progress: &dyn ProgressSink,
    ) -> UpdateOutcome<Self::Handle>;

    async fn save(&self, handle: &Self::Handle, path: &Path) -> CapabilityResult<()>;
}

/// Scoring capability.
pub trait Predictor: Send + Sync {
    type Handle: Send + Sync;

    fn load(&self, path: &Path) -> CapabilityResult<Self::Handle>;

    fn predict(&self, handle: &Self::Handle, features: &FeatureVector) -> CapabilityResult<f32>;
}

/// Produces synthetic examples derived from a real one.
pub trait DataAugmenter: Send + Sync {
    fn augment(&self, example: &LabeledExample) -> Vec<LabeledExample>;
}

/// Uploads the current updatable artifact after a successful training run.
#[async_trait]
pub trait BackupTrigger: Send + Sync {
    async fn backup_current(&self) -> anyhow::Result<()>;
}
