//! Reference regression backend.
//!
//! A linear model over the numerical features plus one learned offset per
//! categorical ordinal, trained with mini-batch SGD on squared error. The
//! artifact is a single JSON file.

use async_trait::async_trait;
use dmt_abstraction::{
    CapabilityError, CapabilityResult, DataAugmenter, FeatureVector, LabeledExample, Predictor,
    ProgressSink, Trainer, TrainerEvent, UpdateConfig, UpdateOutcome,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

pub const DEFAULT_LEARNING_RATE: f64 = 0.01;
pub const DEFAULT_BATCH_SIZE: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub numerical: Vec<f32>,
    #[serde(default)]
    pub categorical1: Vec<f32>,
    #[serde(default)]
    pub categorical2: Vec<f32>,
    pub bias: f32,
}

impl LinearModel {
    #[must_use]
    pub fn zeros(num_numerical: usize) -> Self {
        Self { numerical: vec![0.0; num_numerical], categorical1: Vec::new(), categorical2: Vec::new(), bias: 0.0 }
    }

    /// Ordinals without a learned offset contribute nothing.
    #[must_use]
    pub fn predict(&self, features: &FeatureVector) -> f32 {
        let dot: f32 = self.numerical.iter().zip(&features.numerical).map(|(w, x)| w * x).sum();
        let c1 = self.categorical1.get(features.categorical1 as usize).copied().unwrap_or(0.0);
        let c2 = self.categorical2.get(features.categorical2 as usize).copied().unwrap_or(0.0);
        dot + c1 + c2 + self.bias
    }

    pub fn read(path: &Path) -> CapabilityResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn write(&self, path: &Path) -> CapabilityResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    fn from_json(text: &str) -> CapabilityResult<Self> {
        serde_json::from_str(text).map_err(|e| CapabilityError::Predictor(format!("invalid model file: {e}")))
    }

    fn to_json(&self) -> CapabilityResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CapabilityError::Trainer(format!("cannot encode model: {e}")))
    }

    /// One SGD step on `examples`; returns the batch mean squared error
    /// measured before the step.
    fn step(&mut self, examples: &[LabeledExample], learning_rate: f32) -> f64 {
        if examples.is_empty() {
            return 0.0;
        }
        let m = examples.len() as f32;
        let mut grad_w = vec![0.0_f32; self.numerical.len()];
        let mut grad_b = 0.0_f32;
        let mut grad_c1: Vec<(usize, f32)> = Vec::with_capacity(examples.len());
        let mut grad_c2: Vec<(usize, f32)> = Vec::with_capacity(examples.len());
        let mut loss = 0.0_f64;

        for example in examples {
            let err = self.predict(&example.features) - example.label;
            loss += f64::from(err) * f64::from(err);
            let g = 2.0 * err / m;
            for (gw, x) in grad_w.iter_mut().zip(&example.features.numerical) {
                *gw += g * x;
            }
            grad_b += g;
            grad_c1.push((example.features.categorical1 as usize, g));
            grad_c2.push((example.features.categorical2 as usize, g));
        }

        for (w, gw) in self.numerical.iter_mut().zip(grad_w) {
            *w -= learning_rate * gw;
        }
        self.bias -= learning_rate * grad_b;
        apply_offsets(&mut self.categorical1, &grad_c1, learning_rate);
        apply_offsets(&mut self.categorical2, &grad_c2, learning_rate);

        loss / f64::from(m)
    }
}

fn apply_offsets(table: &mut Vec<f32>, grads: &[(usize, f32)], learning_rate: f32) {
    for &(ordinal, g) in grads {
        if table.len() <= ordinal {
            table.resize(ordinal + 1, 0.0);
        }
        table[ordinal] -= learning_rate * g;
    }
}

/// `Trainer` and `Predictor` over `LinearModel` JSON artifacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearRegressor;

#[async_trait]
impl Trainer for LinearRegressor {
    type Handle = LinearModel;

    fn id(&self) -> &'static str {
        "linear"
    }

    async fn load(&self, path: &Path) -> CapabilityResult<LinearModel> {
        let text = tokio::fs::read_to_string(path).await?;
        LinearModel::from_json(&text).map_err(|e| CapabilityError::Trainer(e.to_string()))
    }

    async fn update(
        &self,
        handle: &LinearModel,
        batch: &[LabeledExample],
        config: &UpdateConfig,
        progress: &dyn ProgressSink,
    ) -> UpdateOutcome<LinearModel> {
        if batch.is_empty() {
            return UpdateOutcome::Failed { reason: "training batch is empty".to_string() };
        }
        if config.epochs == 0 {
            return UpdateOutcome::Failed { reason: "epochs must be at least 1".to_string() };
        }
        if let Some(width) = batch.iter().map(|e| e.features.numerical.len()).find(|&w| w != handle.numerical.len()) {
            return UpdateOutcome::Failed {
                reason: format!("model expects {} numerical features, batch has {width}", handle.numerical.len()),
            };
        }

        let learning_rate = config.learning_rate.unwrap_or(DEFAULT_LEARNING_RATE) as f32;
        let batch_size = config.batch_size.unwrap_or(DEFAULT_BATCH_SIZE).max(1);
        let mut model = handle.clone();
        let mut epoch_loss = f64::NAN;

        progress.on_event(TrainerEvent::TrainingBegin);
        for epoch_index in 0..config.epochs {
            let mut total = 0.0;
            for (batch_index, chunk) in batch.chunks(batch_size).enumerate() {
                let loss = model.step(chunk, learning_rate);
                total += loss * chunk.len() as f64;
                progress.on_event(TrainerEvent::MiniBatchEnd { batch_index, loss });
            }
            epoch_loss = total / batch.len() as f64;
            if !epoch_loss.is_finite() {
                return UpdateOutcome::Failed { reason: format!("loss diverged at epoch {epoch_index}") };
            }
            progress.on_event(TrainerEvent::EpochEnd { epoch_index, loss: epoch_loss });
            tokio::task::yield_now().await;
        }
        debug!(epochs = config.epochs, loss = epoch_loss, "Linear update finished");

        UpdateOutcome::Completed { model, final_loss: epoch_loss }
    }

    async fn save(&self, handle: &LinearModel, path: &Path) -> CapabilityResult<()> {
        tokio::fs::write(path, handle.to_json()?).await?;
        Ok(())
    }
}

impl Predictor for LinearRegressor {
    type Handle = LinearModel;

    fn load(&self, path: &Path) -> CapabilityResult<LinearModel> {
        LinearModel::read(path)
    }

    fn predict(&self, handle: &LinearModel, features: &FeatureVector) -> CapabilityResult<f32> {
        Ok(handle.predict(features))
    }
}

/// Adds one noisy copy of each example, perturbing every numerical feature
/// uniformly within `±scale`.
#[derive(Debug)]
pub struct JitterAugmenter {
    scale: f32,
    rng: Mutex<StdRng>,
}

impl JitterAugmenter {
    #[must_use]
    pub fn new(scale: f32, seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self { scale: scale.abs(), rng: Mutex::new(rng) }
    }
}

impl DataAugmenter for JitterAugmenter {
    fn augment(&self, example: &LabeledExample) -> Vec<LabeledExample> {
        let Ok(mut rng) = self.rng.lock() else {
            return Vec::new();
        };
        let mut copy = example.clone();
        if self.scale > 0.0 {
            for x in &mut copy.features.numerical {
                *x += rng.gen_range(-self.scale..=self.scale);
            }
        }
        vec![copy]
    }
}
